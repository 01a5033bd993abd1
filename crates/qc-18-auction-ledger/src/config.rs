//! Configuration for the Auction Ledger.

use crate::domain::{Address, ZERO_ADDRESS};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::env;

/// Default flat protocol fee: 0.01 of a 10^18-unit coin.
pub const DEFAULT_PROTOCOL_FEE: u64 = 10_000_000_000_000_000;

/// Ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The ledger's own identity in the asset registry.
    pub custodian: Address,
    /// Only identity allowed to read and sweep the fee pool.
    pub admin: Address,
    /// Flat fee taken from every winning bid.
    pub protocol_fee: U256,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            custodian: ZERO_ADDRESS,
            admin: ZERO_ADDRESS,
            protocol_fee: U256::from(DEFAULT_PROTOCOL_FEE),
        }
    }
}

impl LedgerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_AUCTION_CUSTODIAN`: ledger address, hex (default: zero address)
    /// - `QC_AUCTION_ADMIN`: admin address, hex (default: zero address)
    /// - `QC_AUCTION_PROTOCOL_FEE`: flat fee, decimal (default: 10^16)
    ///
    /// Missing or malformed values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            custodian: env::var("QC_AUCTION_CUSTODIAN")
                .ok()
                .and_then(|v| parse_address(&v))
                .unwrap_or(defaults.custodian),

            admin: env::var("QC_AUCTION_ADMIN")
                .ok()
                .and_then(|v| parse_address(&v))
                .unwrap_or(defaults.admin),

            protocol_fee: env::var("QC_AUCTION_PROTOCOL_FEE")
                .ok()
                .and_then(|v| U256::from_dec_str(v.trim()).ok())
                .unwrap_or(defaults.protocol_fee),
        }
    }

    /// Set the custodian address.
    pub fn with_custodian(mut self, custodian: Address) -> Self {
        self.custodian = custodian;
        self
    }

    /// Set the admin address.
    pub fn with_admin(mut self, admin: Address) -> Self {
        self.admin = admin;
        self
    }

    /// Set the protocol fee.
    pub fn with_protocol_fee(mut self, fee: U256) -> Self {
        self.protocol_fee = fee;
        self
    }
}

/// Parse a 20-byte hex address, with or without `0x`.
pub fn parse_address(value: &str) -> Option<Address> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let bytes = hex::decode(digits).ok()?;
    bytes.try_into().ok()
}
