//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports. Embedders wire real
//! registries and payment rails in their place.

mod asset_registry;
mod clock;
mod event_log;
mod funds;

pub use asset_registry::InMemoryAssetRegistry;
pub use clock::ManualClock;
pub use event_log::InMemoryEventLog;
pub use funds::InMemoryFundChannel;
