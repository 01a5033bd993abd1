//! Event Log Adapter
//!
//! Implements the `EventSink` port by appending to an in-memory log.

use crate::events::AuctionEvent;
use crate::ports::outbound::EventSink;
use parking_lot::RwLock;

/// Append-only in-memory event log.
#[derive(Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<AuctionEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in publication order.
    pub fn events(&self) -> Vec<AuctionEvent> {
        self.events.read().clone()
    }

    /// Most recent event.
    pub fn last(&self) -> Option<AuctionEvent> {
        self.events.read().last().cloned()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// True when nothing was published.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, event: AuctionEvent) {
        self.events.write().push(event);
    }
}
