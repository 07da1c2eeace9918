//! Event emission system.
//!
//! Events are pushed from the daemon to UI subscribers. Each subscriber
//! has an independent buffer with backpressure at 1000 events. Emission
//! is best-effort and never fails the operation that produced the event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "AccountCreated", "LinkRedeemed").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// Categorize an event type into a category.
pub fn categorize_event(event_type: &str) -> &'static str {
    match event_type {
        s if s.starts_with("Account") || s.starts_with("Session") => "account",
        s if s.starts_with("Credits") || s.starts_with("Generation") => "ledger",
        s if s.starts_with("Link") => "redemption",
        s if s.starts_with("Subscription") => "billing",
        _ => "system",
    }
}
