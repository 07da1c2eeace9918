//! # admill-daemon
//!
//! The entitlement & redemption service.
//!
//! Route guards, the signup flow, the generation service, and admin
//! tooling call the typed handlers in [`commands`]; [`refresh`] keeps
//! subscription snapshots fresh for every active session. The binary in
//! `main.rs` wires configuration, the database, and the background task
//! together. Transport (HTTP, RPC) is deliberately out of this crate.

pub mod clock;
pub mod commands;
pub mod config;
pub mod events;
pub mod refresh;

#[cfg(test)]
mod testutil;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};

use admill_entitle::{BillingProvider, StatusCache};
use admill_notify::Mailer;

use crate::config::DaemonConfig;
use crate::events::EventBus;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// External billing entitlement lookup.
    pub billing: Arc<dyn BillingProvider>,
    /// External email service.
    pub mailer: Arc<dyn Mailer>,
    /// Subscription snapshot cache.
    pub cache: Arc<Mutex<StatusCache>>,
    /// Accounts with an active session (refreshed in the background).
    pub sessions: Arc<RwLock<HashSet<String>>>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    /// Assemble daemon state around an open database connection.
    pub fn new(
        config: DaemonConfig,
        conn: rusqlite::Connection,
        billing: Arc<dyn BillingProvider>,
        mailer: Arc<dyn Mailer>,
    ) -> Arc<Self> {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        Arc::new(Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            event_bus: EventBus::new(1000),
            billing,
            mailer,
            cache: Arc::new(Mutex::new(StatusCache::new())),
            sessions: Arc::new(RwLock::new(HashSet::new())),
            shutdown_tx,
        })
    }
}
