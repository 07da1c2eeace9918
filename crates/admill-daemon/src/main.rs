//! admill-daemon binary entry point.
//!
//! Single OS process running a Tokio async runtime.

use std::sync::Arc;

use tracing::{error, info};

use admill_daemon::config::DaemonConfig;
use admill_daemon::{clock, events, refresh, DaemonState};
use admill_entitle::{BillingProvider, StubBillingProvider};
use admill_notify::{Mailer, TracingMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("admill=info".parse()?),
        )
        .init();

    info!("admill daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("admill.db");
    let conn = admill_db::open(&db_path)?;

    // 3. External collaborators. The stub provider and tracing mailer
    // stand in until the vendor integrations are configured.
    let billing: Arc<dyn BillingProvider> = Arc::new(StubBillingProvider::new());
    let mailer: Arc<dyn Mailer> = Arc::new(TracingMailer);

    // 4. Build daemon state
    let state = DaemonState::new(config, conn, billing, mailer);

    // 5. Emit DaemonStarted event
    state.event_bus.emit(events::Event {
        event_type: "DaemonStarted".to_string(),
        timestamp: clock::now_secs(),
        payload: serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    });

    // 6. Run the background refresh until shutdown
    let refresh_task = tokio::spawn(refresh::run(Arc::clone(&state)));

    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    let _ = state.shutdown_tx.send(());
    if let Err(e) = refresh_task.await {
        error!("Refresh task error: {}", e);
    }

    info!("Daemon stopped");
    Ok(())
}
