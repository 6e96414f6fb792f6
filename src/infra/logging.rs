//! Diagnostic logging setup.
//!
//! Progress meant for the user is printed by `reporting::console`; this is
//! the `tracing` side channel for diagnostics (orphaned lenses, stat
//! failures, indexer calls). Filter with `TESTREE_LOG`, e.g. `TESTREE_LOG=debug`.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "TESTREE_LOG";

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Installs a stderr subscriber. Safe to call more than once.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another subscriber may already be installed (e.g. by a test harness).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
