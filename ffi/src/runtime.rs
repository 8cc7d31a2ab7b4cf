//! Process-wide state shared by every call across the boundary.
//!
//! # Design
//! The first call builds one multi-thread tokio runtime and one
//! `BatchExecutor` (configured from the environment) and keeps them for the
//! life of the process, so connection pools survive between batches. If
//! either fails to build, the error is kept too and every call reports it.

use std::sync::OnceLock;

use fanout_core::{BatchExecutor, ExecutorConfig};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV: &str = "FANOUT_LOG";

pub(crate) struct Shared {
    pub(crate) runtime: Runtime,
    pub(crate) executor: BatchExecutor,
}

pub(crate) fn shared() -> Result<&'static Shared, String> {
    static SHARED: OnceLock<Result<Shared, String>> = OnceLock::new();
    SHARED
        .get_or_init(|| {
            init_logging();
            build()
        })
        .as_ref()
        .map_err(String::clone)
}

fn build() -> Result<Shared, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("fanout-worker")
        .build()
        .map_err(|e| format!("error starting runtime: {e}"))?;

    let config = ExecutorConfig::from_env();
    let executor = {
        let _guard = runtime.enter();
        BatchExecutor::new(config).map_err(|e| e.to_string())?
    };
    tracing::debug!(config = ?executor.config(), "batch executor ready");
    Ok(Shared { runtime, executor })
}

/// Install a stderr subscriber unless the host process already has one.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
