//! Shared test support: a one-time `tracing` subscriber so integration runs
//! surface the crate's own `tracing::debug!`/`warn!`/`error!` instrumentation
//! instead of discarding it.

use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
    });
}
