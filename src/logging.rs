use std::sync::Once;

/// Variable holding the log filter, e.g. `LAZYSCHEME_LOG=lazyscheme=trace`.
pub const LOG_ENV_VAR: &str = "LAZYSCHEME_LOG";

const DEFAULT_FILTER: &str = "warn";

static TRACING_INIT: Once = Once::new();

/// Installs the stderr subscriber for the binaries. Safe to call more than
/// once; only the first call has an effect.
pub fn init() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        // Another subscriber may already be installed, e.g. by a test harness
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::debug!("logging initialised");
    }
}
