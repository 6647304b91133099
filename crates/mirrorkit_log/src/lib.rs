//! Tracing bootstrap shared by `mirrorkit` binaries.
//!
//! Diagnostics go to stderr; stdout stays reserved for the action log.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter directive for a `-v` count.
pub fn derive_default_directive(n_verbosity: u8) -> &'static str {
    match n_verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows `n_verbosity`.
pub fn init(n_verbosity: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(derive_default_directive(n_verbosity)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(n_verbosity > 1)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{derive_default_directive, init};
    use tracing::{info, warn};

    #[test]
    fn default_directive_follows_verbosity() {
        assert_eq!(derive_default_directive(0), "warn");
        assert_eq!(derive_default_directive(1), "info");
        assert_eq!(derive_default_directive(2), "debug");
        assert_eq!(derive_default_directive(9), "debug");
    }

    #[test]
    fn init_twice_reports_error_instead_of_panicking() {
        // The global subscriber can only be set once per process.
        let _ = init(1);
        assert!(init(1).is_err());

        info!("logging initialized");
        warn!("second init rejected");
    }
}
