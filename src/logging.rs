//! Tracing initialization.
//!
//! `RUST_LOG` wins when set. Otherwise the CLI logs warnings only, or
//! everything from this crate at debug level with `--verbose`. Logs go to
//! stderr so stdout stays clean for documents and listings.

use tracing_subscriber::EnvFilter;

fn default_directives(verbose: bool) -> &'static str {
    if verbose { "warn,tailor=debug" } else { "warn" }
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json {
        builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init()
    } else {
        builder.compact().try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_crate_debug() {
        assert_eq!(default_directives(false), "warn");
        assert!(default_directives(true).contains("tailor=debug"));
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false, true);
        init(true, false);
    }
}
