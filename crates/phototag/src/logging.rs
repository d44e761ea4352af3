//! Logging initialization.
//!
//! Logs go to stderr so stdout stays reserved for tags and reports.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level used when `RUST_LOG` is not set.
fn default_level(verbose: bool, configured: &str) -> &str {
    match (verbose, configured) {
        (true, "trace") => "trace",
        (true, _) => "debug",
        (false, level @ ("error" | "warn" | "info" | "debug" | "trace")) => level,
        (false, _) => "info",
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section, with CLI overrides.
pub fn init_from_config(config: &phototag_core::Config, verbose: bool, json_logs: bool) {
    let level = default_level(verbose, &config.logging.level);
    let json_format = json_logs || config.logging.format == "json";
    init(level, json_format);
}
