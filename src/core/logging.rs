// Tracing subscriber setup for hosts and demos

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "proctor_lib=info,info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber: JSON lines when `json` is set, colored text otherwise.
/// Returns false if a subscriber was already installed.
pub fn init_logging(json: bool) -> bool {
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter())
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter())
            .try_init()
            .is_ok()
    }
}
