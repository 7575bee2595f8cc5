//! Tracing initialisation for the check binary.
//!
//! Log lines go to stderr so that stdout carries only the final summary.
//! The filter comes from `CHECK_OSS_HISTORY_LOG`, then `RUST_LOG`, then the
//! level chosen on the command line.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "CHECK_OSS_HISTORY_LOG";

/// Verbosity implied by `--verbose` / `--quiet`.
pub fn level_for(verbose: bool, quiet: bool) -> Level {
    match (verbose, quiet) {
        (true, _) => Level::DEBUG,
        (false, true) => Level::WARN,
        (false, false) => Level::INFO,
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber. `json` switches to newline-delimited JSON.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = env_filter(level);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_quiet() {
        assert_eq!(level_for(true, true), Level::DEBUG);
        assert_eq!(level_for(false, true), Level::WARN);
        assert_eq!(level_for(false, false), Level::INFO);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
