//! Tracing subscriber set-up

use tracing_subscriber::prelude::*;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Install the global subscriber; `RUST_LOG` takes precedence over `fallback`.
///
/// Span close events (with their busy/idle timings) are logged once the
/// filter enables `debug`, so every frame and projection step gets timed.
pub fn init_with_filter(fallback: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let span_events = if logs_span_timings(&env_filter.to_string()) {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_writer(std::io::stderr)
        .with_span_events(span_events);

    // a subscriber installed earlier (tests, embedding binaries) wins
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

fn logs_span_timings(filter: &str) -> bool {
    filter.contains("debug") || filter.contains("trace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timings_follow_filter_level() {
        assert!(!logs_span_timings("info"));
        assert!(logs_span_timings("dictyviz=debug"));
        assert!(logs_span_timings("warn,dictyviz::ortho_pipeline=trace"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_with_filter("warn");
        init();
    }
}
