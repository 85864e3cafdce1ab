//! Tracing setup for pushgate.
//!
//! Gate output goes to stdout; every log event goes to stderr so that a hook
//! wrapper or `--json` consumer sees only the report.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Check if colored output should be used.
///
/// Returns true only if:
/// - stderr is a terminal (TTY)
/// - NO_COLOR environment variable is not set
#[must_use]
pub fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("pushgate=debug,info")
            } else {
                EnvFilter::try_new("warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the defaults. `json` switches to one JSON object per
/// event.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = default_filter(verbose);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(verbose)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span covering the evaluation of one pushed ref.
#[must_use]
pub fn ref_span(ref_name: &str, range: &str) -> tracing::Span {
    span!(Level::INFO, "ref_evaluation", ref_name = %ref_name, range = %range)
}

/// Span covering one pipeline stage.
#[must_use]
pub fn stage_span(stage: &'static str) -> tracing::Span {
    span!(Level::DEBUG, "stage", stage = stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_can_be_entered_without_subscriber() {
        let span = ref_span("refs/heads/main", "a..b");
        let _guard = span.enter();
        let inner = stage_span("classify");
        let _inner = inner.enter();
    }

    #[test]
    fn test_default_filter_builds() {
        let _ = default_filter(true);
        let _ = default_filter(false);
    }
}
