//! Tracing setup and phase lifecycle log helpers.

use std::io::IsTerminal;
use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::types::PhaseId;

fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the global tracing subscriber.
///
/// Logs go to stderr so stdout stays free for phase summaries. `RUST_LOG`
/// overrides the built-in filter. Verbose mode adds targets and span-close
/// timing events.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("exemplar=debug,info")
            } else {
                EnvFilter::try_new("exemplar=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false);

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                layer
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.with_target(false).compact())
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one phase execution.
pub fn phase_span(phase: PhaseId) -> tracing::Span {
    span!(Level::INFO, "phase", phase = %phase)
}

pub fn log_phase_start(phase: PhaseId) {
    info!(phase = %phase, "Starting phase");
}

pub fn log_phase_complete(phase: PhaseId, duration_ms: u128) {
    info!(phase = %phase, duration_ms = %duration_ms, "Phase completed");
}

pub fn log_phase_error(phase: PhaseId, error: &str, duration_ms: u128) {
    error!(
        phase = %phase,
        duration_ms = %duration_ms,
        error = %error,
        "Phase failed"
    );
}
