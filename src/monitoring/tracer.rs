/*!
 * Structured Tracing
 * Subscriber setup and per-evaluation spans using the tracing crate
 *
 * Features:
 * - Trace ID per evaluation for correlating console output and errors
 * - JSON-formatted logs for structured parsing
 * - Slow evaluation warnings
 */

use crate::core::limits::SLOW_EVAL_THRESHOLD;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SANDBOX_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("SANDBOX_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "structured tracing initialized");
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one `eval` inside an isolated context
pub struct EvalSpan {
    span: Span,
    start: Instant,
    trace_id: String,
    outcome: Option<&'static str>,
}

impl EvalSpan {
    pub fn new(module_count: usize, entry: Option<&str>) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "eval",
            trace_id = %trace_id,
            modules = module_count,
            entry = entry.unwrap_or(""),
            outcome = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        span.in_scope(|| debug!(modules = module_count, entry = ?entry, "evaluation started"));

        Self {
            span,
            start: Instant::now(),
            trace_id,
            outcome: None,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Enter the span; events logged while the guard lives are attributed to it
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record how the evaluation ended (`rendered`, `defined`, `error`)
    pub fn record_outcome(&mut self, outcome: &'static str) {
        self.outcome = Some(outcome);
        self.span.record("outcome", outcome);
    }

    pub fn outcome(&self) -> Option<&'static str> {
        self.outcome
    }
}

impl Drop for EvalSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let duration_ms = duration.as_millis() as u64;
        self.span.record("duration_ms", duration_ms);
        let _entered = self.span.enter();
        let outcome = self.outcome.unwrap_or("unknown");

        if duration > SLOW_EVAL_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                outcome,
                duration_ms,
                slow = true,
                "slow evaluation detected"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                outcome,
                duration_us = duration.as_micros() as u64,
                "evaluation completed"
            );
        }
    }
}
