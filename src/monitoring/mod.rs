/*!
 * Monitoring
 * Structured logging setup and evaluation tracing
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, EvalSpan};
