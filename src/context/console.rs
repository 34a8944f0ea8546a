/*!
 * Console Interceptor
 * Every console call inside the context is logged locally and forwarded
 * across the boundary as a `console` message
 */

use super::value::Value;
use crate::protocol::{ConsoleLevel, OutboundMessage, Outbox};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Best-effort string form of a console argument
///
/// Objects are pretty-printed as JSON; anything that cannot be serialized
/// falls back to plain string conversion. Never fails.
pub fn format_arg(arg: &Value) -> String {
    match arg {
        Value::Object(_) | Value::Array(_) | Value::Null => {
            arg.to_pretty_json().unwrap_or_else(|| arg.to_string())
        }
        _ => arg.to_string(),
    }
}

/// Console visible to module code
#[derive(Clone)]
pub struct Console {
    outbox: Arc<dyn Outbox>,
}

impl Console {
    pub fn new(outbox: Arc<dyn Outbox>) -> Self {
        Self { outbox }
    }

    pub fn emit(&self, level: ConsoleLevel, args: &[Value]) {
        let rendered: Vec<String> = args.iter().map(format_arg).collect();
        let line = rendered.join(" ");

        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => {
                info!(target: "sandbox::console", level = %level, "{}", line)
            }
            ConsoleLevel::Warn => warn!(target: "sandbox::console", "{}", line),
            ConsoleLevel::Error => error!(target: "sandbox::console", "{}", line),
            ConsoleLevel::Debug => debug!(target: "sandbox::console", "{}", line),
        }

        self.outbox.post(OutboundMessage::console(level, rendered));
    }

    pub fn log(&self, args: &[Value]) {
        self.emit(ConsoleLevel::Log, args);
    }

    pub fn info(&self, args: &[Value]) {
        self.emit(ConsoleLevel::Info, args);
    }

    pub fn warn(&self, args: &[Value]) {
        self.emit(ConsoleLevel::Warn, args);
    }

    pub fn error(&self, args: &[Value]) {
        self.emit(ConsoleLevel::Error, args);
    }

    pub fn debug(&self, args: &[Value]) {
        self.emit(ConsoleLevel::Debug, args);
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}
