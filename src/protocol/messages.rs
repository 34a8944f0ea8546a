/*!
 * Protocol Messages
 * The tagged union crossing the isolation boundary in both directions
 */

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Module name -> executable code text, in submission order
pub type ModuleSource = IndexMap<String, String>;

/// Messages posted into the isolated context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Eval(EvalRequest),
}

/// Body of an `eval` message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalRequest {
    #[serde(default)]
    pub modules: ModuleSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
}

impl EvalRequest {
    pub fn new(modules: ModuleSource, main_module: impl Into<String>) -> Self {
        Self {
            modules,
            main_module: Some(main_module.into()),
            css: None,
        }
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    /// Entry module, if one was named (an empty name counts as none)
    pub fn entry(&self) -> Option<&str> {
        self.main_module.as_deref().filter(|name| !name.is_empty())
    }

    /// Stylesheet text, if any non-empty css was supplied
    pub fn stylesheet(&self) -> Option<&str> {
        self.css.as_deref().filter(|css| !css.is_empty())
    }
}

/// Messages posted out of the isolated context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Ready,
    Rendered,
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<ErrorPayload>,
    },
    Console {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<ConsoleLevel>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Vec<String>>,
    },
}

impl OutboundMessage {
    pub fn error(payload: ErrorPayload) -> Self {
        OutboundMessage::Error {
            payload: Some(payload),
        }
    }

    pub fn console(level: ConsoleLevel, args: Vec<String>) -> Self {
        OutboundMessage::Console {
            level: Some(level),
            args: Some(args),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Ready => "ready",
            OutboundMessage::Rendered => "rendered",
            OutboundMessage::Error { .. } => "error",
            OutboundMessage::Console { .. } => "console",
        }
    }
}

/// Serialized failure carried by an `error` message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }

    pub fn with_location(mut self, source: impl Into<String>, line: u32, column: u32) -> Self {
        self.source = Some(source.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl From<crate::core::ScriptError> for ErrorPayload {
    fn from(err: crate::core::ScriptError) -> Self {
        ErrorPayload::new(err.message).with_stack(err.stack)
    }
}

/// Console method that produced a `console` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 5] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
        ConsoleLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details handed to the caller's error callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}
