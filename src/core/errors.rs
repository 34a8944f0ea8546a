/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::BoundaryId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Module resolution result
///
/// # Must Use
/// A failed `require` aborts the current evaluation and must be propagated
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Controller-side result
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Wire decoding result
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// A failure raised by module code inside the isolated context
///
/// This is the only error shape that crosses the boundary: it becomes the
/// `payload` of an `error` message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl From<&str> for ScriptError {
    fn from(message: &str) -> Self {
        ScriptError::new(message)
    }
}

impl From<String> for ScriptError {
    fn from(message: String) -> Self {
        ScriptError::new(message)
    }
}

/// In-context module system errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    #[diagnostic(
        code(module::not_found),
        help("The module was never defined in this evaluation, or its code failed to compile.")
    )]
    NotFound(String),

    #[error("{library} not loaded. {hint}")]
    #[diagnostic(
        code(module::library_unavailable),
        help("Bind the library in the sandbox capability table before creating the sandbox.")
    )]
    LibraryUnavailable { library: String, hint: String },

    #[error("{0}")]
    #[diagnostic(
        code(module::mount_failed),
        help("The entry module must export a component the runtime library can mount.")
    )]
    MountFailed(String),

    #[error(transparent)]
    #[diagnostic(code(module::script))]
    Script(#[from] ScriptError),
}

impl From<ModuleError> for ScriptError {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Script(script) => script,
            other => ScriptError::new(other.to_string()),
        }
    }
}

/// A module's code text could not be turned into a factory
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("{message}")]
#[diagnostic(
    code(module::compile_failed),
    help("The module is left unregistered; requiring it fails with `Module not found`.")
)]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Wire decoding errors (payloads the receiving side ignores)
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProtocolError {
    #[error("Message payload is not an object")]
    #[diagnostic(code(protocol::not_an_object))]
    NotAnObject,

    #[error("Message has no `type` field")]
    #[diagnostic(code(protocol::missing_type))]
    MissingType,

    #[error("Unrecognized message type: {0}")]
    #[diagnostic(
        code(protocol::unknown_type),
        help("Only eval, ready, rendered, error and console messages are part of the protocol.")
    )]
    UnknownType(String),

    #[error("Malformed message: {0}")]
    #[diagnostic(code(protocol::malformed))]
    Malformed(String),
}

/// Controller-side errors
///
/// None of these cross the boundary; the controller logs them locally.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SandboxError {
    #[error("Container not found: {0}")]
    #[diagnostic(
        code(sandbox::container_not_found),
        help("Register the container on the page before creating the sandbox.")
    )]
    ContainerNotFound(String),

    #[error("Isolation boundary does not exist")]
    #[diagnostic(
        code(sandbox::boundary_missing),
        help("The sandbox failed to initialize or has been destroyed.")
    )]
    BoundaryMissing,

    #[error("Isolation boundary {0} has not signalled ready")]
    #[diagnostic(
        code(sandbox::not_ready),
        help("Wait for the ready callback before executing modules.")
    )]
    NotReady(BoundaryId),

    #[error("Failed to spawn isolated context: {0}")]
    #[diagnostic(code(sandbox::spawn_failed))]
    SpawnFailed(String),

    #[error("Isolated context {0} is no longer receiving messages")]
    #[diagnostic(code(sandbox::disconnected))]
    Disconnected(BoundaryId),

    #[error("Protocol error: {0}")]
    #[diagnostic(transparent)]
    Protocol(#[from] ProtocolError),
}
