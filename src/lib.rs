/*!
 * Module Sandbox Library
 * Runs submitted source modules inside an isolated context and reports back over messages
 *
 * Layers:
 * - `core`: identifiers, status, limits, and error types
 * - `protocol`: the message contract crossing the isolation boundary
 * - `context`: the isolated side (module registry, console, error reporter)
 * - `sandbox`: the host side (page, bus, and the controller)
 * - `monitoring`: tracing setup and evaluation spans
 */

pub mod context;
pub mod core;
pub mod monitoring;
pub mod protocol;
pub mod sandbox;

// Re-exports
pub use crate::context::{
    factory, BootstrapConfig, CodeCompiler, Factory, Function, Libraries, Module, Object,
    PrecompiledCompiler, Require, RuntimeLibrary, StaticRuntime, Value,
};
pub use crate::core::{
    BoundaryId, CompileError, ModuleError, ProtocolError, SandboxError, SandboxStatus, ScriptError,
};
pub use monitoring::init_tracing;
pub use protocol::{ConsoleLevel, ErrorReport, EvalRequest, ModuleSource};
pub use sandbox::{Container, Page, Sandbox, SandboxCallbacks, SandboxConfig, SandboxOptions};
