/*!
 * Isolated Context
 * Everything that runs on the far side of the isolation boundary
 *
 * A context owns its module registry, document and mounted instance, and
 * talks to the outside world only through messages.
 */

pub mod bootstrap;
pub mod compiler;
pub mod console;
pub mod document;
pub mod env;
pub mod handler;
pub mod libraries;
pub mod registry;
pub mod reporter;
pub mod runtime;
pub mod value;

pub use bootstrap::{spawn_context, BootstrapConfig, ContextHandle};
pub use compiler::{CodeCompiler, PrecompiledCompiler};
pub use console::Console;
pub use document::{Document, MountPoint, StyleElement};
pub use env::ContextEnv;
pub use handler::ContextRuntime;
pub use libraries::{Libraries, MountedInstance, RuntimeLibrary, VirtualModule, RUNTIME_FACADE_EXPORTS};
pub use registry::{factory, Factory, Module, ModuleRegistry, Require};
pub use runtime::StaticRuntime;
pub use value::{Function, Object, Value};
