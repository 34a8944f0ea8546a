/*!
 * Code Compiler
 * Capability that turns module code text into an invocable factory
 */

use super::registry::Factory;
use crate::core::errors::CompileError;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Compile module source text into a `(require, module, exports)` factory
pub trait CodeCompiler: Send + Sync {
    fn compile(&self, name: &str, code: &str) -> Result<Factory, CompileError>;
}

impl<F> CodeCompiler for F
where
    F: Fn(&str, &str) -> Result<Factory, CompileError> + Send + Sync,
{
    fn compile(&self, name: &str, code: &str) -> Result<Factory, CompileError> {
        self(name, code)
    }
}

/// Compiler for code that was compiled ahead of time
///
/// The code text is a key (surrounding whitespace ignored) under which a
/// native factory was registered. Unknown keys fail to compile.
#[derive(Clone, Default)]
pub struct PrecompiledCompiler {
    factories: Arc<DashMap<String, Factory>>,
}

impl PrecompiledCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` as the compiled form of `code`
    pub fn register(&self, code: impl Into<String>, factory: Factory) {
        self.factories.insert(code.into().trim().to_string(), factory);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(self, code: impl Into<String>, factory: Factory) -> Self {
        self.register(code, factory);
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl CodeCompiler for PrecompiledCompiler {
    fn compile(&self, name: &str, code: &str) -> Result<Factory, CompileError> {
        self.factories
            .get(code.trim())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                CompileError::new(format!(
                    "SyntaxError: no compiled form for the code of module '{}'",
                    name
                ))
            })
    }
}

impl fmt::Debug for PrecompiledCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrecompiledCompiler")
            .field("factories", &self.factories.len())
            .finish()
    }
}
