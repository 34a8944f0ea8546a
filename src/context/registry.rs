/*!
 * Module Registry
 * Minimal synchronous module system of an isolated context
 *
 * Two tables per execution generation:
 * - name -> factory, filled by `define`
 * - name -> module record, filled by the first `require` of each name
 *
 * Both are cleared by `reset()` at the start of every evaluation.
 */

use super::console::Console;
use super::env::ContextEnv;
use super::libraries::{Libraries, VirtualModule};
use super::value::{Object, Value};
use crate::core::errors::{ModuleError, ModuleResult, ScriptError};
use ahash::HashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A compiled module body, invoked as `(require, module, exports)`
pub type Factory =
    Arc<dyn Fn(&mut Require<'_>, &Module, &Object) -> Result<(), ScriptError> + Send + Sync>;

/// Wrap a closure as a [`Factory`]
pub fn factory<F>(f: F) -> Factory
where
    F: Fn(&mut Require<'_>, &Module, &Object) -> Result<(), ScriptError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Instantiated module record
pub struct Module {
    name: String,
    exports: RwLock<Value>,
}

impl Module {
    fn new(name: &str, exports: Value) -> Self {
        Self {
            name: name.to_string(),
            exports: RwLock::new(exports),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current `module.exports`
    pub fn exports(&self) -> Value {
        self.exports.read().clone()
    }

    /// Replace `module.exports` wholesale
    pub fn set_exports(&self, exports: Value) {
        *self.exports.write() = exports;
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish()
    }
}

/// The `require` handle passed to every factory
pub struct Require<'a> {
    registry: &'a mut ModuleRegistry,
    env: &'a ContextEnv,
}

impl<'a> Require<'a> {
    pub fn new(registry: &'a mut ModuleRegistry, env: &'a ContextEnv) -> Self {
        Self { registry, env }
    }

    pub fn require(&mut self, name: &str) -> ModuleResult<Value> {
        self.registry.require(name, self.env)
    }

    pub fn define(&mut self, name: impl Into<String>, factory: Factory) {
        self.registry.define(name, factory);
    }

    pub fn console(&self) -> &Console {
        self.env.console()
    }

    pub fn global_config(&self) -> Value {
        self.env.global_config()
    }

    /// Schedule work to run once the current message has been handled
    pub fn defer<F>(&self, job: F)
    where
        F: FnOnce(&ContextEnv) -> Result<(), ScriptError> + Send + 'static,
    {
        self.env.defer(job);
    }
}

pub struct ModuleRegistry {
    factories: HashMap<String, Factory>,
    cache: HashMap<String, Arc<Module>>,
    libraries: Libraries,
    stack: Vec<String>,
    generation: u64,
}

impl ModuleRegistry {
    pub fn new(libraries: Libraries) -> Self {
        Self {
            factories: HashMap::default(),
            cache: HashMap::default(),
            libraries,
            stack: Vec::new(),
            generation: 0,
        }
    }

    /// Register or overwrite the factory for `name`; never instantiates
    pub fn define(&mut self, name: impl Into<String>, factory: Factory) {
        let name = name.into();
        trace!(module = %name, "module defined");
        self.factories.insert(name, factory);
    }

    /// Resolve `name` to its exports
    ///
    /// Virtual modules win over anything registered under the same name.
    /// The record is cached before the factory runs, so a circular require
    /// sees the partially populated exports instead of recursing.
    pub fn require(&mut self, name: &str, env: &ContextEnv) -> ModuleResult<Value> {
        if let Some(module) = VirtualModule::lookup(name) {
            return self.libraries.resolve(module);
        }

        if let Some(record) = self.cache.get(name) {
            return Ok(record.exports());
        }

        let factory = self
            .factories
            .get(name)
            .cloned()
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;

        let exports = Object::new();
        let record = Arc::new(Module::new(name, Value::Object(exports.clone())));
        self.cache.insert(name.to_string(), Arc::clone(&record));
        self.stack.push(name.to_string());
        debug!(module = %name, depth = self.stack.len(), "instantiating module");

        let outcome = {
            let mut require = Require::new(self, env);
            factory(&mut require, &*record, &exports)
        };

        let trace = self.stack_trace();
        self.stack.pop();

        match outcome {
            Ok(()) => Ok(record.exports()),
            Err(mut err) => {
                if err.stack.is_none() {
                    err.stack = Some(format!("Error: {}\n{}", err.message, trace));
                }
                Err(ModuleError::Script(err))
            }
        }
    }

    /// Forget every factory and instance of the current generation
    pub fn reset(&mut self) {
        self.factories.clear();
        self.cache.clear();
        self.stack.clear();
        self.generation += 1;
        debug!(generation = self.generation, "module registry reset");
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn is_instantiated(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn defined_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn instance_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of resets so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn libraries(&self) -> &Libraries {
        &self.libraries
    }

    fn stack_trace(&self) -> String {
        self.stack
            .iter()
            .rev()
            .map(|name| format!("    at {}", name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("defined", &self.defined_names())
            .field("instances", &self.cache.len())
            .field("generation", &self.generation)
            .finish()
    }
}
