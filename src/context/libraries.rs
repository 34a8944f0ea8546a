/*!
 * Runtime Libraries
 * Capability table behind the virtual modules
 *
 * Virtual modules resolve from this table instead of ambient globals. The
 * table is filled in by whoever creates the sandbox; a missing entry makes
 * the matching `require` fail with a descriptive message.
 */

use super::document::MountPoint;
use super::runtime::StaticRuntime;
use super::value::{Object, Value};
use crate::core::errors::{ModuleError, ModuleResult, ScriptError};
use std::fmt;
use std::sync::Arc;

/// Reactivity and lifecycle primitives re-exported by the runtime facade
pub const RUNTIME_FACADE_EXPORTS: &[&str] = &[
    "ref",
    "reactive",
    "computed",
    "watch",
    "watchEffect",
    "onMounted",
    "onUnmounted",
    "onBeforeMount",
    "onBeforeUnmount",
    "onUpdated",
    "onBeforeUpdate",
    "onActivated",
    "onDeactivated",
    "onErrorCaptured",
    "provide",
    "inject",
    "toRef",
    "toRefs",
    "unref",
    "isRef",
    "shallowRef",
    "triggerRef",
    "shallowReactive",
    "shallowReadonly",
    "readonly",
    "isReactive",
    "isReadonly",
    "isProxy",
    "markRaw",
    "toRaw",
    "nextTick",
    "defineComponent",
    "defineAsyncComponent",
    "getCurrentInstance",
    "h",
];

/// A live rendered instance; disposing it detaches its output
pub trait MountedInstance: Send {
    fn destroy(&mut self);
}

/// The UI runtime that entry modules are mounted with
pub trait RuntimeLibrary: Send + Sync {
    /// The runtime's global object, re-exported as the facade's default
    fn global(&self) -> Object;

    /// Render `component` into `target`
    fn mount(
        &self,
        component: &Value,
        target: &MountPoint,
    ) -> Result<Box<dyn MountedInstance>, ScriptError>;
}

/// Names resolvable without registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualModule {
    Runtime,
    Components,
    Utilities,
}

impl VirtualModule {
    /// Resolution order; fixed
    pub const ALL: [VirtualModule; 3] = [
        VirtualModule::Runtime,
        VirtualModule::Components,
        VirtualModule::Utilities,
    ];

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            VirtualModule::Runtime => &["vue", "Vue"],
            VirtualModule::Components => &["element-ui", "ElementUI", "ELEMENT"],
            VirtualModule::Utilities => &["lodash", "_"],
        }
    }

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|module| module.aliases().contains(&name))
    }

    pub fn library_name(&self) -> &'static str {
        match self {
            VirtualModule::Runtime => "Vue",
            VirtualModule::Components => "Element UI",
            VirtualModule::Utilities => "Lodash",
        }
    }

    fn unavailable(&self) -> ModuleError {
        let hint = match self {
            VirtualModule::Runtime => "Please wait for the runtime library to load.",
            VirtualModule::Components | VirtualModule::Utilities => {
                "Please bind it in the sandbox libraries."
            }
        };
        ModuleError::LibraryUnavailable {
            library: self.library_name().to_string(),
            hint: hint.to_string(),
        }
    }
}

/// Capability table: `{runtime, components, utilities}`
#[derive(Clone, Default)]
pub struct Libraries {
    runtime: Option<Arc<dyn RuntimeLibrary>>,
    components: Option<Object>,
    utilities: Option<Value>,
}

impl Libraries {
    /// Empty table; every virtual module is unavailable
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in static runtime bound
    pub fn standard() -> Self {
        Self::new().with_runtime(Arc::new(StaticRuntime::new()))
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn RuntimeLibrary>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_components(mut self, components: Object) -> Self {
        self.components = Some(components);
        self
    }

    pub fn with_utilities(mut self, utilities: Value) -> Self {
        self.utilities = Some(utilities);
        self
    }

    pub fn runtime(&self) -> ModuleResult<&Arc<dyn RuntimeLibrary>> {
        self.runtime
            .as_ref()
            .ok_or_else(|| VirtualModule::Runtime.unavailable())
    }

    /// Build the facade a virtual module resolves to
    pub fn resolve(&self, module: VirtualModule) -> ModuleResult<Value> {
        match module {
            VirtualModule::Runtime => {
                let global = self.runtime()?.global();
                let facade = Object::new();
                facade.set("default", Value::Object(global.clone()));
                for name in RUNTIME_FACADE_EXPORTS {
                    facade.set(*name, global.get(name));
                }
                facade.set("Vue", Value::Object(global));
                Ok(Value::Object(facade))
            }
            VirtualModule::Components => {
                let components = self
                    .components
                    .as_ref()
                    .ok_or_else(|| module.unavailable())?;
                let facade = Object::new();
                facade.set("default", Value::Object(components.clone()));
                for (key, value) in components.entries() {
                    facade.set(key, value);
                }
                Ok(Value::Object(facade))
            }
            VirtualModule::Utilities => self
                .utilities
                .clone()
                .ok_or_else(|| module.unavailable()),
        }
    }
}

impl fmt::Debug for Libraries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Libraries")
            .field("runtime", &self.runtime.is_some())
            .field("components", &self.components.is_some())
            .field("utilities", &self.utilities.is_some())
            .finish()
    }
}
