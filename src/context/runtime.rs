/*!
 * Static Runtime
 * Built-in render-to-text runtime library for headless previews
 *
 * Components are rendered once into markup:
 * - strings, numbers, booleans render as text
 * - functions are called with the `h` helper and their result rendered
 * - objects render through their `render` function or `template` string
 * - arrays render each item in order
 */

use super::document::MountPoint;
use super::libraries::{MountedInstance, RuntimeLibrary};
use super::value::{Function, Object, Value};
use crate::core::errors::ScriptError;
use crate::core::limits::MAX_RENDER_DEPTH;

/// Version reported by the runtime's global object
pub const STATIC_RUNTIME_VERSION: &str = "static-1";

/// `h(tag, ...children)` -> markup string
fn create_element(args: &[Value]) -> Result<Value, ScriptError> {
    let tag = match args.first() {
        Some(Value::String(tag)) if !tag.is_empty() => tag.clone(),
        Some(other) => {
            return Err(ScriptError::new(format!(
                "h() expects a tag name, got {}",
                other.type_of()
            )))
        }
        None => return Err(ScriptError::new("h() expects a tag name")),
    };

    let mut children = String::new();
    for child in args.iter().skip(1) {
        children.push_str(&render(child, 0)?);
    }
    Ok(Value::String(format!("<{tag}>{children}</{tag}>")))
}

fn render(component: &Value, depth: usize) -> Result<String, ScriptError> {
    if depth > MAX_RENDER_DEPTH {
        return Err(ScriptError::new("Maximum render depth exceeded"));
    }

    match component {
        Value::Undefined | Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(component.to_string()),
        Value::Array(items) => items
            .iter()
            .map(|item| render(item, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.concat()),
        Value::Function(function) => {
            let output = function.call(&[h_helper()])?;
            render(&output, depth + 1)
        }
        Value::Object(object) => {
            if let Value::Function(render_fn) = object.get("render") {
                let output = render_fn.call(&[h_helper()])?;
                render(&output, depth + 1)
            } else if let Value::String(template) = object.get("template") {
                Ok(template)
            } else {
                Err(ScriptError::new(
                    "Failed to mount component: template or render function not defined.",
                ))
            }
        }
    }
}

fn h_helper() -> Value {
    Value::Function(Function::new("h", create_element))
}

/// The built-in runtime library
#[derive(Debug, Clone)]
pub struct StaticRuntime {
    global: Object,
}

impl StaticRuntime {
    pub fn new() -> Self {
        let global = Object::new();
        global.set("version", Value::from(STATIC_RUNTIME_VERSION));
        global.set("h", h_helper());
        Self { global }
    }
}

impl Default for StaticRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeLibrary for StaticRuntime {
    fn global(&self) -> Object {
        self.global.clone()
    }

    fn mount(
        &self,
        component: &Value,
        target: &MountPoint,
    ) -> Result<Box<dyn MountedInstance>, ScriptError> {
        let markup = render(component, 0)?;
        target.append(markup);
        Ok(Box::new(StaticInstance {
            target: Some(target.clone()),
        }))
    }
}

/// Instance produced by [`StaticRuntime`]
struct StaticInstance {
    target: Option<MountPoint>,
}

impl MountedInstance for StaticInstance {
    fn destroy(&mut self) {
        if let Some(target) = self.target.take() {
            target.clear();
        }
    }
}
