/*!
 * Context Runtime Tests
 * Evaluation cycle, error reporting, and the readiness handshake
 */

use mockall::mock;
use module_sandbox::context::{
    factory, reporter, BootstrapConfig, ContextRuntime, Function, Libraries, PrecompiledCompiler,
    Value,
};
use module_sandbox::core::limits::STYLE_MARKER;
use module_sandbox::protocol::{ConsoleLevel, ErrorPayload, OutboundMessage, Outbox};
use module_sandbox::ScriptError;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

mock! {
    pub Sink {}

    impl Outbox for Sink {
        fn post(&self, message: OutboundMessage);
    }
}

#[derive(Default)]
struct Recorder {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl Recorder {
    fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }

    fn errors(&self) -> Vec<ErrorPayload> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                OutboundMessage::Error { payload } => payload,
                _ => None,
            })
            .collect()
    }

    fn console(&self, level: ConsoleLevel) -> Vec<Vec<String>> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                OutboundMessage::Console {
                    level: Some(found),
                    args: Some(args),
                } if found == level => Some(args),
                _ => None,
            })
            .collect()
    }

    fn count(&self, kind: &str) -> usize {
        self.messages()
            .iter()
            .filter(|message| message.kind() == kind)
            .count()
    }

    fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Outbox for Recorder {
    fn post(&self, message: OutboundMessage) {
        self.messages.lock().push(message);
    }
}

const ONE_PLUS_ONE: &str = "module.exports = 1 + 1";
const GHOST_IMPORT: &str = "require('Ghost')";
const TEMPLATE: &str = "module.exports = { template: '<p>hi</p>' }";
const EMPTY_OBJECT: &str = "module.exports = {}";
const THEMED: &str = "module.exports = $GLOBAL_CONFIG.theme";
const LATE_FAILURE: &str = "Promise.reject(new Error('late failure'))";
const PANICS: &str = "null.property";

fn compiler() -> PrecompiledCompiler {
    PrecompiledCompiler::new()
        .with(
            ONE_PLUS_ONE,
            factory(|_, module, _| {
                module.set_exports(Value::from(1.0 + 1.0));
                Ok(())
            }),
        )
        .with(
            GHOST_IMPORT,
            factory(|require, _, _| {
                require.require("Ghost")?;
                Ok(())
            }),
        )
        .with(
            TEMPLATE,
            factory(|_, _, exports| {
                exports.set("template", Value::from("<p>hi</p>"));
                Ok(())
            }),
        )
        .with(EMPTY_OBJECT, factory(|_, _, _| Ok(())))
        .with(
            THEMED,
            factory(|require, module, _| {
                module.set_exports(require.global_config().get("theme"));
                Ok(())
            }),
        )
        .with(
            LATE_FAILURE,
            factory(|require, module, _| {
                require.defer(|env| {
                    env.console().log(&[Value::from("job ran")]);
                    Err(ScriptError::new("late failure"))
                });
                module.set_exports(Value::from("scheduled"));
                Ok(())
            }),
        )
        .with(
            PANICS,
            factory(|_, _, _| -> Result<(), ScriptError> { panic!("cannot read property of null") }),
        )
}

fn runtime_with(config: BootstrapConfig) -> (ContextRuntime, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let runtime = ContextRuntime::new(config.with_compiler(Arc::new(compiler())), recorder.clone());
    (runtime, recorder)
}

fn runtime() -> (ContextRuntime, Arc<Recorder>) {
    runtime_with(BootstrapConfig::new())
}

fn eval(modules: serde_json::Value, main: &str) -> serde_json::Value {
    json!({"type": "eval", "modules": modules, "mainModule": main})
}

#[test]
fn test_ready_is_sent_exactly_once() {
    let mut sink = MockSink::new();
    sink.expect_post()
        .withf(|message| *message == OutboundMessage::Ready)
        .times(1)
        .return_const(());

    let mut runtime = ContextRuntime::new(BootstrapConfig::new(), Arc::new(sink));
    runtime.announce_ready();
    runtime.announce_ready();
}

#[test]
fn test_one_plus_one_renders_without_error() {
    let (mut runtime, recorder) = runtime();

    assert!(runtime.dispatch(&eval(json!({"Main": ONE_PLUS_ONE}), "Main")));

    assert_eq!(recorder.messages(), vec![OutboundMessage::Rendered]);
    assert!(runtime.has_instance());
    let mount_point = runtime.document().mount_point().unwrap();
    assert_eq!(mount_point.inner_html(), "2");
}

#[test]
fn test_missing_entry_yields_one_named_error() {
    let (mut runtime, recorder) = runtime();

    runtime.dispatch(&eval(json!({}), "Missing"));

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Missing"));
    assert_eq!(recorder.count("rendered"), 0);
    assert!(!runtime.has_instance());
}

#[test]
fn test_nested_missing_module_carries_stack() {
    let (mut runtime, recorder) = runtime();

    runtime.dispatch(&eval(json!({"Main": GHOST_IMPORT}), "Main"));

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Module not found: Ghost");
    assert_eq!(
        errors[0].stack.as_deref(),
        Some("Error: Module not found: Ghost\n    at Main")
    );
    assert_eq!(
        recorder.console(ConsoleLevel::Error),
        vec![vec![
            "Failed to mount component:".to_string(),
            "Module not found: Ghost".to_string()
        ]]
    );
}

#[test]
fn test_consecutive_evals_leave_one_instance_and_one_marked_style() {
    let (mut runtime, recorder) =
        runtime_with(BootstrapConfig::new().with_stylesheet("body { margin: 0 }"));

    for css in ["p { color: red }", "p { color: blue }"] {
        let mut message = eval(json!({"Main": TEMPLATE}), "Main");
        message["css"] = json!(css);
        runtime.dispatch(&message);
    }

    assert_eq!(recorder.count("rendered"), 2);
    assert!(recorder.errors().is_empty());

    let document = runtime.document();
    assert_eq!(document.marked_count(STYLE_MARKER), 1);
    assert_eq!(document.styles().len(), 2);
    assert!(document
        .styles()
        .iter()
        .any(|style| style.marker.is_none() && style.text == "body { margin: 0 }"));
    assert!(document
        .styles()
        .iter()
        .any(|style| style.marker.is_some() && style.text == "p { color: blue }"));

    let mount_point = document.mount_point().unwrap();
    assert_eq!(mount_point.nodes(), vec!["<p>hi</p>".to_string()]);
}

#[test]
fn test_registry_is_fresh_for_every_eval() {
    let (mut runtime, _recorder) = runtime();

    runtime.dispatch(&eval(json!({"First": ONE_PLUS_ONE}), "First"));
    runtime.dispatch(&eval(json!({"Second": ONE_PLUS_ONE}), ""));

    let registry = runtime.registry();
    assert_eq!(registry.defined_names(), vec!["Second".to_string()]);
    assert_eq!(registry.instance_count(), 0);
    assert_eq!(registry.generation(), 2);
    // no entry: the previous instance is still disposed
    assert!(!runtime.has_instance());
}

#[test]
fn test_compile_failure_is_not_fatal() {
    let (mut runtime, recorder) = runtime();

    runtime.dispatch(&eval(
        json!({"Broken": "this is not code", "Main": ONE_PLUS_ONE}),
        "Main",
    ));

    assert_eq!(recorder.count("rendered"), 1);
    assert!(recorder.errors().is_empty());
    let logged = recorder.console(ConsoleLevel::Error);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0][0], "Failed to define module Broken:");
    assert!(!runtime.registry().is_defined("Broken"));
}

#[test]
fn test_unmountable_component_reports_error() {
    let (mut runtime, recorder) = runtime();

    runtime.dispatch(&eval(json!({"Main": EMPTY_OBJECT}), "Main"));

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Failed to mount component: template or render function not defined."
    );
}

#[test]
fn test_missing_runtime_library_reports_error() {
    let (mut runtime, recorder) =
        runtime_with(BootstrapConfig::new().with_libraries(Libraries::new()));

    runtime.dispatch(&eval(json!({"Main": TEMPLATE}), "Main"));

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Vue not loaded. Please wait for the runtime library to load."
    );
}

#[test]
fn test_global_config_is_visible_to_modules() {
    let (mut runtime, recorder) =
        runtime_with(BootstrapConfig::new().with_global_config(json!({"theme": "dark"})));

    runtime.dispatch(&eval(json!({"Main": THEMED}), "Main"));

    assert_eq!(recorder.messages(), vec![OutboundMessage::Rendered]);
    assert_eq!(runtime.document().mount_point().unwrap().inner_html(), "dark");
}

#[test]
fn test_failed_job_is_an_unhandled_rejection() {
    let (mut runtime, recorder) = runtime();

    runtime.dispatch(&eval(json!({"Main": LATE_FAILURE}), "Main"));
    assert!(runtime.has_pending_jobs());
    assert_eq!(recorder.messages(), vec![OutboundMessage::Rendered]);
    recorder.clear();

    assert_eq!(runtime.run_pending_jobs(), 1);
    assert!(!runtime.has_pending_jobs());

    assert_eq!(recorder.console(ConsoleLevel::Log), vec![vec!["job ran".to_string()]]);
    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Unhandled Promise Rejection: late failure");
}

#[test]
fn test_panics_are_reported_with_location() {
    let handle = std::thread::spawn(|| {
        reporter::install();
        let (mut runtime, recorder) = runtime();

        runtime.dispatch(&eval(json!({"Main": PANICS}), "Main"));
        let errors = recorder.errors();

        // the context keeps working afterwards
        recorder.clear();
        runtime.dispatch(&eval(json!({"Main": ONE_PLUS_ONE}), "Main"));
        (errors, recorder.messages())
    });

    let (errors, after) = handle.join().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "cannot read property of null");
    assert!(errors[0]
        .source
        .as_deref()
        .unwrap_or_default()
        .ends_with("handler_test.rs"));
    assert!(errors[0].line.is_some());
    assert_eq!(after, vec![OutboundMessage::Rendered]);
}

#[test]
fn test_invalid_payloads_are_ignored() {
    let (mut runtime, recorder) = runtime();

    assert!(!runtime.dispatch(&json!("eval")));
    assert!(!runtime.dispatch(&json!({"modules": {}})));
    assert!(!runtime.dispatch(&json!({"type": "rendered"})));
    assert!(!runtime.dispatch(&json!({"type": "eval", "modules": "nope"})));
    assert!(recorder.messages().is_empty());
}

#[test]
fn test_render_functions_receive_h() {
    let compiler = PrecompiledCompiler::new().with(
        "render",
        factory(|require, _, exports| {
            let vue = require.require("vue")?;
            let h = vue.get("h");
            exports.set(
                "default",
                Value::Function(Function::new("App", move |_| {
                    let h = h.as_function().cloned().ok_or("h missing")?;
                    h.call(&[Value::from("div"), Value::from("from h")])
                })),
            );
            Ok(())
        }),
    );
    let recorder = Arc::new(Recorder::default());
    let mut runtime = ContextRuntime::new(
        BootstrapConfig::new().with_compiler(Arc::new(compiler)),
        recorder.clone(),
    );

    runtime.dispatch(&eval(json!({"App": "render"}), "App"));

    assert_eq!(recorder.messages(), vec![OutboundMessage::Rendered]);
    assert_eq!(
        runtime.document().mount_point().unwrap().inner_html(),
        "<div>from h</div>"
    );
}

#[test]
fn test_removed_mount_point_is_recreated() {
    let (mut runtime, recorder) = runtime();
    let removed = runtime.document_mut().remove_mount_point();
    assert!(removed.is_some());

    runtime.dispatch(&eval(json!({"Main": TEMPLATE}), "Main"));

    assert_eq!(recorder.messages(), vec![OutboundMessage::Rendered]);
    let mount_point = runtime.document().mount_point().unwrap();
    assert_eq!(mount_point.id(), "app");
    assert_eq!(mount_point.inner_html(), "<p>hi</p>");
}
