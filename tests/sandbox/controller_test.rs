/*!
 * Sandbox Controller Tests
 * End-to-end lifecycle over real context threads
 */

use module_sandbox::context::{factory, BootstrapConfig, Object, PrecompiledCompiler, Value};
use module_sandbox::protocol::{
    ConsoleLevel, Envelope, ErrorPayload, ErrorReport, EvalRequest, ModuleSource, OutboundMessage,
    Outbox,
};
use module_sandbox::sandbox::{BoundaryOutbox, Container, Page, Sandbox, SandboxCallbacks, SandboxOptions};
use module_sandbox::{BoundaryId, SandboxError, SandboxStatus};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TIMEOUT: Duration = Duration::from_secs(5);
const ONE_PLUS_ONE: &str = "module.exports = 1 + 1";
const LOGS_OBJECT: &str = "console.log({ a: 1 }); module.exports = 'logged'";

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Ready,
    Rendered,
    Error(ErrorReport),
    Console(ConsoleLevel, Vec<String>),
    Status(SandboxStatus),
}

fn callbacks(tx: mpsc::UnboundedSender<Event>) -> SandboxCallbacks {
    let ready = tx.clone();
    let rendered = tx.clone();
    let error = tx.clone();
    let console = tx.clone();
    SandboxCallbacks::new()
        .on_ready(move || {
            let _ = ready.send(Event::Ready);
        })
        .on_rendered(move || {
            let _ = rendered.send(Event::Rendered);
        })
        .on_error(move |report| {
            let _ = error.send(Event::Error(report.clone()));
        })
        .on_console(move |level, args| {
            let _ = console.send(Event::Console(level, args.to_vec()));
        })
        .on_status_change(move |status| {
            let _ = tx.send(Event::Status(status));
        })
}

fn compiler() -> PrecompiledCompiler {
    PrecompiledCompiler::new()
        .with(
            ONE_PLUS_ONE,
            factory(|_, module, _| {
                module.set_exports(Value::from(2));
                Ok(())
            }),
        )
        .with(
            LOGS_OBJECT,
            factory(|require, module, _| {
                let payload = Object::from_entries([("a", Value::from(1))]);
                require.console().log(&[Value::Object(payload)]);
                module.set_exports(Value::from("logged"));
                Ok(())
            }),
        )
}

struct Harness {
    page: Page,
    container: Container,
    sandbox: Sandbox,
    events: mpsc::UnboundedReceiver<Event>,
}

fn harness() -> Harness {
    let page = Page::new();
    let container = page.add_container("app");
    let (tx, events) = mpsc::unbounded_channel();

    let sandbox = Sandbox::create(
        &page,
        SandboxOptions::new("#app")
            .with_bootstrap(BootstrapConfig::new().with_compiler(Arc::new(compiler())))
            .with_callbacks(callbacks(tx)),
    );

    Harness {
        page,
        container,
        sandbox,
        events,
    }
}

async fn ready_harness() -> Harness {
    let harness = harness();
    assert!(
        harness
            .sandbox
            .wait_for_status(SandboxStatus::Ready, TIMEOUT)
            .await,
        "sandbox never became ready"
    );
    harness
}

/// Receive events until one matches, returning it with everything skipped on the way
async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<Event>,
    matches: impl Fn(&Event) -> bool,
) -> (Event, Vec<Event>) {
    let mut skipped = Vec::new();
    tokio::time::timeout(TIMEOUT, async {
        while let Some(event) = events.recv().await {
            if matches(&event) {
                return (event, skipped);
            }
            skipped.push(event);
        }
        panic!("event channel closed");
    })
    .await
    .expect("timed out waiting for event")
}

fn drain(events: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn statuses(events: &[Event]) -> Vec<SandboxStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Status(status) => Some(*status),
            _ => None,
        })
        .collect()
}

fn one_plus_one() -> ModuleSource {
    let mut modules = ModuleSource::new();
    modules.insert("Main".to_string(), ONE_PLUS_ONE.to_string());
    modules
}

#[tokio::test]
async fn test_lifecycle_ready_render_destroy() {
    let mut harness = ready_harness().await;
    let boundary = harness.sandbox.boundary_id();
    assert!(boundary.is_some());
    assert_eq!(harness.container.frame(), boundary);

    harness.sandbox.execute(one_plus_one(), "Main", None);
    let (_, before) = wait_for(&mut harness.events, |event| *event == Event::Rendered).await;
    assert_eq!(harness.sandbox.status(), SandboxStatus::Ready);

    harness.sandbox.destroy();
    harness.sandbox.destroy();

    assert_eq!(harness.sandbox.status(), SandboxStatus::Idle);
    assert_eq!(harness.sandbox.boundary_id(), None);
    assert_eq!(harness.container.frame(), None);
    assert_eq!(harness.page.bus().listener_count(), 0);

    let mut all = before;
    all.extend(drain(&mut harness.events));
    assert_eq!(
        statuses(&all),
        vec![SandboxStatus::Loading, SandboxStatus::Ready, SandboxStatus::Idle]
    );
    assert_eq!(all.iter().filter(|event| **event == Event::Ready).count(), 1);
}

#[tokio::test]
async fn test_missing_entry_reports_single_error() {
    let mut harness = ready_harness().await;

    harness.sandbox.execute(ModuleSource::new(), "Missing", None);
    let (event, _) = wait_for(&mut harness.events, |event| matches!(event, Event::Error(_))).await;
    assert_eq!(
        event,
        Event::Error(ErrorReport {
            message: "Module not found: Missing".to_string(),
            stack: None,
        })
    );
    assert_eq!(harness.sandbox.status(), SandboxStatus::Error);

    // later evaluations still run; nothing else was reported in between
    harness.sandbox.execute(one_plus_one(), "Main", None);
    let (_, between) = wait_for(&mut harness.events, |event| *event == Event::Rendered).await;
    assert!(!between.iter().any(|event| matches!(event, Event::Error(_))));
}

#[tokio::test]
async fn test_console_messages_are_forwarded() {
    let mut harness = ready_harness().await;

    let mut modules = ModuleSource::new();
    modules.insert("Main".to_string(), LOGS_OBJECT.to_string());
    harness.sandbox.execute(modules, "Main", Some("p { margin: 0 }"));

    let (event, _) = wait_for(&mut harness.events, |event| {
        matches!(event, Event::Console(ConsoleLevel::Log, _))
    })
    .await;
    assert_eq!(
        event,
        Event::Console(ConsoleLevel::Log, vec!["{\n  \"a\": 1\n}".to_string()])
    );

    wait_for(&mut harness.events, |event| *event == Event::Rendered).await;
    assert_eq!(harness.sandbox.status(), SandboxStatus::Ready);
}

#[tokio::test]
async fn test_foreign_and_malformed_messages_are_ignored() {
    let mut harness = ready_harness().await;
    let own = harness.sandbox.boundary_id().unwrap();
    let bus = harness.page.bus().clone();

    harness
        .page
        .post_message(json!({"type": "error", "payload": {"message": "from the page"}}));
    BoundaryOutbox::new(BoundaryId::next(), bus.clone())
        .post(OutboundMessage::error(ErrorPayload::new("from another boundary")));
    bus.post(Envelope::from_boundary(own, json!("not an object")));
    bus.post(Envelope::from_boundary(own, json!({"payload": {}})));
    bus.post(Envelope::from_boundary(own, json!({"type": "eval", "modules": {}})));

    harness.sandbox.execute(one_plus_one(), "Main", None);
    let (_, between) = wait_for(&mut harness.events, |event| *event == Event::Rendered).await;

    assert!(!between.iter().any(|event| matches!(event, Event::Error(_))));
    assert_eq!(harness.sandbox.status(), SandboxStatus::Ready);
}

#[tokio::test]
async fn test_repeated_ready_from_live_boundary_fires_once() {
    let mut harness = ready_harness().await;
    let own = harness.sandbox.boundary_id().unwrap();

    harness
        .page
        .bus()
        .post(Envelope::from_boundary(own, json!({"type": "ready"})));
    harness.sandbox.execute(one_plus_one(), "Main", None);
    let (_, before) = wait_for(&mut harness.events, |event| *event == Event::Rendered).await;

    assert_eq!(before.iter().filter(|event| **event == Event::Ready).count(), 1);
    assert_eq!(
        statuses(&before),
        vec![SandboxStatus::Loading, SandboxStatus::Ready]
    );
}

#[tokio::test]
async fn test_missing_container_yields_inert_handle() {
    let page = Page::new();
    let (tx, mut events) = mpsc::unbounded_channel();
    let sandbox = Sandbox::create(
        &page,
        SandboxOptions::new("#nowhere").with_callbacks(callbacks(tx)),
    );

    assert_eq!(sandbox.status(), SandboxStatus::Idle);
    assert_eq!(sandbox.boundary_id(), None);
    assert_eq!(page.bus().listener_count(), 0);

    sandbox.execute(one_plus_one(), "Main", None);
    assert_eq!(
        sandbox.submit(EvalRequest::new(one_plus_one(), "Main")),
        Err(SandboxError::BoundaryMissing)
    );

    sandbox.destroy();
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_execute_after_destroy_is_a_noop() {
    let mut harness = ready_harness().await;
    harness.sandbox.destroy();

    harness.sandbox.execute(one_plus_one(), "Main", None);
    assert_eq!(
        harness.sandbox.submit(EvalRequest::new(one_plus_one(), "Main")),
        Err(SandboxError::BoundaryMissing)
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    let late = drain(&mut harness.events);
    assert!(!late.contains(&Event::Rendered));
    assert_eq!(harness.sandbox.status(), SandboxStatus::Idle);
}

#[tokio::test]
async fn test_dropping_the_handle_destroys_the_boundary() {
    let harness = ready_harness().await;
    let Harness {
        page,
        container,
        sandbox,
        ..
    } = harness;

    drop(sandbox);

    assert_eq!(container.frame(), None);
    assert_eq!(page.bus().listener_count(), 0);
}

#[tokio::test]
async fn test_sandboxes_on_one_page_are_independent() {
    let page = Page::new();
    let left = page.add_container("left");
    let right = page.add_container("right");
    let (tx_left, mut events_left) = mpsc::unbounded_channel();
    let (tx_right, mut events_right) = mpsc::unbounded_channel();

    let bootstrap = BootstrapConfig::new().with_compiler(Arc::new(compiler()));
    let first = Sandbox::create(
        &page,
        SandboxOptions::new(&left)
            .with_bootstrap(bootstrap.clone())
            .with_callbacks(callbacks(tx_left)),
    );
    let second = Sandbox::create(
        &page,
        SandboxOptions::new(&right)
            .with_bootstrap(bootstrap)
            .with_callbacks(callbacks(tx_right)),
    );

    assert!(first.wait_for_status(SandboxStatus::Ready, TIMEOUT).await);
    assert!(second.wait_for_status(SandboxStatus::Ready, TIMEOUT).await);
    assert_ne!(first.boundary_id(), second.boundary_id());

    first.execute(ModuleSource::new(), "Missing", None);
    wait_for(&mut events_left, |event| matches!(event, Event::Error(_))).await;

    second.execute(one_plus_one(), "Main", None);
    let (_, between) = wait_for(&mut events_right, |event| *event == Event::Rendered).await;
    assert!(!between.iter().any(|event| matches!(event, Event::Error(_))));

    assert_eq!(first.status(), SandboxStatus::Error);
    assert_eq!(second.status(), SandboxStatus::Ready);
}
