/*!
 * Module Sandbox - Demo Entry Point
 *
 * Walks one sandbox through its lifecycle:
 * - create against a page container
 * - wait for ready
 * - execute a two-module program and wait for rendered
 * - execute a program with a missing entry and observe the error
 * - destroy
 */

use module_sandbox::{
    factory, init_tracing, BootstrapConfig, Function, ModuleSource, Page, PrecompiledCompiler, Sandbox,
    SandboxCallbacks, SandboxOptions, SandboxStatus, Value,
};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

const GREETING_CODE: &str = "module.exports = 'Hello from the sandbox'";
const APP_CODE: &str = "const greeting = require('Greeting'); module.exports = { default: h => h('h1', greeting) }";

fn demo_compiler() -> PrecompiledCompiler {
    PrecompiledCompiler::new()
        .with(
            GREETING_CODE,
            factory(|_require, module, _exports| {
                module.set_exports(Value::from("Hello from the sandbox"));
                Ok(())
            }),
        )
        .with(
            APP_CODE,
            factory(|require, _module, exports| {
                let greeting = require.require("Greeting")?;
                require.console().log(&[Value::from("rendering"), greeting.clone()]);
                exports.set(
                    "default",
                    Value::Function(Function::new("App", move |args| {
                        let h = args
                            .first()
                            .and_then(Value::as_function)
                            .cloned()
                            .ok_or("App expects the h helper")?;
                        h.call(&[Value::from("h1"), greeting.clone()])
                    })),
                );
                Ok(())
            }),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    info!("Module sandbox demo starting...");

    let page = Page::new();
    let container = page.add_container("preview");

    let (events, mut rx) = mpsc::unbounded_channel::<String>();
    let rendered = events.clone();
    let failed = events.clone();
    let callbacks = SandboxCallbacks::new()
        .on_rendered(move || {
            let _ = rendered.send("rendered".to_string());
        })
        .on_error(move |report| {
            let _ = failed.send(format!("error: {}", report.message));
        })
        .on_console(|level, args| info!(%level, "console: {}", args.join(" ")))
        .on_status_change(|status| info!(%status, "status changed"));

    let bootstrap = BootstrapConfig::new()
        .with_compiler(Arc::new(demo_compiler()))
        .with_stylesheet("body { margin: 0; }");

    let sandbox = Sandbox::create(
        &page,
        SandboxOptions::new(&container)
            .with_bootstrap(bootstrap)
            .with_callbacks(callbacks),
    );

    if !sandbox
        .wait_for_status(SandboxStatus::Ready, Duration::from_secs(5))
        .await
    {
        error!(status = %sandbox.status(), "sandbox never became ready");
        return Err("sandbox never became ready".into());
    }

    let mut modules = ModuleSource::new();
    modules.insert("Greeting".to_string(), GREETING_CODE.to_string());
    modules.insert("App".to_string(), APP_CODE.to_string());
    sandbox.execute(modules, "App", Some("h1 { color: teal; }"));
    if let Some(event) = rx.recv().await {
        info!(%event, "first execution finished");
    }

    sandbox.execute(ModuleSource::new(), "Missing", None);
    if let Some(event) = rx.recv().await {
        info!(%event, status = %sandbox.status(), "second execution finished");
    }

    sandbox.destroy();
    info!(status = %sandbox.status(), "Module sandbox demo finished");
    Ok(())
}
