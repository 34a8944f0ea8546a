/*!
 * Context Bootstrap
 * Spawns an isolated context on its own thread and wires its inbound channel
 *
 * Startup order on the context thread:
 * 1. global error reporter
 * 2. console interceptor, module registry and the `require`/`define` pair
 * 3. inbound message listener
 * 4. `ready`, exactly once
 */

use super::compiler::{CodeCompiler, PrecompiledCompiler};
use super::handler::ContextRuntime;
use super::libraries::Libraries;
use super::reporter;
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::limits::DEFAULT_MOUNT_POINT_ID;
use crate::core::types::BoundaryId;
use crate::protocol::Outbox;
use flume::{Receiver, Sender, TryRecvError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, info_span, warn};

/// Everything an isolated context is created with
#[derive(Clone)]
pub struct BootstrapConfig {
    pub compiler: Arc<dyn CodeCompiler>,
    pub libraries: Libraries,
    /// Configuration object readable by module code
    pub global_config: Value,
    /// Host stylesheets; never removed by an evaluation
    pub stylesheets: Vec<String>,
    pub mount_point_id: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            compiler: Arc::new(PrecompiledCompiler::new()),
            libraries: Libraries::standard(),
            global_config: Value::Object(Default::default()),
            stylesheets: Vec::new(),
            mount_point_id: DEFAULT_MOUNT_POINT_ID.to_string(),
        }
    }
}

impl BootstrapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn CodeCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_libraries(mut self, libraries: Libraries) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_global_config(mut self, global_config: Value) -> Self {
        self.global_config = global_config;
        self
    }

    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheets.push(css.into());
        self
    }

    pub fn with_mount_point_id(mut self, id: impl Into<String>) -> Self {
        self.mount_point_id = id.into();
        self
    }
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("libraries", &self.libraries)
            .field("global_config", &self.global_config)
            .field("stylesheets", &self.stylesheets.len())
            .field("mount_point_id", &self.mount_point_id)
            .finish_non_exhaustive()
    }
}

/// Controller-side handle to a running context
///
/// Dropping or tearing down the handle closes the inbound channel; the
/// context thread finishes its current turn and exits on its own.
#[derive(Debug)]
pub struct ContextHandle {
    id: BoundaryId,
    inbound: Sender<Value>,
    thread: Option<JoinHandle<()>>,
}

impl ContextHandle {
    pub fn id(&self) -> BoundaryId {
        self.id
    }

    /// Post a raw payload into the context
    pub fn post(&self, data: Value) -> SandboxResult<()> {
        self.inbound
            .send(data)
            .map_err(|_| SandboxError::Disconnected(self.id))
    }

    pub fn is_alive(&self) -> bool {
        self.thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Close the inbound channel and detach the thread
    pub fn teardown(mut self) {
        if let Some(thread) = self.thread.take() {
            debug!(boundary = %self.id, finished = thread.is_finished(), "context detached");
        }
    }
}

/// Spawn an isolated context
///
/// The context announces `ready` through `outbox` once it is listening.
pub fn spawn_context(
    id: BoundaryId,
    config: BootstrapConfig,
    outbox: Arc<dyn Outbox>,
    thread_name: String,
) -> SandboxResult<ContextHandle> {
    let (inbound, rx) = flume::unbounded();

    let thread = thread::Builder::new()
        .name(thread_name)
        .spawn(move || run_context(id, config, outbox, rx))
        .map_err(|e| SandboxError::SpawnFailed(e.to_string()))?;

    info!(boundary = %id, "isolated context spawned");
    Ok(ContextHandle {
        id,
        inbound,
        thread: Some(thread),
    })
}

fn run_context(id: BoundaryId, config: BootstrapConfig, outbox: Arc<dyn Outbox>, rx: Receiver<Value>) {
    reporter::install();
    let span = info_span!("context", boundary = %id);
    let _entered = span.enter();

    let mut runtime = ContextRuntime::new(config, outbox);
    runtime.announce_ready();

    loop {
        // Pending jobs must not block on an idle channel
        let next = if runtime.has_pending_jobs() {
            match rx.try_recv() {
                Ok(data) => Some(data),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(data) => Some(data),
                Err(_) => break,
            }
        };

        if let Some(data) = next {
            runtime.dispatch(&data);
        }
        runtime.run_pending_jobs();
    }

    let dropped = runtime.shutdown();
    if dropped > 0 {
        warn!(boundary = %id, dropped, "context closed with pending jobs");
    }
    info!(boundary = %id, "isolated context exited");
}
