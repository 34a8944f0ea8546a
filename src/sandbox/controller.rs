/*!
 * Sandbox Controller
 * Host-side owner of one isolation boundary
 *
 * Lifecycle:
 * - `create` attaches a boundary to a container and starts listening (loading)
 * - the boundary's `ready` unlocks `execute` (ready)
 * - `error` messages move to error; a later `ready` or `rendered` never resets it
 * - `destroy` tears everything down (idle); safe to repeat
 *
 * Public operations never fail: problems are logged and the call becomes a no-op.
 */

use super::bus::{BoundaryOutbox, MessageBus};
use super::callbacks::SandboxCallbacks;
use super::config::SandboxOptions;
use super::page::{Container, Page};
use crate::context::bootstrap::{spawn_context, ContextHandle};
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::limits::UNKNOWN_ERROR_MESSAGE;
use crate::core::types::{BoundaryId, ListenerId, SandboxStatus};
use crate::protocol::{
    decode_outbound, encode, Envelope, ErrorReport, EvalRequest, InboundMessage, ModuleSource,
    OutboundMessage,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Live boundary state; present between a successful `create` and `destroy`
struct Boundary {
    id: BoundaryId,
    context: ContextHandle,
    container: Container,
    listener: ListenerId,
}

/// State shared with the listener thread
struct Shared {
    status: watch::Sender<SandboxStatus>,
    callbacks: SandboxCallbacks,
    boundary: Mutex<Option<Boundary>>,
    ready_seen: AtomicBool,
}

impl Shared {
    fn set_status(&self, status: SandboxStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(from = %previous, to = %status, "sandbox status changed");
            self.callbacks.status_changed(status);
        }
    }

    fn current_boundary(&self) -> Option<BoundaryId> {
        self.boundary.lock().as_ref().map(|boundary| boundary.id)
    }

    /// Apply one validated message from boundary `origin`
    ///
    /// Callbacks run without any lock held.
    fn handle(&self, origin: BoundaryId, message: OutboundMessage) {
        if self.current_boundary() != Some(origin) {
            debug!(boundary = %origin, kind = message.kind(), "message after destroy dropped");
            return;
        }

        match message {
            OutboundMessage::Ready => {
                if self.ready_seen.swap(true, Ordering::SeqCst) {
                    debug!(boundary = %origin, "duplicate ready ignored");
                    return;
                }
                info!(boundary = %origin, "isolated context ready");
                self.set_status(SandboxStatus::Ready);
                self.callbacks.ready();
            }
            OutboundMessage::Rendered => {
                debug!(boundary = %origin, "rendered");
                self.callbacks.rendered();
            }
            OutboundMessage::Error { payload } => {
                self.set_status(SandboxStatus::Error);
                if let Some(payload) = payload {
                    let message = if payload.message.is_empty() {
                        UNKNOWN_ERROR_MESSAGE.to_string()
                    } else {
                        payload.message
                    };
                    warn!(boundary = %origin, %message, "error reported by isolated context");
                    self.callbacks.error(&ErrorReport {
                        message,
                        stack: payload.stack,
                    });
                }
            }
            OutboundMessage::Console {
                level: Some(level),
                args: Some(args),
            } => self.callbacks.console(level, &args),
            OutboundMessage::Console { .. } => {
                debug!(boundary = %origin, "incomplete console message ignored");
            }
        }
    }
}

/// Handle returned by [`Sandbox::create`]
pub struct Sandbox {
    shared: Arc<Shared>,
    bus: MessageBus,
}

impl Sandbox {
    /// Create a boundary inside the container named by `options`
    ///
    /// If the container cannot be resolved or the context cannot start, the
    /// failure is logged and the returned handle has no boundary.
    pub fn create(page: &Page, options: SandboxOptions) -> Self {
        let SandboxOptions {
            container,
            bootstrap,
            callbacks,
            config,
        } = options;

        let (status, _) = watch::channel(SandboxStatus::Idle);
        let sandbox = Self {
            shared: Arc::new(Shared {
                status,
                callbacks,
                boundary: Mutex::new(None),
                ready_seen: AtomicBool::new(false),
            }),
            bus: page.bus().clone(),
        };

        let container = match page.resolve(&container) {
            Ok(container) => container,
            Err(err) => {
                error!(error = %err, "[sandbox] container not found");
                return sandbox;
            }
        };

        let id = BoundaryId::next();
        // Subscribe first: `ready` may be posted before the listener thread runs
        let (listener, rx) = sandbox.bus.subscribe();
        let outbox = Arc::new(BoundaryOutbox::new(id, sandbox.bus.clone()));

        let context = match spawn_context(id, bootstrap, outbox, config.context_thread_name(id)) {
            Ok(context) => context,
            Err(err) => {
                error!(boundary = %id, error = %err, "[sandbox] failed to start isolated context");
                sandbox.bus.unsubscribe(listener);
                return sandbox;
            }
        };

        sandbox.shared.set_status(SandboxStatus::Loading);
        if let Some(displaced) = container.attach(id) {
            debug!(boundary = %id, displaced = %displaced, "container content replaced");
        }
        *sandbox.shared.boundary.lock() = Some(Boundary {
            id,
            context,
            container,
            listener,
        });

        let shared = Arc::clone(&sandbox.shared);
        let spawned = thread::Builder::new()
            .name(config.listener_thread_name(id))
            .spawn(move || listen(id, rx, shared));

        if let Err(err) = spawned {
            error!(boundary = %id, error = %err, "[sandbox] failed to start listener");
            sandbox.destroy();
        } else {
            info!(boundary = %id, "sandbox created");
        }
        sandbox
    }

    pub fn status(&self) -> SandboxStatus {
        *self.shared.status.borrow()
    }

    /// Receiver observing every status change from now on
    pub fn subscribe_status(&self) -> watch::Receiver<SandboxStatus> {
        self.shared.status.subscribe()
    }

    /// Wait until the status equals `status`; false on timeout
    pub async fn wait_for_status(&self, status: SandboxStatus, timeout: Duration) -> bool {
        let mut rx = self.subscribe_status();
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|current| *current == status)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Id of the live boundary, if any
    pub fn boundary_id(&self) -> Option<BoundaryId> {
        self.shared.current_boundary()
    }

    /// Submit modules for evaluation; outcomes arrive through the callbacks
    ///
    /// A no-op with a logged warning before `ready` or without a boundary.
    pub fn execute(&self, modules: ModuleSource, main_module: impl Into<String>, css: Option<&str>) {
        let mut request = EvalRequest::new(modules, main_module);
        if let Some(css) = css {
            request = request.with_css(css);
        }

        if let Err(err) = self.submit(request) {
            warn!(error = %err, "[sandbox] execute ignored");
        }
    }

    /// Post an `eval`, reporting why it could not be posted
    pub fn submit(&self, request: EvalRequest) -> SandboxResult<()> {
        let data = encode(&InboundMessage::Eval(request))?;

        let guard = self.shared.boundary.lock();
        let boundary = guard.as_ref().ok_or(SandboxError::BoundaryMissing)?;
        if !self.shared.ready_seen.load(Ordering::SeqCst) {
            return Err(SandboxError::NotReady(boundary.id));
        }

        trace!(boundary = %boundary.id, "eval posted");
        boundary.context.post(data)
    }

    /// Remove the listener, discard the boundary and return to idle
    pub fn destroy(&self) {
        let boundary = self.shared.boundary.lock().take();

        if let Some(boundary) = boundary {
            self.bus.unsubscribe(boundary.listener);
            boundary.container.detach(boundary.id);
            let id = boundary.id;
            boundary.context.teardown();
            info!(boundary = %id, "sandbox destroyed");
        }

        self.shared.ready_seen.store(false, Ordering::SeqCst);
        self.shared.set_status(SandboxStatus::Idle);
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox")
            .field("status", &self.status())
            .field("boundary", &self.boundary_id())
            .field("callbacks", &self.shared.callbacks)
            .finish()
    }
}

/// Listener loop; exits when the bus subscription is removed
fn listen(id: BoundaryId, rx: flume::Receiver<Envelope>, shared: Arc<Shared>) {
    for envelope in rx.iter() {
        if envelope.origin() != Some(id) {
            trace!(boundary = %id, source = ?envelope.source, "foreign message ignored");
            continue;
        }

        match decode_outbound(&envelope.data) {
            Ok(message) => shared.handle(id, message),
            Err(err) => debug!(boundary = %id, error = %err, "malformed message ignored"),
        }
    }
    debug!(boundary = %id, "listener stopped");
}
