/*!
 * Context Runtime
 * Inbound message handling of an isolated context
 *
 * Transport-agnostic: the runtime turns inbound messages into effects on
 * its document and registry and reports through an [`Outbox`].
 */

use super::bootstrap::BootstrapConfig;
use super::compiler::CodeCompiler;
use super::console::Console;
use super::document::{Document, MountPoint};
use super::env::ContextEnv;
use super::libraries::MountedInstance;
use super::registry::ModuleRegistry;
use super::reporter;
use super::value::Value;
use crate::core::errors::{ModuleError, ModuleResult, ScriptError};
use crate::core::limits::{MAX_JOBS_PER_TURN, STYLE_MARKER, UNHANDLED_REJECTION_PREFIX};
use crate::monitoring::EvalSpan;
use crate::protocol::{decode_inbound, ErrorPayload, EvalRequest, InboundMessage, OutboundMessage, Outbox};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct ContextRuntime {
    registry: ModuleRegistry,
    env: ContextEnv,
    document: Document,
    instance: Option<Box<dyn MountedInstance>>,
    compiler: Arc<dyn CodeCompiler>,
    outbox: Arc<dyn Outbox>,
    ready_sent: bool,
}

impl ContextRuntime {
    pub fn new(config: BootstrapConfig, outbox: Arc<dyn Outbox>) -> Self {
        let console = Console::new(Arc::clone(&outbox));
        let env = ContextEnv::new(console, Value::from(config.global_config));

        let mut document = Document::new(&config.mount_point_id);
        for css in config.stylesheets {
            document.add_stylesheet(css, None);
        }

        Self {
            registry: ModuleRegistry::new(config.libraries),
            env,
            document,
            instance: None,
            compiler: config.compiler,
            outbox,
            ready_sent: false,
        }
    }

    /// Send `ready`; only the first call has an effect
    pub fn announce_ready(&mut self) {
        if self.ready_sent {
            return;
        }
        self.ready_sent = true;
        info!("isolated context ready");
        self.outbox.post(OutboundMessage::Ready);
    }

    /// Decode and handle a raw payload; anything not a valid inbound message is ignored
    pub fn dispatch(&mut self, data: &serde_json::Value) -> bool {
        match decode_inbound(data) {
            Ok(message) => {
                self.handle(message);
                true
            }
            Err(err) => {
                debug!(error = %err, "ignoring inbound payload");
                false
            }
        }
    }

    /// Handle one message; failures never escape
    pub fn handle(&mut self, message: InboundMessage) {
        let outcome = reporter::guard(|| match message {
            InboundMessage::Eval(request) => self.evaluate(request),
        });

        if let Err(payload) = outcome {
            self.report_error(payload);
        }
    }

    fn evaluate(&mut self, request: EvalRequest) {
        let mut span = EvalSpan::new(request.modules.len(), request.entry());
        let outcome = {
            let _entered = span.enter();
            self.run_eval(&request)
        };
        span.record_outcome(outcome);
    }

    fn run_eval(&mut self, request: &EvalRequest) -> &'static str {
        self.registry.reset();
        self.document.remove_marked(STYLE_MARKER);
        if let Some(mut previous) = self.instance.take() {
            previous.destroy();
        }
        let mount_point = self.document.reset_mount_point();

        if let Some(css) = request.stylesheet() {
            self.document.add_stylesheet(css, Some(STYLE_MARKER));
        }

        for (name, code) in &request.modules {
            match self.compiler.compile(name, code) {
                Ok(factory) => self.registry.define(name.clone(), factory),
                Err(err) => {
                    warn!(module = %name, error = %err, "module failed to compile");
                    self.env.console().error(&[
                        Value::from(format!("Failed to define module {}:", name)),
                        Value::from(err.message),
                    ]);
                }
            }
        }

        let Some(entry) = request.entry() else {
            return "defined";
        };

        match self.mount(entry, &mount_point) {
            Ok(instance) => {
                self.instance = Some(instance);
                debug!(entry, "entry module mounted");
                self.outbox.post(OutboundMessage::Rendered);
                "rendered"
            }
            Err(err) => {
                let err = ScriptError::from(err);
                self.env.console().error(&[
                    Value::from("Failed to mount component:"),
                    Value::from(err.message.clone()),
                ]);
                self.outbox.post(OutboundMessage::error(ErrorPayload::from(err)));
                "error"
            }
        }
    }

    fn mount(&mut self, entry: &str, target: &MountPoint) -> ModuleResult<Box<dyn MountedInstance>> {
        let exports = self.registry.require(entry, &self.env)?;

        let default = exports.get("default");
        let component = if default.is_truthy() { default } else { exports };
        if component.is_nullish() {
            return Err(ModuleError::MountFailed(format!(
                "Module {} does not export a component",
                entry
            )));
        }

        let runtime = Arc::clone(self.registry.libraries().runtime()?);
        Ok(runtime.mount(&component, target)?)
    }

    /// Run scheduled jobs, at most one turn's budget
    ///
    /// A failing job is reported as an unhandled rejection; jobs queued past
    /// the budget stay for the next turn.
    pub fn run_pending_jobs(&mut self) -> usize {
        let jobs = self.env.take_jobs(MAX_JOBS_PER_TURN);
        let ran = jobs.len();

        for job in jobs {
            let env = &self.env;
            match reporter::guard(|| job(env)) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.report_rejection(err),
                Err(payload) => self.report_error(payload),
            }
        }

        if ran == MAX_JOBS_PER_TURN && self.has_pending_jobs() {
            debug!(pending = self.env.pending_jobs(), "job budget exhausted for this turn");
        }
        ran
    }

    pub fn has_pending_jobs(&self) -> bool {
        self.env.pending_jobs() > 0
    }

    fn report_rejection(&self, err: ScriptError) {
        let payload = ErrorPayload::new(format!("{}{}", UNHANDLED_REJECTION_PREFIX, err.message))
            .with_stack(err.stack);
        self.report_error(payload);
    }

    /// Serialize a runtime failure into an `error` message
    pub fn report_error(&self, payload: ErrorPayload) {
        error!(message = %payload.message, "runtime error reported");
        self.outbox.post(OutboundMessage::error(payload));
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn env(&self) -> &ContextEnv {
        &self.env
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// Dispose the live instance and drop queued jobs; returns how many were dropped
    pub fn shutdown(&mut self) -> usize {
        if let Some(mut instance) = self.instance.take() {
            instance.destroy();
        }
        let dropped = self.env.pending_jobs();
        self.env.clear_jobs();
        self.registry.reset();
        dropped
    }
}

impl fmt::Debug for ContextRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRuntime")
            .field("registry", &self.registry)
            .field("document", &self.document)
            .field("instance", &self.instance.is_some())
            .field("ready_sent", &self.ready_sent)
            .finish_non_exhaustive()
    }
}
