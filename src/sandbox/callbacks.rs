/*!
 * Sandbox Callbacks
 * Caller-supplied hooks; every one is optional
 */

use crate::core::types::SandboxStatus;
use crate::protocol::{ConsoleLevel, ErrorReport};
use std::fmt;
use std::sync::Arc;

pub type ReadyCallback = Arc<dyn Fn() + Send + Sync>;
pub type RenderedCallback = Arc<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&ErrorReport) + Send + Sync>;
pub type ConsoleCallback = Arc<dyn Fn(ConsoleLevel, &[String]) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(SandboxStatus) + Send + Sync>;

#[derive(Clone, Default)]
pub struct SandboxCallbacks {
    pub on_ready: Option<ReadyCallback>,
    pub on_rendered: Option<RenderedCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_console: Option<ConsoleCallback>,
    pub on_status_change: Option<StatusCallback>,
}

impl SandboxCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Arc::new(f));
        self
    }

    pub fn on_rendered(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_rendered = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ErrorReport) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_console(mut self, f: impl Fn(ConsoleLevel, &[String]) + Send + Sync + 'static) -> Self {
        self.on_console = Some(Arc::new(f));
        self
    }

    pub fn on_status_change(mut self, f: impl Fn(SandboxStatus) + Send + Sync + 'static) -> Self {
        self.on_status_change = Some(Arc::new(f));
        self
    }

    pub(crate) fn ready(&self) {
        if let Some(f) = &self.on_ready {
            f();
        }
    }

    pub(crate) fn rendered(&self) {
        if let Some(f) = &self.on_rendered {
            f();
        }
    }

    pub(crate) fn error(&self, report: &ErrorReport) {
        if let Some(f) = &self.on_error {
            f(report);
        }
    }

    pub(crate) fn console(&self, level: ConsoleLevel, args: &[String]) {
        if let Some(f) = &self.on_console {
            f(level, args);
        }
    }

    pub(crate) fn status_changed(&self, status: SandboxStatus) {
        if let Some(f) = &self.on_status_change {
            f(status);
        }
    }
}

impl fmt::Debug for SandboxCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SandboxCallbacks")
            .field("on_ready", &self.on_ready.is_some())
            .field("on_rendered", &self.on_rendered.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_console", &self.on_console.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .finish()
    }
}
