/*!
 * Context Environment
 * Globals every module sees: console, injected config, and the deferred job queue
 */

use super::console::Console;
use super::value::Value;
use crate::core::errors::ScriptError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// Work scheduled to run after the current message (a promise continuation)
pub type Job = Box<dyn FnOnce(&ContextEnv) -> Result<(), ScriptError> + Send>;

pub struct ContextEnv {
    console: Console,
    global_config: Value,
    jobs: Mutex<VecDeque<Job>>,
}

impl ContextEnv {
    pub fn new(console: Console, global_config: Value) -> Self {
        Self {
            console,
            global_config,
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Host-supplied configuration object
    pub fn global_config(&self) -> Value {
        self.global_config.clone()
    }

    pub fn defer<F>(&self, job: F)
    where
        F: FnOnce(&ContextEnv) -> Result<(), ScriptError> + Send + 'static,
    {
        self.jobs.lock().push_back(Box::new(job));
    }

    /// Take up to `limit` jobs in scheduling order
    pub fn take_jobs(&self, limit: usize) -> Vec<Job> {
        let mut jobs = self.jobs.lock();
        let count = jobs.len().min(limit);
        jobs.drain(..count).collect()
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Drop every scheduled job
    pub fn clear_jobs(&self) {
        self.jobs.lock().clear();
    }
}

impl fmt::Debug for ContextEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextEnv")
            .field("global_config", &self.global_config)
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}
