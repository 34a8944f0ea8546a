/*!
 * Sandbox Configuration
 * Process-level settings and the per-sandbox options builder
 */

use super::callbacks::SandboxCallbacks;
use super::page::ContainerRef;
use crate::context::bootstrap::BootstrapConfig;
use crate::core::limits::{CONTEXT_THREAD_PREFIX, DEFAULT_MOUNT_POINT_ID, LISTENER_THREAD_PREFIX};
use crate::core::types::BoundaryId;

/// Settings shared by every sandbox in the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub context_thread_prefix: String,
    pub listener_thread_prefix: String,
    pub mount_point_id: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            context_thread_prefix: CONTEXT_THREAD_PREFIX.to_string(),
            listener_thread_prefix: LISTENER_THREAD_PREFIX.to_string(),
            mount_point_id: DEFAULT_MOUNT_POINT_ID.to_string(),
        }
    }
}

impl SandboxConfig {
    /// Defaults overridden by environment variables
    ///
    /// - SANDBOX_CONTEXT_THREAD_PREFIX
    /// - SANDBOX_LISTENER_THREAD_PREFIX
    /// - SANDBOX_MOUNT_ID
    ///
    /// Empty values are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            context_thread_prefix: env_or("SANDBOX_CONTEXT_THREAD_PREFIX", defaults.context_thread_prefix),
            listener_thread_prefix: env_or("SANDBOX_LISTENER_THREAD_PREFIX", defaults.listener_thread_prefix),
            mount_point_id: env_or("SANDBOX_MOUNT_ID", defaults.mount_point_id),
        }
    }

    pub fn context_thread_name(&self, boundary: BoundaryId) -> String {
        format!("{}-{}", self.context_thread_prefix, boundary.0)
    }

    pub fn listener_thread_name(&self, boundary: BoundaryId) -> String {
        format!("{}-{}", self.listener_thread_prefix, boundary.0)
    }
}

fn env_or(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default,
    }
}

/// Everything `Sandbox::create` needs
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    pub container: ContainerRef,
    pub bootstrap: BootstrapConfig,
    pub callbacks: SandboxCallbacks,
    pub config: SandboxConfig,
}

impl SandboxOptions {
    /// Options with the process configuration taken from the environment
    ///
    /// A mount id from the environment replaces the bootstrap default.
    pub fn new(container: impl Into<ContainerRef>) -> Self {
        let config = SandboxConfig::from_env();
        let bootstrap = BootstrapConfig::default().with_mount_point_id(config.mount_point_id.clone());
        Self {
            container: container.into(),
            bootstrap,
            callbacks: SandboxCallbacks::default(),
            config,
        }
    }

    /// Replace the bootstrap settings
    ///
    /// The replacement's own mount id wins over `SANDBOX_MOUNT_ID`.
    pub fn with_bootstrap(mut self, bootstrap: BootstrapConfig) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_callbacks(mut self, callbacks: SandboxCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Replace the process settings; their mount id is applied to the bootstrap
    pub fn with_config(mut self, config: SandboxConfig) -> Self {
        self.bootstrap.mount_point_id = config.mount_point_id.clone();
        self.config = config;
        self
    }
}
