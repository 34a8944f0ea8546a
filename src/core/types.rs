/*!
 * Core Types
 * Identifiers and status values shared by the controller and the isolated context
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one isolation boundary (the origin of every message it posts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundaryId(pub u64);

impl BoundaryId {
    /// Allocate a process-unique boundary id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boundary-{}", self.0)
    }
}

/// Handle of a message-bus listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally observed sandbox status
///
/// `Idle -> Loading -> Ready`, then `Ready <-> Error` for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

impl SandboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxStatus::Idle => "idle",
            SandboxStatus::Loading => "loading",
            SandboxStatus::Ready => "ready",
            SandboxStatus::Error => "error",
        }
    }

    /// Whether the boundary has completed its readiness handshake
    pub fn is_live(&self) -> bool {
        matches!(self, SandboxStatus::Ready | SandboxStatus::Error)
    }
}

impl fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
