/*!
 * Host Page
 * Containers that boundaries attach to, plus the page-level message bus
 */

use super::bus::MessageBus;
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::types::BoundaryId;
use crate::protocol::Envelope;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A host element a boundary is attached into
///
/// Holds at most one boundary; attaching replaces the previous content.
/// Cloning yields another handle to the same element.
#[derive(Clone)]
pub struct Container {
    id: Arc<str>,
    frame: Arc<Mutex<Option<BoundaryId>>>,
}

impl Container {
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            frame: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attach `boundary`, returning the boundary it displaced
    pub fn attach(&self, boundary: BoundaryId) -> Option<BoundaryId> {
        self.frame.lock().replace(boundary)
    }

    /// Detach `boundary`; false if it is not the attached one
    pub fn detach(&self, boundary: BoundaryId) -> bool {
        let mut frame = self.frame.lock();
        if *frame == Some(boundary) {
            *frame = None;
            true
        } else {
            false
        }
    }

    pub fn frame(&self) -> Option<BoundaryId> {
        *self.frame.lock()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("frame", &self.frame())
            .finish()
    }
}

/// How a sandbox names the container it should attach to
#[derive(Debug, Clone)]
pub enum ContainerRef {
    Element(Container),
    /// Element id, with or without a leading `#`
    Selector(String),
}

impl From<Container> for ContainerRef {
    fn from(container: Container) -> Self {
        ContainerRef::Element(container)
    }
}

impl From<&Container> for ContainerRef {
    fn from(container: &Container) -> Self {
        ContainerRef::Element(container.clone())
    }
}

impl From<&str> for ContainerRef {
    fn from(selector: &str) -> Self {
        ContainerRef::Selector(selector.to_string())
    }
}

impl From<String> for ContainerRef {
    fn from(selector: String) -> Self {
        ContainerRef::Selector(selector)
    }
}

/// Cloning yields another handle to the same page
#[derive(Clone, Default)]
pub struct Page {
    containers: Arc<DashMap<String, Container>>,
    bus: MessageBus,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or return the existing) container with `id`
    pub fn add_container(&self, id: &str) -> Container {
        self.containers
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(container = id, "container added");
                Container::new(id)
            })
            .clone()
    }

    pub fn container(&self, id: &str) -> Option<Container> {
        self.containers.get(id).map(|entry| entry.value().clone())
    }

    pub fn remove_container(&self, id: &str) -> Option<Container> {
        self.containers.remove(id).map(|(_, container)| container)
    }

    pub fn resolve(&self, target: &ContainerRef) -> SandboxResult<Container> {
        match target {
            ContainerRef::Element(container) => Ok(container.clone()),
            ContainerRef::Selector(selector) => {
                let id = selector.strip_prefix('#').unwrap_or(selector);
                self.container(id)
                    .ok_or_else(|| SandboxError::ContainerNotFound(selector.clone()))
            }
        }
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Post a message from the page itself (not from any boundary)
    pub fn post_message(&self, data: serde_json::Value) -> usize {
        self.bus.post(Envelope::from_page(data))
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("containers", &self.containers.len())
            .field("bus", &self.bus)
            .finish()
    }
}
