/*!
 * Message Envelope
 * What a page-level listener observes: the posting origin plus the raw payload
 */

use crate::core::types::BoundaryId;
use serde_json::Value;

/// Who posted a message onto the page bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageSource {
    /// An isolated context
    Boundary(BoundaryId),
    /// Script running on the host page itself
    Page,
}

/// A message event as delivered to page listeners
///
/// The payload stays untyped until the receiver has checked the origin and
/// validated the shape; nothing else is shared across the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source: MessageSource,
    pub data: Value,
}

impl Envelope {
    pub fn from_boundary(origin: BoundaryId, data: Value) -> Self {
        Self {
            source: MessageSource::Boundary(origin),
            data,
        }
    }

    pub fn from_page(data: Value) -> Self {
        Self {
            source: MessageSource::Page,
            data,
        }
    }

    /// Boundary that posted the message, if any
    pub fn origin(&self) -> Option<BoundaryId> {
        match self.source {
            MessageSource::Boundary(id) => Some(id),
            MessageSource::Page => None,
        }
    }
}
