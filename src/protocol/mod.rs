/*!
 * Execution Protocol
 * Message contract between the controller and an isolated context
 */

pub mod codec;
pub mod envelope;
pub mod messages;

pub use codec::{decode_inbound, decode_outbound, encode};
pub use envelope::{Envelope, MessageSource};
pub use messages::{
    ConsoleLevel, ErrorPayload, ErrorReport, EvalRequest, InboundMessage, ModuleSource,
    OutboundMessage,
};

/// Sink for messages leaving an isolated context
///
/// The context never knows how its messages travel; the controller supplies
/// the transport, and tests supply a recorder.
pub trait Outbox: Send + Sync {
    /// Post a message; delivery is best-effort and never reported back
    fn post(&self, message: OutboundMessage);
}
