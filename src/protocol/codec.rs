/*!
 * Protocol Codec
 * JSON encoding and validated decoding of boundary messages
 *
 * Decoding is strict about shape: payloads that are not objects, carry no
 * `type`, or carry a type from the other direction are rejected so the
 * receiver can drop them without side effects.
 */

use super::messages::{InboundMessage, OutboundMessage};
use crate::core::errors::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Message types the isolated context understands
pub const INBOUND_TYPES: &[&str] = &["eval"];

/// Message types the controller understands
pub const OUTBOUND_TYPES: &[&str] = &["ready", "rendered", "error", "console"];

/// Encode a message into its wire form
pub fn encode<T: Serialize>(message: &T) -> ProtocolResult<Value> {
    serde_json::to_value(message).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Decode a payload posted into the isolated context
pub fn decode_inbound(data: &Value) -> ProtocolResult<InboundMessage> {
    decode(data, INBOUND_TYPES)
}

/// Decode a payload posted out of the isolated context
pub fn decode_outbound(data: &Value) -> ProtocolResult<OutboundMessage> {
    decode(data, OUTBOUND_TYPES)
}

fn decode<T: DeserializeOwned>(data: &Value, known: &[&str]) -> ProtocolResult<T> {
    let object = data.as_object().ok_or(ProtocolError::NotAnObject)?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !known.contains(&kind) {
        return Err(ProtocolError::UnknownType(kind.to_string()));
    }

    serde_json::from_value(data.clone()).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
