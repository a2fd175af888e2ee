use super::messages::{ClientMessage, ServerMessage};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Message has no type field")]
    MissingType,

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

/// JSON text frame codec.
pub struct MessageCodec;

impl MessageCodec {
    /// Decode one text frame. An unrecognized `type` is reported separately
    /// from a frame that is not valid JSON or is missing required fields.
    pub fn decode(frame: &str) -> Result<ServerMessage, ProtocolError> {
        let value: Value = serde_json::from_str(frame)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;
        if !ServerMessage::KNOWN_TYPES.contains(&kind) {
            return Err(ProtocolError::UnknownType(kind.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn encode(message: &ClientMessage) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(message)?)
    }
}
