//! Connection to the relay server: wire protocol, transport links and the
//! state synchronization rules applied on top of them.

pub mod protocol;
pub mod sync;
pub mod transport;

pub use protocol::{ClientMessage, MessageCodec, ProtocolError, ServerMessage};
pub use sync::{InboundEffects, SendThrottle};
pub use transport::{Connector, Link, MemoryConnector, TransportEvent, TransportHandle, WsConnector};

// Error types
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("Invalid endpoint: {reason}")]
    InvalidEndpoint { reason: String },

    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Message encode failed: {reason}")]
    Encode { reason: String },

    #[error("Transport error: {reason}")]
    Transport { reason: String },
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        NetworkError::Transport { reason: err.to_string() }
    }
}

impl From<ProtocolError> for NetworkError {
    fn from(err: ProtocolError) -> Self {
        NetworkError::Encode { reason: err.to_string() }
    }
}
