//! Wire protocol: JSON text frames tagged by a `type` field.

pub mod codecs;
pub mod messages;

pub use codecs::{MessageCodec, ProtocolError};
pub use messages::{ClientMessage, PeerUpdate, PlayerSnapshot, RelayedUpdate, ServerMessage};
