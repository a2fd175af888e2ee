use crate::utils::math::{WirePosition, WireRotation};
use crate::world::peers::PeerId;
use serde::{Deserialize, Serialize};

/// One participant as listed in `initialState` or announced by `playerJoined`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<WirePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<WireRotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_state: Option<String>,
}

impl PlayerSnapshot {
    pub fn new(id: impl Into<PeerId>) -> Self {
        Self {
            id: id.into(),
            position: None,
            rotation: None,
            animation_state: None,
        }
    }
}

/// Pose fields of an `updateState`; each one is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<WirePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<WireRotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_state: Option<String>,
}

/// `updateState` as relayed by the server, stamped with the sender's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PeerId>,
    #[serde(flatten)]
    pub update: PeerUpdate,
}

/// Messages the server sends. The `type` field selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "yourId")]
    YourId { id: PeerId },

    #[serde(rename = "initialState", rename_all = "camelCase")]
    InitialState {
        your_id: PeerId,
        #[serde(default)]
        players: Vec<PlayerSnapshot>,
    },

    #[serde(rename = "playerJoined")]
    PlayerJoined(PlayerSnapshot),

    #[serde(rename = "playerLeft")]
    PlayerLeft { id: PeerId },

    #[serde(rename = "updateState")]
    UpdateState(RelayedUpdate),
}

impl ServerMessage {
    /// Values of the `type` field this client understands.
    pub const KNOWN_TYPES: [&'static str; 5] =
        ["yourId", "initialState", "playerJoined", "playerLeft", "updateState"];

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::YourId { .. } => "yourId",
            ServerMessage::InitialState { .. } => "initialState",
            ServerMessage::PlayerJoined(_) => "playerJoined",
            ServerMessage::PlayerLeft { .. } => "playerLeft",
            ServerMessage::UpdateState(_) => "updateState",
        }
    }
}

/// Messages this client sends. The server attributes the sender itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "updateState", rename_all = "camelCase")]
    UpdateState {
        position: WirePosition,
        rotation: WireRotation,
        animation_state: String,
    },
}
