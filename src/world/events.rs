use crate::assets::VisualHandle;
use crate::world::peers::PeerId;
use glam::{Quat, Vec3};
use std::fmt;
use std::time::SystemTime;

/// Signals for the rendering collaborator. Drained once per loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A peer's model finished loading and should be placed in the scene.
    AttachVisual {
        peer: PeerId,
        handle: VisualHandle,
        position: Vec3,
        orientation: Quat,
    },
    /// The visual is no longer referenced and its resources can be freed.
    ReleaseVisual { peer: PeerId, handle: VisualHandle },
    CameraModeChanged(CameraMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    #[default]
    ThirdPerson,
    FirstPerson,
}

impl CameraMode {
    pub fn toggled(self) -> Self {
        match self {
            CameraMode::ThirdPerson => CameraMode::FirstPerson,
            CameraMode::FirstPerson => CameraMode::ThirdPerson,
        }
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraMode::ThirdPerson => write!(f, "Third Person"),
            CameraMode::FirstPerson => write!(f, "First Person"),
        }
    }
}

/// Connection status enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    /// Open, but the server has not assigned our id yet.
    AwaitingId,
    Connected { short_id: String, players: usize },
    Error(String),
    Reconnecting,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "Connecting to server..."),
            ConnectionStatus::AwaitingId => write!(f, "Connected (Waiting for ID)"),
            ConnectionStatus::Connected { short_id, players } => {
                write!(f, "Connected (ID: {}..., Players: {})", short_id, players)
            }
            ConnectionStatus::Error(reason) => write!(f, "{}", reason),
            ConnectionStatus::Reconnecting => write!(f, "Disconnected. Attempting to reconnect..."),
        }
    }
}

/// Connection status change event, shown to the user as a one-line indicator.
#[derive(Debug, Clone)]
pub struct ConnectionStatusEvent {
    pub status: ConnectionStatus,
    pub timestamp: SystemTime,
}

impl ConnectionStatusEvent {
    pub fn new(status: ConnectionStatus) -> Self {
        Self {
            status,
            timestamp: SystemTime::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ConnectionStatus::Error(_))
    }

    pub fn text(&self) -> String {
        self.status.to_string()
    }
}
