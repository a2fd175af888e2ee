//! The client session: everything one running client owns, advanced by the
//! app loop one event at a time.

use crate::assets::{AssetError, AvatarModel, VisualHandle};
use crate::config::ClientSettings;
use crate::networking::protocol::{MessageCodec, ProtocolError};
use crate::networking::sync::{local_update, InboundEffects, SendThrottle};
use crate::networking::{NetworkError, NetworkResult, TransportEvent, TransportHandle};
use crate::world::animation::{resolve_target, AnimationController};
use crate::world::events::{CameraMode, ConnectionStatus, ConnectionStatusEvent, SceneEvent};
use crate::world::input::InputEvent;
use crate::world::motion::{LocalAvatarState, MotionModel};
use crate::world::peers::{PeerId, PeerRegistry, PeerVisual};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where the session stands with its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// A connection attempt is in flight.
    Connecting,
    Open,
    /// Disconnected; the next attempt is due at `retry_at`.
    Reconnecting { retry_at: Instant },
}

pub struct ClientSession {
    settings: ClientSettings,
    motion: MotionModel,
    avatar: LocalAvatarState,
    local_visual: VisualHandle,
    animation: AnimationController,
    registry: PeerRegistry,
    throttle: SendThrottle,
    transport: Option<TransportHandle>,
    link: LinkState,
    status: ConnectionStatusEvent,
    camera_mode: CameraMode,
    scene_events: Vec<SceneEvent>,
    load_requests: Vec<PeerId>,
}

impl ClientSession {
    /// Set up the local avatar from its loaded model. Fails when the model
    /// carries no animation clips.
    pub fn new(settings: ClientSettings, model: AvatarModel) -> Result<Self, AssetError> {
        let animation = AnimationController::for_local(&model.clips, settings.animation.fade_seconds)?;
        let motion = MotionModel::new(settings.movement.clone());
        let avatar = motion.spawn();
        let throttle = SendThrottle::new(settings.network.send_interval());
        info!("Local avatar ready at {}", avatar.position);

        Ok(Self {
            settings,
            motion,
            avatar,
            local_visual: model.handle,
            animation,
            registry: PeerRegistry::new(),
            throttle,
            transport: None,
            link: LinkState::Connecting,
            status: ConnectionStatusEvent::new(ConnectionStatus::Connecting),
            camera_mode: CameraMode::default(),
            scene_events: Vec::new(),
            load_requests: Vec::new(),
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn avatar(&self) -> &LocalAvatarState {
        &self.avatar
    }

    pub fn local_visual(&self) -> VisualHandle {
        self.local_visual
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.registry.local_id()
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn status(&self) -> &ConnectionStatusEvent {
        &self.status
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    /// When the next connection attempt is due, if one is scheduled.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        match self.link {
            LinkState::Reconnecting { retry_at } => Some(retry_at),
            _ => None,
        }
    }

    pub fn take_scene_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.scene_events)
    }

    /// Peers whose avatar model should be loaded now.
    pub fn take_load_requests(&mut self) -> Vec<PeerId> {
        std::mem::take(&mut self.load_requests)
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status.status != status {
            info!("Status: {}", status);
            self.status = ConnectionStatusEvent::new(status);
        }
    }

    fn refresh_connected_status(&mut self) {
        let Some(id) = self.registry.local_id() else { return };
        let status = ConnectionStatus::Connected {
            short_id: id.short().to_string(),
            players: self.registry.len() + 1,
        };
        self.set_status(status);
    }

    // =========================================================================
    // Input and frame tick
    // =========================================================================

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::Press(flags) => self.avatar.flags.insert(flags),
            InputEvent::Release(flags) => self.avatar.flags.remove(flags),
            InputEvent::Jump => {
                if self.motion.try_jump(&mut self.avatar) {
                    debug!("Jump");
                }
            }
            InputEvent::Respawn => {
                self.motion.respawn(&mut self.avatar);
                self.throttle.reset();
                self.send_state(now);
            }
            InputEvent::ToggleCamera => {
                self.camera_mode = self.camera_mode.toggled();
                info!("Camera mode: {}", self.camera_mode);
                self.scene_events.push(SceneEvent::CameraModeChanged(self.camera_mode));
            }
            InputEvent::Look { dx } => self.motion.look(&mut self.avatar, dx),
        }
    }

    /// One frame: motion, animation, mixers, then the rate-limited send.
    pub fn tick(&mut self, delta: Duration, now: Instant) {
        let step = self.motion.step(&mut self.avatar);
        if step.landed {
            debug!("Landed at {}", self.avatar.position);
        }
        self.animation
            .apply_local(resolve_target(step.airborne, step.moving, step.running));

        let delta = delta.as_secs_f32();
        self.animation.update(delta);
        self.registry.update_animations(delta);

        self.send_state(now);
    }

    /// Publish the local state if a local id is known, the link is open and
    /// the send interval has elapsed. Returns whether a frame was written.
    pub fn send_state(&mut self, now: Instant) -> bool {
        if self.link != LinkState::Open || self.registry.local_id().is_none() {
            return false;
        }
        let Some(handle) = self.transport.as_ref() else { return false };
        if !self.throttle.try_acquire(now) {
            return false;
        }

        let message = local_update(&self.avatar, self.animation.current());
        let result: NetworkResult<()> = MessageCodec::encode(&message)
            .map_err(NetworkError::from)
            .and_then(|frame| handle.send(frame));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send state: {}", e);
                false
            }
        }
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// A connection attempt has started.
    pub fn begin_connect(&mut self) {
        self.link = LinkState::Connecting;
        self.set_status(ConnectionStatus::Connecting);
    }

    /// Adopt the sending side of a freshly connected link. The link counts
    /// as open once its `Opened` event arrives.
    pub fn attach_transport(&mut self, handle: TransportHandle) {
        self.transport = Some(handle);
    }

    pub fn on_connect_failed(&mut self, err: &NetworkError, now: Instant) {
        error!("Connection attempt failed: {}", err);
        self.set_status(ConnectionStatus::Error(format!("Connection error: {err}")));
        self.on_disconnect(now);
    }

    pub fn on_transport_event(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Opened => {
                info!("Connection established");
                self.link = LinkState::Open;
                self.throttle.reset();
                self.set_status(ConnectionStatus::AwaitingId);
            }
            TransportEvent::Message(frame) => self.on_frame(&frame),
            TransportEvent::Error(reason) => {
                error!("Transport error: {}", reason);
                self.set_status(ConnectionStatus::Error(format!("Connection error: {reason}")));
            }
            TransportEvent::Closed { reason } => {
                match reason {
                    Some(reason) => info!("Connection closed: {}", reason),
                    None => info!("Connection closed"),
                }
                self.on_disconnect(now);
            }
        }
    }

    fn on_frame(&mut self, frame: &str) {
        let message = match MessageCodec::decode(frame) {
            Ok(message) => message,
            Err(ProtocolError::UnknownType(kind)) => {
                warn!("Received unknown message type: {}", kind);
                return;
            }
            Err(e) => {
                error!("Error processing message {}: {}", frame, e);
                return;
            }
        };
        debug!("Received {}", message.kind());

        let changed = InboundEffects {
            registry: &mut self.registry,
            load_requests: &mut self.load_requests,
            scene_events: &mut self.scene_events,
        }
        .apply(message);
        if changed {
            self.refresh_connected_status();
        }
    }

    /// Tear down everything tied to the lost connection and schedule the
    /// next attempt.
    pub fn on_disconnect(&mut self, now: Instant) {
        if let LinkState::Reconnecting { .. } = self.link {
            return;
        }
        for peer in self.registry.clear() {
            if let Some(visual) = peer.visual {
                self.scene_events.push(SceneEvent::ReleaseVisual {
                    peer: peer.id,
                    handle: visual.handle,
                });
            }
        }
        self.registry.clear_local_id();
        self.load_requests.clear();
        self.transport = None;

        let retry_at = now + self.settings.network.reconnect_delay();
        self.link = LinkState::Reconnecting { retry_at };
        self.set_status(ConnectionStatus::Reconnecting);
        info!("Reconnecting in {:?}", self.settings.network.reconnect_delay());
    }

    // =========================================================================
    // Asset completions
    // =========================================================================

    /// Resolve a peer model load. A model that arrives after its peer left,
    /// or for a peer that already shows one, is released straight away.
    pub fn complete_peer_load(&mut self, id: PeerId, result: Result<AvatarModel, AssetError>) {
        let model = match result {
            Ok(model) => model,
            Err(e) => {
                error!("Error loading model for player {}: {}", id, e);
                return;
            }
        };

        let Some(peer) = self.registry.get(&id) else {
            debug!("Player {} left before its model loaded", id);
            self.scene_events.push(SceneEvent::ReleaseVisual {
                peer: id,
                handle: model.handle,
            });
            return;
        };
        let (position, orientation) = (peer.position, peer.orientation);
        let visual = PeerVisual {
            handle: model.handle,
            animation: AnimationController::for_peer(
                &model.clips,
                self.settings.animation.fade_seconds,
                peer.current_animation,
            ),
        };

        match self.registry.attach_visual(&id, visual) {
            Ok(()) => {
                debug!("Attached model for player {}", id);
                self.scene_events.push(SceneEvent::AttachVisual {
                    peer: id,
                    handle: model.handle,
                    position,
                    orientation,
                });
            }
            Err(visual) => {
                debug!("Player {} already has a model; releasing the duplicate", id);
                self.scene_events.push(SceneEvent::ReleaseVisual {
                    peer: id,
                    handle: visual.handle,
                });
            }
        }
    }
}
