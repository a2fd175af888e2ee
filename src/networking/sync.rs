//! State synchronization: rate-limited publishing of the local pose and the
//! rules for applying server messages to the peer registry.

use crate::networking::protocol::{ClientMessage, PlayerSnapshot, ServerMessage};
use crate::utils::math::{WirePosition, WireRotation};
use crate::world::animation::AnimationName;
use crate::world::events::SceneEvent;
use crate::world::motion::LocalAvatarState;
use crate::world::peers::{PeerAvatarState, PeerId, PeerRegistry};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Admits at most one send per interval.
#[derive(Debug, Clone)]
pub struct SendThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl SendThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Claim the send slot for `now`. Returns false while the previous send
    /// is less than one interval old.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_sent {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_sent = Some(now);
        true
    }

    /// Forget the last send so the next attempt goes out immediately.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

/// The `updateState` message describing the local avatar.
pub fn local_update(avatar: &LocalAvatarState, animation: AnimationName) -> ClientMessage {
    ClientMessage::UpdateState {
        position: WirePosition::from(avatar.position),
        rotation: WireRotation::from(avatar.orientation()),
        animation_state: animation.as_str().to_string(),
    }
}

/// Session state touched by inbound messages.
pub struct InboundEffects<'a> {
    pub registry: &'a mut PeerRegistry,
    /// Peers created by this message whose model must now be loaded.
    pub load_requests: &'a mut Vec<PeerId>,
    pub scene_events: &'a mut Vec<SceneEvent>,
}

impl InboundEffects<'_> {
    fn release(&mut self, peer: PeerAvatarState) {
        if let Some(visual) = peer.visual {
            self.scene_events.push(SceneEvent::ReleaseVisual {
                peer: peer.id,
                handle: visual.handle,
            });
        }
    }

    fn assign_local_id(&mut self, id: PeerId) {
        info!("Assigned local player ID: {}", id);
        if let Some(evicted) = self.registry.set_local_id(id) {
            self.release(evicted);
        }
    }

    fn join(&mut self, snapshot: &PlayerSnapshot) -> bool {
        if !self.registry.upsert_on_join(snapshot) {
            return false;
        }
        info!("Player joined: {}", snapshot.id);
        self.load_requests.push(snapshot.id.clone());
        true
    }

    /// Apply one server message. Returns true when the local id or the
    /// roster may have changed and the status line should be refreshed.
    /// Messages that arrive out of place are ignored.
    pub fn apply(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::YourId { id } => {
                if self.registry.local_id().is_some() {
                    debug!("Ignoring repeated yourId {}", id);
                    return false;
                }
                self.assign_local_id(id);
                true
            }
            ServerMessage::InitialState { your_id, players } => {
                if self.registry.local_id().is_none() {
                    self.assign_local_id(your_id);
                }
                debug!("Initial state with {} players", players.len());
                for snapshot in &players {
                    self.join(snapshot);
                }
                self.registry.local_id().is_some()
            }
            ServerMessage::PlayerJoined(snapshot) => {
                if self.registry.local_id().is_none() {
                    return false;
                }
                self.join(&snapshot)
            }
            ServerMessage::PlayerLeft { id } => match self.registry.remove(&id) {
                Some(peer) => {
                    info!("Player left: {}", id);
                    self.release(peer);
                    true
                }
                None => false,
            },
            ServerMessage::UpdateState(relayed) => {
                if self.registry.local_id().is_none() {
                    return false;
                }
                if let Some(id) = relayed.id {
                    self.registry.apply_update(&id, &relayed.update);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ClipInfo, VisualHandle};
    use crate::networking::protocol::{PeerUpdate, RelayedUpdate};
    use crate::world::animation::AnimationController;
    use crate::world::peers::PeerVisual;
    use glam::Vec3;

    #[derive(Default)]
    struct Fixture {
        registry: PeerRegistry,
        loads: Vec<PeerId>,
        events: Vec<SceneEvent>,
    }

    impl Fixture {
        fn apply(&mut self, message: ServerMessage) -> bool {
            InboundEffects {
                registry: &mut self.registry,
                load_requests: &mut self.loads,
                scene_events: &mut self.events,
            }
            .apply(message)
        }
    }

    fn joined(id: &str) -> ServerMessage {
        ServerMessage::PlayerJoined(PlayerSnapshot::new(id))
    }

    #[test]
    fn test_throttle_admits_one_send_per_interval() {
        let mut throttle = SendThrottle::new(Duration::from_millis(100));
        let start = Instant::now();
        let sent = (0..100u64)
            .filter(|i| throttle.try_acquire(start + Duration::from_millis(*i * 10)))
            .count();
        assert_eq!(sent, 10);
    }

    #[test]
    fn test_throttle_reset_allows_immediate_send() {
        let mut throttle = SendThrottle::new(Duration::from_millis(100));
        let now = Instant::now();
        assert!(throttle.try_acquire(now));
        assert!(!throttle.try_acquire(now + Duration::from_millis(5)));
        throttle.reset();
        assert!(throttle.try_acquire(now + Duration::from_millis(6)));
    }

    #[test]
    fn test_local_update_carries_pose_and_animation() {
        let mut avatar = LocalAvatarState::new(Vec3::new(200.0, 1.0, 0.0));
        avatar.yaw = std::f32::consts::FRAC_PI_2;
        let ClientMessage::UpdateState {
            position,
            rotation,
            animation_state,
        } = local_update(&avatar, AnimationName::Walk);
        assert_eq!(position, WirePosition::new(200.0, 1.0, 0.0));
        assert!((rotation.y - std::f32::consts::FRAC_PI_4.sin()).abs() < 1e-6);
        assert_eq!(animation_state, "Walk");
    }

    #[test]
    fn test_your_id_only_first_is_accepted() {
        let mut fx = Fixture::default();
        assert!(fx.apply(ServerMessage::YourId { id: "a".into() }));
        assert!(!fx.apply(ServerMessage::YourId { id: "b".into() }));
        assert_eq!(fx.registry.local_id(), Some(&PeerId::from("a")));
    }

    #[test]
    fn test_initial_state_skips_local_and_known() {
        let mut fx = Fixture::default();
        fx.apply(ServerMessage::YourId { id: "me".into() });
        let changed = fx.apply(ServerMessage::InitialState {
            your_id: "other".into(),
            players: vec![PlayerSnapshot::new("me"), PlayerSnapshot::new("p1"), PlayerSnapshot::new("p1")],
        });
        assert!(changed);
        assert_eq!(fx.registry.local_id(), Some(&PeerId::from("me")));
        assert_eq!(fx.registry.len(), 1);
        assert_eq!(fx.loads, vec![PeerId::from("p1")]);
    }

    #[test]
    fn test_join_and_update_require_local_id() {
        let mut fx = Fixture::default();
        assert!(!fx.apply(joined("p1")));
        assert!(fx.registry.is_empty());

        fx.apply(ServerMessage::YourId { id: "me".into() });
        assert!(fx.apply(joined("p1")));
        assert!(!fx.apply(joined("p1")));
        assert!(!fx.apply(joined("me")));
        assert_eq!(fx.loads.len(), 1);

        fx.apply(ServerMessage::UpdateState(RelayedUpdate {
            id: Some("p1".into()),
            update: PeerUpdate {
                position: Some(WirePosition::new(3.0, 1.0, 4.0)),
                ..Default::default()
            },
        }));
        let peer = fx.registry.get(&"p1".into()).unwrap();
        assert_eq!(peer.position, Vec3::new(3.0, 1.0, 4.0));

        // Updates never create peers.
        fx.apply(ServerMessage::UpdateState(RelayedUpdate {
            id: Some("ghost".into()),
            update: PeerUpdate::default(),
        }));
        assert!(!fx.registry.contains(&"ghost".into()));
    }

    #[test]
    fn test_leave_releases_visual() {
        let mut fx = Fixture::default();
        fx.apply(ServerMessage::YourId { id: "me".into() });
        fx.apply(joined("p1"));
        let handle = VisualHandle::next();
        let clips = [ClipInfo::new("Idle", 1.0)];
        fx.registry
            .attach_visual(
                &"p1".into(),
                PeerVisual {
                    handle,
                    animation: AnimationController::for_peer(&clips, 0.2, AnimationName::Idle),
                },
            )
            .unwrap();

        assert!(fx.apply(ServerMessage::PlayerLeft { id: "p1".into() }));
        assert!(fx.registry.is_empty());
        assert_eq!(
            fx.events,
            vec![SceneEvent::ReleaseVisual {
                peer: "p1".into(),
                handle
            }]
        );
        assert!(!fx.apply(ServerMessage::PlayerLeft { id: "p1".into() }));
    }
}
