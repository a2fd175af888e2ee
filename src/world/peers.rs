//! Remote participants known to this client.

use crate::assets::VisualHandle;
use crate::networking::protocol::{PeerUpdate, PlayerSnapshot};
use crate::world::animation::{AnimationController, AnimationName};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Server-assigned participant id. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First few characters, for status text.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(4) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Visual attached to a peer once its model finished loading.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerVisual {
    pub handle: VisualHandle,
    pub animation: AnimationController,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeerAvatarState {
    pub id: PeerId,
    pub position: Vec3,
    pub orientation: Quat,
    /// Last animation name the peer reported.
    pub current_animation: AnimationName,
    pub visual: Option<PeerVisual>,
}

impl PeerAvatarState {
    pub fn from_snapshot(snapshot: &PlayerSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            position: snapshot.position.map(|p| p.to_vec3()).unwrap_or(Vec3::ZERO),
            orientation: snapshot.rotation.map(|r| r.to_quat()).unwrap_or(Quat::IDENTITY),
            current_animation: snapshot
                .animation_state
                .as_deref()
                .and_then(AnimationName::from_wire)
                .unwrap_or_default(),
            visual: None,
        }
    }

    pub fn animation_running(&self) -> bool {
        self.visual
            .as_ref()
            .is_some_and(|visual| visual.animation.current_running())
    }

    fn apply(&mut self, update: &PeerUpdate) {
        if let Some(position) = update.position {
            self.position = position.to_vec3();
        }
        if let Some(rotation) = update.rotation {
            self.orientation = rotation.to_quat();
        }
        let received = update.animation_state.as_deref();
        self.current_animation = received.and_then(AnimationName::from_wire).unwrap_or_default();
        if let Some(visual) = self.visual.as_mut() {
            visual.animation.apply_remote(received);
        }
    }
}

/// Peer id to last-known state. Never holds the local participant.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    local_id: Option<PeerId>,
    peers: HashMap<PeerId, PeerAvatarState>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    fn is_local(&self, id: &PeerId) -> bool {
        self.local_id.as_ref() == Some(id)
    }

    /// Record the id the server assigned to us. An entry already registered
    /// under that id is evicted and returned.
    pub fn set_local_id(&mut self, id: PeerId) -> Option<PeerAvatarState> {
        let evicted = self.peers.remove(&id);
        self.local_id = Some(id);
        evicted
    }

    pub fn clear_local_id(&mut self) {
        self.local_id = None;
    }

    /// Create an entry for a joining peer. Returns false when the id is ours
    /// or already known.
    pub fn upsert_on_join(&mut self, snapshot: &PlayerSnapshot) -> bool {
        if self.is_local(&snapshot.id) || self.peers.contains_key(&snapshot.id) {
            return false;
        }
        self.peers
            .insert(snapshot.id.clone(), PeerAvatarState::from_snapshot(snapshot));
        true
    }

    /// Apply a state update. Unknown ids are never created here.
    pub fn apply_update(&mut self, id: &PeerId, update: &PeerUpdate) -> bool {
        if self.is_local(id) {
            return false;
        }
        match self.peers.get_mut(id) {
            Some(peer) => {
                peer.apply(update);
                true
            }
            None => false,
        }
    }

    /// Remove a peer; the caller releases its visual.
    pub fn remove(&mut self, id: &PeerId) -> Option<PeerAvatarState> {
        if self.is_local(id) {
            return None;
        }
        self.peers.remove(id)
    }

    /// Drop every peer, returning them so their visuals can be released.
    pub fn clear(&mut self) -> Vec<PeerAvatarState> {
        self.peers.drain().map(|(_, peer)| peer).collect()
    }

    /// Attach a loaded visual. Hands the visual back if the peer is gone or
    /// already has one, so the caller can release it.
    pub fn attach_visual(&mut self, id: &PeerId, visual: PeerVisual) -> Result<(), PeerVisual> {
        match self.peers.get_mut(id) {
            Some(peer) if peer.visual.is_none() => {
                peer.visual = Some(visual);
                Ok(())
            }
            _ => Err(visual),
        }
    }

    pub fn get(&self, id: &PeerId) -> Option<&PeerAvatarState> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerAvatarState> {
        self.peers.values()
    }

    /// Advance every attached peer mixer.
    pub fn update_animations(&mut self, delta: f32) {
        for visual in self.peers.values_mut().filter_map(|peer| peer.visual.as_mut()) {
            visual.animation.update(delta);
        }
    }
}
