//! Avatar model loading.
//!
//! Decoding meshes and skeletons belongs to the renderer. The client core only
//! needs an opaque handle for the visual and the list of animation clips the
//! model carries.

pub mod cache;
pub mod manager;

pub use manager::{load_local_avatar, AvatarLoader, ManifestLoader, StaticLoader};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Name and length of one animation clip in a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    pub name: String,
    /// Seconds; zero means the clip does not loop meaningfully.
    #[serde(default)]
    pub duration: f32,
}

impl ClipInfo {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// Opaque reference to a visual instance owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(u64);

static NEXT_VISUAL: AtomicU64 = AtomicU64::new(1);

impl VisualHandle {
    pub fn next() -> Self {
        Self(NEXT_VISUAL.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A loaded avatar: its visual plus the clips the animation mixer can play.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarModel {
    pub handle: VisualHandle,
    pub clips: Vec<ClipInfo>,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Model '{source_name}' not found")]
    NotFound { source_name: String },

    #[error("Failed to read model '{source_name}': {reason}")]
    Io { source_name: String, reason: String },

    #[error("Invalid model manifest '{source_name}': {reason}")]
    InvalidManifest { source_name: String, reason: String },

    #[error("Model has no animations")]
    NoAnimations,
}
