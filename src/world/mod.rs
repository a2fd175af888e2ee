pub mod animation;
pub mod events;
pub mod input;
pub mod motion;
pub mod peers;

// Re-export all event types for easier access
pub use events::*;
pub use animation::{AnimationController, AnimationName, AnimationTarget};
pub use input::{InputEvent, MovementFlags};
pub use motion::{LocalAvatarState, MotionModel, MotionStep};
pub use peers::{PeerAvatarState, PeerId, PeerRegistry, PeerVisual};
