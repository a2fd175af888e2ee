pub mod settings;

// Re-export commonly used types
pub use settings::{
    AnimationSettings, AssetSettings, ClientSettings, LoggingSettings, MovementSettings,
    NetworkSettings, load_settings, save_settings,
};
