// citywalk: multiplayer avatar client core

pub mod app;
pub mod assets;
pub mod config;
pub mod networking;
pub mod session;
pub mod utils;
pub mod world;

// Re-export commonly used types for convenience
pub use app::ClientApp;
pub use config::{load_settings, ClientSettings};
pub use session::{ClientSession, LinkState};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
