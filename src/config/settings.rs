use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "CITYWALK";

// =============================================================================
// Client Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// `host[:port]` of the relay server; the socket endpoint is derived from it.
    pub server_host: String,
    pub socket_path: String,
    pub send_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    pub frame_rate_hz: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1:8080".to_string(),
            socket_path: "/ws".to_string(),
            send_interval_ms: 100,
            reconnect_delay_ms: 5000,
            frame_rate_hz: 60,
        }
    }
}

impl NetworkSettings {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate_hz.max(1)))
    }
}

/// Movement constants. Speeds, gravity and the jump impulse are applied once
/// per tick, not scaled by elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub jump_force: f32,
    pub gravity: f32,
    pub ground_height: f32,
    pub respawn_position: [f32; 3],
    pub look_sensitivity: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            walk_speed: 0.5,
            run_speed: 0.9,
            jump_force: 0.3,
            gravity: -0.015,
            ground_height: 1.0,
            respawn_position: [200.0, 1.0, 0.0],
            look_sensitivity: 0.002,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub fade_seconds: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self { fade_seconds: 0.2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory holding avatar manifests (`<name>.json`).
    pub root: PathBuf,
    pub avatar_model: String,
    /// Use the built-in soldier when the avatar manifest does not exist.
    pub builtin_fallback: bool,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("static/models"),
            avatar_model: "Soldier".to_string(),
            builtin_fallback: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub network: NetworkSettings,
    pub movement: MovementSettings,
    pub animation: AnimationSettings,
    pub assets: AssetSettings,
    pub logging: LoggingSettings,
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "citywalk", "citywalk").map(|proj| proj.config_dir().join(CONFIG_FILE))
}

/// Load settings: built-in defaults, then the TOML file (optional), then
/// `CITYWALK__SECTION__KEY` environment overrides.
///
/// With `path == None` the per-user config directory is used.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, ConfigError> {
    let file = path.map(Path::to_path_buf).or_else(config_path);

    let mut builder = Config::builder().add_source(Config::try_from(&ClientSettings::default())?);
    if let Some(file) = file {
        builder = builder.add_source(File::from(file).required(false));
    }
    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

pub fn save_settings(settings: &ClientSettings, path: Option<&Path>) -> std::io::Result<()> {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path, toml)
}
