use citywalk::config::{load_settings, save_settings, ClientSettings};
use std::path::PathBuf;
use std::time::Duration;

fn scratch_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("citywalk-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    let path = scratch_file("does-not-exist.toml");
    let settings = load_settings(Some(&path)).unwrap();
    assert_eq!(settings, ClientSettings::default());
}

#[tokio::test]
async fn test_file_overrides_defaults() {
    let path = scratch_file("override.toml");
    std::fs::write(
        &path,
        "[network]\nserver_host = \"play.example.org:9000\"\nsend_interval_ms = 50\n\n[movement]\nwalk_speed = 0.25\n",
    )
    .unwrap();

    let settings = load_settings(Some(&path)).unwrap();
    assert_eq!(settings.network.server_host, "play.example.org:9000");
    assert_eq!(settings.network.send_interval(), Duration::from_millis(50));
    assert_eq!(settings.network.reconnect_delay(), Duration::from_secs(5));
    assert_eq!(settings.movement.walk_speed, 0.25);
    assert_eq!(settings.movement.run_speed, 0.9);
}

#[tokio::test]
async fn test_saved_settings_load_back() {
    let path = scratch_file("roundtrip.toml");
    let mut settings = ClientSettings::default();
    settings.assets.avatar_model = "Robot".to_string();
    settings.animation.fade_seconds = 0.5;
    settings.movement.respawn_position = [10.0, 1.0, -4.0];

    save_settings(&settings, Some(&path)).unwrap();
    let loaded = load_settings(Some(&path)).unwrap();
    assert_eq!(loaded.assets.avatar_model, "Robot");
    assert_eq!(loaded.animation.fade_seconds, 0.5);
    assert_eq!(loaded.movement.respawn_position, [10.0, 1.0, -4.0]);
}
