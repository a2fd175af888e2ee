use anyhow::Context;
use citywalk::assets::load_local_avatar;
use citywalk::networking::transport::{endpoint_url, WsConnector};
use citywalk::utils::logging::{init_logging, log_system_info};
use citywalk::world::InputEvent;
use citywalk::{load_settings, ClientApp, ClientSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = load_settings(config_path.as_deref()).context("Failed to load settings")?;
    init_logging(&settings.logging).context("Failed to initialize logging")?;
    info!("Starting {} v{}", citywalk::APP_NAME, citywalk::VERSION);
    log_system_info();

    let (loader, model) = load_local_avatar(&settings.assets)
        .await
        .with_context(|| format!("Error loading player model '{}'", settings.assets.avatar_model))?;

    let endpoint = endpoint_url(&settings.network.server_host, &settings.network.socket_path)?;
    let session = ClientSession::new(settings, model).context("Failed to set up local avatar")?;

    // Commands on stdin: `down KeyW`, `up ShiftLeft`, `look 12.5`.
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match InputEvent::parse_command(&line) {
                Some(event) => {
                    if input_tx.send(event).is_err() {
                        break;
                    }
                }
                None => warn!("Unrecognized command: {}", line.trim()),
            }
        }
    });

    let mut app = ClientApp::new(session, Arc::new(WsConnector), loader, endpoint).with_inputs(input_rx);
    app.run_until(tokio::signal::ctrl_c()).await?;
    info!("Shutting down");
    Ok(())
}
