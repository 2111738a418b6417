mod console;
mod host;
mod logs;

use ecconfig::get_config;
use ecmaps::{FsMapStorage, MapPipeline};
use ecsession::{EliminationSession, SessionConfig};
use ectmx::TmxClient;
use host::{ConsoleHud, ConsoleMode};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Configuration et logs ==========
    let config = get_config();
    let log_control = logs::init_logging(&config);
    info!("⚙️ Configuration loaded from {}", config.dir());

    // ========== PHASE 2 : Pipeline de maps ==========
    let client = TmxClient::from_config(&config)?;
    info!("📡 Map exchange at {}", client.base_url());

    // Le répertoire des maps est fixé pour toute la durée du processus
    let maps_dir = SessionConfig::from_config(&config)?.maps_storage_path;
    let storage = Arc::new(FsMapStorage::new(&maps_dir));
    let pipeline = Arc::new(MapPipeline::new(Arc::new(client), storage));
    info!("🗺️ Maps stored in {}", maps_dir.display());

    // ========== PHASE 3 : Session ==========
    let hud = Arc::new(ConsoleHud::default());
    let session = EliminationSession::new(
        pipeline,
        Arc::new(ConsoleMode),
        hud.clone(),
        config.clone(),
    );

    info!("✅ ElimChamber is ready! Type /ec for help.");
    info!("Press Ctrl+C to stop...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => console::dispatch(&session, &hud, &log_control, &line).await,
                None => break,
            },
            _ = signal::ctrl_c() => {
                info!("Ctrl+C received");
                break;
            }
        }
    }

    session.stop().await;
    info!("👋 ElimChamber stopped");
    Ok(())
}
