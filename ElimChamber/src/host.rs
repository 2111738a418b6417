//! Serveur hôte simulé sur la console
//!
//! Les actions sur le mode de jeu et le HUD sont journalisées, et les
//! frames HUD sont écrites sur stdout en JSON.

use async_trait::async_trait;
use ecsession::{GameMode, HUD_ID, HudState, HudSurface, Player};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Mode de jeu qui ne fait que tracer les ordres reçus
#[derive(Debug, Default)]
pub struct ConsoleMode;

#[async_trait]
impl GameMode for ConsoleMode {
    async fn set_script(&self, script: &str) -> anyhow::Result<()> {
        info!(script, "🎮 Mode script selected");
        Ok(())
    }

    async fn set_setting(&self, key: &str, value: i64) -> anyhow::Result<()> {
        info!(key, value, "Mode setting");
        Ok(())
    }

    async fn load_match_settings(&self, path: &Path) -> anyhow::Result<()> {
        info!(path = %path.display(), "Match settings loaded");
        Ok(())
    }

    async fn restart_map(&self) -> anyhow::Result<()> {
        info!("🔄 Map restarted");
        Ok(())
    }

    async fn next_map(&self) -> anyhow::Result<()> {
        info!("⏭️ Next map");
        Ok(())
    }
}

/// Joueurs connectés et rendu du HUD
#[derive(Debug, Default)]
pub struct ConsoleHud {
    players: RwLock<BTreeMap<String, Player>>,
}

impl ConsoleHud {
    pub async fn connect(&self, player: Player) {
        self.players
            .write()
            .await
            .insert(player.login.clone(), player);
    }

    pub async fn disconnect(&self, login: &str) -> Option<Player> {
        self.players.write().await.remove(login)
    }

    fn render(&self, player: &Player, hud: Option<&HudState>) {
        let frame = serde_json::json!({
            "id": HUD_ID,
            "login": player.login,
            "hud": hud,
        });
        println!("{}", frame);
    }
}

#[async_trait]
impl HudSurface for ConsoleHud {
    async fn players(&self) -> Vec<Player> {
        self.players.read().await.values().cloned().collect()
    }

    async fn show(&self, player: &Player, hud: &HudState) {
        debug!(login = %player.login, "HUD shown");
        self.render(player, Some(hud));
    }

    async fn update(&self, player: &Player, hud: &HudState) {
        self.render(player, Some(hud));
    }

    async fn hide(&self, player: &Player) {
        debug!(login = %player.login, "HUD hidden");
        self.render(player, None);
    }
}
