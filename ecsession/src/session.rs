//! Cycle de vie d'une session d'élimination
//!
//! ```text
//!            start (ok)
//!   Inactive ──────────► Active
//!      ▲                   │
//!      └───────────────────┘
//!              stop
//! ```
//!
//! Un `start` qui échoue laisse la session inactive. Les callbacks de l'hôte
//! ne font rien tant que la session n'est pas active.

use crate::config::{ConfigSource, SessionConfig};
use crate::error::{Result, SessionError};
use crate::host::{GameMode, HudSurface, Player};
use crate::state::{PlayerState, PlayerStatus, SessionState, SessionStatus};
use ecmaps::{LocalMap, MapPipeline, ResolveGuard};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Maps demandées à l'échange au démarrage
pub const INITIAL_QUEUE_TARGET: usize = 20;
/// En dessous de ce nombre de maps en file, un début de map relance une recherche
pub const LOW_WATER_MARK: usize = 5;
/// Maps demandées lors d'une recharge en cours de session
pub const REFILL_BATCH: usize = 10;

pub const MIN_LIVES: u32 = 1;
pub const MAX_LIVES: u32 = 10;

/// Événements émis par le serveur hôte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    BeginMap,
    EndMap,
    PlayerConnect(Player),
    PlayerDisconnect(Player),
}

/// Ticket d'une session : valide tant qu'aucun `stop` n'a eu lieu depuis
/// sa création
struct SessionTicket {
    state: Arc<RwLock<SessionState>>,
    epoch: u64,
}

impl ResolveGuard for SessionTicket {
    fn is_current(&self) -> bool {
        self.state
            .read()
            .map(|state| state.epoch == self.epoch)
            .unwrap_or(false)
    }
}

/// Le contrôleur d'une session "dernier survivant"
///
/// La session ne compte ni les vies ni les éliminations : c'est le travail
/// du mode scripté. Elle garde la file de maps approvisionnée, ajoute une
/// map à la playlist à chaque fin de map et pilote le HUD.
pub struct EliminationSession {
    pipeline: Arc<MapPipeline>,
    mode: Arc<dyn GameMode>,
    hud: Arc<dyn HudSurface>,
    config: Arc<dyn ConfigSource>,
    state: Arc<RwLock<SessionState>>,
    next_lives: Mutex<Option<u32>>,
    starting: tokio::sync::Mutex<()>,
}

impl EliminationSession {
    pub fn new(
        pipeline: Arc<MapPipeline>,
        mode: Arc<dyn GameMode>,
        hud: Arc<dyn HudSurface>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            pipeline,
            mode,
            hud,
            config,
            state: Arc::new(RwLock::new(SessionState::default())),
            next_lives: Mutex::new(None),
            starting: tokio::sync::Mutex::new(()),
        }
    }

    /// La file de maps partagée
    pub fn pipeline(&self) -> &Arc<MapPipeline> {
        &self.pipeline
    }

    pub fn is_active(&self) -> bool {
        self.state.read().map(|s| s.active).unwrap_or(false)
    }

    /// Vies imposées au prochain démarrage sans valeur explicite
    pub fn next_lives(&self) -> Option<u32> {
        self.next_lives.lock().ok().and_then(|lives| *lives)
    }

    /// Mémorise les vies du prochain démarrage
    pub fn set_next_lives(&self, lives: u32) -> Result<u32> {
        check_lives(lives)?;
        if let Ok(mut next) = self.next_lives.lock() {
            *next = Some(lives);
        }
        info!(lives, "Lives set for next session");
        Ok(lives)
    }

    // ========================================================================
    // Start / Stop
    // ========================================================================

    /// Démarre une session
    ///
    /// Les vies viennent, dans l'ordre : de `lives`, de
    /// [`set_next_lives`](Self::set_next_lives), puis de la configuration.
    /// Seules les deux premières sources sont bornées à 1..=10.
    /// Tout échec laisse la session inactive ; les maps déjà mises en file
    /// par la recherche initiale y restent.
    pub async fn start(&self, lives: Option<u32>) -> Result<()> {
        let _starting = self.starting.lock().await;

        let epoch = {
            let state = self.read_state()?;
            if state.active {
                warn!("Session start refused: already active");
                return Err(SessionError::AlreadyActive);
            }
            state.epoch
        };

        let config = self
            .config
            .snapshot()
            .map_err(|e| SessionError::Config(e.to_string()))?;
        let lives = match lives.or_else(|| self.next_lives()) {
            Some(lives) => {
                check_lives(lives)?;
                lives
            }
            None => config.lives_start,
        };

        info!(lives, "🏁 Starting elimination session");

        if let Err(e) = self
            .pipeline
            .refill(&config.search_filters, INITIAL_QUEUE_TARGET)
            .await
        {
            error!(error = %e, "Session start aborted: map search failed");
            return Err(SessionError::RefillFailed(e.to_string()));
        }

        let ticket = SessionTicket {
            state: self.state.clone(),
            epoch,
        };
        let first = match self.pipeline.resolve_next(&config.playlist(), &ticket).await {
            Ok(first) => first,
            Err(reason) => {
                error!(%reason, "Session start aborted: no playable map");
                return Err(SessionError::NoPlayableMap(reason));
            }
        };

        self.configure_mode(&config, lives).await.map_err(|e| {
            error!(error = %e, "Session start aborted: game mode setup failed");
            SessionError::Mode(e.to_string())
        })?;

        let players = self.hud.players().await;
        {
            let mut state = self.write_state()?;
            state.active = true;
            state.lives = lives;
            state.config = Some(Arc::new(config));
            state.player_states = players
                .iter()
                .map(|p| (p.login.clone(), alive(lives)))
                .collect();
        }
        if let Ok(mut next) = self.next_lives.lock() {
            *next = None;
        }

        for player in &players {
            let hud = self.read_state()?.hud_for(&player.login);
            self.hud.show(player, &hud).await;
        }

        info!(
            lives,
            first_map = %first.display_name,
            players = players.len(),
            "✅ Elimination session started"
        );
        Ok(())
    }

    async fn configure_mode(&self, config: &SessionConfig, lives: u32) -> anyhow::Result<()> {
        self.mode.set_script(&config.mode_script).await?;
        for (key, value) in config.mode_settings(lives) {
            self.mode.set_setting(key, value).await?;
        }
        self.mode.load_match_settings(&config.playlist_path).await?;
        self.mode.restart_map().await?;
        Ok(())
    }

    /// Arrête la session ; sans effet si elle n'est pas active
    ///
    /// L'époque est incrémentée sous le verrou d'ajout du pipeline : une
    /// résolution encore en cours n'écrira pas dans la playlist.
    pub async fn stop(&self) {
        let stopped = self
            .pipeline
            .fence(|| {
                let Ok(mut state) = self.state.write() else {
                    error!("Session state lock poisoned");
                    return false;
                };
                if !state.active {
                    return false;
                }
                state.active = false;
                state.epoch += 1;
                state.config = None;
                state.player_states.clear();
                true
            })
            .await;
        if !stopped {
            debug!("Stop ignored: no active session");
            return;
        }

        for player in self.hud.players().await {
            self.hud.hide(&player).await;
        }
        self.pipeline.clear_queue().await;

        info!("🛑 Elimination session stopped");
    }

    // ========================================================================
    // Host callbacks
    // ========================================================================

    /// Dispatch an event from the host server
    pub async fn handle(&self, event: HostEvent) {
        match event {
            HostEvent::BeginMap => self.on_map_begin().await,
            HostEvent::EndMap => {
                self.on_map_end().await;
            }
            HostEvent::PlayerConnect(player) => self.on_player_join(&player).await,
            HostEvent::PlayerDisconnect(player) => self.on_player_leave(&player.login),
        }
    }

    /// Rafraîchit le HUD et recharge la file si elle passe sous le seuil
    pub async fn on_map_begin(&self) {
        let Some((config, _)) = self.active_ticket() else {
            return;
        };

        for player in self.hud.players().await {
            let hud = match self.read_state() {
                Ok(state) => state.hud_for(&player.login),
                Err(_) => return,
            };
            self.hud.update(&player, &hud).await;
        }

        let queued = self.pipeline.queue_size().await;
        if queued < LOW_WATER_MARK {
            debug!(queued, "Map queue low, refilling");
            if let Err(e) = self
                .pipeline
                .refill(&config.search_filters, REFILL_BATCH)
                .await
            {
                warn!(error = %e, "Could not refill map queue");
            }
        }
    }

    /// Prépare la map suivante
    ///
    /// Retourne la map ajoutée à la playlist, ou `None` si aucune n'a pu
    /// l'être (la raison est journalisée).
    pub async fn on_map_end(&self) -> Option<LocalMap> {
        let (config, ticket) = self.active_ticket()?;
        self.stage_next(&config, &ticket).await
    }

    /// Prépare une map puis demande au serveur de passer à la suivante
    pub async fn force_next(&self) -> Result<()> {
        let Some((config, ticket)) = self.active_ticket() else {
            return Err(SessionError::NotActive);
        };

        self.stage_next(&config, &ticket).await;
        self.mode.next_map().await.map_err(|e| {
            error!(error = %e, "Skip to next map failed");
            SessionError::Mode(e.to_string())
        })?;
        info!("⏭️ Forced next map");
        Ok(())
    }

    async fn stage_next(&self, config: &SessionConfig, ticket: &SessionTicket) -> Option<LocalMap> {
        match self.pipeline.resolve_next(&config.playlist(), ticket).await {
            Ok(map) => {
                info!(map = %map.display_name, "Next map ready");
                Some(map)
            }
            Err(reason) => {
                warn!(%reason, "No map added to the playlist");
                None
            }
        }
    }

    pub async fn on_player_join(&self, player: &Player) {
        let hud = {
            let Ok(mut state) = self.state.write() else {
                return;
            };
            if !state.active {
                return;
            }
            let lives = state.lives;
            state
                .player_states
                .entry(player.login.clone())
                .or_insert_with(|| alive(lives));
            state.hud_for(&player.login)
        };

        debug!(login = %player.login, "Player joined session");
        self.hud.show(player, &hud).await;
    }

    pub fn on_player_leave(&self, login: &str) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        if !state.active {
            return;
        }
        if state.player_states.remove(login).is_some() {
            debug!(login, "Player left session");
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub async fn status(&self) -> SessionStatus {
        let queued = self.pipeline.queued().await;
        let (active, lives, player_states): (bool, u32, BTreeMap<String, PlayerState>) =
            match self.state.read() {
                Ok(state) => (
                    state.active,
                    state.lives,
                    state
                        .player_states
                        .iter()
                        .map(|(login, s)| (login.clone(), s.clone()))
                        .collect(),
                ),
                Err(_) => (false, 0, BTreeMap::new()),
            };

        SessionStatus {
            active,
            lives,
            queue_size: queued.len(),
            queued,
            player_states,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn active_ticket(&self) -> Option<(Arc<SessionConfig>, SessionTicket)> {
        let state = self.state.read().ok()?;
        if !state.active {
            return None;
        }
        let config = state.config.clone()?;
        Some((
            config,
            SessionTicket {
                state: self.state.clone(),
                epoch: state.epoch,
            },
        ))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, SessionState>> {
        self.state
            .read()
            .map_err(|_| SessionError::Poisoned)
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, SessionState>> {
        self.state
            .write()
            .map_err(|_| SessionError::Poisoned)
    }
}

fn alive(lives: u32) -> PlayerState {
    PlayerState {
        lives,
        status: PlayerStatus::Alive,
    }
}

fn check_lives(lives: u32) -> Result<()> {
    if (MIN_LIVES..=MAX_LIVES).contains(&lives) {
        Ok(())
    } else {
        Err(SessionError::InvalidLives {
            got: lives,
            min: MIN_LIVES,
            max: MAX_LIVES,
        })
    }
}

impl std::fmt::Debug for EliminationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EliminationSession")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
