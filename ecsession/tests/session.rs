use anyhow::anyhow;
use async_trait::async_trait;
use ecmaps::{FsMapStorage, MapPipeline, Unavailable};
use ecsession::{
    Command, EliminationSession, GameMode, HostEvent, HudState, HudSurface, Player,
    PlayerStatus, SessionConfig, SessionError, operator,
};
use ectmx::{Error as TmxError, MapDescriptor, MapExchange, SearchFilters};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

/// Échange qui invente des ids neufs à chaque recherche
#[derive(Default)]
struct FakeExchange {
    next_id: AtomicU64,
    /// Nombre maximal de résultats par recherche
    cap: Mutex<Option<usize>>,
    search_fails: AtomicBool,
    failing_downloads: Mutex<HashSet<u64>>,
    hold_downloads: AtomicBool,
    download_started: Notify,
    release: Notify,
    searches: AtomicUsize,
    downloads: AtomicUsize,
}

#[async_trait]
impl MapExchange for FakeExchange {
    async fn search(
        &self,
        _filters: &SearchFilters,
        desired_count: usize,
    ) -> ectmx::Result<Vec<MapDescriptor>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.search_fails.load(Ordering::SeqCst) {
            return Err(TmxError::remote_unavailable("offline"));
        }
        let count = match *self.cap.lock().unwrap() {
            Some(cap) => desired_count.min(cap),
            None => desired_count,
        };
        Ok((0..count)
            .map(|_| {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                MapDescriptor::new(id, format!("Map {}", id), "mapper")
            })
            .collect())
    }

    async fn download(&self, external_id: u64) -> ectmx::Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.hold_downloads.load(Ordering::SeqCst) {
            self.download_started.notify_one();
            self.release.notified().await;
        }
        if self.failing_downloads.lock().unwrap().contains(&external_id) {
            return Err(TmxError::remote_unavailable("HTTP 500"));
        }
        Ok(format!("GBX-{}", external_id).into_bytes())
    }
}

#[derive(Default)]
struct RecordingMode {
    calls: Mutex<Vec<String>>,
    fail_script: AtomicBool,
}

impl RecordingMode {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GameMode for RecordingMode {
    async fn set_script(&self, script: &str) -> anyhow::Result<()> {
        if self.fail_script.load(Ordering::SeqCst) {
            return Err(anyhow!("script not found"));
        }
        self.record(format!("script {}", script));
        Ok(())
    }

    async fn set_setting(&self, key: &str, value: i64) -> anyhow::Result<()> {
        self.record(format!("{}={}", key, value));
        Ok(())
    }

    async fn load_match_settings(&self, path: &Path) -> anyhow::Result<()> {
        self.record(format!("load {}", path.file_name().unwrap().to_string_lossy()));
        Ok(())
    }

    async fn restart_map(&self) -> anyhow::Result<()> {
        self.record("restart".into());
        Ok(())
    }

    async fn next_map(&self) -> anyhow::Result<()> {
        self.record("next".into());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHud {
    players: Mutex<Vec<Player>>,
    shown: Mutex<Vec<(String, HudState)>>,
    updated: Mutex<Vec<String>>,
    hidden: Mutex<Vec<String>>,
}

#[async_trait]
impl HudSurface for RecordingHud {
    async fn players(&self) -> Vec<Player> {
        self.players.lock().unwrap().clone()
    }

    async fn show(&self, player: &Player, hud: &HudState) {
        self.shown
            .lock()
            .unwrap()
            .push((player.login.clone(), hud.clone()));
    }

    async fn update(&self, player: &Player, _hud: &HudState) {
        self.updated.lock().unwrap().push(player.login.clone());
    }

    async fn hide(&self, player: &Player) {
        self.hidden.lock().unwrap().push(player.login.clone());
    }
}

struct Harness {
    _dir: TempDir,
    config: SessionConfig,
    exchange: Arc<FakeExchange>,
    mode: Arc<RecordingMode>,
    hud: Arc<RecordingHud>,
    session: Arc<EliminationSession>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut SessionConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SessionConfig {
            lives_start: 3,
            skip_threshold_percent: 51,
            round_timeout_sec: 300,
            winners_count: 1,
            search_filters: SearchFilters::default(),
            maps_storage_path: dir.path().join("Maps"),
            playlist_path: dir.path().join("MatchSettings/EliminationChamber.txt"),
            mode_script: "EliminationChamber.Script.txt".into(),
        };
        adjust(&mut config);

        let exchange = Arc::new(FakeExchange::default());
        let mode = Arc::new(RecordingMode::default());
        let hud = Arc::new(RecordingHud::default());
        *hud.players.lock().unwrap() = vec![
            Player::new("alice", "Alice"),
            Player::new("bob", "Bob"),
        ];

        let storage = Arc::new(FsMapStorage::new(&config.maps_storage_path));
        let pipeline = Arc::new(MapPipeline::new(exchange.clone(), storage));
        let session = Arc::new(EliminationSession::new(
            pipeline,
            mode.clone(),
            hud.clone(),
            Arc::new(config.clone()),
        ));

        Self {
            _dir: dir,
            config,
            exchange,
            mode,
            hud,
            session,
        }
    }

    async fn playlist(&self) -> Vec<String> {
        self.config.playlist().entries().await.unwrap()
    }

    /// Ligne de playlist attendue pour la map `id`
    fn entry(&self, id: u64) -> String {
        self.config
            .maps_storage_path
            .join(format!("{}.Map.Gbx", id))
            .to_string_lossy()
            .to_string()
    }

    fn searches(&self) -> usize {
        self.exchange.searches.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn start_configures_mode_and_shows_hud() {
    let h = Harness::new();

    h.session.start(None).await.unwrap();

    assert_eq!(
        h.mode.calls(),
        vec![
            "script EliminationChamber.Script.txt",
            "S_LivesStart=3",
            "S_SkipThresholdPercent=51",
            "S_RoundTimeoutSec=300",
            "S_WinnersCount=1",
            "load EliminationChamber.txt",
            "restart",
        ]
    );
    assert_eq!(h.playlist().await, vec![h.entry(1)]);

    let status = h.session.status().await;
    assert!(status.active);
    assert_eq!(status.lives, 3);
    assert_eq!(status.queue_size, 19);
    assert_eq!(status.queued.len(), 19);
    assert_eq!(status.player_states.len(), 2);
    assert_eq!(status.player_states["alice"].status, PlayerStatus::Alive);

    let shown = h.hud.shown.lock().unwrap().clone();
    assert_eq!(shown.len(), 2);
    assert!(shown.iter().all(|(_, hud)| hud.lives == 3));
}

#[tokio::test]
async fn lives_come_from_override_then_next_lives_then_config() {
    let h = Harness::new();

    h.session.set_next_lives(6).unwrap();
    h.session.start(None).await.unwrap();
    assert!(h.mode.calls().contains(&"S_LivesStart=6".to_string()));
    assert_eq!(h.session.next_lives(), None);
    h.session.stop().await;

    h.session.set_next_lives(6).unwrap();
    h.session.start(Some(2)).await.unwrap();
    assert_eq!(h.session.status().await.lives, 2);
    h.session.stop().await;

    h.session.start(None).await.unwrap();
    assert_eq!(h.session.status().await.lives, 3);
}

#[tokio::test]
async fn configured_lives_are_used_as_is() {
    let h = Harness::with_config(|config| config.lives_start = 15);

    h.session.start(None).await.unwrap();

    assert!(h.session.is_active());
    assert_eq!(h.session.status().await.lives, 15);
    assert!(h.mode.calls().contains(&"S_LivesStart=15".to_string()));
}

#[tokio::test]
async fn invalid_lives_are_rejected() {
    let h = Harness::new();

    assert!(matches!(
        h.session.set_next_lives(11),
        Err(SessionError::InvalidLives { got: 11, .. })
    ));
    assert!(matches!(
        h.session.start(Some(0)).await,
        Err(SessionError::InvalidLives { got: 0, .. })
    ));
    assert!(!h.session.is_active());
    assert_eq!(h.searches(), 0);
}

#[tokio::test]
async fn second_start_is_refused() {
    let h = Harness::new();
    h.session.start(None).await.unwrap();

    assert_eq!(h.session.start(None).await, Err(SessionError::AlreadyActive));
    assert_eq!(h.searches(), 1);
}

#[tokio::test]
async fn start_aborts_when_search_fails() {
    let h = Harness::new();
    h.exchange.search_fails.store(true, Ordering::SeqCst);

    let result = h.session.start(None).await;

    assert!(matches!(result, Err(SessionError::RefillFailed(_))));
    assert!(!h.session.is_active());
    assert!(h.mode.calls().is_empty());
    assert!(h.hud.shown.lock().unwrap().is_empty());
}

#[tokio::test]
async fn start_aborts_when_search_finds_nothing() {
    let h = Harness::new();
    *h.exchange.cap.lock().unwrap() = Some(0);

    let result = h.session.start(None).await;

    assert_eq!(
        result,
        Err(SessionError::NoPlayableMap(Unavailable::QueueEmpty))
    );
    assert!(!h.session.is_active());
}

#[tokio::test]
async fn failed_first_download_keeps_partial_queue() {
    let h = Harness::new();
    h.exchange.failing_downloads.lock().unwrap().insert(1);

    let result = h.session.start(None).await;

    assert_eq!(
        result,
        Err(SessionError::NoPlayableMap(Unavailable::DownloadFailed(1)))
    );
    assert!(!h.session.is_active());
    assert_eq!(h.session.status().await.queue_size, 19);
    assert!(h.playlist().await.is_empty());
}

#[tokio::test]
async fn start_aborts_when_mode_rejects_script() {
    let h = Harness::new();
    h.mode.fail_script.store(true, Ordering::SeqCst);

    let result = h.session.start(None).await;

    assert!(matches!(result, Err(SessionError::Mode(_))));
    assert!(!h.session.is_active());
}

#[tokio::test]
async fn stop_is_idempotent_and_clears_queue() {
    let h = Harness::new();

    h.session.stop().await;
    assert!(h.hud.hidden.lock().unwrap().is_empty());

    h.session.start(None).await.unwrap();
    h.session.stop().await;
    h.session.stop().await;

    let status = h.session.status().await;
    assert!(!status.active);
    assert_eq!(status.queue_size, 0);
    assert!(status.player_states.is_empty());
    assert_eq!(*h.hud.hidden.lock().unwrap(), vec!["alice", "bob"]);
}

#[tokio::test]
async fn callbacks_do_nothing_while_inactive() {
    let h = Harness::new();

    h.session.on_map_begin().await;
    assert!(h.session.on_map_end().await.is_none());
    h.session.on_player_join(&Player::new("carol", "Carol")).await;
    h.session.on_player_leave("alice");

    assert_eq!(h.session.force_next().await, Err(SessionError::NotActive));
    assert_eq!(h.searches(), 0);
    assert!(h.hud.shown.lock().unwrap().is_empty());
    assert!(h.hud.updated.lock().unwrap().is_empty());
    assert!(h.mode.calls().is_empty());
}

#[tokio::test]
async fn map_end_appends_next_map() {
    let h = Harness::new();
    h.session.start(None).await.unwrap();

    let staged = h.session.on_map_end().await.unwrap();
    h.session.handle(HostEvent::EndMap).await;

    assert_eq!(staged.filename, "2.Map.Gbx");
    assert_eq!(
        h.playlist().await,
        vec![h.entry(1), h.entry(2), h.entry(3)]
    );
    assert_eq!(h.session.status().await.queue_size, 17);
}

#[tokio::test]
async fn map_begin_refills_below_low_water_mark() {
    let h = Harness::new();
    h.session.start(None).await.unwrap();

    // 19 queued: no refill
    h.session.on_map_begin().await;
    assert_eq!(h.searches(), 1);
    assert_eq!(h.hud.updated.lock().unwrap().len(), 2);

    for _ in 0..14 {
        h.session.on_map_end().await.unwrap();
    }
    // 5 queued: still no refill
    h.session.handle(HostEvent::BeginMap).await;
    assert_eq!(h.searches(), 1);

    h.session.on_map_end().await.unwrap();
    h.session.on_map_begin().await;
    assert_eq!(h.searches(), 2);
    assert_eq!(h.session.status().await.queue_size, 14);
}

#[tokio::test]
async fn refill_failure_keeps_session_running() {
    let h = Harness::new();
    *h.exchange.cap.lock().unwrap() = Some(2);
    h.session.start(None).await.unwrap();

    h.exchange.search_fails.store(true, Ordering::SeqCst);
    h.session.on_map_begin().await;

    assert!(h.session.is_active());
    assert_eq!(h.searches(), 2);
    assert_eq!(h.session.status().await.queue_size, 1);
}

#[tokio::test]
async fn empty_queue_at_map_end_is_not_fatal() {
    let h = Harness::new();
    *h.exchange.cap.lock().unwrap() = Some(1);
    h.session.start(None).await.unwrap();

    assert!(h.session.on_map_end().await.is_none());
    assert!(h.session.is_active());
    assert_eq!(h.playlist().await.len(), 1);
}

#[tokio::test]
async fn players_joining_and_leaving() {
    let h = Harness::new();
    h.session.start(Some(5)).await.unwrap();

    let carol = Player::new("carol", "Carol");
    h.session.handle(HostEvent::PlayerConnect(carol.clone())).await;

    let status = h.session.status().await;
    assert_eq!(status.player_states["carol"].lives, 5);
    let shown = h.hud.shown.lock().unwrap().clone();
    assert_eq!(shown.last().unwrap().0, "carol");
    assert_eq!(shown.last().unwrap().1.status, PlayerStatus::Alive);

    h.session.handle(HostEvent::PlayerDisconnect(carol)).await;
    h.session.on_player_leave("nobody");
    let status = h.session.status().await;
    assert!(!status.player_states.contains_key("carol"));
    assert_eq!(status.player_states.len(), 2);
}

#[tokio::test]
async fn force_next_stages_a_map_and_skips() {
    let h = Harness::new();
    h.session.start(None).await.unwrap();

    h.session.force_next().await.unwrap();

    assert_eq!(h.mode.calls().last().unwrap(), "next");
    assert_eq!(h.playlist().await.len(), 2);
}

#[tokio::test]
async fn resolution_finishing_after_stop_is_discarded() {
    let h = Harness::new();
    h.session.start(None).await.unwrap();

    h.exchange.hold_downloads.store(true, Ordering::SeqCst);
    let session = h.session.clone();
    let pending = tokio::spawn(async move { session.on_map_end().await });

    h.exchange.download_started.notified().await;
    h.session.stop().await;
    h.exchange.release.notify_one();

    assert!(pending.await.unwrap().is_none());
    assert_eq!(h.playlist().await, vec![h.entry(1)]);
}

#[tokio::test]
async fn status_serializes_for_operators() {
    let h = Harness::new();
    *h.exchange.cap.lock().unwrap() = Some(2);
    h.session.start(None).await.unwrap();

    let json = serde_json::to_value(h.session.status().await).unwrap();
    assert_eq!(json["active"], true);
    assert_eq!(json["queueSize"], 1);
    assert_eq!(json["queued"][0]["externalId"], 2);
    assert_eq!(json["playerStates"]["bob"]["status"], "ALIVE");
}

// ============================================================================
// Chat commands
// ============================================================================

async fn run(h: &Harness, line: &str) -> ecsession::Reply {
    let caller = Player::new("admin", "Admin");
    let command = Command::parse(line).unwrap();
    operator::execute(&h.session, &caller, command).await
}

#[tokio::test]
async fn operator_start_status_and_stop() {
    let h = Harness::new();

    let skip = run(&h, "/skip").await;
    assert_eq!(skip.to_caller, vec!["No EliminationChamber session is active."]);

    let started = run(&h, "/ec start 4").await;
    assert_eq!(started.to_caller, vec!["EliminationChamber session started!"]);
    assert_eq!(
        started.to_all,
        vec!["EliminationChamber session started by Admin!"]
    );
    assert_eq!(h.session.status().await.lives, 4);

    let status = run(&h, "/ec status").await;
    assert_eq!(
        status.to_caller,
        vec!["Session Active: Yes", "Maps in Queue: 19"]
    );

    let again = run(&h, "/ec start").await;
    assert_eq!(
        again.to_caller,
        vec!["An EliminationChamber session is already running."]
    );

    let next = run(&h, "/ec next").await;
    assert_eq!(next.to_all, vec!["Map skipped by Admin."]);

    let stopped = run(&h, "/ec stop").await;
    assert_eq!(stopped.to_caller, vec!["EliminationChamber session stopped."]);
    assert!(!h.session.is_active());
}

#[tokio::test]
async fn operator_lives_and_help() {
    let h = Harness::new();

    let usage = run(&h, "/ec lives").await;
    assert_eq!(usage.to_caller, vec!["Usage: /ec lives <number>"]);

    let out_of_range = run(&h, "/ec lives 12").await;
    assert_eq!(out_of_range.to_caller, vec!["Lives must be between 1 and 10."]);
    assert_eq!(h.session.next_lives(), None);

    let set = run(&h, "/ec lives 8").await;
    assert_eq!(
        set.to_caller,
        vec!["Lives setting changed to 8 (takes effect next session)."]
    );
    assert_eq!(h.session.next_lives(), Some(8));

    let next = run(&h, "/ec next").await;
    assert_eq!(next.to_caller, vec!["No session is active."]);

    let help = run(&h, "/ec").await;
    assert_eq!(help.to_caller.len(), 6);
    assert_eq!(run(&h, "/ec what").await, help);
}

#[tokio::test]
async fn operator_reports_failed_start() {
    let h = Harness::new();
    h.exchange.search_fails.store(true, Ordering::SeqCst);

    let reply = run(&h, "/ec start").await;
    assert_eq!(
        reply.to_caller,
        vec!["Failed to start session. Check logs for details."]
    );
    assert!(reply.to_all.is_empty());
}
