//! 플레이 세션 통합 테스트.
//!
//! 프로세스 감지 → 레지스트리 → 종료 처리 → SQLite 기록/세이브 백업까지 전체 흐름.

use async_trait::async_trait;
use playtrack_core::error::CoreError;
use playtrack_core::event_bus::{EventBus, MonitorEvent};
use playtrack_core::models::game::{GameEntry, LauncherMode, LauncherSettings, MonitorMode, MonitorTarget};
use playtrack_core::models::process::{ProcessEntry, ProcessEvent, ProcessEventType};
use playtrack_core::ports::integration::{DisplayScaler, ShellIntegration};
use playtrack_core::ports::process::{ProcessSnapshotProvider, ProcessTerminator};
use playtrack_core::ports::storage::GameRepository;
use playtrack_monitor::game_monitor::{MonitorContext, MonitorSettings};
use playtrack_monitor::hook_bridge::HookBridge;
use playtrack_monitor::poller::PollingFallback;
use playtrack_monitor::registry::MonitorRegistry;
use playtrack_monitor::snapshot_hook::SnapshotDiffHook;
use playtrack_storage::backup::FsSaveBackup;
use playtrack_storage::sqlite::SqliteGameStore;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, watch};

#[derive(Default)]
struct ScriptedSnapshot(Mutex<Vec<ProcessEntry>>);

impl ScriptedSnapshot {
    fn set(&self, entries: Vec<ProcessEntry>) {
        *self.0.lock().unwrap() = entries;
    }
}

#[async_trait]
impl ProcessSnapshotProvider for ScriptedSnapshot {
    async fn list(&self) -> Result<Vec<ProcessEntry>, CoreError> {
        Ok(self.0.lock().unwrap().clone())
    }
}

struct NoopTerminator;

#[async_trait]
impl ProcessTerminator for NoopTerminator {
    async fn kill_by_path(&self, path: &str) -> Result<usize, CoreError> {
        Err(CoreError::ProcessNotFound(path.to_string()))
    }

    async fn kill_by_name(&self, name: &str) -> Result<usize, CoreError> {
        Err(CoreError::ProcessNotFound(name.to_string()))
    }
}

#[derive(Default)]
struct CountingShell {
    refreshes: AtomicU32,
}

#[async_trait]
impl ShellIntegration for CountingShell {
    async fn focus_main_window(&self, _game_id: &str) -> Result<(), CoreError> {
        Ok(())
    }

    async fn refresh_recent_games(&self) -> Result<(), CoreError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct NoScaler;

#[async_trait]
impl DisplayScaler for NoScaler {
    async fn scale(&self, _game_id: &str) -> Result<bool, CoreError> {
        Ok(false)
    }
}

fn game_exe(name: &str, pid: u32, path: &str) -> ProcessEntry {
    ProcessEntry {
        name: name.to_string(),
        pid,
        executable_path: Some(path.to_string()),
        command_line: Some(format!("\"{path}\"")),
    }
}

struct World {
    temp: TempDir,
    store: Arc<SqliteGameStore>,
    snapshot: Arc<ScriptedSnapshot>,
    shell: Arc<CountingShell>,
    registry: Arc<MonitorRegistry>,
    events: EventBus,
}

impl World {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteGameStore::open(&temp.path().join("playtrack.db")).unwrap());
        let snapshot = Arc::new(ScriptedSnapshot::default());
        let shell = Arc::new(CountingShell::default());
        let events = EventBus::new(128);

        let ctx = MonitorContext {
            snapshot: snapshot.clone(),
            terminator: Arc::new(NoopTerminator),
            repository: store.clone(),
            shell: shell.clone(),
            backup: Arc::new(FsSaveBackup::new(temp.path().join("backups"), 3)),
            scaler: Arc::new(NoScaler),
            events: events.clone(),
            settings: MonitorSettings {
                check_interval: Duration::from_millis(20),
                ..MonitorSettings::default()
            },
        };

        Self {
            registry: Arc::new(MonitorRegistry::new(ctx)),
            temp,
            store,
            snapshot,
            shell,
            events,
        }
    }

    fn add_game(&self, id: &str, target: MonitorTarget, save_paths: Vec<String>) {
        self.store
            .upsert_game(&GameEntry {
                id: id.to_string(),
                launcher: LauncherSettings::with_target(LauncherMode::File, target),
                save_paths,
            })
            .unwrap();
    }

    fn save_dir(&self) -> String {
        let dir = self.temp.path().join("Saved");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("slot.sav"), b"save").unwrap();
        dir.display().to_string()
    }
}

async fn wait_for_stop(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut seen = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let event = rx.recv().await.unwrap();
            let done = matches!(event, MonitorEvent::GameStopped { .. });
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "game:stopped 이벤트를 받지 못함: {seen:?}");
    seen
}

#[tokio::test]
async fn hook_events_record_session_and_backup() {
    let world = World::new();
    let saves = world.save_dir();
    world.add_game(
        "foo",
        MonitorTarget::new(MonitorMode::Folder, "D:/Games/Foo"),
        vec![saves],
    );
    let mut rx = world.events.subscribe();

    let creation = ProcessEvent {
        id: "foo".to_string(),
        event_type: ProcessEventType::Creation,
        full_path: "d:/games/foo/foo.exe".to_string(),
        pid: 42,
    };
    world.registry.handle_process_event(creation.clone()).await;
    world.registry.handle_process_event(creation).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    world
        .registry
        .handle_process_event(ProcessEvent {
            id: "foo".to_string(),
            event_type: ProcessEventType::Termination,
            full_path: "d:/games/foo/foo.exe".to_string(),
            pid: 42,
        })
        .await;

    let seen = wait_for_stop(&mut rx).await;
    let channels: Vec<&str> = seen
        .iter()
        .map(|e| e.channel())
        .filter(|c| *c != "monitor:timer-status-change")
        .collect();
    assert_eq!(
        channels,
        vec!["game:started", "game:launched", "game:exiting", "game:exited", "game:stopped"]
    );
    assert!(seen.contains(&MonitorEvent::GameLaunched {
        game_id: "foo".to_string(),
        source: "nativeMonitor".to_string(),
    }));

    let record = world.store.game_record("foo").await.unwrap();
    assert_eq!(record.timers.len(), 1);
    assert!(record.play_time_ms >= 30);
    assert!(record.last_run_date.is_some());
    assert_eq!(world.shell.refreshes.load(Ordering::SeqCst), 1);

    let backups = FsSaveBackup::new(world.temp.path().join("backups"), 3)
        .list_backups("foo")
        .await
        .unwrap();
    assert_eq!(backups.len(), 1);
    assert!(world.registry.is_empty().await);
}

#[tokio::test]
async fn polling_fallback_detects_process_name_once() {
    let world = World::new();
    world.add_game("g", MonitorTarget::new(MonitorMode::Process, "game.exe"), vec![]);
    world
        .snapshot
        .set(vec![game_exe("GAME.EXE", 7, "C:/anywhere/GAME.EXE")]);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = world.registry.spawn_reaper(shutdown_rx);
    let mut rx = world.events.subscribe();

    let poller = Arc::new(PollingFallback::new(
        world.registry.clone(),
        world.store.clone(),
        world.snapshot.clone(),
        Duration::from_millis(25),
    ));
    poller.start().await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(poller.active_games().await, vec!["g".to_string()]);

    world.snapshot.set(vec![]);
    let seen = wait_for_stop(&mut rx).await;
    let started = seen.iter().filter(|e| e.channel() == "game:started").count();
    assert_eq!(started, 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(poller.active_games().await.is_empty());
    assert!(world.registry.is_empty().await);
    assert_eq!(world.store.game_record("g").await.unwrap().timers.len(), 1);

    poller.stop().await;
    shutdown_tx.send(true).unwrap();
    reaper.await.unwrap();
}

#[tokio::test]
async fn snapshot_hook_drives_full_session() {
    let world = World::new();
    world.add_game(
        "bar",
        MonitorTarget::new(MonitorMode::File, "E:\\Games\\Bar\\bar.exe"),
        vec![],
    );
    world.add_game("idle", MonitorTarget::new(MonitorMode::File, ""), vec![]);

    let hook = Arc::new(SnapshotDiffHook::new(
        world.snapshot.clone(),
        Duration::from_millis(10),
    ));
    let bridge = HookBridge::new(hook, world.registry.clone(), world.store.clone());
    let mut rx = world.events.subscribe();

    bridge.start().await.unwrap();
    world
        .snapshot
        .set(vec![game_exe("bar.exe", 9, "E:/Games/Bar/bar.exe")]);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(world.registry.active_game_ids().await, vec!["bar".to_string()]);

    world.snapshot.set(vec![]);
    wait_for_stop(&mut rx).await;

    bridge.stop().await;
    assert_eq!(world.store.game_record("bar").await.unwrap().timers.len(), 1);
    assert!(world.store.game_record("idle").await.unwrap().timers.is_empty());
}
