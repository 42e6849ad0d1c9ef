//! 단위 테스트용 모의 포트.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playtrack_core::error::CoreError;
use playtrack_core::event_bus::EventBus;
use playtrack_core::models::game::{GameRecord, LauncherSettings, TimerEntry};
use playtrack_core::models::process::{KnownGame, ProcessEntry, ProcessEvent};
use playtrack_core::ports::hook::NativeProcessHook;
use playtrack_core::ports::integration::{DisplayScaler, SaveBackup, ShellIntegration};
use playtrack_core::ports::process::{ProcessSnapshotProvider, ProcessTerminator};
use playtrack_core::ports::storage::GameRepository;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::game_monitor::{MonitorContext, MonitorSettings};

pub fn proc_entry(name: &str, pid: u32, exe: Option<&str>) -> ProcessEntry {
    ProcessEntry {
        name: name.to_string(),
        pid,
        executable_path: exe.map(str::to_string),
        command_line: exe.map(|e| format!("\"{e}\"")),
    }
}

// ============================================================
// 프로세스
// ============================================================

#[derive(Default)]
pub struct ScriptedSnapshot {
    entries: Mutex<Vec<ProcessEntry>>,
    pub fail: AtomicBool,
    pub calls: AtomicU32,
}

impl ScriptedSnapshot {
    pub fn set(&self, entries: Vec<ProcessEntry>) {
        *self.entries.lock().unwrap() = entries;
    }
}

#[async_trait]
impl ProcessSnapshotProvider for ScriptedSnapshot {
    async fn list(&self) -> Result<Vec<ProcessEntry>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Snapshot("mock failure".to_string()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MockTerminator {
    /// 처음 N번은 실패
    pub fail_first: AtomicU32,
    pub not_found: AtomicBool,
    pub attempts: AtomicU32,
}

impl MockTerminator {
    fn kill(&self, target: &str) -> Result<usize, CoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.not_found.load(Ordering::SeqCst) {
            return Err(CoreError::ProcessNotFound(target.to_string()));
        }
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(CoreError::Termination(format!("{target}: access denied")));
        }
        Ok(1)
    }
}

#[async_trait]
impl ProcessTerminator for MockTerminator {
    async fn kill_by_path(&self, path: &str) -> Result<usize, CoreError> {
        self.kill(path)
    }

    async fn kill_by_name(&self, name: &str) -> Result<usize, CoreError> {
        self.kill(name)
    }
}

// ============================================================
// 저장소
// ============================================================

struct StoredGame {
    launcher: LauncherSettings,
    save_paths: Vec<String>,
    record: GameRecord,
}

#[derive(Default)]
pub struct MemoryRepository {
    games: Mutex<HashMap<String, StoredGame>>,
}

impl MemoryRepository {
    pub fn insert(&self, id: &str, launcher: LauncherSettings, save_paths: Vec<String>) {
        self.games.lock().unwrap().insert(
            id.to_string(),
            StoredGame {
                launcher,
                save_paths,
                record: GameRecord::default(),
            },
        );
    }

    pub fn timer_count(&self, id: &str) -> usize {
        self.games
            .lock()
            .unwrap()
            .get(id)
            .map(|g| g.record.timers.len())
            .unwrap_or(0)
    }

    fn with_game<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut StoredGame) -> T,
    ) -> Result<T, CoreError> {
        let mut games = self.games.lock().unwrap();
        games
            .get_mut(id)
            .map(f)
            .ok_or_else(|| CoreError::game_not_found(id))
    }
}

#[async_trait]
impl GameRepository for MemoryRepository {
    async fn list_game_ids(&self) -> Result<Vec<String>, CoreError> {
        let mut ids: Vec<String> = self.games.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn launcher_settings(&self, game_id: &str) -> Result<LauncherSettings, CoreError> {
        self.with_game(game_id, |g| g.launcher.clone())
    }

    async fn save_paths(&self, game_id: &str) -> Result<Vec<String>, CoreError> {
        self.with_game(game_id, |g| g.save_paths.clone())
    }

    async fn game_record(&self, game_id: &str) -> Result<GameRecord, CoreError> {
        self.with_game(game_id, |g| g.record.clone())
    }

    async fn append_timer(&self, game_id: &str, entry: TimerEntry) -> Result<(), CoreError> {
        self.with_game(game_id, |g| g.record.timers.push(entry))
    }

    async fn set_last_run_date(&self, game_id: &str, at: DateTime<Utc>) -> Result<(), CoreError> {
        self.with_game(game_id, |g| g.record.last_run_date = Some(at))
    }

    async fn add_play_time(&self, game_id: &str, duration_ms: u64) -> Result<u64, CoreError> {
        self.with_game(game_id, |g| {
            g.record.play_time_ms += duration_ms;
            g.record.play_time_ms
        })
    }
}

// ============================================================
// 부수효과
// ============================================================

#[derive(Default)]
pub struct CountingShell {
    pub focus_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
}

#[async_trait]
impl ShellIntegration for CountingShell {
    async fn focus_main_window(&self, _game_id: &str) -> Result<(), CoreError> {
        self.focus_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_recent_games(&self) -> Result<(), CoreError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingBackup {
    pub calls: AtomicU32,
}

#[async_trait]
impl SaveBackup for CountingBackup {
    async fn backup_game_save(
        &self,
        _game_id: &str,
        _save_paths: &[String],
    ) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingScaler {
    pub calls: AtomicU32,
}

#[async_trait]
impl DisplayScaler for CountingScaler {
    async fn scale(&self, _game_id: &str) -> Result<bool, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

// ============================================================
// 훅
// ============================================================

#[derive(Default)]
pub struct RecordingHook {
    pub known: Mutex<Vec<KnownGame>>,
    pub events: Mutex<Option<mpsc::Sender<ProcessEvent>>>,
    pub foreground: Mutex<Option<mpsc::Sender<Option<String>>>>,
    pub stop_calls: AtomicU32,
    pub replace_calls: AtomicU32,
    pub fail_start: AtomicBool,
}

#[async_trait]
impl NativeProcessHook for RecordingHook {
    async fn start_monitoring(
        &self,
        known_games: Vec<KnownGame>,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<(), CoreError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(CoreError::Unsupported("mock hook".to_string()));
        }
        *self.known.lock().unwrap() = known_games;
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn stop_monitoring(&self) -> Result<(), CoreError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().take();
        Ok(())
    }

    async fn replace_known_games(&self, known_games: Vec<KnownGame>) -> Result<(), CoreError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        *self.known.lock().unwrap() = known_games;
        Ok(())
    }

    async fn install_foreground_hook(
        &self,
        foreground: mpsc::Sender<Option<String>>,
        _wait_time: Duration,
    ) -> Result<(), CoreError> {
        *self.foreground.lock().unwrap() = Some(foreground);
        Ok(())
    }

    async fn uninstall_foreground_hook(&self) -> Result<(), CoreError> {
        self.foreground.lock().unwrap().take();
        Ok(())
    }
}

// ============================================================
// 조립
// ============================================================

pub struct Fixture {
    pub snapshot: Arc<ScriptedSnapshot>,
    pub terminator: Arc<MockTerminator>,
    pub repo: Arc<MemoryRepository>,
    pub shell: Arc<CountingShell>,
    pub backup: Arc<CountingBackup>,
    pub scaler: Arc<CountingScaler>,
    pub events: EventBus,
    pub settings: MonitorSettings,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(ScriptedSnapshot::default()),
            terminator: Arc::new(MockTerminator::default()),
            repo: Arc::new(MemoryRepository::default()),
            shell: Arc::new(CountingShell::default()),
            backup: Arc::new(CountingBackup::default()),
            scaler: Arc::new(CountingScaler::default()),
            events: EventBus::new(64),
            settings: MonitorSettings {
                check_interval: Duration::from_millis(20),
                executable_extensions: vec![".exe".to_string()],
                terminate_max_retries: 3,
                terminate_retry_delay: Duration::from_millis(1),
            },
        }
    }

    pub fn ctx(&self) -> MonitorContext {
        MonitorContext {
            snapshot: self.snapshot.clone(),
            terminator: self.terminator.clone(),
            repository: self.repo.clone(),
            shell: self.shell.clone(),
            backup: self.backup.clone(),
            scaler: self.scaler.clone(),
            events: self.events.clone(),
            settings: self.settings.clone(),
        }
    }
}
