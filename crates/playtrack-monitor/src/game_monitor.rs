//! 게임 모니터: 게임 하나의 프로세스 집합과 세션 상태를 관리한다.
//!
//! 두 가지 경로로 상태가 바뀐다.
//! - 체크 루프: `start()` → 주기적으로 프로세스 스냅샷과 비교
//! - 팬텀 경로: 네이티브 훅 이벤트가 `phantom_start`/`phantom_stop` 호출
//!
//! 모든 전이는 같은 관측이 반복되어도 결과가 같도록 작성되어 있으며,
//! 종료 처리는 `exiting` 플래그로 세션당 한 번만 실행된다.

use chrono::{DateTime, Utc};
use playtrack_core::config::MonitorConfig;
use playtrack_core::error::CoreError;
use playtrack_core::event_bus::{EventBus, MonitorEvent};
use playtrack_core::models::game::{has_save_paths, MonitorMode, TimerEntry};
use playtrack_core::models::process::{GameStatus, MonitoredProcess, ProcessEntry};
use playtrack_core::ports::integration::{DisplayScaler, SaveBackup, ShellIntegration};
use playtrack_core::ports::process::{ProcessSnapshotProvider, ProcessTerminator};
use playtrack_core::ports::storage::GameRepository;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::matcher::{matches_descriptor, normalize_path};
use crate::scan::executable_files;

// ============================================================
// 의존성
// ============================================================

/// 게임 모니터 동작 파라미터
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// 체크 루프 주기
    pub check_interval: Duration,
    /// 폴더 모드 실행 파일 확장자
    pub executable_extensions: Vec<String>,
    /// 강제 종료 최대 시도 횟수
    pub terminate_max_retries: u32,
    /// 강제 종료 재시도 간격
    pub terminate_retry_delay: Duration,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            check_interval: config.check_interval(),
            executable_extensions: config.executable_extensions.clone(),
            terminate_max_retries: config.terminate_max_retries,
            terminate_retry_delay: config.terminate_retry_delay(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

/// 게임 모니터가 호출하는 포트 묶음
#[derive(Clone)]
pub struct MonitorContext {
    pub snapshot: Arc<dyn ProcessSnapshotProvider>,
    pub terminator: Arc<dyn ProcessTerminator>,
    pub repository: Arc<dyn GameRepository>,
    pub shell: Arc<dyn ShellIntegration>,
    pub backup: Arc<dyn SaveBackup>,
    pub scaler: Arc<dyn DisplayScaler>,
    pub events: EventBus,
    pub settings: MonitorSettings,
}

/// 스냅샷 조회. 실패 시 로그 후 빈 목록.
pub async fn snapshot_or_empty(provider: &dyn ProcessSnapshotProvider) -> Vec<ProcessEntry> {
    match provider.list().await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("프로세스 스냅샷 실패, 빈 목록으로 처리: {e}");
            Vec::new()
        }
    }
}

// ============================================================
// 상태
// ============================================================

#[derive(Default)]
struct MonitorState {
    is_running: bool,
    processes: Vec<MonitoredProcess>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    exiting: bool,
    /// 체크 루프 중지 신호 (루프 실행 중일 때만 Some)
    check_loop: Option<watch::Sender<bool>>,
}

/// 게임 하나의 감시 상태 머신
pub struct GameMonitor {
    game_id: String,
    ctx: MonitorContext,
    state: Mutex<MonitorState>,
    /// 강제 종료 요청 수신 가능 여부 (세션 시작 시 설정, 첫 사용 또는 stop()에서 해제)
    stop_listener: AtomicBool,
}

impl GameMonitor {
    /// 새 모니터 생성 (감시 대상은 비어 있음)
    pub fn new(game_id: impl Into<String>, ctx: MonitorContext) -> Self {
        Self {
            game_id: game_id.into(),
            ctx,
            state: Mutex::new(MonitorState::default()),
            stop_listener: AtomicBool::new(false),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// 세션 진행 중 여부
    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_running
    }

    /// 현재 상태 스냅샷
    pub async fn status(&self) -> GameStatus {
        let state = self.state.lock().await;
        GameStatus {
            game_id: self.game_id.clone(),
            is_running: state.is_running,
            processes: state.processes.clone(),
            start_time: state.start_time,
            end_time: state.end_time,
        }
    }

    // ============================================================
    // 초기화
    // ============================================================

    /// 설정된 감시 모드로 감시 대상 목록을 채운다.
    ///
    /// 설정 오류는 로그만 남기고 목록을 비워 둔다.
    pub async fn init(&self) {
        let mut state = self.state.lock().await;
        self.init_locked(&mut state).await;
    }

    async fn init_locked(&self, state: &mut MonitorState) {
        let settings = match self.ctx.repository.launcher_settings(&self.game_id).await {
            Ok(settings) => settings,
            Err(e) => {
                error!("게임 {} 실행기 설정 조회 실패: {e}", self.game_id);
                return;
            }
        };

        let Some(target) = settings.active_target().filter(|t| t.is_configured()) else {
            warn!("게임 {} 감시 경로 미설정", self.game_id);
            return;
        };

        state.processes = match target.monitor_mode {
            MonitorMode::File => vec![MonitoredProcess::for_path(&target.monitor_path)],
            MonitorMode::Process => {
                vec![MonitoredProcess::for_process_name(&target.monitor_path)]
            }
            MonitorMode::Folder => {
                match executable_files(
                    Path::new(&target.monitor_path),
                    &self.ctx.settings.executable_extensions,
                )
                .await
                {
                    Ok(files) => files
                        .into_iter()
                        .map(|f| MonitoredProcess::for_path(f.to_string_lossy()))
                        .collect(),
                    Err(e) => {
                        error!("게임 {} 감시 폴더 탐색 실패: {e}", self.game_id);
                        Vec::new()
                    }
                }
            }
        };

        debug!(
            "게임 {} 감시 대상 {}개 ({})",
            self.game_id,
            state.processes.len(),
            target.monitor_mode.as_str()
        );
    }

    // ============================================================
    // 체크 루프 경로
    // ============================================================

    /// 감시 시작: 즉시 한 번 확인한 뒤 주기적 체크 루프를 띄운다.
    pub async fn start(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        if state.is_running {
            debug!("게임 {} 이미 감시 중", self.game_id);
            return;
        }

        if state.processes.is_empty() {
            self.init_locked(&mut state).await;
        }
        if state.processes.is_empty() {
            warn!("게임 {} 감시 대상 없음, 시작 취소", self.game_id);
            return;
        }

        self.begin_session(&mut state);
        self.check_locked(&mut state).await;

        if state.is_running && state.check_loop.is_none() {
            let (stop_tx, stop_rx) = watch::channel(false);
            state.check_loop = Some(stop_tx);
            tokio::spawn(run_check_loop(
                Arc::downgrade(self),
                self.ctx.settings.check_interval,
                stop_rx,
            ));
        }

        info!("게임 {} 감시 시작", self.game_id);
    }

    /// 감시 중지. 체크 루프와 강제 종료 리스너를 해제한다.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state);
    }

    /// 프로세스 목록을 한 번 확인하여 감시 대상 상태를 갱신한다.
    pub async fn check_processes(&self) {
        let mut state = self.state.lock().await;
        self.check_locked(&mut state).await;
    }

    fn begin_session(&self, state: &mut MonitorState) {
        state.is_running = true;
        state.start_time = Some(Utc::now());
        state.end_time = None;
        state.exiting = false;
        self.stop_listener.store(true, Ordering::SeqCst);
    }

    fn stop_locked(&self, state: &mut MonitorState) {
        if let Some(stop_tx) = state.check_loop.take() {
            let _ = stop_tx.send(true);
        }
        if state.is_running && state.end_time.is_none() {
            state.end_time = Some(Utc::now());
        }
        state.is_running = false;
        self.stop_listener.store(false, Ordering::SeqCst);
    }

    async fn check_locked(&self, state: &mut MonitorState) {
        // 조회 실패 시 이번 주기는 건너뛴다 (빈 목록으로 보면 전체 종료로 오인)
        let snapshot = match self.ctx.snapshot.list().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("게임 {} 프로세스 확인 실패: {e}", self.game_id);
                return;
            }
        };

        let was_some_running = state.processes.iter().any(|p| p.is_running);
        let mut newly_started = Vec::new();

        for (idx, monitored) in state.processes.iter_mut().enumerate() {
            let found = snapshot.iter().find(|e| matches_descriptor(&*monitored, e));
            let was_running = monitored.is_running;

            monitored.is_running = found.is_some();
            if let Some(entry) = found {
                monitored.pid = Some(entry.pid);
            }

            if !was_running && monitored.is_running {
                newly_started.push(idx);
            } else if !monitored.is_running {
                monitored.is_scaled = false;
            }
        }

        for idx in newly_started {
            info!(
                "게임 {} 프로세스 실행 감지: {}",
                self.game_id, state.processes[idx].path
            );
            self.apply_scaling(state, idx).await;
        }

        let all_stopped = state.processes.iter().all(|p| !p.is_running);
        if all_stopped && was_some_running {
            self.handle_exit_locked(state).await;
        }
    }

    /// 실행 직후 한 번 디스플레이 스케일링 적용
    async fn apply_scaling(&self, state: &mut MonitorState, idx: usize) {
        if state.processes[idx].is_scaled {
            return;
        }

        let use_magpie = match self.ctx.repository.launcher_settings(&self.game_id).await {
            Ok(settings) => settings.use_magpie,
            Err(e) => {
                warn!("게임 {} 스케일링 설정 조회 실패: {e}", self.game_id);
                false
            }
        };
        if !use_magpie {
            return;
        }

        match self.ctx.scaler.scale(&self.game_id).await {
            Ok(true) => state.processes[idx].is_scaled = true,
            Ok(false) => debug!("게임 {} 스케일러 미설정, 건너뜀", self.game_id),
            Err(e) => warn!("게임 {} 스케일링 실패: {e}", self.game_id),
        }
    }

    // ============================================================
    // 팬텀 경로 (네이티브 훅)
    // ============================================================

    /// 외부에서 감지된 프로세스를 실행 중으로 등록한다. 체크 루프는 띄우지 않는다.
    ///
    /// 같은 pid가 이미 실행 중이면 아무것도 하지 않는다.
    pub async fn phantom_start(&self, path: &str, pid: u32) {
        let mut state = self.state.lock().await;

        if state
            .processes
            .iter()
            .any(|p| p.is_running && p.pid == Some(pid))
        {
            debug!("게임 {} pid {} 이미 등록됨", self.game_id, pid);
            return;
        }

        let normalized = normalize_path(path);
        let reusable = state.processes.iter().position(|p| {
            !p.is_running && !p.is_process_name_mode && normalize_path(&p.path) == normalized
        });
        let idx = match reusable {
            Some(idx) => {
                let slot = &mut state.processes[idx];
                slot.pid = Some(pid);
                slot.is_running = true;
                idx
            }
            None => {
                state.processes.push(MonitoredProcess {
                    pid: Some(pid),
                    is_running: true,
                    ..MonitoredProcess::for_path(path)
                });
                state.processes.len() - 1
            }
        };

        if !state.is_running {
            self.begin_session(&mut state);
            info!("게임 {} 세션 시작 (pid {})", self.game_id, pid);
        }

        self.apply_scaling(&mut state, idx).await;
    }

    /// pid에 해당하는 프로세스를 종료로 표시한다. 모두 종료되면 종료 처리.
    ///
    /// 모니터가 완전히 멈췄으면 true.
    pub async fn phantom_stop(&self, pid: u32) -> bool {
        let mut state = self.state.lock().await;

        let mut found = false;
        for monitored in state
            .processes
            .iter_mut()
            .filter(|p| p.is_running && p.pid == Some(pid))
        {
            monitored.is_running = false;
            monitored.is_scaled = false;
            found = true;
        }

        if !found {
            debug!("게임 {} 알 수 없는 pid {} 종료 무시", self.game_id, pid);
            return !state.is_running;
        }

        if state.processes.iter().all(|p| !p.is_running) {
            self.handle_exit_locked(&mut state).await;
        }
        !state.is_running
    }

    // ============================================================
    // 강제 종료
    // ============================================================

    /// 사용자 요청 강제 종료: 실행 중인 프로세스를 모두 종료한 뒤 종료 처리.
    ///
    /// 리스너는 세션당 한 번만 응답한다. 모든 프로세스를 종료했으면 `Ok(true)`.
    pub async fn request_stop(&self) -> Result<bool, CoreError> {
        if !self.stop_listener.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Conflict(format!(
                "게임 {} 종료 요청을 받을 수 없는 상태",
                self.game_id
            )));
        }

        let mut state = self.state.lock().await;
        if state.exiting {
            return Ok(false);
        }

        let mut all_terminated = true;
        for idx in 0..state.processes.len() {
            if !state.processes[idx].is_running {
                continue;
            }
            if self.terminate_with_retry(&state.processes[idx]).await {
                let monitored = &mut state.processes[idx];
                monitored.is_running = false;
                monitored.is_scaled = false;
            } else {
                error!(
                    "게임 {} 프로세스 종료 실패, 최대 재시도 초과: {}",
                    self.game_id, state.processes[idx].path
                );
                all_terminated = false;
            }
        }

        self.handle_exit_locked(&mut state).await;
        Ok(all_terminated)
    }

    async fn terminate_with_retry(&self, monitored: &MonitoredProcess) -> bool {
        let max_attempts = self.ctx.settings.terminate_max_retries.max(1);

        for attempt in 1..=max_attempts {
            let result = if monitored.is_process_name_mode {
                self.ctx.terminator.kill_by_name(&monitored.path).await
            } else {
                self.ctx.terminator.kill_by_path(&monitored.path).await
            };

            match result {
                Ok(count) => {
                    info!("프로세스 {}개 종료: {}", count, monitored.path);
                    return true;
                }
                Err(CoreError::ProcessNotFound(_)) => {
                    debug!("프로세스 이미 없음: {}", monitored.path);
                    return true;
                }
                Err(e) => {
                    warn!(
                        "프로세스 종료 시도 {}/{} 실패 ({}): {e}",
                        attempt, max_attempts, monitored.path
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.ctx.settings.terminate_retry_delay).await;
                    }
                }
            }
        }
        false
    }

    // ============================================================
    // 종료 처리
    // ============================================================

    async fn handle_exit_locked(&self, state: &mut MonitorState) {
        if state.exiting || !state.is_running {
            return;
        }
        state.exiting = true;

        let end = Utc::now();
        state.end_time = Some(end);
        let entry = TimerEntry {
            start: state.start_time.unwrap_or(end),
            end,
        };
        let duration_ms = entry.duration_ms();
        info!("게임 {} 종료 ({}ms)", self.game_id, duration_ms);

        if let Err(e) = self.ctx.shell.focus_main_window(&self.game_id).await {
            warn!("메인 창 포커스 실패: {e}");
        }
        self.ctx.events.publish(MonitorEvent::GameExiting {
            game_id: self.game_id.clone(),
        });

        let repo = &self.ctx.repository;
        if let Err(e) = repo.append_timer(&self.game_id, entry).await {
            error!("게임 {} 세션 기록 실패: {e}", self.game_id);
        }
        if let Err(e) = repo.set_last_run_date(&self.game_id, end).await {
            error!("게임 {} 마지막 실행 시각 기록 실패: {e}", self.game_id);
        }
        match repo.add_play_time(&self.game_id, duration_ms).await {
            Ok(total) => debug!("게임 {} 누적 플레이 시간 {}ms", self.game_id, total),
            Err(e) => error!("게임 {} 플레이 시간 기록 실패: {e}", self.game_id),
        }

        self.stop_locked(state);

        if let Err(e) = self.ctx.shell.refresh_recent_games().await {
            warn!("최근 게임 목록 갱신 실패: {e}");
        }

        match repo.save_paths(&self.game_id).await {
            Ok(paths) if has_save_paths(&paths) => {
                if let Err(e) = self.ctx.backup.backup_game_save(&self.game_id, &paths).await {
                    error!("게임 {} 세이브 백업 실패: {e}", self.game_id);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("게임 {} 세이브 경로 조회 실패: {e}", self.game_id),
        }

        self.ctx.events.publish(MonitorEvent::GameExited {
            game_id: self.game_id.clone(),
        });
        self.ctx.events.publish(MonitorEvent::GameStopped {
            game_id: self.game_id.clone(),
            duration_ms,
        });
    }
}

/// 체크 루프. 첫 확인은 `start()`에서 이미 했으므로 다음 주기부터 돈다.
async fn run_check_loop(
    monitor: Weak<GameMonitor>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(monitor) = monitor.upgrade() else { break };
                monitor.check_processes().await;
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
    debug!("체크 루프 종료");
}
