//! 모니터 레지스트리: 활성 게임 ID → 게임 모니터 맵.
//!
//! 모든 맵 변경은 하나의 비동기 잠금 안에서 일어난다.
//! 잠금 순서는 항상 레지스트리 → 모니터이며, 모니터는 레지스트리를 호출하지 않는다.

use playtrack_core::error::CoreError;
use playtrack_core::event_bus::{EventBus, MonitorEvent};
use playtrack_core::models::process::{
    GameStatus, ProcessEvent, ProcessEventType, TimerStatus, TimerStatusEntry,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::game_monitor::{GameMonitor, MonitorContext};

/// 네이티브 훅 경로의 이벤트 출처
pub const SOURCE_NATIVE: &str = "nativeMonitor";
/// 체크 루프 경로의 이벤트 출처
pub const SOURCE_MONITOR: &str = "monitor";

struct MonitorEntry {
    monitor: Arc<GameMonitor>,
    timer_status: TimerStatus,
}

/// 활성 게임 모니터 레지스트리
pub struct MonitorRegistry {
    ctx: MonitorContext,
    monitors: Mutex<HashMap<String, MonitorEntry>>,
}

impl MonitorRegistry {
    /// 빈 레지스트리 생성
    pub fn new(ctx: MonitorContext) -> Self {
        Self {
            ctx,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.ctx.events
    }

    /// 저장된 실행기 설정으로 모니터 생성. 게임이 없으면 None.
    async fn spawn_legacy_monitor(&self, game_id: &str) -> Option<Arc<GameMonitor>> {
        match self.ctx.repository.launcher_settings(game_id).await {
            Ok(_) => Some(Arc::new(GameMonitor::new(game_id, self.ctx.clone()))),
            Err(e) => {
                error!("게임 {} 모니터 생성 실패: {e}", game_id);
                None
            }
        }
    }

    fn announce_started(&self, game_id: &str, source: &str) {
        self.ctx.events.publish(MonitorEvent::GameStarted {
            game_id: game_id.to_string(),
        });
        self.ctx.events.publish(MonitorEvent::GameLaunched {
            game_id: game_id.to_string(),
            source: source.to_string(),
        });
    }

    // ============================================================
    // 훅 경로
    // ============================================================

    /// 프로세스 생성 통지 처리 (path/pid가 없으면 등록만 한다)
    pub async fn start_phantom_monitor(&self, game_id: &str, path: Option<&str>, pid: Option<u32>) {
        let mut monitors = self.monitors.lock().await;

        let (monitor, first_sighting) = match monitors.get(game_id) {
            Some(entry) => (entry.monitor.clone(), false),
            None => match self.spawn_legacy_monitor(game_id).await {
                Some(monitor) => (monitor, true),
                None => return,
            },
        };

        if let (Some(path), Some(pid)) = (path, pid) {
            monitor.phantom_start(path, pid).await;
        }

        if first_sighting {
            monitors.insert(
                game_id.to_string(),
                MonitorEntry {
                    monitor,
                    timer_status: TimerStatus::Resumed,
                },
            );
            info!("게임 {} 모니터 등록", game_id);
            self.announce_started(game_id, SOURCE_NATIVE);
        }

        self.publish_status_locked(&monitors);
    }

    /// 프로세스 종료 통지 처리. 모니터가 완전히 멈추면 맵에서 제거한다.
    pub async fn stop_phantom_monitor(&self, game_id: &str, pid: u32) {
        let mut monitors = self.monitors.lock().await;

        if let Some(monitor) = monitors.get(game_id).map(|e| e.monitor.clone()) {
            if monitor.phantom_stop(pid).await {
                monitors.remove(game_id);
                info!("게임 {} 모니터 제거", game_id);
            }
        } else {
            debug!("게임 {} 등록된 모니터 없음 (pid {})", game_id, pid);
        }

        self.publish_status_locked(&monitors);
    }

    /// 네이티브 훅 이벤트 분배
    pub async fn handle_process_event(&self, event: ProcessEvent) {
        match event.event_type {
            ProcessEventType::Creation => {
                self.start_phantom_monitor(&event.id, Some(&event.full_path), Some(event.pid))
                    .await
            }
            ProcessEventType::Termination => {
                self.stop_phantom_monitor(&event.id, event.pid).await
            }
        }
    }

    /// 강제 제거. 모니터는 중지되며 세션은 기록하지 않는다.
    pub async fn remove_monitor_stub(&self, game_id: &str) -> bool {
        let mut monitors = self.monitors.lock().await;
        let removed = monitors.remove(game_id);
        if let Some(entry) = &removed {
            entry.monitor.stop().await;
            info!("게임 {} 모니터 강제 제거", game_id);
        }
        self.publish_status_locked(&monitors);
        removed.is_some()
    }

    // ============================================================
    // 체크 루프 경로
    // ============================================================

    /// 체크 루프 기반 감시 시작 (폴링 폴백 및 레거시 모드 사용자 요청)
    pub async fn start_monitor(&self, game_id: &str) -> Result<(), CoreError> {
        let mut monitors = self.monitors.lock().await;

        let (monitor, first_sighting) = match monitors.get(game_id) {
            Some(entry) => (entry.monitor.clone(), false),
            None => {
                let monitor = self
                    .spawn_legacy_monitor(game_id)
                    .await
                    .ok_or_else(|| CoreError::game_not_found(game_id))?;
                (monitor, true)
            }
        };

        monitor.start().await;
        if !monitor.is_running().await {
            return Err(CoreError::Config(format!(
                "게임 {game_id} 감시를 시작할 수 없음 (감시 대상 없음)"
            )));
        }

        if first_sighting {
            monitors.insert(
                game_id.to_string(),
                MonitorEntry {
                    monitor,
                    timer_status: TimerStatus::Resumed,
                },
            );
            self.announce_started(game_id, SOURCE_MONITOR);
        }

        self.publish_status_locked(&monitors);
        Ok(())
    }

    /// 사용자 강제 종료 요청. 모든 프로세스를 종료했으면 true.
    pub async fn request_stop(&self, game_id: &str) -> Result<bool, CoreError> {
        let monitor = {
            let monitors = self.monitors.lock().await;
            monitors.get(game_id).map(|e| e.monitor.clone())
        }
        .ok_or_else(|| CoreError::NotFound {
            resource_type: "Monitor".to_string(),
            id: game_id.to_string(),
        })?;

        monitor.request_stop().await
    }

    // ============================================================
    // 포그라운드 / 상태
    // ============================================================

    /// 포그라운드 게임 갱신. 일치하는 게임만 Resumed, 나머지는 Paused.
    pub async fn update_foreground(&self, foreground: Option<&str>) {
        let mut monitors = self.monitors.lock().await;
        for (game_id, entry) in monitors.iter_mut() {
            entry.timer_status = if foreground == Some(game_id.as_str()) {
                TimerStatus::Resumed
            } else {
                TimerStatus::Paused
            };
        }
        self.publish_status_locked(&monitors);
    }

    /// 활성 게임별 타이머 상태 (게임 ID순)
    pub async fn timer_statuses(&self) -> Vec<TimerStatusEntry> {
        let monitors = self.monitors.lock().await;
        collect_statuses(&monitors)
    }

    pub async fn status(&self, game_id: &str) -> Option<GameStatus> {
        let monitor = {
            let monitors = self.monitors.lock().await;
            monitors.get(game_id).map(|e| e.monitor.clone())
        }?;
        Some(monitor.status().await)
    }

    /// 등록된 게임 ID (정렬)
    pub async fn active_game_ids(&self) -> Vec<String> {
        let monitors = self.monitors.lock().await;
        let mut ids: Vec<String> = monitors.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn is_empty(&self) -> bool {
        self.monitors.lock().await.is_empty()
    }

    fn publish_status_locked(&self, monitors: &HashMap<String, MonitorEntry>) {
        self.ctx.events.publish(MonitorEvent::TimerStatusChanged {
            statuses: collect_statuses(monitors),
        });
    }

    // ============================================================
    // 정리
    // ============================================================

    /// 모든 모니터 중지 후 비운다. 빈 상태를 한 번 더 알린다.
    pub async fn shutdown(&self) {
        let mut monitors = self.monitors.lock().await;
        for (game_id, entry) in monitors.drain() {
            entry.monitor.stop().await;
            debug!("게임 {} 모니터 중지", game_id);
        }
        self.publish_status_locked(&monitors);
        info!("모니터 레지스트리 종료");
    }

    /// 종료 이벤트를 받아 완전히 멈춘 모니터를 정리하는 태스크 시작
    pub fn spawn_reaper(self: &Arc<Self>, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let events = self.ctx.events.subscribe();
        let registry = Arc::clone(self);
        tokio::spawn(async move { registry.run_reaper(events, shutdown_rx).await })
    }

    async fn run_reaper(
        &self,
        mut events: broadcast::Receiver<MonitorEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(MonitorEvent::GameStopped { game_id, .. }) => {
                        self.retire_if_stopped(&game_id).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("레지스트리 정리 태스크 이벤트 {}개 누락", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("레지스트리 정리 태스크 종료");
    }

    async fn retire_if_stopped(&self, game_id: &str) {
        let mut monitors = self.monitors.lock().await;
        let Some(monitor) = monitors.get(game_id).map(|e| e.monitor.clone()) else {
            return;
        };
        if !monitor.is_running().await {
            monitors.remove(game_id);
            debug!("게임 {} 종료된 모니터 정리", game_id);
            self.publish_status_locked(&monitors);
        }
    }
}

fn collect_statuses(monitors: &HashMap<String, MonitorEntry>) -> Vec<TimerStatusEntry> {
    let mut statuses: Vec<TimerStatusEntry> = monitors
        .iter()
        .map(|(game_id, entry)| TimerStatusEntry {
            name: game_id.clone(),
            status: entry.timer_status,
        })
        .collect();
    statuses.sort_by(|a, b| a.name.cmp(&b.name));
    statuses
}
