//! 폴링 폴백 모니터.
//!
//! 네이티브 훅을 쓸 수 없을 때 주기적으로 프로세스 스냅샷을 각 게임의
//! 감시 대상과 비교하고, 일치하면 레지스트리의 체크 루프 경로로 모니터를 시작한다.
//! 이미 시작한 게임은 `active_games`에 두어 매 주기 재시작하지 않는다.

use playtrack_core::event_bus::{EventBus, MonitorEvent};
use playtrack_core::ports::process::ProcessSnapshotProvider;
use playtrack_core::ports::storage::GameRepository;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::game_monitor::snapshot_or_empty;
use crate::matcher::matches_target;
use crate::registry::MonitorRegistry;

/// 폴링 기반 게임 감지
pub struct PollingFallback {
    registry: Arc<MonitorRegistry>,
    repository: Arc<dyn GameRepository>,
    snapshot: Arc<dyn ProcessSnapshotProvider>,
    events: EventBus,
    interval: Duration,
    active_games: Mutex<HashSet<String>>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl PollingFallback {
    pub fn new(
        registry: Arc<MonitorRegistry>,
        repository: Arc<dyn GameRepository>,
        snapshot: Arc<dyn ProcessSnapshotProvider>,
        interval: Duration,
    ) -> Self {
        let events = registry.events().clone();
        Self {
            registry,
            repository,
            snapshot,
            events,
            interval,
            active_games: Mutex::new(HashSet::new()),
            stop_tx: Mutex::new(None),
        }
    }

    /// 스캔 시작: 즉시 한 번 스캔하고 주기 루프를 띄운다.
    pub async fn start(self: &Arc<Self>) {
        let mut stop_slot = self.stop_tx.lock().await;
        if stop_slot.is_some() {
            return;
        }

        let events = self.events.subscribe();
        self.scan_once().await;

        let (stop_tx, stop_rx) = watch::channel(false);
        *stop_slot = Some(stop_tx);
        tokio::spawn(Arc::clone(self).run(events, stop_rx));

        info!("폴링 폴백 시작 (주기 {:?})", self.interval);
    }

    /// 스캔 중지 및 활성 목록 초기화
    pub async fn stop(&self) {
        if let Some(stop_tx) = self.stop_tx.lock().await.take() {
            let _ = stop_tx.send(true);
        }
        self.active_games.lock().await.clear();
        info!("폴링 폴백 중지");
    }

    pub async fn is_running(&self) -> bool {
        self.stop_tx.lock().await.is_some()
    }

    /// 현재 활성으로 간주하는 게임 ID (정렬)
    pub async fn active_games(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active_games.lock().await.iter().cloned().collect();
        ids.sort();
        ids
    }

    async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<MonitorEvent>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.scan_once().await,
                received = events.recv() => match received {
                    Ok(MonitorEvent::GameStopped { game_id, .. }) => {
                        self.handle_game_stopped(&game_id).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("폴링 폴백 이벤트 {}개 누락", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("폴링 폴백 루프 종료");
    }

    async fn handle_game_stopped(&self, game_id: &str) {
        if self.active_games.lock().await.remove(game_id) {
            info!("게임 {} 종료, 활성 목록에서 제거", game_id);
        }
    }

    /// 한 번 스캔. 스냅샷은 한 번만 조회하고 모든 게임에 재사용한다.
    pub async fn scan_once(&self) {
        let ids = match self.repository.list_game_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("게임 목록 조회 실패: {e}");
                return;
            }
        };
        let processes = snapshot_or_empty(self.snapshot.as_ref()).await;

        let mut active = self.active_games.lock().await;
        for game_id in ids {
            if active.contains(&game_id) {
                continue;
            }

            let target = match self.repository.launcher_settings(&game_id).await {
                Ok(settings) => settings.active_target().cloned(),
                Err(e) => {
                    warn!("게임 {} 설정 조회 실패: {e}", game_id);
                    continue;
                }
            };
            let Some(target) = target.filter(|t| t.is_configured()) else {
                continue;
            };

            if !processes.iter().any(|p| matches_target(&target, p)) {
                continue;
            }

            debug!("게임 {} 프로세스 일치", game_id);
            match self.registry.start_monitor(&game_id).await {
                Ok(()) => {
                    info!("게임 {} 감지, 모니터 시작", game_id);
                    active.insert(game_id);
                }
                Err(e) => error!("게임 {} 모니터 시작 실패: {e}", game_id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{proc_entry, Fixture};
    use playtrack_core::models::game::{LauncherMode, LauncherSettings, MonitorMode, MonitorTarget};
    use playtrack_core::models::process::ProcessEntry;
    use std::sync::atomic::Ordering;

    fn poller(fixture: &Fixture) -> (Arc<MonitorRegistry>, Arc<PollingFallback>) {
        let registry = Arc::new(MonitorRegistry::new(fixture.ctx()));
        let poller = Arc::new(PollingFallback::new(
            registry.clone(),
            fixture.repo.clone(),
            fixture.snapshot.clone(),
            Duration::from_millis(30),
        ));
        (registry, poller)
    }

    fn process_mode_game(fixture: &Fixture) {
        fixture.repo.insert(
            "g1",
            LauncherSettings::with_target(
                LauncherMode::File,
                MonitorTarget::new(MonitorMode::Process, "game.exe"),
            ),
            vec![],
        );
    }

    #[tokio::test]
    async fn process_name_match_starts_monitor_once() {
        let fixture = Fixture::new();
        process_mode_game(&fixture);
        fixture
            .snapshot
            .set(vec![proc_entry("GAME.EXE", 10, Some("C:/anything/GAME.EXE"))]);
        let (registry, poller) = poller(&fixture);
        let mut rx = fixture.events.subscribe();

        for _ in 0..3 {
            poller.scan_once().await;
        }

        let started = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| e.channel() == "game:started")
            .count();
        assert_eq!(started, 1);
        assert_eq!(poller.active_games().await, vec!["g1".to_string()]);
        assert!(registry.status("g1").await.unwrap().is_running);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn snapshot_failure_is_treated_as_no_match() {
        let fixture = Fixture::new();
        process_mode_game(&fixture);
        fixture.snapshot.fail.store(true, Ordering::SeqCst);
        let (registry, poller) = poller(&fixture);

        poller.scan_once().await;
        assert!(poller.active_games().await.is_empty());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn game_stopped_clears_active_entry() {
        let fixture = Fixture::new();
        process_mode_game(&fixture);
        fixture.snapshot.set(vec![proc_entry("game.exe", 10, None)]);
        let (registry, poller) = poller(&fixture);

        poller.start().await;
        assert_eq!(poller.active_games().await, vec!["g1".to_string()]);

        fixture.snapshot.set(vec![]);
        let mut cleared = false;
        for _ in 0..50 {
            if poller.active_games().await.is_empty() {
                cleared = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(cleared);
        assert_eq!(fixture.repo.timer_count("g1"), 1);

        poller.stop().await;
        assert!(!poller.is_running().await);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn command_line_only_match_closes_session() {
        let fixture = Fixture::new();
        fixture.repo.insert(
            "g1",
            LauncherSettings::with_target(
                LauncherMode::File,
                MonitorTarget::new(MonitorMode::File, "C:/Games/Foo/foo.exe"),
            ),
            vec![],
        );
        fixture.snapshot.set(vec![ProcessEntry {
            name: "foo.exe".to_string(),
            pid: 11,
            executable_path: None,
            command_line: Some("\"C:\\Games\\Foo\\foo.exe\" -windowed".to_string()),
        }]);
        let (registry, poller) = poller(&fixture);

        poller.start().await;
        assert_eq!(poller.active_games().await, vec!["g1".to_string()]);
        assert!(registry.status("g1").await.unwrap().processes[0].is_running);

        fixture.snapshot.set(vec![]);
        let mut cleared = false;
        for _ in 0..50 {
            if poller.active_games().await.is_empty() {
                cleared = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(cleared);
        assert_eq!(fixture.repo.timer_count("g1"), 1);

        poller.stop().await;
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn unconfigured_games_are_skipped() {
        let fixture = Fixture::new();
        fixture.repo.insert("blank", LauncherSettings::default(), vec![]);
        fixture.snapshot.set(vec![proc_entry("", 1, Some(""))]);
        let (_registry, poller) = poller(&fixture);

        poller.scan_once().await;
        assert!(poller.active_games().await.is_empty());
    }
}
