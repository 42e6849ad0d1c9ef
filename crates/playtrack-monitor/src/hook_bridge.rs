//! 네이티브 훅 브리지.
//!
//! 알려진 게임 경로를 훅 모듈에 등록하고, 생성/종료 이벤트와
//! 포그라운드 변경 알림을 레지스트리로 전달한다.

use playtrack_core::error::CoreError;
use playtrack_core::models::process::KnownGame;
use playtrack_core::ports::hook::NativeProcessHook;
use playtrack_core::ports::storage::GameRepository;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::MonitorRegistry;

/// 훅 이벤트 채널 용량
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 저장소의 전체 게임에서 (감시 경로, 게임 ID) 목록을 만든다.
///
/// 설정을 읽을 수 없거나 경로가 비어 있는 게임은 건너뛴다.
pub async fn collect_known_games(
    repository: &dyn GameRepository,
) -> Result<Vec<KnownGame>, CoreError> {
    let ids = repository.list_game_ids().await?;
    let mut known = Vec::with_capacity(ids.len());

    for id in ids {
        match repository.launcher_settings(&id).await {
            Ok(settings) => {
                if let Some(target) = settings.active_target().filter(|t| t.is_configured()) {
                    known.push(KnownGame {
                        path: target.monitor_path.clone(),
                        id,
                    });
                }
            }
            Err(e) => warn!("게임 {} 설정 조회 실패, 훅 등록 제외: {e}", id),
        }
    }

    Ok(known)
}

/// 훅 모듈 ↔ 레지스트리 연결
pub struct HookBridge {
    hook: Arc<dyn NativeProcessHook>,
    registry: Arc<MonitorRegistry>,
    repository: Arc<dyn GameRepository>,
    foreground_enabled: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl HookBridge {
    pub fn new(
        hook: Arc<dyn NativeProcessHook>,
        registry: Arc<MonitorRegistry>,
        repository: Arc<dyn GameRepository>,
    ) -> Self {
        Self {
            hook,
            registry,
            repository,
            foreground_enabled: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push(handle),
            Err(e) => warn!("훅 태스크 목록 잠금 실패: {e}"),
        }
    }

    /// 알려진 게임을 등록하고 이벤트 전달을 시작한다.
    pub async fn start(&self) -> Result<(), CoreError> {
        let known = collect_known_games(self.repository.as_ref()).await?;
        let count = known.len();

        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.hook.start_monitoring(known, tx).await?;

        let registry = Arc::clone(&self.registry);
        self.track(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!(
                    "훅 이벤트: {:?} {} pid={}",
                    event.event_type, event.id, event.pid
                );
                registry.handle_process_event(event).await;
            }
            debug!("훅 이벤트 채널 닫힘");
        }));

        info!("네이티브 훅 시작: 게임 {}개 등록", count);
        Ok(())
    }

    /// 게임 목록이 바뀌었을 때 훅의 알려진 게임 목록 교체
    pub async fn refresh_known_games(&self) -> Result<(), CoreError> {
        let known = collect_known_games(self.repository.as_ref()).await?;
        let count = known.len();
        self.hook.replace_known_games(known).await?;
        debug!("알려진 게임 {}개로 갱신", count);
        Ok(())
    }

    /// 포그라운드 훅 설치. 전면 게임이 바뀔 때마다 레지스트리 타이머 상태를 갱신한다.
    pub async fn enable_foreground_timer(&self, wait_time: Duration) -> Result<(), CoreError> {
        if self.foreground_enabled.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<Option<String>>(EVENT_CHANNEL_CAPACITY);
        self.hook.install_foreground_hook(tx, wait_time).await?;
        self.foreground_enabled.store(true, Ordering::SeqCst);

        let registry = Arc::clone(&self.registry);
        self.track(tokio::spawn(async move {
            while let Some(foreground) = rx.recv().await {
                registry.update_foreground(foreground.as_deref()).await;
            }
        }));

        info!("포그라운드 타이머 활성화");
        Ok(())
    }

    pub async fn disable_foreground_timer(&self) -> Result<(), CoreError> {
        if !self.foreground_enabled.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.hook.uninstall_foreground_hook().await?;
        info!("포그라운드 타이머 비활성화");
        Ok(())
    }

    /// 포그라운드 훅 해제 → 감시 중지 → 전달 태스크 정리
    pub async fn stop(&self) {
        if let Err(e) = self.disable_foreground_timer().await {
            warn!("포그라운드 훅 해제 실패: {e}");
        }
        if let Err(e) = self.hook.stop_monitoring().await {
            warn!("네이티브 훅 중지 실패: {e}");
        }

        let handles = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(e) => {
                warn!("훅 태스크 목록 잠금 실패: {e}");
                Vec::new()
            }
        };
        for handle in handles {
            handle.abort();
        }
        info!("네이티브 훅 브리지 종료");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, RecordingHook};
    use playtrack_core::event_bus::MonitorEvent;
    use playtrack_core::models::game::{LauncherMode, LauncherSettings, MonitorMode, MonitorTarget};
    use playtrack_core::models::process::{ProcessEvent, ProcessEventType, TimerStatus};

    fn setup() -> (Fixture, Arc<RecordingHook>, HookBridge) {
        let fixture = Fixture::new();
        fixture.repo.insert(
            "folder-game",
            LauncherSettings::with_target(
                LauncherMode::File,
                MonitorTarget::new(MonitorMode::Folder, "D:/Games/Foo"),
            ),
            vec![],
        );
        fixture.repo.insert(
            "unset",
            LauncherSettings::with_target(
                LauncherMode::Url,
                MonitorTarget::new(MonitorMode::File, ""),
            ),
            vec![],
        );
        let registry = Arc::new(MonitorRegistry::new(fixture.ctx()));
        let hook = Arc::new(RecordingHook::default());
        let bridge = HookBridge::new(hook.clone(), registry, fixture.repo.clone());
        (fixture, hook, bridge)
    }

    #[tokio::test]
    async fn start_registers_only_configured_games() {
        let (_fixture, hook, bridge) = setup();
        bridge.start().await.unwrap();

        let known = hook.known.lock().unwrap().clone();
        assert_eq!(
            known,
            vec![KnownGame {
                path: "D:/Games/Foo".to_string(),
                id: "folder-game".to_string(),
            }]
        );
        bridge.stop().await;
        assert_eq!(hook.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hook_events_reach_registry() {
        let (fixture, hook, bridge) = setup();
        let mut rx = fixture.events.subscribe();
        bridge.start().await.unwrap();

        let sender = hook.events.lock().unwrap().clone().unwrap();
        sender
            .send(ProcessEvent {
                id: "folder-game".to_string(),
                event_type: ProcessEventType::Creation,
                full_path: "d:/games/foo/a.exe".to_string(),
                pid: 100,
            })
            .await
            .unwrap();
        sender
            .send(ProcessEvent {
                id: "folder-game".to_string(),
                event_type: ProcessEventType::Termination,
                full_path: "d:/games/foo/a.exe".to_string(),
                pid: 100,
            })
            .await
            .unwrap();

        let mut stopped = false;
        for _ in 0..100 {
            match rx.try_recv() {
                Ok(MonitorEvent::GameStopped { game_id, .. }) => {
                    assert_eq!(game_id, "folder-game");
                    stopped = true;
                    break;
                }
                Ok(_) => {}
                Err(_) => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
        assert!(stopped);
        bridge.stop().await;
    }

    #[tokio::test]
    async fn foreground_updates_timer_status() {
        let (_fixture, hook, bridge) = setup();
        bridge.start().await.unwrap();
        bridge
            .registry
            .start_phantom_monitor("folder-game", Some("D:/Games/Foo/a.exe"), Some(1))
            .await;

        bridge
            .enable_foreground_timer(Duration::from_millis(3000))
            .await
            .unwrap();
        let fg = hook.foreground.lock().unwrap().clone().unwrap();
        fg.send(None).await.unwrap();

        let registry = Arc::clone(&bridge.registry);
        let mut paused = false;
        for _ in 0..100 {
            if registry.timer_statuses().await[0].status == TimerStatus::Paused {
                paused = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(paused);

        bridge.stop().await;
        assert!(hook.foreground.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_replaces_known_games() {
        let (fixture, hook, bridge) = setup();
        bridge.start().await.unwrap();
        fixture.repo.insert(
            "new-game",
            LauncherSettings::with_target(
                LauncherMode::File,
                MonitorTarget::new(MonitorMode::Process, "new.exe"),
            ),
            vec![],
        );

        bridge.refresh_known_games().await.unwrap();
        assert_eq!(hook.replace_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hook.known.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_hook_start_is_reported() {
        let (_fixture, hook, bridge) = setup();
        hook.fail_start.store(true, Ordering::SeqCst);
        assert!(matches!(
            bridge.start().await,
            Err(CoreError::Unsupported(_))
        ));
    }
}
