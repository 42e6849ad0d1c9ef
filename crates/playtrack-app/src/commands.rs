//! 사용자 명령.
//!
//! 게임 감시 시작, 강제 종료, 감지 방식 전환, 알려진 게임 갱신.
//! 루프/콜백과 달리 명령은 실패를 호출자에게 그대로 돌려준다.

use playtrack_core::config::ProcessMonitorMode;
use playtrack_core::config_manager::ConfigManager;
use playtrack_core::error::CoreError;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::detection::{Detection, DetectionDeps};

pub struct MonitorCommands {
    config: ConfigManager,
    deps: DetectionDeps,
    detection: Mutex<Detection>,
}

impl MonitorCommands {
    pub fn new(config: ConfigManager, deps: DetectionDeps, detection: Detection) -> Self {
        Self {
            config,
            deps,
            detection: Mutex::new(detection),
        }
    }

    pub async fn current_mode(&self) -> ProcessMonitorMode {
        self.detection.lock().await.mode()
    }

    /// 게임 감시 시작. 네이티브 방식은 pid 없이 등록만 하고, 폴링 방식은 체크 루프를 시작한다.
    pub async fn start_monitor(&self, game_id: &str) -> Result<(), CoreError> {
        self.deps.repository.launcher_settings(game_id).await?;

        let detection = self.detection.lock().await;
        match &*detection {
            Detection::Native(_) => {
                self.deps
                    .registry
                    .start_phantom_monitor(game_id, None, None)
                    .await;
                Ok(())
            }
            Detection::Polling(_) => self.deps.registry.start_monitor(game_id).await,
        }
    }

    /// 실행 중인 게임 강제 종료. 모든 프로세스를 종료했으면 true.
    pub async fn stop_game(&self, game_id: &str) -> Result<bool, CoreError> {
        info!("게임 {} 강제 종료 요청", game_id);
        self.deps.registry.request_stop(game_id).await
    }

    /// 감지 방식 전환. 실행 중인 게임이 있으면 `Conflict`.
    ///
    /// 프로세스 없이 등록만 된 모니터는 전환 전에 제거한다.
    pub async fn change_process_monitor(
        &self,
        mode: ProcessMonitorMode,
    ) -> Result<ProcessMonitorMode, CoreError> {
        let mut detection = self.detection.lock().await;

        let registry = &self.deps.registry;
        let mut idle = Vec::new();
        for game_id in registry.active_game_ids().await {
            match registry.status(&game_id).await {
                Some(status) if status.is_running => {
                    return Err(CoreError::Conflict(format!(
                        "실행 중인 게임({game_id})이 있어 감지 방식을 바꿀 수 없음"
                    )));
                }
                _ => idle.push(game_id),
            }
        }
        for game_id in idle {
            if registry.remove_monitor_stub(&game_id).await {
                debug!("게임 {} 대기 모니터 제거", game_id);
            }
        }

        detection.halt().await;
        detection.teardown().await;

        let config = self.config.update_with(|c| c.monitor.process_monitor = mode)?;
        *detection = Detection::start(mode, &self.deps, &config.monitor).await;

        let active = detection.mode();
        info!("감지 방식 전환: 요청 {}, 적용 {}", mode, active);
        Ok(active)
    }

    /// 게임 목록 변경 후 호출. 네이티브 방식에서만 훅 목록을 교체한다.
    pub async fn refresh_known_games(&self) -> Result<(), CoreError> {
        match &*self.detection.lock().await {
            Detection::Native(bridge) => bridge.refresh_known_games().await,
            Detection::Polling(_) => {
                debug!("폴링 방식은 매 주기 저장소를 읽으므로 갱신 불필요");
                Ok(())
            }
        }
    }

    /// 생산자 중단 → 레지스트리 종료 → 훅 해제
    pub async fn shutdown(&self) {
        let detection = self.detection.lock().await;
        detection.halt().await;
        self.deps.registry.shutdown().await;
        detection.teardown().await;
    }
}
