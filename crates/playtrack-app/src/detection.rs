//! 게임 감지 생산자 선택.
//!
//! 설정의 감지 방식에 따라 네이티브 훅 브리지 또는 폴링 폴백 중 하나만 실행한다.
//! 네이티브 훅을 시작하지 못하면 폴링 폴백으로 전환한다.

use playtrack_core::config::{MonitorConfig, ProcessMonitorMode};
use playtrack_core::ports::hook::NativeProcessHook;
use playtrack_core::ports::process::ProcessSnapshotProvider;
use playtrack_core::ports::storage::GameRepository;
use playtrack_monitor::hook_bridge::HookBridge;
use playtrack_monitor::poller::PollingFallback;
use playtrack_monitor::registry::MonitorRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 생산자 생성에 필요한 의존성
#[derive(Clone)]
pub struct DetectionDeps {
    pub registry: Arc<MonitorRegistry>,
    pub repository: Arc<dyn GameRepository>,
    pub snapshot: Arc<dyn ProcessSnapshotProvider>,
    pub hook: Arc<dyn NativeProcessHook>,
}

/// 실행 중인 감지 생산자
pub enum Detection {
    Native(Arc<HookBridge>),
    Polling(Arc<PollingFallback>),
}

impl Detection {
    /// 요청한 방식으로 시작
    pub async fn start(mode: ProcessMonitorMode, deps: &DetectionDeps, config: &MonitorConfig) -> Self {
        if mode == ProcessMonitorMode::Native {
            let bridge = Arc::new(HookBridge::new(
                Arc::clone(&deps.hook),
                Arc::clone(&deps.registry),
                Arc::clone(&deps.repository),
            ));
            match bridge.start().await {
                Ok(()) => {
                    if config.enable_foreground_timer {
                        let wait = Duration::from_millis(config.foreground_wait_time_ms);
                        if let Err(e) = bridge.enable_foreground_timer(wait).await {
                            warn!("포그라운드 타이머 사용 불가: {e}");
                        }
                    }
                    info!("감지 방식: 네이티브 훅");
                    return Self::Native(bridge);
                }
                Err(e) => warn!("네이티브 훅 시작 실패, 폴링 폴백으로 전환: {e}"),
            }
        }

        let poller = Arc::new(PollingFallback::new(
            Arc::clone(&deps.registry),
            Arc::clone(&deps.repository),
            Arc::clone(&deps.snapshot),
            config.auto_scan_interval(),
        ));
        poller.start().await;
        info!("감지 방식: 폴링");
        Self::Polling(poller)
    }

    /// 실제로 동작 중인 방식
    pub fn mode(&self) -> ProcessMonitorMode {
        match self {
            Self::Native(_) => ProcessMonitorMode::Native,
            Self::Polling(_) => ProcessMonitorMode::Legacy,
        }
    }

    /// 새 감지 중단 (폴링 루프 정지)
    pub async fn halt(&self) {
        if let Self::Polling(poller) = self {
            poller.stop().await;
        }
    }

    /// 훅 해제
    pub async fn teardown(&self) {
        if let Self::Native(bridge) = self {
            bridge.stop().await;
        }
    }
}
