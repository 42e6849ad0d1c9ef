//! 게임 라이프사이클 이벤트 버스.
//!
//! `tokio::broadcast` 기반. UI/트레이/로그 구독자에게 알림을 라우팅한다.

use crate::models::process::TimerStatusEntry;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// 감시 서브시스템이 발행하는 알림
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// 게임 세션 시작 (레지스트리 최초 등록)
    GameStarted { game_id: String },
    /// 게임 실행 감지
    GameLaunched { game_id: String, source: String },
    /// 종료 처리 시작 (메인 창 포커스 요청)
    GameExiting { game_id: String },
    /// 종료 처리 완료
    GameExited { game_id: String },
    /// 세션 종료 (세션 길이, 밀리초)
    GameStopped { game_id: String, duration_ms: u64 },
    /// 활성 게임 전체의 타이머 상태
    TimerStatusChanged { statuses: Vec<TimerStatusEntry> },
}

impl MonitorEvent {
    /// 외부 채널 이름
    pub fn channel(&self) -> &'static str {
        match self {
            Self::GameStarted { .. } => "game:started",
            Self::GameLaunched { .. } => "game:launched",
            Self::GameExiting { .. } => "game:exiting",
            Self::GameExited { .. } => "game:exited",
            Self::GameStopped { .. } => "game:stopped",
            Self::TimerStatusChanged { .. } => "monitor:timer-status-change",
        }
    }

    /// 이벤트 대상 게임 ID (상태 브로드캐스트는 None)
    pub fn game_id(&self) -> Option<&str> {
        match self {
            Self::GameStarted { game_id }
            | Self::GameLaunched { game_id, .. }
            | Self::GameExiting { game_id }
            | Self::GameExited { game_id }
            | Self::GameStopped { game_id, .. } => Some(game_id),
            Self::TimerStatusChanged { .. } => None,
        }
    }
}

/// 이벤트 버스 (복제 시 같은 채널 공유)
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 이벤트 발행. 구독자가 없어도 에러가 아니다.
    pub fn publish(&self, event: MonitorEvent) {
        debug!("이벤트 발행: {}", event.channel());
        let _ = self.tx.send(event);
    }

    /// 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
