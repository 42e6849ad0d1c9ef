//! 이벤트 로그 싱크.
//!
//! 모니터 이벤트 버스를 구독해 채널 이름과 페이로드를 로그로 남긴다.
//! UI가 없는 환경에서 IPC 알림 대신 쓰인다.

use playtrack_core::event_bus::{EventBus, MonitorEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 로그 한 줄: `<채널> <JSON 페이로드>`
pub fn describe(event: &MonitorEvent) -> String {
    let payload = serde_json::to_string(event).unwrap_or_else(|e| format!("<직렬화 실패: {e}>"));
    format!("{} {}", event.channel(), payload)
}

/// 이벤트 로그 태스크 시작
pub fn spawn_event_log(events: &EventBus, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event @ MonitorEvent::TimerStatusChanged { .. }) => {
                        debug!("{}", describe(&event));
                    }
                    Ok(event) => info!("{}", describe(&event)),
                    Err(RecvError::Lagged(skipped)) => warn!("이벤트 로그 {}개 누락", skipped),
                    Err(RecvError::Closed) => break,
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("이벤트 로그 종료");
    })
}
