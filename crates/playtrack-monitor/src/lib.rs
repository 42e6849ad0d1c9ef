//! # playtrack-monitor
//!
//! 게임 프로세스 감시 어댑터.
//! 프로세스 스냅샷(sysinfo), 게임별 모니터와 플레이 세션 기록,
//! 활성 모니터 레지스트리, 네이티브 훅 브리지, 폴링 폴백을 제공한다.

pub mod game_monitor;
pub mod hook_bridge;
pub mod matcher;
pub mod poller;
pub mod registry;
pub mod scan;
pub mod snapshot;
pub mod snapshot_hook;

#[cfg(test)]
mod test_support;
