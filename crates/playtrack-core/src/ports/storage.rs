//! 게임 라이브러리/플레이 기록 저장소 포트.
//!
//! 구현: `playtrack-storage` crate (rusqlite)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::game::{GameRecord, LauncherSettings, TimerEntry};

/// 게임 설정 조회 및 플레이 기록 갱신
#[async_trait]
pub trait GameRepository: Send + Sync {
    // ============================================================
    // 조회
    // ============================================================

    /// 등록된 전체 게임 ID
    async fn list_game_ids(&self) -> Result<Vec<String>, CoreError>;

    /// 실행기 설정. 게임이 없으면 `NotFound`.
    async fn launcher_settings(&self, game_id: &str) -> Result<LauncherSettings, CoreError>;

    /// 세이브 경로 목록
    async fn save_paths(&self, game_id: &str) -> Result<Vec<String>, CoreError>;

    /// 플레이 기록
    async fn game_record(&self, game_id: &str) -> Result<GameRecord, CoreError>;

    // ============================================================
    // 기록
    // ============================================================

    /// 세션 추가 (시간순 유지)
    async fn append_timer(&self, game_id: &str, entry: TimerEntry) -> Result<(), CoreError>;

    /// 마지막 실행 시각 갱신
    async fn set_last_run_date(&self, game_id: &str, at: DateTime<Utc>) -> Result<(), CoreError>;

    /// 누적 플레이 시간 증가. 갱신된 누적값(밀리초) 반환.
    async fn add_play_time(&self, game_id: &str, duration_ms: u64) -> Result<u64, CoreError>;
}
