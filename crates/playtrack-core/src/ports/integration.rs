//! 종료 처리 부수효과 포트.
//!
//! 메인 창/트레이, 세이브 백업, 디스플레이 스케일링.
//! 구현: `playtrack-app` (셸, 스케일러), `playtrack-storage` (백업)

use async_trait::async_trait;

use crate::error::CoreError;

/// 데스크톱 셸 연동 (메인 창, 트레이)
#[async_trait]
pub trait ShellIntegration: Send + Sync {
    /// 메인 창 표시 및 포커스
    async fn focus_main_window(&self, game_id: &str) -> Result<(), CoreError>;

    /// 트레이의 최근 플레이 목록 갱신
    async fn refresh_recent_games(&self) -> Result<(), CoreError>;
}

/// 세이브 데이터 백업
#[async_trait]
pub trait SaveBackup: Send + Sync {
    /// 세이브 경로 전체를 새 백업으로 복사
    async fn backup_game_save(&self, game_id: &str, save_paths: &[String])
        -> Result<(), CoreError>;
}

/// 외부 디스플레이 스케일러
#[async_trait]
pub trait DisplayScaler: Send + Sync {
    /// 스케일링 적용. 실제로 적용했으면 true.
    async fn scale(&self, game_id: &str) -> Result<bool, CoreError>;
}
