//! 헤드리스 셸 연동.
//!
//! 창/트레이가 없는 실행 환경용 `ShellIntegration` 구현.
//! 메인 창 포커스 요청은 로그로만 남기고, 최근 플레이 목록은 저장소에서 계산해 기록한다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playtrack_core::error::CoreError;
use playtrack_core::ports::integration::ShellIntegration;
use playtrack_core::ports::storage::GameRepository;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 트레이 최근 목록 크기
const RECENT_GAMES_LIMIT: usize = 5;

pub struct HeadlessShell {
    repository: Arc<dyn GameRepository>,
    recent: Mutex<Vec<String>>,
}

impl HeadlessShell {
    pub fn new(repository: Arc<dyn GameRepository>) -> Self {
        Self {
            repository,
            recent: Mutex::new(Vec::new()),
        }
    }

    /// 마지막으로 계산한 최근 플레이 목록 (최신순)
    pub fn recent_games(&self) -> Vec<String> {
        match self.recent.lock() {
            Ok(recent) => recent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ShellIntegration for HeadlessShell {
    async fn focus_main_window(&self, game_id: &str) -> Result<(), CoreError> {
        info!("메인 창 포커스 요청 (게임 {} 종료 중)", game_id);
        Ok(())
    }

    async fn refresh_recent_games(&self) -> Result<(), CoreError> {
        let mut played: Vec<(DateTime<Utc>, String)> = Vec::new();
        for id in self.repository.list_game_ids().await? {
            match self.repository.game_record(&id).await {
                Ok(record) => {
                    if let Some(at) = record.last_run_date {
                        played.push((at, id));
                    }
                }
                Err(e) => warn!("게임 {} 기록 조회 실패: {e}", id),
            }
        }
        played.sort_by(|a, b| b.0.cmp(&a.0));

        let recent: Vec<String> = played
            .into_iter()
            .take(RECENT_GAMES_LIMIT)
            .map(|(_, id)| id)
            .collect();
        info!("최근 플레이 목록 갱신: {:?}", recent);

        let mut slot = self
            .recent
            .lock()
            .map_err(|e| CoreError::Internal(format!("최근 목록 잠금 실패: {e}")))?;
        *slot = recent;
        Ok(())
    }
}
