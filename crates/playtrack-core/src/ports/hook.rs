//! 네이티브 프로세스 훅 포트.
//!
//! OS 수준 프로세스 생성/종료 및 포그라운드 창 변경 알림.
//! 콜백은 `mpsc::Sender` 싱크로 모델링한다.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;
use crate::models::process::{KnownGame, ProcessEvent};

/// 네이티브 훅 모듈
#[async_trait]
pub trait NativeProcessHook: Send + Sync {
    /// 알려진 게임 경로 등록 후 감시 시작
    async fn start_monitoring(
        &self,
        known_games: Vec<KnownGame>,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<(), CoreError>;

    /// 감시 중지
    async fn stop_monitoring(&self) -> Result<(), CoreError>;

    /// 알려진 게임 목록 교체
    async fn replace_known_games(&self, known_games: Vec<KnownGame>) -> Result<(), CoreError>;

    /// 포그라운드 훅 설치. 싱크는 전면 게임 ID(없으면 None)를 받는다.
    async fn install_foreground_hook(
        &self,
        foreground: mpsc::Sender<Option<String>>,
        wait_time: Duration,
    ) -> Result<(), CoreError>;

    /// 포그라운드 훅 해제
    async fn uninstall_foreground_hook(&self) -> Result<(), CoreError>;
}
