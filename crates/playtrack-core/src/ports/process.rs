//! 프로세스 조회/종료 포트.
//!
//! 구현: `playtrack-monitor` crate (sysinfo)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::process::ProcessEntry;

/// 프로세스 스냅샷 제공자
#[async_trait]
pub trait ProcessSnapshotProvider: Send + Sync {
    /// 현재 실행 중인 전체 프로세스 목록 (시점 스냅샷)
    async fn list(&self) -> Result<Vec<ProcessEntry>, CoreError>;
}

/// 프로세스 강제 종료
///
/// 대상이 없으면 `CoreError::ProcessNotFound`를 반환한다.
#[async_trait]
pub trait ProcessTerminator: Send + Sync {
    /// 실행 파일 경로가 일치하는 프로세스 종료. 종료한 개수 반환.
    async fn kill_by_path(&self, path: &str) -> Result<usize, CoreError>;

    /// 프로세스 이름이 일치하는 프로세스 종료 (대소문자 무시). 종료한 개수 반환.
    async fn kill_by_name(&self, name: &str) -> Result<usize, CoreError>;
}
