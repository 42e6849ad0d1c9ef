//! PlayTrack 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 에러 타입에서 `#[from] CoreError`로 래핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 설정, 유효성 검증, 프로세스 제어, 저장소 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Game", "Monitor")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 종료 대상 프로세스가 이미 없음 (종료 성공으로 간주)
    #[error("프로세스 없음: {0}")]
    ProcessNotFound(String),

    /// 프로세스 종료 실패
    #[error("프로세스 종료 실패: {0}")]
    Termination(String),

    /// 프로세스 스냅샷 수집 실패
    #[error("프로세스 스냅샷 실패: {0}")]
    Snapshot(String),

    /// 현재 플랫폼/어댑터에서 지원하지 않는 기능
    #[error("미지원 기능: {0}")]
    Unsupported(String),

    /// 상태 충돌 (이미 실행 중 등)
    #[error("상태 충돌: {0}")]
    Conflict(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 게임 미발견 에러 생성
    pub fn game_not_found(game_id: &str) -> Self {
        Self::NotFound {
            resource_type: "Game".to_string(),
            id: game_id.to_string(),
        }
    }
}
