//! PlayTrack 도메인 모델.
//!
//! 게임 라이브러리 설정, 플레이 기록, 프로세스 감시 상태를 표현하는 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod game;
pub mod process;
