//! 프로세스 감시 모델.
//!
//! 프로세스 스냅샷 행, 게임별 감시 대상 프로세스, 감시 상태,
//! 네이티브 훅 이벤트 계약.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 프로세스 스냅샷의 한 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEntry {
    /// 프로세스 이름 (예: "game.exe")
    pub name: String,
    pub pid: u32,
    /// 실행 파일 전체 경로 (권한 부족 시 None)
    pub executable_path: Option<String>,
    /// 전체 명령줄
    pub command_line: Option<String>,
}

/// 게임 모니터가 감시하는 실행 파일 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredProcess {
    /// 파일 경로 또는 프로세스 이름
    pub path: String,
    pub pid: Option<u32>,
    pub is_running: bool,
    /// 이번 실행에서 스케일링이 적용되었는지
    pub is_scaled: bool,
    /// 경로 대신 프로세스 이름으로 비교
    pub is_process_name_mode: bool,
}

impl MonitoredProcess {
    /// 경로 기반 감시 대상
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pid: None,
            is_running: false,
            is_scaled: false,
            is_process_name_mode: false,
        }
    }

    /// 프로세스 이름 기반 감시 대상
    pub fn for_process_name(name: impl Into<String>) -> Self {
        Self {
            is_process_name_mode: true,
            ..Self::for_path(name)
        }
    }
}

/// 게임 모니터 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub game_id: String,
    pub is_running: bool,
    pub processes: Vec<MonitoredProcess>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// 포그라운드 기반 타이머 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Paused,
    #[default]
    Resumed,
}

/// 상태 브로드캐스트 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatusEntry {
    /// 게임 ID
    pub name: String,
    pub status: TimerStatus,
}

/// 네이티브 훅 이벤트 종류 (와이어 값 0/1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProcessEventType {
    Creation,
    Termination,
}

impl From<ProcessEventType> for u8 {
    fn from(value: ProcessEventType) -> Self {
        match value {
            ProcessEventType::Creation => 0,
            ProcessEventType::Termination => 1,
        }
    }
}

impl TryFrom<u8> for ProcessEventType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Creation),
            1 => Ok(Self::Termination),
            other => Err(format!("알 수 없는 이벤트 종류: {other}")),
        }
    }
}

/// 네이티브 훅이 전달하는 프로세스 생성/종료 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEvent {
    /// 게임 ID
    pub id: String,
    pub event_type: ProcessEventType,
    pub full_path: String,
    pub pid: u32,
}

/// 훅에 등록하는 (경로, 게임 ID) 쌍
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnownGame {
    pub path: String,
    pub id: String,
}
