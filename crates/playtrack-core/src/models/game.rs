//! 게임 라이브러리 모델.
//!
//! 실행기 설정(감시 모드/경로), 세이브 경로, 플레이 기록.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 실행기 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LauncherMode {
    /// 실행 파일 직접 실행
    #[default]
    File,
    /// 스크립트 실행
    Script,
    /// URL 프로토콜 실행 (스토어 클라이언트 등)
    Url,
}

impl LauncherMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Script => "script",
            Self::Url => "url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "script" => Some(Self::Script),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

/// 프로세스 감시 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// 단일 실행 파일 경로
    #[default]
    File,
    /// 폴더 하위의 모든 실행 파일
    Folder,
    /// 경로 없이 프로세스 이름만
    Process,
}

impl MonitorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
            Self::Process => "process",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "folder" => Some(Self::Folder),
            "process" => Some(Self::Process),
            _ => None,
        }
    }
}

/// 감시 대상 (모드 + 경로 또는 프로세스 이름)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorTarget {
    pub monitor_mode: MonitorMode,
    pub monitor_path: String,
}

impl MonitorTarget {
    pub fn new(monitor_mode: MonitorMode, monitor_path: impl Into<String>) -> Self {
        Self {
            monitor_mode,
            monitor_path: monitor_path.into(),
        }
    }

    /// 경로가 비어 있지 않은지 여부
    pub fn is_configured(&self) -> bool {
        !self.monitor_path.trim().is_empty()
    }
}

/// 게임별 실행기 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherSettings {
    #[serde(default)]
    pub mode: LauncherMode,
    #[serde(default)]
    pub file_config: Option<MonitorTarget>,
    #[serde(default)]
    pub script_config: Option<MonitorTarget>,
    #[serde(default)]
    pub url_config: Option<MonitorTarget>,
    /// 실행 시 디스플레이 스케일링 사용
    #[serde(default)]
    pub use_magpie: bool,
}

impl LauncherSettings {
    /// 현재 실행기 모드에 해당하는 감시 대상
    pub fn active_target(&self) -> Option<&MonitorTarget> {
        match self.mode {
            LauncherMode::File => self.file_config.as_ref(),
            LauncherMode::Script => self.script_config.as_ref(),
            LauncherMode::Url => self.url_config.as_ref(),
        }
    }

    /// 단일 대상으로 설정 생성 (해당 모드 슬롯에 배치)
    pub fn with_target(mode: LauncherMode, target: MonitorTarget) -> Self {
        let mut settings = Self {
            mode,
            ..Self::default()
        };
        match mode {
            LauncherMode::File => settings.file_config = Some(target),
            LauncherMode::Script => settings.script_config = Some(target),
            LauncherMode::Url => settings.url_config = Some(target),
        }
        settings
    }
}

/// 라이브러리에 등록된 게임
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEntry {
    pub id: String,
    pub launcher: LauncherSettings,
    #[serde(default)]
    pub save_paths: Vec<String>,
}

impl GameEntry {
    pub fn has_save_paths(&self) -> bool {
        has_save_paths(&self.save_paths)
    }
}

/// 세이브 경로 설정 여부. `[""]`는 미설정으로 취급한다.
pub fn has_save_paths(paths: &[String]) -> bool {
    paths.iter().any(|p| !p.trim().is_empty())
}

/// 한 세션의 시작/종료 시각
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEntry {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimerEntry {
    /// 세션 길이 (밀리초, 음수는 0)
    pub fn duration_ms(&self) -> u64 {
        u64::try_from((self.end - self.start).num_milliseconds()).unwrap_or(0)
    }
}

/// 게임 플레이 기록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// 시간순 세션 목록
    pub timers: Vec<TimerEntry>,
    /// 누적 플레이 시간 (밀리초)
    pub play_time_ms: u64,
    pub last_run_date: Option<DateTime<Utc>>,
}

impl GameRecord {
    /// 세션 목록에서 계산한 누적 시간
    pub fn timers_total_ms(&self) -> u64 {
        self.timers.iter().map(TimerEntry::duration_ms).sum()
    }
}
