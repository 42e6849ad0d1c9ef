//! 애플리케이션 설정 구조체.
//!
//! 프로세스 감시 방식, 감시 주기, 종료 재시도 정책, 저장소 경로,
//! 외부 연동(디스플레이 스케일링) 설정을 정의한다. JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 프로세스 감시 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 외부 프로그램 연동 설정
    #[serde(default)]
    pub linkage: LinkageConfig,
}

// ============================================================
// 감시 설정
// ============================================================

/// 프로세스 감지 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMonitorMode {
    /// 네이티브 훅 (생성/종료 이벤트 푸시)
    #[default]
    Native,
    /// 레거시 폴링 (주기적 프로세스 테이블 스캔)
    Legacy,
}

impl std::fmt::Display for ProcessMonitorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

impl std::str::FromStr for ProcessMonitorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "new" => Ok(Self::Native),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("알 수 없는 감시 방식: {other}")),
        }
    }
}

/// 프로세스 감시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 감지 방식
    #[serde(default)]
    pub process_monitor: ProcessMonitorMode,
    /// 게임별 체크 루프 주기 (밀리초)
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// 폴링 폴백 스캔 주기 (밀리초)
    #[serde(default = "default_auto_scan_interval_ms")]
    pub auto_scan_interval_ms: u64,
    /// 스냅샷 비교 훅의 폴링 주기 (밀리초)
    #[serde(default = "default_hook_poll_interval_ms")]
    pub hook_poll_interval_ms: u64,
    /// 폴더 모드에서 실행 파일로 간주할 확장자
    #[serde(default = "default_executable_extensions")]
    pub executable_extensions: Vec<String>,
    /// 포그라운드 기반 타이머 일시정지 사용
    #[serde(default)]
    pub enable_foreground_timer: bool,
    /// 포그라운드 전환 판정 대기 (밀리초)
    #[serde(default = "default_foreground_wait_time_ms")]
    pub foreground_wait_time_ms: u64,
    /// 강제 종료 최대 재시도 횟수
    #[serde(default = "default_terminate_max_retries")]
    pub terminate_max_retries: u32,
    /// 강제 종료 재시도 간격 (밀리초)
    #[serde(default = "default_terminate_retry_delay_ms")]
    pub terminate_retry_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            process_monitor: ProcessMonitorMode::default(),
            check_interval_ms: default_check_interval_ms(),
            auto_scan_interval_ms: default_auto_scan_interval_ms(),
            hook_poll_interval_ms: default_hook_poll_interval_ms(),
            executable_extensions: default_executable_extensions(),
            enable_foreground_timer: false,
            foreground_wait_time_ms: default_foreground_wait_time_ms(),
            terminate_max_retries: default_terminate_max_retries(),
            terminate_retry_delay_ms: default_terminate_retry_delay_ms(),
        }
    }
}

impl MonitorConfig {
    /// 체크 루프 주기를 Duration으로 반환
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// 폴링 폴백 스캔 주기를 Duration으로 반환
    pub fn auto_scan_interval(&self) -> Duration {
        Duration::from_millis(self.auto_scan_interval_ms)
    }

    /// 스냅샷 훅 주기를 Duration으로 반환
    pub fn hook_poll_interval(&self) -> Duration {
        Duration::from_millis(self.hook_poll_interval_ms)
    }

    pub fn terminate_retry_delay(&self) -> Duration {
        Duration::from_millis(self.terminate_retry_delay_ms)
    }
}

// ============================================================
// 저장소 설정
// ============================================================

/// 로컬 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite DB 파일 경로 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// 세이브 백업 루트 디렉토리 (None이면 데이터 디렉토리 하위 `backups`)
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    /// 게임별 보관할 최대 백업 수
    #[serde(default = "default_max_backups_per_game")]
    pub max_backups_per_game: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            backup_dir: None,
            max_backups_per_game: default_max_backups_per_game(),
        }
    }
}

// ============================================================
// 외부 연동 설정
// ============================================================

/// 외부 프로그램 연동 설정 (Magpie 디스플레이 스케일러)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkageConfig {
    /// 스케일러 실행 파일 경로
    #[serde(default)]
    pub magpie_path: Option<String>,
    /// 스케일링 토글 단축키 (예: "win+alt+a")
    #[serde(default = "default_magpie_hotkey")]
    pub magpie_hotkey: String,
    /// 스케일러 기동 후 단축키 전송까지 대기 (밀리초)
    #[serde(default = "default_magpie_settle_ms")]
    pub magpie_settle_ms: u64,
}

impl Default for LinkageConfig {
    fn default() -> Self {
        Self {
            magpie_path: None,
            magpie_hotkey: default_magpie_hotkey(),
            magpie_settle_ms: default_magpie_settle_ms(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            storage: StorageConfig::default(),
            linkage: LinkageConfig::default(),
        }
    }

    /// 스케일러 경로가 설정되어 있는지 여부 (빈 문자열은 미설정)
    pub fn has_magpie(&self) -> bool {
        self.linkage
            .magpie_path
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_check_interval_ms() -> u64 {
    5_000
}
fn default_auto_scan_interval_ms() -> u64 {
    10_000
}
fn default_hook_poll_interval_ms() -> u64 {
    1_000
}
fn default_executable_extensions() -> Vec<String> {
    vec![".exe".to_string(), ".bat".to_string(), ".cmd".to_string()]
}
fn default_foreground_wait_time_ms() -> u64 {
    3_000
}
fn default_terminate_max_retries() -> u32 {
    3
}
fn default_terminate_retry_delay_ms() -> u64 {
    100
}
fn default_max_backups_per_game() -> usize {
    5
}
fn default_magpie_hotkey() -> String {
    "win+alt+a".to_string()
}
fn default_magpie_settle_ms() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{ "monitor": { "process_monitor": "legacy" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.monitor.process_monitor, ProcessMonitorMode::Legacy);
        assert_eq!(config.monitor.check_interval_ms, 5_000);
        assert_eq!(config.monitor.terminate_max_retries, 3);
        assert_eq!(config.storage.max_backups_per_game, 5);
        assert!(config.linkage.magpie_path.is_none());
    }

    #[test]
    fn monitor_mode_parses_aliases() {
        assert_eq!(
            "new".parse::<ProcessMonitorMode>().unwrap(),
            ProcessMonitorMode::Native
        );
        assert_eq!(
            "LEGACY".parse::<ProcessMonitorMode>().unwrap(),
            ProcessMonitorMode::Legacy
        );
        assert!("hybrid".parse::<ProcessMonitorMode>().is_err());
    }

    #[test]
    fn blank_magpie_path_counts_as_unset() {
        let mut config = AppConfig::default_config();
        assert!(!config.has_magpie());
        config.linkage.magpie_path = Some("   ".to_string());
        assert!(!config.has_magpie());
        config.linkage.magpie_path = Some("C:/Tools/Magpie.exe".to_string());
        assert!(config.has_magpie());
    }
}
