//! # playtrack-core
//!
//! PlayTrack 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 도메인 데이터 구조체 (serde Serialize/Deserialize)
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)
//! - [`event_bus`]: 게임 라이프사이클 알림 브로드캐스트

pub mod config;
pub mod config_manager;
pub mod error;
pub mod event_bus;
pub mod models;
pub mod ports;

#[cfg(test)]
mod tests {
    use crate::models::game::{GameRecord, TimerEntry};
    use crate::models::process::TimerStatus;
    use chrono::{Duration, Utc};

    #[test]
    fn timer_entry_serde_keeps_duration() {
        let start = Utc::now();
        let entry = TimerEntry {
            start,
            end: start + Duration::minutes(3),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"start\""));
        assert!(json.contains("\"end\""));

        let back: TimerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.duration_ms(), 180_000);
    }

    #[test]
    fn game_record_total_matches_timer_sum() {
        let t0 = Utc::now();
        let record = GameRecord {
            timers: vec![
                TimerEntry {
                    start: t0,
                    end: t0 + Duration::seconds(10),
                },
                TimerEntry {
                    start: t0 + Duration::seconds(60),
                    end: t0 + Duration::seconds(90),
                },
            ],
            play_time_ms: 40_000,
            last_run_date: None,
        };
        assert_eq!(record.timers_total_ms(), record.play_time_ms);
    }

    #[test]
    fn timer_status_serializes_lowercase() {
        let json = serde_json::to_string(&TimerStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }

    #[test]
    fn config_defaults() {
        let config = crate::config::AppConfig::default_config();
        assert_eq!(config.monitor.check_interval_ms, 5_000);
        assert_eq!(config.monitor.auto_scan_interval_ms, 10_000);
        assert_eq!(
            config.monitor.executable_extensions,
            vec![".exe".to_string(), ".bat".to_string(), ".cmd".to_string()]
        );
        assert_eq!(config.linkage.magpie_hotkey, "win+alt+a");
    }
}
