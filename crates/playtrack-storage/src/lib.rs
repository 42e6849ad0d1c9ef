//! # playtrack-storage
//!
//! 로컬 저장소 어댑터.
//! SQLite 기반 게임 라이브러리/플레이 기록 저장, 스키마 마이그레이션,
//! 세이브 데이터 백업을 관리한다.
//!
//! ## 모듈
//! - `sqlite`: 게임 저장소 (GameRepository 구현)
//! - `backup`: 세이브 백업 (SaveBackup 구현)
//! - `migration`: 스키마 마이그레이션

pub mod backup;
pub mod migration;
pub mod sqlite;
