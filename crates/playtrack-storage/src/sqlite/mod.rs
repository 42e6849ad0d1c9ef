//! SQLite 저장소 어댑터.
//!
//! `GameRepository` 포트 구현.
//!
//! # 모듈 구조
//! - `library`: 게임 라이브러리 (등록/삭제, 실행기 설정, 세이브 경로)
//! - `records`: 플레이 기록 (세션, 누적 시간) 및 포트 구현

mod library;
mod records;

use chrono::{DateTime, SecondsFormat, Utc};
use playtrack_core::error::CoreError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::migration;

/// SQLite 게임 저장소: `GameRepository` 포트 구현
pub struct SqliteGameStore {
    pub(super) conn: Mutex<Connection>,
}

impl SqliteGameStore {
    /// 파일 기반 SQLite 저장소 생성
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| CoreError::Internal(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            PRAGMA foreign_keys=ON;
            ",
        )
        .map_err(|e| CoreError::Internal(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Internal(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 저장소 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Internal(format!("인메모리 SQLite 생성 실패: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| CoreError::Internal(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Internal(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))
    }
}

/// 정렬 가능한 고정 형식 (UTC, 밀리초)
pub(super) fn format_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(super) fn parse_time(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::Internal(format!("시각 파싱 실패 ({raw}): {e}")))
}

/// 게임 존재 여부 확인. 없으면 `NotFound`.
pub(super) fn ensure_game(conn: &Connection, game_id: &str) -> Result<(), CoreError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM games WHERE id = ?1",
            [game_id],
            |row| row.get(0),
        )
        .map_err(|e| CoreError::Internal(format!("게임 조회 실패: {e}")))?;

    if count == 0 {
        return Err(CoreError::game_not_found(game_id));
    }
    Ok(())
}
