//! 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리.

use rusqlite::Connection;
use tracing::{debug, info};

/// 현재 스키마 버전
const CURRENT_VERSION: u32 = 2;

/// 스키마 마이그레이션 실행
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// 현재 스키마 버전 조회
fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: games + launch_profiles 테이블
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: games + launch_profiles 테이블");

    conn.execute_batch(
        "
        -- 게임 라이브러리 (세이브 경로는 JSON 배열)
        CREATE TABLE IF NOT EXISTS games (
            id TEXT PRIMARY KEY,
            launcher_mode TEXT NOT NULL DEFAULT 'file',
            use_magpie INTEGER NOT NULL DEFAULT 0,
            save_paths TEXT NOT NULL DEFAULT '[]',
            play_time_ms INTEGER NOT NULL DEFAULT 0,
            last_run_date TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 실행기 모드별 감시 대상
        CREATE TABLE IF NOT EXISTS launch_profiles (
            game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            launcher_mode TEXT NOT NULL,
            monitor_mode TEXT NOT NULL,
            monitor_path TEXT NOT NULL,
            PRIMARY KEY (game_id, launcher_mode)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    info!("마이그레이션 V1 완료");
    Ok(())
}

/// V2: game_timers 테이블 (플레이 세션)
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V2 실행: game_timers 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS game_timers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            duration_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_game_timers_game_start ON game_timers(game_id, start_time);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;

    info!("마이그레이션 V2 완료");
    Ok(())
}
