//! 플레이 기록 (GameRepository 포트 구현).
//!
//! 세션은 시작 시각 순으로 보관하고, 누적 시간 증가는 한 문장으로 처리한다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playtrack_core::error::CoreError;
use playtrack_core::models::game::{GameRecord, LauncherSettings, TimerEntry};
use playtrack_core::ports::storage::GameRepository;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use super::library::{read_game_ids, read_launcher, read_save_paths};
use super::{ensure_game, format_time, parse_time, SqliteGameStore};

fn to_sql_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

fn from_sql_ms(ms: i64) -> u64 {
    u64::try_from(ms).unwrap_or(0)
}

fn read_timers(conn: &Connection, game_id: &str) -> Result<Vec<TimerEntry>, CoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT start_time, end_time FROM game_timers WHERE game_id = ?1 ORDER BY start_time, id",
        )
        .map_err(|e| CoreError::Internal(format!("쿼리 준비 실패: {e}")))?;

    let rows: Vec<(String, String)> = stmt
        .query_map([game_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| CoreError::Internal(format!("쿼리 실행 실패: {e}")))?
        .filter_map(|r| r.ok())
        .collect();

    rows.iter()
        .map(|(start, end)| {
            Ok(TimerEntry {
                start: parse_time(start)?,
                end: parse_time(end)?,
            })
        })
        .collect()
}

#[async_trait]
impl GameRepository for SqliteGameStore {
    async fn list_game_ids(&self) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;
        read_game_ids(&conn)
    }

    async fn launcher_settings(&self, game_id: &str) -> Result<LauncherSettings, CoreError> {
        let conn = self.lock()?;
        read_launcher(&conn, game_id)
    }

    async fn save_paths(&self, game_id: &str) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;
        read_save_paths(&conn, game_id)
    }

    async fn game_record(&self, game_id: &str) -> Result<GameRecord, CoreError> {
        let conn = self.lock()?;

        let row: Option<(i64, Option<String>)> = conn
            .query_row(
                "SELECT play_time_ms, last_run_date FROM games WHERE id = ?1",
                [game_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| CoreError::Internal(format!("플레이 기록 조회 실패: {e}")))?;

        let Some((play_time_ms, last_run_date)) = row else {
            return Err(CoreError::game_not_found(game_id));
        };

        Ok(GameRecord {
            timers: read_timers(&conn, game_id)?,
            play_time_ms: from_sql_ms(play_time_ms),
            last_run_date: last_run_date.as_deref().map(parse_time).transpose()?,
        })
    }

    async fn append_timer(&self, game_id: &str, entry: TimerEntry) -> Result<(), CoreError> {
        let conn = self.lock()?;
        ensure_game(&conn, game_id)?;

        conn.execute(
            "INSERT INTO game_timers (game_id, start_time, end_time, duration_ms) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                game_id,
                format_time(&entry.start),
                format_time(&entry.end),
                to_sql_ms(entry.duration_ms())
            ],
        )
        .map_err(|e| CoreError::Internal(format!("세션 저장 실패: {e}")))?;

        debug!("게임 {} 세션 저장 ({}ms)", game_id, entry.duration_ms());
        Ok(())
    }

    async fn set_last_run_date(&self, game_id: &str, at: DateTime<Utc>) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE games SET last_run_date = ?2 WHERE id = ?1",
                rusqlite::params![game_id, format_time(&at)],
            )
            .map_err(|e| CoreError::Internal(format!("마지막 실행 시각 저장 실패: {e}")))?;

        if updated == 0 {
            return Err(CoreError::game_not_found(game_id));
        }
        Ok(())
    }

    async fn add_play_time(&self, game_id: &str, duration_ms: u64) -> Result<u64, CoreError> {
        let conn = self.lock()?;
        let total: Option<i64> = conn
            .query_row(
                "UPDATE games SET play_time_ms = play_time_ms + ?2 WHERE id = ?1 RETURNING play_time_ms",
                rusqlite::params![game_id, to_sql_ms(duration_ms)],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CoreError::Internal(format!("플레이 시간 갱신 실패: {e}")))?;

        match total {
            Some(total) => Ok(from_sql_ms(total)),
            None => Err(CoreError::game_not_found(game_id)),
        }
    }
}
