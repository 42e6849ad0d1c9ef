//! 게임 라이브러리 저장.
//!
//! 게임 등록/갱신/삭제, 실행기 설정과 세이브 경로 조회.

use playtrack_core::error::CoreError;
use playtrack_core::models::game::{
    GameEntry, LauncherMode, LauncherSettings, MonitorMode, MonitorTarget,
};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::SqliteGameStore;

impl SqliteGameStore {
    /// 게임 등록 또는 설정 갱신. 플레이 기록은 보존한다.
    pub fn upsert_game(&self, game: &GameEntry) -> Result<(), CoreError> {
        if game.id.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "id".to_string(),
                message: "게임 ID가 비어 있음".to_string(),
            });
        }
        let save_paths = serde_json::to_string(&game.save_paths)?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Internal(format!("트랜잭션 시작 실패: {e}")))?;

        tx.execute(
            "INSERT INTO games (id, launcher_mode, use_magpie, save_paths) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                launcher_mode = excluded.launcher_mode,
                use_magpie = excluded.use_magpie,
                save_paths = excluded.save_paths",
            rusqlite::params![
                game.id,
                game.launcher.mode.as_str(),
                game.launcher.use_magpie,
                save_paths
            ],
        )
        .map_err(|e| CoreError::Internal(format!("게임 저장 실패: {e}")))?;

        tx.execute("DELETE FROM launch_profiles WHERE game_id = ?1", [&game.id])
            .map_err(|e| CoreError::Internal(format!("실행 프로필 삭제 실패: {e}")))?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO launch_profiles (game_id, launcher_mode, monitor_mode, monitor_path)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| CoreError::Internal(format!("쿼리 준비 실패: {e}")))?;

            let profiles = [
                (LauncherMode::File, &game.launcher.file_config),
                (LauncherMode::Script, &game.launcher.script_config),
                (LauncherMode::Url, &game.launcher.url_config),
            ];
            for (mode, target) in profiles {
                if let Some(target) = target {
                    stmt.execute(rusqlite::params![
                        game.id,
                        mode.as_str(),
                        target.monitor_mode.as_str(),
                        target.monitor_path
                    ])
                    .map_err(|e| CoreError::Internal(format!("실행 프로필 저장 실패: {e}")))?;
                }
            }
        }

        tx.commit()
            .map_err(|e| CoreError::Internal(format!("트랜잭션 커밋 실패: {e}")))?;

        debug!("게임 저장: {}", game.id);
        Ok(())
    }

    /// 게임과 모든 기록 삭제. 삭제했으면 true.
    pub fn remove_game(&self, game_id: &str) -> Result<bool, CoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Internal(format!("트랜잭션 시작 실패: {e}")))?;

        tx.execute("DELETE FROM game_timers WHERE game_id = ?1", [game_id])
            .map_err(|e| CoreError::Internal(format!("세션 삭제 실패: {e}")))?;
        tx.execute("DELETE FROM launch_profiles WHERE game_id = ?1", [game_id])
            .map_err(|e| CoreError::Internal(format!("실행 프로필 삭제 실패: {e}")))?;
        let removed = tx
            .execute("DELETE FROM games WHERE id = ?1", [game_id])
            .map_err(|e| CoreError::Internal(format!("게임 삭제 실패: {e}")))?;

        tx.commit()
            .map_err(|e| CoreError::Internal(format!("트랜잭션 커밋 실패: {e}")))?;

        if removed > 0 {
            info!("게임 삭제: {}", game_id);
        }
        Ok(removed > 0)
    }

    /// 게임 설정 전체 조회
    pub fn get_game(&self, game_id: &str) -> Result<GameEntry, CoreError> {
        let conn = self.lock()?;
        Ok(GameEntry {
            id: game_id.to_string(),
            launcher: read_launcher(&conn, game_id)?,
            save_paths: read_save_paths(&conn, game_id)?,
        })
    }
}

pub(super) fn read_game_ids(conn: &Connection) -> Result<Vec<String>, CoreError> {
    let mut stmt = conn
        .prepare("SELECT id FROM games ORDER BY id")
        .map_err(|e| CoreError::Internal(format!("쿼리 준비 실패: {e}")))?;

    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| CoreError::Internal(format!("쿼리 실행 실패: {e}")))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(ids)
}

pub(super) fn read_launcher(conn: &Connection, game_id: &str) -> Result<LauncherSettings, CoreError> {
    let row: Option<(String, bool)> = conn
        .query_row(
            "SELECT launcher_mode, use_magpie FROM games WHERE id = ?1",
            [game_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| CoreError::Internal(format!("실행기 설정 조회 실패: {e}")))?;

    let Some((mode, use_magpie)) = row else {
        return Err(CoreError::game_not_found(game_id));
    };

    let mut settings = LauncherSettings {
        mode: LauncherMode::parse(&mode).unwrap_or_else(|| {
            warn!("게임 {} 알 수 없는 실행기 모드: {}", game_id, mode);
            LauncherMode::default()
        }),
        use_magpie,
        ..LauncherSettings::default()
    };

    let mut stmt = conn
        .prepare(
            "SELECT launcher_mode, monitor_mode, monitor_path FROM launch_profiles WHERE game_id = ?1",
        )
        .map_err(|e| CoreError::Internal(format!("쿼리 준비 실패: {e}")))?;

    let profiles = stmt
        .query_map([game_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| CoreError::Internal(format!("쿼리 실행 실패: {e}")))?
        .filter_map(|r| r.ok());

    for (launcher_mode, monitor_mode, monitor_path) in profiles {
        let (Some(launcher_mode), Some(monitor_mode)) = (
            LauncherMode::parse(&launcher_mode),
            MonitorMode::parse(&monitor_mode),
        ) else {
            warn!("게임 {} 잘못된 실행 프로필 무시", game_id);
            continue;
        };
        let target = Some(MonitorTarget::new(monitor_mode, monitor_path));
        match launcher_mode {
            LauncherMode::File => settings.file_config = target,
            LauncherMode::Script => settings.script_config = target,
            LauncherMode::Url => settings.url_config = target,
        }
    }

    Ok(settings)
}

pub(super) fn read_save_paths(conn: &Connection, game_id: &str) -> Result<Vec<String>, CoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT save_paths FROM games WHERE id = ?1",
            [game_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CoreError::Internal(format!("세이브 경로 조회 실패: {e}")))?;

    match raw {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Err(CoreError::game_not_found(game_id)),
    }
}
