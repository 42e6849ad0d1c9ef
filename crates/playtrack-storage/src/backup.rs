//! 세이브 데이터 백업 저장소.
//!
//! 게임 종료 시 세이브 경로(파일 또는 폴더)를 백업 폴더로 복사한다.
//! 구조: `<backup_dir>/<game_id>/YYYYMMDD-HHMMSS-NNN/<원본 이름>`
//! 게임별로 `max_backups`개를 넘으면 오래된 것부터 삭제한다.

use async_trait::async_trait;
use chrono::Utc;
use playtrack_core::error::CoreError;
use playtrack_core::ports::integration::SaveBackup;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::fs;
use tracing::{debug, info, warn};

/// 파일 시스템 세이브 백업
pub struct FsSaveBackup {
    backup_dir: PathBuf,
    max_backups: usize,
    /// 같은 초 안의 백업 구분
    counter: AtomicU32,
}

impl FsSaveBackup {
    pub fn new(backup_dir: PathBuf, max_backups: usize) -> Self {
        Self {
            backup_dir,
            max_backups: max_backups.max(1),
            counter: AtomicU32::new(0),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn game_dir(&self, game_id: &str) -> PathBuf {
        let safe: String = game_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.backup_dir.join(safe)
    }

    /// 게임의 백업 목록 (오래된 순)
    pub async fn list_backups(&self, game_id: &str) -> Result<Vec<PathBuf>, CoreError> {
        let game_dir = self.game_dir(game_id);
        if !fs::try_exists(&game_dir).await? {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&game_dir).await?;
        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                backups.push(entry.path());
            }
        }
        backups.sort();
        Ok(backups)
    }

    async fn prune(&self, game_id: &str) -> Result<usize, CoreError> {
        let backups = self.list_backups(game_id).await?;
        let excess = backups.len().saturating_sub(self.max_backups);

        for old in backups.iter().take(excess) {
            if let Err(e) = fs::remove_dir_all(old).await {
                warn!("오래된 백업 삭제 실패: {}: {e}", old.display());
            } else {
                debug!("오래된 백업 삭제: {}", old.display());
            }
        }
        Ok(excess)
    }
}

/// 파일 또는 폴더 재귀 복사
async fn copy_recursive(src: &Path, dst: &Path) -> Result<u64, CoreError> {
    let meta = fs::metadata(src).await?;
    if meta.is_file() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }
        return Ok(fs::copy(src, dst).await?);
    }

    fs::create_dir_all(dst).await?;
    let mut total = 0;
    let mut entries = fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        total += Box::pin(copy_recursive(&entry.path(), &dst.join(entry.file_name()))).await?;
    }
    Ok(total)
}

#[async_trait]
impl SaveBackup for FsSaveBackup {
    async fn backup_game_save(
        &self,
        game_id: &str,
        save_paths: &[String],
    ) -> Result<(), CoreError> {
        let mut sources = Vec::new();
        for raw in save_paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let path = PathBuf::from(raw);
            if fs::try_exists(&path).await? {
                sources.push(path);
            } else {
                warn!("게임 {} 세이브 경로 없음: {}", game_id, raw);
            }
        }
        if sources.is_empty() {
            warn!("게임 {} 백업할 세이브 없음", game_id);
            return Ok(());
        }

        let counter = self.counter.fetch_add(1, Ordering::SeqCst) % 1000;
        let stamp = format!("{}-{counter:03}", Utc::now().format("%Y%m%d-%H%M%S"));
        let target = self.game_dir(game_id).join(stamp);
        fs::create_dir_all(&target)
            .await
            .map_err(|e| CoreError::Internal(format!("백업 폴더 생성 실패: {e}")))?;

        let mut used = HashSet::new();
        let mut bytes = 0u64;
        for (index, source) in sources.iter().enumerate() {
            let base = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("save-{index}"));
            let name = if used.insert(base.clone()) {
                base
            } else {
                format!("{index}-{base}")
            };

            bytes += copy_recursive(source, &target.join(&name))
                .await
                .map_err(|e| CoreError::Internal(format!("세이브 복사 실패 ({}): {e}", source.display())))?;
        }

        let pruned = self.prune(game_id).await?;
        info!(
            "게임 {} 세이브 백업: {} ({}bytes, 정리 {}개)",
            game_id,
            target.display(),
            bytes,
            pruned
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn save_tree(root: &Path) -> PathBuf {
        let saves = root.join("Saved");
        std::fs::create_dir_all(saves.join("slot1")).unwrap();
        std::fs::write(saves.join("slot1").join("data.sav"), b"progress").unwrap();
        std::fs::write(saves.join("config.ini"), b"[x]").unwrap();
        saves
    }

    #[tokio::test]
    async fn copies_folder_and_file_sources() {
        let temp = TempDir::new().unwrap();
        let saves = save_tree(temp.path());
        let single = temp.path().join("profile.dat");
        std::fs::write(&single, b"p").unwrap();
        let backup = FsSaveBackup::new(temp.path().join("backups"), 5);

        backup
            .backup_game_save(
                "game/1",
                &[
                    saves.display().to_string(),
                    single.display().to_string(),
                    String::new(),
                ],
            )
            .await
            .unwrap();

        let backups = backup.list_backups("game/1").await.unwrap();
        assert_eq!(backups.len(), 1);
        let snapshot = &backups[0];
        assert!(snapshot.starts_with(temp.path().join("backups").join("game_1")));
        assert_eq!(
            std::fs::read(snapshot.join("Saved").join("slot1").join("data.sav")).unwrap(),
            b"progress"
        );
        assert!(snapshot.join("profile.dat").exists());
    }

    #[tokio::test]
    async fn keeps_only_newest_backups() {
        let temp = TempDir::new().unwrap();
        let saves = save_tree(temp.path());
        let backup = FsSaveBackup::new(temp.path().join("backups"), 2);
        let paths = vec![saves.display().to_string()];

        for _ in 0..4 {
            backup.backup_game_save("g", &paths).await.unwrap();
        }

        let backups = backup.list_backups("g").await.unwrap();
        assert_eq!(backups.len(), 2);
        assert!(backups[0].file_name().unwrap().to_string_lossy().ends_with("-002"));
    }

    #[tokio::test]
    async fn missing_sources_create_nothing() {
        let temp = TempDir::new().unwrap();
        let backup = FsSaveBackup::new(temp.path().join("backups"), 5);

        backup
            .backup_game_save("g", &[temp.path().join("nope").display().to_string()])
            .await
            .unwrap();
        assert!(backup.list_backups("g").await.unwrap().is_empty());
    }
}
