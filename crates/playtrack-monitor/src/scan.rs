//! 폴더 모드 실행 파일 탐색.

use playtrack_core::error::CoreError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// 확장자 비교 (대소문자 무시, 점 유무 무관)
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').to_lowercase() == ext)
}

/// `dir` 하위를 재귀 탐색하여 허용 확장자 파일 목록을 반환한다. 결과는 경로순 정렬.
///
/// 루트 폴더를 읽지 못하면 `Config` 에러. 하위 폴더 오류는 로그만 남기고 건너뛴다.
pub async fn executable_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, CoreError> {
    let entries = fs::read_dir(dir)
        .await
        .map_err(|e| CoreError::Config(format!("감시 폴더 읽기 실패: {}: {e}", dir.display())))?;

    let mut found = Vec::new();
    collect(dir, entries, extensions, &mut found).await;
    found.sort();
    Ok(found)
}

async fn collect(dir: &Path, mut entries: fs::ReadDir, extensions: &[String], found: &mut Vec<PathBuf>) {
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("폴더 항목 읽기 실패, 나머지 건너뜀: {}: {e}", dir.display());
                break;
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!("파일 종류 확인 실패: {}: {e}", path.display());
                continue;
            }
        };

        if file_type.is_dir() {
            match fs::read_dir(&path).await {
                Ok(sub) => Box::pin(collect(&path, sub, extensions, found)).await,
                Err(e) => warn!("하위 폴더 읽기 실패, 건너뜀: {}: {e}", path.display()),
            }
        } else if file_type.is_file() && has_extension(&path, extensions) {
            found.push(path);
        }
    }
}
