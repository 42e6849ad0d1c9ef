//! 디스플레이 스케일러 연동 (Magpie).
//!
//! 스케일러가 떠 있지 않으면 트레이 모드(`-t`)로 실행하고, 잠시 기다린 뒤
//! 전체화면 스케일링 단축키를 보낸다. 단축키 전송은 `enigo` feature가 켜졌을 때만 가능하다.

use async_trait::async_trait;
use playtrack_core::config::LinkageConfig;
use playtrack_core::error::CoreError;
use playtrack_core::ports::integration::DisplayScaler;
use playtrack_core::ports::process::ProcessSnapshotProvider;
use playtrack_monitor::matcher::name_matches;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `"win+alt+a"` → `["win", "alt", "a"]`
pub fn parse_hotkey(hotkey: &str) -> Vec<String> {
    hotkey
        .split('+')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

pub struct MagpieScaler {
    linkage: LinkageConfig,
    snapshot: Arc<dyn ProcessSnapshotProvider>,
}

impl MagpieScaler {
    pub fn new(linkage: LinkageConfig, snapshot: Arc<dyn ProcessSnapshotProvider>) -> Self {
        Self { linkage, snapshot }
    }

    fn executable(&self) -> Option<&str> {
        self.linkage
            .magpie_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    async fn is_running(&self, exe_name: &str) -> bool {
        match self.snapshot.list().await {
            Ok(entries) => entries.iter().any(|p| name_matches(&p.name, exe_name)),
            Err(e) => {
                warn!("스케일러 실행 여부 확인 실패: {e}");
                false
            }
        }
    }

    /// 실행 중이 아니면 기동. 새로 띄웠으면 true.
    async fn ensure_running(&self, path: &str) -> Result<bool, CoreError> {
        let exe_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        if self.is_running(&exe_name).await {
            debug!("스케일러 이미 실행 중: {}", exe_name);
            return Ok(false);
        }

        tokio::process::Command::new(path)
            .arg("-t")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CoreError::Internal(format!("스케일러 실행 실패 ({path}): {e}")))?;

        info!("스케일러 실행: {}", path);
        Ok(true)
    }
}

#[cfg(feature = "enigo")]
fn parse_key(key: &str) -> enigo::Key {
    match key {
        "win" | "meta" | "super" | "cmd" | "command" => enigo::Key::Meta,
        "alt" | "option" => enigo::Key::Alt,
        "ctrl" | "control" => enigo::Key::Control,
        "shift" => enigo::Key::Shift,
        other => match other.chars().next() {
            Some(ch) if other.chars().count() == 1 => enigo::Key::Unicode(ch),
            _ => {
                debug!("알 수 없는 키: {other}, Unicode 'a' 폴백");
                enigo::Key::Unicode('a')
            }
        },
    }
}

/// 키를 순서대로 누르고 역순으로 뗀다.
#[cfg(feature = "enigo")]
fn send_hotkey(keys: &[String]) -> Result<(), CoreError> {
    use enigo::{Direction, Enigo, Keyboard, Settings};

    let mut enigo = Enigo::new(&Settings::default())
        .map_err(|e| CoreError::Internal(format!("입력 드라이버 초기화 실패: {e}")))?;
    for key in keys {
        enigo
            .key(parse_key(key), Direction::Press)
            .map_err(|e| CoreError::Internal(format!("단축키 Press 실패: {e}")))?;
    }
    for key in keys.iter().rev() {
        enigo
            .key(parse_key(key), Direction::Release)
            .map_err(|e| CoreError::Internal(format!("단축키 Release 실패: {e}")))?;
    }
    Ok(())
}

#[cfg(not(feature = "enigo"))]
fn send_hotkey(_keys: &[String]) -> Result<(), CoreError> {
    Err(CoreError::Unsupported(
        "단축키 전송 불가 (enigo feature 비활성)".to_string(),
    ))
}

#[async_trait]
impl DisplayScaler for MagpieScaler {
    async fn scale(&self, game_id: &str) -> Result<bool, CoreError> {
        let Some(path) = self.executable().map(str::to_string) else {
            debug!("스케일러 경로 미설정, 게임 {} 스케일링 생략", game_id);
            return Ok(false);
        };

        if self.ensure_running(&path).await? {
            tokio::time::sleep(Duration::from_millis(self.linkage.magpie_settle_ms)).await;
        }

        let keys = parse_hotkey(&self.linkage.magpie_hotkey);
        if keys.is_empty() {
            warn!("스케일러 단축키가 비어 있음");
            return Ok(false);
        }

        tokio::task::spawn_blocking(move || send_hotkey(&keys))
            .await
            .map_err(|e| CoreError::Internal(format!("단축키 태스크 실패: {e}")))??;

        info!("게임 {} 스케일링 단축키 전송", game_id);
        Ok(true)
    }
}
