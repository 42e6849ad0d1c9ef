//! 스냅샷 비교 기반 프로세스 훅.
//!
//! OS 콜백 대신 주기적으로 프로세스 스냅샷을 떠서 직전 스냅샷과 비교하고,
//! 알려진 게임에 속한 프로세스의 생성/종료를 `ProcessEvent`로 내보낸다.
//! 포그라운드 훅은 지원하지 않는다.

use async_trait::async_trait;
use playtrack_core::error::CoreError;
use playtrack_core::models::process::{KnownGame, ProcessEntry, ProcessEvent, ProcessEventType};
use playtrack_core::ports::hook::NativeProcessHook;
use playtrack_core::ports::process::ProcessSnapshotProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::matcher::{is_within, name_matches, normalize_path};

/// (정규화 경로, pid) → 게임 ID
pub type RunningGames = HashMap<(String, u32), String>;

/// 실행 파일 경로로 알려진 게임 찾기
///
/// 가장 가까운 상위 폴더(또는 동일 파일)가 우선이고, 구분자가 없는 항목은
/// 실행 파일 이름으로 비교한다.
pub fn resolve_known_game<'a>(known: &'a [KnownGame], entry: &ProcessEntry) -> Option<&'a KnownGame> {
    let exe = entry
        .executable_path
        .as_deref()
        .map(normalize_path)
        .filter(|p| !p.is_empty());

    if let Some(exe) = &exe {
        let by_path = known
            .iter()
            .map(|k| (k, normalize_path(&k.path)))
            .filter(|(_, path)| path.contains('/') && is_within(exe, path))
            .max_by_key(|(_, path)| path.len())
            .map(|(k, _)| k);
        if by_path.is_some() {
            return by_path;
        }
    }

    let file_name = exe
        .as_deref()
        .and_then(|p| p.rsplit('/').next())
        .unwrap_or(entry.name.as_str());
    known.iter().find(|k| {
        let path = k.path.trim();
        !path.is_empty()
            && !path.contains(['/', '\\'])
            && (name_matches(file_name, path) || name_matches(&entry.name, path))
    })
}

/// 스냅샷에서 알려진 게임에 속한 프로세스만 추린다.
pub fn running_games(entries: &[ProcessEntry], known: &[KnownGame]) -> RunningGames {
    entries
        .iter()
        .filter_map(|entry| {
            let game = resolve_known_game(known, entry)?;
            let path = entry
                .executable_path
                .as_deref()
                .map(normalize_path)
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| entry.name.trim().to_lowercase());
            Some(((path, entry.pid), game.id.clone()))
        })
        .collect()
}

/// 두 스냅샷의 차이를 이벤트로 변환 (생성 먼저, 그다음 종료)
pub fn diff_snapshot(previous: &RunningGames, current: &RunningGames) -> Vec<ProcessEvent> {
    let to_event = |((path, pid), id): (&(String, u32), &String), event_type| ProcessEvent {
        id: id.clone(),
        event_type,
        full_path: path.clone(),
        pid: *pid,
    };

    let mut created: Vec<ProcessEvent> = current
        .iter()
        .filter(|(key, _)| !previous.contains_key(*key))
        .map(|item| to_event(item, ProcessEventType::Creation))
        .collect();
    let mut terminated: Vec<ProcessEvent> = previous
        .iter()
        .filter(|(key, _)| !current.contains_key(*key))
        .map(|item| to_event(item, ProcessEventType::Termination))
        .collect();

    created.sort_by_key(|e| e.pid);
    terminated.sort_by_key(|e| e.pid);
    created.extend(terminated);
    created
}

struct PollTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// 폴링으로 흉내낸 네이티브 프로세스 훅
pub struct SnapshotDiffHook {
    snapshot: Arc<dyn ProcessSnapshotProvider>,
    poll_interval: Duration,
    known: Arc<Mutex<Vec<KnownGame>>>,
    task: Mutex<Option<PollTask>>,
}

impl SnapshotDiffHook {
    pub fn new(snapshot: Arc<dyn ProcessSnapshotProvider>, poll_interval: Duration) -> Self {
        Self {
            snapshot,
            poll_interval,
            known: Arc::new(Mutex::new(Vec::new())),
            task: Mutex::new(None),
        }
    }

    fn set_known(&self, known_games: Vec<KnownGame>) -> Result<(), CoreError> {
        let mut known = self
            .known
            .lock()
            .map_err(|e| CoreError::Internal(format!("알려진 게임 잠금 실패: {e}")))?;
        *known = known_games;
        Ok(())
    }

    async fn poll_loop(
        snapshot: Arc<dyn ProcessSnapshotProvider>,
        known: Arc<Mutex<Vec<KnownGame>>>,
        poll_interval: Duration,
        events: mpsc::Sender<ProcessEvent>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut previous = RunningGames::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let entries = match snapshot.list().await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("훅 스냅샷 실패, 이번 주기 건너뜀: {e}");
                    continue;
                }
            };

            let current = match known.lock() {
                Ok(known) => running_games(&entries, &known),
                Err(e) => {
                    warn!("알려진 게임 잠금 실패: {e}");
                    continue;
                }
            };

            for event in diff_snapshot(&previous, &current) {
                debug!("프로세스 {:?}: {} pid={}", event.event_type, event.full_path, event.pid);
                if events.send(event).await.is_err() {
                    debug!("훅 이벤트 수신자 없음, 폴링 종료");
                    return;
                }
            }
            previous = current;
        }
        debug!("스냅샷 훅 루프 종료");
    }
}

#[async_trait]
impl NativeProcessHook for SnapshotDiffHook {
    async fn start_monitoring(
        &self,
        known_games: Vec<KnownGame>,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<(), CoreError> {
        let mut task = self
            .task
            .lock()
            .map_err(|e| CoreError::Internal(format!("훅 태스크 잠금 실패: {e}")))?;
        if task.is_some() {
            return Err(CoreError::Conflict("프로세스 훅이 이미 실행 중".to_string()));
        }

        let count = known_games.len();
        self.set_known(known_games)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Self::poll_loop(
            Arc::clone(&self.snapshot),
            Arc::clone(&self.known),
            self.poll_interval,
            events,
            stop_rx,
        ));
        *task = Some(PollTask { stop_tx, handle });

        info!("스냅샷 훅 시작: 게임 {}개, 주기 {:?}", count, self.poll_interval);
        Ok(())
    }

    async fn stop_monitoring(&self) -> Result<(), CoreError> {
        let task = self
            .task
            .lock()
            .map_err(|e| CoreError::Internal(format!("훅 태스크 잠금 실패: {e}")))?
            .take();
        if let Some(task) = task {
            let _ = task.stop_tx.send(true);
            task.handle.abort();
            info!("스냅샷 훅 중지");
        }
        Ok(())
    }

    async fn replace_known_games(&self, known_games: Vec<KnownGame>) -> Result<(), CoreError> {
        self.set_known(known_games)
    }

    async fn install_foreground_hook(
        &self,
        _foreground: mpsc::Sender<Option<String>>,
        _wait_time: Duration,
    ) -> Result<(), CoreError> {
        Err(CoreError::Unsupported(
            "스냅샷 훅은 포그라운드 감지를 지원하지 않음".to_string(),
        ))
    }

    async fn uninstall_foreground_hook(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
