//! 프로세스 스냅샷 및 강제 종료.
//!
//! `ProcessSnapshotProvider`, `ProcessTerminator` 포트 구현 (sysinfo).

use async_trait::async_trait;
use playtrack_core::error::CoreError;
use playtrack_core::models::process::ProcessEntry;
use playtrack_core::ports::process::{ProcessSnapshotProvider, ProcessTerminator};
use std::sync::Mutex;
use sysinfo::{Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::{debug, warn};

use crate::matcher::normalize_path;

/// 프로세스 테이블: sysinfo 기반 스냅샷/종료 구현
pub struct SysinfoProcessTable {
    sys: Mutex<System>,
}

impl SysinfoProcessTable {
    /// 새 프로세스 테이블 생성
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
        }
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing()
            .with_exe(UpdateKind::Always)
            .with_cmd(UpdateKind::Always)
    }

    /// 최신 프로세스 목록으로 갱신 후 조건에 맞는 프로세스를 종료한다.
    fn kill_matching<F>(&self, target: &str, predicate: F) -> Result<usize, CoreError>
    where
        F: Fn(&Process) -> bool,
    {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| CoreError::Internal(format!("시스템 잠금 실패: {e}")))?;
        sys.refresh_processes_specifics(ProcessesToUpdate::All, true, Self::refresh_kind());

        let mut matched = 0usize;
        let mut killed = 0usize;
        for process in sys.processes().values().filter(|p| predicate(p)) {
            matched += 1;
            if process.kill() {
                killed += 1;
            } else {
                warn!(
                    "프로세스 종료 신호 실패: pid={} ({})",
                    process.pid().as_u32(),
                    target
                );
            }
        }

        match (matched, killed) {
            (0, _) => Err(CoreError::ProcessNotFound(target.to_string())),
            (_, 0) => Err(CoreError::Termination(format!(
                "{target}: {matched}개 프로세스 종료 실패"
            ))),
            _ => {
                debug!("프로세스 {}개 종료: {}", killed, target);
                Ok(killed)
            }
        }
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn to_entry(process: &Process) -> ProcessEntry {
    let cmd = process.cmd();
    let command_line = if cmd.is_empty() {
        None
    } else {
        Some(
            cmd.iter()
                .map(|part| part.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" "),
        )
    };

    ProcessEntry {
        name: process.name().to_string_lossy().to_string(),
        pid: process.pid().as_u32(),
        executable_path: process.exe().map(|p| p.to_string_lossy().to_string()),
        command_line,
    }
}

#[async_trait]
impl ProcessSnapshotProvider for SysinfoProcessTable {
    async fn list(&self) -> Result<Vec<ProcessEntry>, CoreError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| CoreError::Snapshot(format!("시스템 잠금 실패: {e}")))?;
        sys.refresh_processes_specifics(ProcessesToUpdate::All, true, Self::refresh_kind());

        let entries: Vec<ProcessEntry> = sys.processes().values().map(to_entry).collect();
        debug!("프로세스 스냅샷 {}개 수집", entries.len());
        Ok(entries)
    }
}

#[async_trait]
impl ProcessTerminator for SysinfoProcessTable {
    async fn kill_by_path(&self, path: &str) -> Result<usize, CoreError> {
        let target = normalize_path(path);
        self.kill_matching(path, |p| {
            p.exe()
                .map(|exe| normalize_path(&exe.to_string_lossy()) == target)
                .unwrap_or(false)
        })
    }

    async fn kill_by_name(&self, name: &str) -> Result<usize, CoreError> {
        let target = name.trim().to_lowercase();
        self.kill_matching(name, |p| {
            p.name().to_string_lossy().to_lowercase() == target
        })
    }
}
