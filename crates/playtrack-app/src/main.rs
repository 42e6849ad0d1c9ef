//! # playtrack-app
//!
//! PlayTrack 바이너리 진입점.
//! DI 컨테이너 역할, 감지 방식 선택, 라이프사이클 관리.

mod commands;
mod detection;
mod event_log;
mod lifecycle;
mod scaler;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use playtrack_core::config::{AppConfig, ProcessMonitorMode};
use playtrack_core::config_manager::ConfigManager;
use playtrack_core::event_bus::EventBus;
use playtrack_core::ports::process::ProcessSnapshotProvider;
use playtrack_core::ports::storage::GameRepository;
use playtrack_monitor::game_monitor::{MonitorContext, MonitorSettings};
use playtrack_monitor::registry::MonitorRegistry;
use playtrack_monitor::snapshot::SysinfoProcessTable;
use playtrack_monitor::snapshot_hook::SnapshotDiffHook;
use playtrack_storage::backup::FsSaveBackup;
use playtrack_storage::sqlite::SqliteGameStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::MonitorCommands;
use crate::detection::{Detection, DetectionDeps};
use crate::lifecycle::LifecycleManager;
use crate::scaler::MagpieScaler;
use crate::shell::HeadlessShell;

/// 이벤트 버스 용량
const EVENT_BUS_CAPACITY: usize = 256;

/// PlayTrack 게임 실행 감시기
///
/// 게임 프로세스를 감시해 플레이 시간을 기록하고 종료 시 세이브를 백업한다.
#[derive(Parser, Debug)]
#[command(name = "playtrack")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 데이터 저장 경로 (DB, 세이브 백업)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 감지 방식 (native | legacy). 지정하면 설정에 저장된다.
    #[arg(long)]
    monitor_mode: Option<ProcessMonitorMode>,

    /// 시작 직후 감시할 게임 ID (여러 번 지정 가능)
    #[arg(long = "start", value_name = "GAME_ID")]
    start: Vec<String>,
}

/// 데이터 디렉토리 결정 (CLI 인자 → 플랫폼 기본 경로 → 현재 디렉토리)
fn resolve_data_dir(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir.unwrap_or_else(|| match ConfigManager::data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!("데이터 디렉토리 결정 실패, 현재 디렉토리 사용: {e}");
            PathBuf::from(".")
        }
    })
}

fn load_config(args: &Args) -> Result<ConfigManager> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;

    if let Some(mode) = args.monitor_mode {
        manager
            .update_with(|c| c.monitor.process_monitor = mode)
            .context("감지 방식 저장 실패")?;
    }
    Ok(manager)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "playtrack={lvl},playtrack_app={lvl},playtrack_core={lvl},playtrack_monitor={lvl},playtrack_storage={lvl}",
        lvl = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("PlayTrack 시작");

    let config_manager = load_config(&args)?;
    let config: AppConfig = config_manager.get();
    info!("설정 파일: {}", config_manager.config_path().display());

    // ── 어댑터 생성 (DI 와이어링) ──

    // 1. 저장소
    let data_dir = resolve_data_dir(args.data_dir.clone());
    let db_path = config
        .storage
        .db_path
        .clone()
        .unwrap_or_else(|| data_dir.join("playtrack.db"));
    let store = Arc::new(SqliteGameStore::open(&db_path).context("게임 저장소 열기 실패")?);
    let repository: Arc<dyn GameRepository> = store.clone();

    let backup_dir = config
        .storage
        .backup_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("backups"));
    let backup = Arc::new(FsSaveBackup::new(
        backup_dir,
        config.storage.max_backups_per_game,
    ));
    info!("백업 경로: {}", backup.backup_dir().display());

    // 2. 프로세스 테이블
    let process_table = Arc::new(SysinfoProcessTable::new());
    let snapshot: Arc<dyn ProcessSnapshotProvider> = process_table.clone();

    // 3. 게임 모니터 의존성
    let events = EventBus::new(EVENT_BUS_CAPACITY);
    let ctx = MonitorContext {
        snapshot: snapshot.clone(),
        terminator: process_table.clone(),
        repository: repository.clone(),
        shell: Arc::new(HeadlessShell::new(repository.clone())),
        backup,
        scaler: Arc::new(MagpieScaler::new(config.linkage.clone(), snapshot.clone())),
        events: events.clone(),
        settings: MonitorSettings::from(&config.monitor),
    };
    let registry = Arc::new(MonitorRegistry::new(ctx));

    // 4. 라이프사이클 및 백그라운드 태스크
    let lifecycle = LifecycleManager::new();
    let reaper = registry.spawn_reaper(lifecycle.subscribe());
    let event_log = event_log::spawn_event_log(&events, lifecycle.subscribe());

    // 5. 감지 생산자
    let deps = DetectionDeps {
        registry: registry.clone(),
        repository: repository.clone(),
        snapshot: snapshot.clone(),
        hook: Arc::new(SnapshotDiffHook::new(
            snapshot.clone(),
            config.monitor.hook_poll_interval(),
        )),
    };
    let detection = Detection::start(config.monitor.process_monitor, &deps, &config.monitor).await;
    if detection.mode() != config.monitor.process_monitor {
        warn!(
            "요청한 감지 방식({})을 사용할 수 없어 {}로 실행",
            config.monitor.process_monitor,
            detection.mode()
        );
    }
    let commands = MonitorCommands::new(config_manager, deps, detection);

    for game_id in &args.start {
        if let Err(e) = commands.start_monitor(game_id).await {
            warn!("게임 {} 감시 시작 실패: {e}", game_id);
        }
    }

    info!(
        "감시 중 (게임 {}개 등록, Ctrl+C로 종료)",
        repository.list_game_ids().await.map(|ids| ids.len()).unwrap_or(0)
    );

    // ── 종료 대기 ──
    lifecycle.wait_for_signal().await;

    commands.shutdown().await;
    for (name, handle) in [("정리 태스크", reaper), ("이벤트 로그", event_log)] {
        if let Err(e) = handle.await {
            warn!("{name} 종료 대기 실패: {e}");
        }
    }

    info!("PlayTrack 종료");
    Ok(())
}
