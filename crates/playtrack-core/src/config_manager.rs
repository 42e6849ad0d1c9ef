//! 설정 파일 관리.
//!
//! 플랫폼 설정 디렉토리(`directories`)의 JSON 파일로 설정을 저장/로드한다.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "playtrack";
const APP_NAME: &str = "playtrack";

/// 설정 관리자
///
/// 메모리 사본과 파일을 함께 갱신한다. 복제해도 같은 설정을 공유한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 설정 디렉토리의 `config.json`으로 생성
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 지정된 경로로 생성. 파일이 없으면 기본 설정을 써 둔다.
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        let config = if config_path.exists() {
            read_config(&config_path)?
        } else {
            let config = AppConfig::default_config();
            write_config(&config_path, &config)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            config
        };

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// 현재 설정 사본
    pub fn get(&self) -> AppConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 설정 전체 교체. 파일 저장에 성공해야 메모리에 반영된다.
    pub fn update(&self, new_config: AppConfig) -> Result<(), CoreError> {
        write_config(&self.config_path, &new_config)?;
        self.replace(new_config)?;
        debug!("설정 저장: {}", self.config_path.display());
        Ok(())
    }

    /// 현재 설정을 고쳐 저장하고 저장된 설정을 돌려준다.
    pub fn update_with<F>(&self, updater: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        updater(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 파일에서 다시 읽기 (외부 편집 반영)
    pub fn reload(&self) -> Result<(), CoreError> {
        self.replace(read_config(&self.config_path)?)?;
        info!("설정 다시 로드: {}", self.config_path.display());
        Ok(())
    }

    fn replace(&self, config: AppConfig) -> Result<(), CoreError> {
        let mut current = self
            .config
            .write()
            .map_err(|e| CoreError::Internal(format!("설정 잠금 획득 실패: {e}")))?;
        *current = config;
        Ok(())
    }

    /// 플랫폼 설정 디렉토리
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// 데이터 디렉토리 (DB, 세이브 백업)
    pub fn data_dir() -> Result<PathBuf, CoreError> {
        project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }
}

fn project_dirs() -> Result<ProjectDirs, CoreError> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APP_NAME)
        .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없음".to_string()))
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("설정 파일 읽기 실패 ({}): {e}", path.display())))?;
    let config = serde_json::from_str(&content)
        .map_err(|e| CoreError::Config(format!("설정 파일 파싱 실패 ({}): {e}", path.display())))?;
    debug!("설정 파일 로드: {}", path.display());
    Ok(config)
}

/// 임시 파일에 쓴 뒤 rename. 중간에 죽어도 기존 파일은 남는다.
fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CoreError::Config(format!("설정 디렉토리 생성 실패 ({}): {e}", parent.display()))
        })?;
    }

    let content = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| CoreError::Config(format!("설정 파일 저장 실패 ({}): {e}", path.display())))
}
