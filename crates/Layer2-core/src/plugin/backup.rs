//! Plugin Backup - 컨테이너 재생성 대비 플러그인 코드 백업/복구
//!
//! 항목별 IO 실패는 로그만 남기고 나머지 항목을 계속 처리한다.

use super::fsutil::{copy_dir_recursive, has_entries};
use super::manifest::MANIFEST_FILE;
use reel_foundation::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// 백업에서 제외되는 항목
const EXCLUDED_ITEMS: &[&str] = &["__init__.py", "__pycache__", ".DS_Store"];

/// 백업/복구 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupReport {
    /// 복사된 항목
    pub copied: Vec<String>,
    /// 이미 있어 건너뛴 항목
    pub skipped: Vec<String>,
    /// 실패한 항목
    pub failed: Vec<String>,
    /// 복구 시 실제로 복구가 수행되었는지
    pub performed: bool,
}

/// 플러그인 백업 관리자
pub struct PluginBackup {
    plugins_dir: PathBuf,
    backup_dir: PathBuf,
}

impl PluginBackup {
    pub fn new(plugins_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// 플러그인 디렉토리의 최상위 항목을 백업 (이미 백업된 항목은 건너뜀)
    pub async fn backup(&self) -> Result<BackupReport> {
        let mut report = BackupReport {
            performed: true,
            ..Default::default()
        };
        if !self.plugins_dir.exists() {
            info!("Plugins directory {:?} does not exist, skipping backup", self.plugins_dir);
            report.performed = false;
            return Ok(report);
        }
        fs::create_dir_all(&self.backup_dir).await?;

        let mut entries = fs::read_dir(&self.plugins_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if EXCLUDED_ITEMS.contains(&name.as_str()) {
                continue;
            }
            let target = self.backup_dir.join(&name);
            if target.exists() {
                debug!("Backup of {} already exists", name);
                report.skipped.push(name);
                continue;
            }

            match copy_item(&entry.path(), &target).await {
                Ok(()) => {
                    info!("Backed up plugin item {}", name);
                    report.copied.push(name);
                }
                Err(e) => {
                    error!("Failed to back up plugin item {}: {}", name, e);
                    report.failed.push(name);
                }
            }
        }

        info!("Plugin backup finished at {:?}", self.backup_dir);
        Ok(report)
    }

    /// 플러그인 디렉토리가 초기화되었는지 (플러그인이 하나도 없음)
    pub async fn is_reset(&self) -> Result<bool> {
        if !self.plugins_dir.exists() {
            return Ok(true);
        }
        let mut entries = fs::read_dir(&self.plugins_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().join(MANIFEST_FILE).exists() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 초기화가 감지되었거나 `force`이면 백업을 복구하고, 백업 디렉토리는 항상 삭제
    pub async fn restore(&self, force: bool) -> Result<BackupReport> {
        let mut report = BackupReport::default();
        if !self.backup_dir.exists() {
            info!("No plugin backup at {:?}, skipping restore", self.backup_dir);
            return Ok(report);
        }

        if force || self.is_reset().await? {
            report.performed = true;
            fs::create_dir_all(&self.plugins_dir).await?;

            let mut entries = fs::read_dir(&self.backup_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                let source = entry.path();
                let target = self.plugins_dir.join(&name);

                match restore_item(&source, &target).await {
                    Ok(true) => {
                        info!("Restored plugin item {}", name);
                        report.copied.push(name);
                    }
                    Ok(false) => report.skipped.push(name),
                    Err(e) => {
                        error!("Failed to restore plugin item {}: {}", name, e);
                        report.failed.push(name);
                    }
                }
            }
            info!("Plugin restore finished, {} items restored", report.copied.len());
        } else {
            debug!("Plugins directory is intact, backup not applied");
        }

        if let Err(e) = fs::remove_dir_all(&self.backup_dir).await {
            warn!("Failed to delete plugin backup {:?}: {}", self.backup_dir, e);
        } else {
            info!("Deleted plugin backup {:?}", self.backup_dir);
        }
        Ok(report)
    }
}

async fn copy_item(source: &Path, target: &Path) -> Result<()> {
    if source.is_dir() {
        copy_dir_recursive(source, target).await
    } else {
        fs::copy(source, target).await?;
        Ok(())
    }
}

/// 복구 대상이면 복사 후 true. 빈 디렉토리는 건너뛴다.
async fn restore_item(source: &Path, target: &Path) -> Result<bool> {
    if source.is_dir() {
        if !has_entries(source).await? {
            return Ok(false);
        }
        if target.exists() {
            fs::remove_dir_all(target).await?;
        }
        copy_dir_recursive(source, target).await?;
        Ok(true)
    } else if source.is_file() {
        fs::copy(source, target).await?;
        Ok(true)
    } else {
        Ok(false)
    }
}
