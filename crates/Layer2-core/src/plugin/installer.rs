//! Plugin Installer - 플러그인 코드 다운로드 및 설치
//!
//! 저장소 URL에서 플러그인 코드를 받아 플러그인 디렉토리에 풀어 놓는다.
//! 설치 목록/설정 갱신은 호출자(lifecycle)의 몫이다.

use super::fsutil::copy_dir_recursive;
use super::manifest::{validate_plugin_id, MANIFEST_FILE};
use async_trait::async_trait;
use reel_foundation::{Error, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "reel-plugin-installer";

// ============================================================================
// PluginSource - 플러그인 소스
// ============================================================================

/// 플러그인 설치 소스
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// GitHub 저장소 (owner/repo 또는 owner/repo@branch)
    GitHub {
        owner: String,
        repo: String,
        branch: Option<String>,
    },
    /// tarball URL
    Url(String),
    /// 로컬 경로
    Local(PathBuf),
}

impl PluginSource {
    /// `github:owner/repo@branch` 파싱
    pub fn parse_github(source: &str) -> Option<Self> {
        let source = source.strip_prefix("github:")?;

        let (repo_path, branch) = match source.split_once('@') {
            Some((path, branch)) => (path, Some(branch.to_string())),
            None => (source, None),
        };

        let mut parts = repo_path.split('/').filter(|p| !p.is_empty());
        let owner = parts.next()?.to_string();
        let repo = parts.next()?.to_string();
        Some(PluginSource::GitHub {
            owner,
            repo,
            branch,
        })
    }

    /// `https://github.com/owner/repo[/...]` 파싱
    fn parse_github_url(url: &str) -> Option<Self> {
        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("http://github.com/"))?;
        let mut parts = rest.split('/').filter(|p| !p.is_empty());
        let owner = parts.next()?.to_string();
        let repo = parts.next()?.trim_end_matches(".git").to_string();
        Some(PluginSource::GitHub {
            owner,
            repo,
            branch: None,
        })
    }

    /// 소스 문자열에서 파싱
    pub fn parse(source: &str) -> Option<Self> {
        let source = source.trim();
        if source.starts_with("github:") {
            Self::parse_github(source)
        } else if source.starts_with("http://") || source.starts_with("https://") {
            Self::parse_github_url(source).or_else(|| Some(PluginSource::Url(source.to_string())))
        } else {
            let path = PathBuf::from(source);
            if path.exists() {
                Some(PluginSource::Local(path))
            } else {
                None
            }
        }
    }

    /// 다운로드할 tarball URL (로컬이면 None)
    pub fn archive_url(&self) -> Option<String> {
        match self {
            PluginSource::GitHub {
                owner,
                repo,
                branch,
            } => Some(format!(
                "https://github.com/{}/{}/archive/refs/heads/{}.tar.gz",
                owner,
                repo,
                branch.as_deref().unwrap_or("main")
            )),
            PluginSource::Url(url) => Some(url.clone()),
            PluginSource::Local(_) => None,
        }
    }
}

// ============================================================================
// CodeInstaller - 설치 계약
// ============================================================================

/// 플러그인 코드 설치기 계약
#[async_trait]
pub trait CodeInstaller: Send + Sync {
    /// `repo_url`에서 `plugin_id`의 코드를 받아 `target_dir`에 설치
    async fn install(&self, plugin_id: &str, repo_url: &str, target_dir: &Path) -> Result<()>;
}

// ============================================================================
// ArchiveInstaller
// ============================================================================

/// tarball 기반 설치기
///
/// 압축을 푼 트리에서 `plugins/<id>`, `<id>`, 루트 순으로 `plugin.json`을 찾는다.
pub struct ArchiveInstaller {
    client: Client,
}

impl Default for ArchiveInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveInstaller {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// 파일 다운로드
    async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Downloading {} to {:?}", url, dest);

        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        fs::write(dest, bytes).await?;
        Ok(())
    }

    /// tarball 압축 해제
    async fn extract_tarball(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!("Extracting {:?} to {:?}", archive, dest);

        let output = tokio::process::Command::new("tar")
            .args([
                "-xzf",
                &archive.to_string_lossy(),
                "-C",
                &dest.to_string_lossy(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Internal(format!(
                "Failed to extract archive: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    /// 압축 해제 후 최상위 디렉토리
    async fn find_extracted_dir(&self, temp_dir: &Path) -> Result<PathBuf> {
        let mut entries = fs::read_dir(temp_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() {
                return Ok(path);
            }
        }
        Err(Error::NotFound("No directory found after extraction".into()))
    }

    async fn fetch_and_place(
        &self,
        source: &PluginSource,
        staging: &Path,
        plugin_id: &str,
        target_dir: &Path,
    ) -> Result<()> {
        let root = match (source, source.archive_url()) {
            (PluginSource::Local(path), _) => path.clone(),
            (_, Some(url)) => {
                fs::create_dir_all(staging).await?;
                let archive = staging.join("archive.tar.gz");
                self.download_file(&url, &archive).await?;
                let extract_dir = staging.join("extract");
                fs::create_dir_all(&extract_dir).await?;
                self.extract_tarball(&archive, &extract_dir).await?;
                self.find_extracted_dir(&extract_dir).await?
            }
            (_, None) => {
                return Err(Error::Validation(format!("Unsupported plugin source {:?}", source)))
            }
        };

        let plugin_dir = locate_plugin_dir(&root, plugin_id)?;
        replace_dir(&plugin_dir, target_dir).await
    }
}

#[async_trait]
impl CodeInstaller for ArchiveInstaller {
    async fn install(&self, plugin_id: &str, repo_url: &str, target_dir: &Path) -> Result<()> {
        validate_plugin_id(plugin_id)?;
        let source = PluginSource::parse(repo_url)
            .ok_or_else(|| Error::Validation(format!("Invalid plugin repository: {}", repo_url)))?;
        info!("Installing plugin {} from {:?}", plugin_id, source);

        let staging = std::env::temp_dir().join(format!("reel_plugin_{}", uuid::Uuid::new_v4()));
        let result = self
            .fetch_and_place(&source, &staging, plugin_id, target_dir)
            .await;

        if staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging).await {
                warn!("Failed to clean up {:?}: {}", staging, e);
            }
        }

        if result.is_ok() {
            info!("Installed plugin code for {} at {:?}", plugin_id, target_dir);
        }
        result
    }
}

/// 트리 안에서 플러그인 디렉토리 찾기
fn locate_plugin_dir(root: &Path, plugin_id: &str) -> Result<PathBuf> {
    let lower = plugin_id.to_lowercase();
    let candidates = [
        root.join("plugins").join(&lower),
        root.join(&lower),
        root.to_path_buf(),
    ];
    candidates
        .into_iter()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .ok_or_else(|| {
            Error::NotFound(format!("Plugin {} not found in {:?}", plugin_id, root))
        })
}

/// 대상 디렉토리를 새 코드로 교체
async fn replace_dir(src: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        fs::remove_dir_all(target).await?;
    }
    copy_dir_recursive(src, target).await
}
