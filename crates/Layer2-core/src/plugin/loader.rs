//! Plugin Loader - 디스크의 플러그인 코드 발견/로드/복제/삭제
//!
//! 코드 디렉토리는 `<root>/<id 소문자>/`이고 그 안의 `plugin.json`이 매니페스트다.

use super::declarative::ManifestPlugin;
use super::fsutil::copy_dir_recursive;
use super::manifest::{validate_plugin_id, PluginManifest, MANIFEST_FILE};
use super::traits::PluginSurface;
use async_trait::async_trait;
use reel_foundation::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

// ============================================================================
// CloneSpec
// ============================================================================

/// 복제 파라미터
#[derive(Debug, Clone, Default)]
pub struct CloneSpec {
    /// 새 ID = 원본 ID + suffix
    pub suffix: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub icon: Option<String>,
}

impl CloneSpec {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// 복제 매니페스트 생성
    pub fn apply(&self, original: &PluginManifest, new_id: &str) -> PluginManifest {
        let mut manifest = original.clone();
        manifest.id = new_id.to_string();
        manifest.name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("{}{}", original.name, self.suffix));
        if let Some(description) = &self.description {
            manifest.description = description.clone();
        }
        if let Some(version) = &self.version {
            manifest.version = version.clone();
        }
        if let Some(icon) = &self.icon {
            manifest.icon = Some(icon.clone());
        }
        manifest.is_clone = true;
        // 복제의 복제도 최초 원본을 가리킨다
        manifest.original_id = Some(
            original
                .original_id
                .clone()
                .unwrap_or_else(|| original.id.clone()),
        );
        manifest
    }
}

// ============================================================================
// PluginLoader Trait
// ============================================================================

/// 플러그인 코드 로더 계약
#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// 디스크의 모든 플러그인 매니페스트
    async fn discover(&self) -> Result<Vec<PluginManifest>>;

    /// 새 인스턴스 생성 (호출마다 새 인스턴스)
    async fn load(&self, plugin_id: &str) -> Result<Arc<dyn PluginSurface>>;

    /// 코드 복제 - 새 매니페스트 반환
    async fn clone_code(
        &self,
        original_id: &str,
        new_id: &str,
        spec: &CloneSpec,
    ) -> Result<PluginManifest>;

    /// 코드 디렉토리 삭제 (없으면 no-op)
    async fn remove_code(&self, plugin_id: &str) -> Result<()>;

    /// 코드 디렉토리 경로
    fn code_dir(&self, plugin_id: &str) -> PathBuf;
}

/// 컴파일된 플러그인 팩토리 (디스크 매니페스트를 받아 인스턴스 생성)
pub type PluginFactory = Arc<dyn Fn(PluginManifest) -> Arc<dyn PluginSurface> + Send + Sync>;

// ============================================================================
// DirectoryLoader
// ============================================================================

/// 디렉토리 기반 로더
///
/// 등록된 팩토리가 있으면 (복제는 원본 ID로도 조회) 그것을 사용하고,
/// 없으면 `ManifestPlugin`으로 로드한다.
pub struct DirectoryLoader {
    root: PathBuf,
    factories: HashMap<String, PluginFactory>,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            factories: HashMap::new(),
        }
    }

    /// 팩토리 등록
    pub fn with_factory(mut self, plugin_id: impl Into<String>, factory: PluginFactory) -> Self {
        self.factories.insert(plugin_id.into(), factory);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 검증된 ID의 코드 디렉토리 - 항상 root 바로 아래
    fn checked_dir(&self, plugin_id: &str) -> Result<PathBuf> {
        validate_plugin_id(plugin_id)?;
        let dir = self.code_dir(plugin_id);
        if dir.parent() != Some(self.root.as_path()) {
            return Err(Error::Validation(format!(
                "Plugin directory for {} escapes {}",
                plugin_id,
                self.root.display()
            )));
        }
        Ok(dir)
    }

    async fn read_manifest(&self, dir: &Path) -> Result<PluginManifest> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(Error::NotFound(format!("{} not found", path.display())));
        }
        let content = fs::read_to_string(&path).await?;
        let manifest: PluginManifest = serde_json::from_str(&content)
            .map_err(|e| Error::Plugin(format!("Invalid {}: {}", path.display(), e)))?;
        Ok(manifest)
    }

    async fn write_manifest(&self, dir: &Path, manifest: &PluginManifest) -> Result<()> {
        let content = serde_json::to_string_pretty(manifest)?;
        fs::write(dir.join(MANIFEST_FILE), content).await?;
        Ok(())
    }
}

#[async_trait]
impl PluginLoader for DirectoryLoader {
    async fn discover(&self) -> Result<Vec<PluginManifest>> {
        let mut manifests = Vec::new();
        if !self.root.exists() {
            return Ok(manifests);
        }

        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() || !path.join(MANIFEST_FILE).exists() {
                continue;
            }
            match self.read_manifest(&path).await {
                Ok(manifest) if validate_plugin_id(&manifest.id).is_err() => {
                    warn!("Skipping plugin directory {:?}: invalid id {:?}", path, manifest.id);
                }
                Ok(manifest) => {
                    debug!("Discovered plugin {} at {:?}", manifest.id, path);
                    manifests.push(manifest);
                }
                Err(e) => warn!("Skipping plugin directory {:?}: {}", path, e),
            }
        }

        manifests.sort_by(|a, b| a.id.cmp(&b.id));
        info!("Discovered {} plugins in {:?}", manifests.len(), self.root);
        Ok(manifests)
    }

    async fn load(&self, plugin_id: &str) -> Result<Arc<dyn PluginSurface>> {
        let manifest = self.read_manifest(&self.checked_dir(plugin_id)?).await?;
        if manifest.id != plugin_id {
            return Err(Error::Plugin(format!(
                "Manifest id {} does not match plugin {}",
                manifest.id, plugin_id
            )));
        }

        let factory = self.factories.get(plugin_id).or_else(|| {
            manifest
                .original_id
                .as_ref()
                .and_then(|original| self.factories.get(original))
        });

        Ok(match factory {
            Some(factory) => (factory.as_ref())(manifest),
            None => Arc::new(ManifestPlugin::new(manifest)),
        })
    }

    async fn clone_code(
        &self,
        original_id: &str,
        new_id: &str,
        spec: &CloneSpec,
    ) -> Result<PluginManifest> {
        let src = self.checked_dir(original_id)?;
        let dest = self.checked_dir(new_id)?;
        if !src.exists() {
            return Err(Error::NotFound(format!("Plugin code for {} not found", original_id)));
        }
        if dest.exists() {
            return Err(Error::Conflict(format!("Plugin directory for {} already exists", new_id)));
        }

        let original = self.read_manifest(&src).await?;
        let manifest = spec.apply(&original, new_id);

        let copied = async {
            copy_dir_recursive(&src, &dest).await?;
            self.write_manifest(&dest, &manifest).await
        }
        .await;

        if let Err(e) = copied {
            // 부분 복사본 정리
            if let Err(cleanup) = fs::remove_dir_all(&dest).await {
                warn!("Failed to clean up partial clone {:?}: {}", dest, cleanup);
            }
            return Err(e);
        }

        info!("Cloned plugin code {} -> {}", original_id, new_id);
        Ok(manifest)
    }

    async fn remove_code(&self, plugin_id: &str) -> Result<()> {
        let dir = self.checked_dir(plugin_id)?;
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
            info!("Removed plugin code directory {:?}", dir);
        }
        Ok(())
    }

    fn code_dir(&self, plugin_id: &str) -> PathBuf {
        self.root.join(plugin_id.to_lowercase())
    }
}
