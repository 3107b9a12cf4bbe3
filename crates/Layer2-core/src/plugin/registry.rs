//! Plugin Registry - 플러그인 저장소
//!
//! 알려진 모든 플러그인의 매니페스트와 실행 중 인스턴스를 관리한다.
//! 설치 목록/폴더 같은 영속 상태는 건드리지 않는다.

use super::events::EventBus;
use super::loader::{CloneSpec, PluginLoader};
use super::manifest::{validate_plugin_id, PluginManifest};
use super::traits::{PluginContext, PluginStatus, PluginSurface};
use crate::router::{ApiSurfaceSource, RouteDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reel_foundation::{ConfigStore, Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 플러그인 정보
pub struct PluginInfo {
    /// 최근 매니페스트
    pub manifest: PluginManifest,

    /// 실행 중 인스턴스
    pub instance: Option<Arc<dyn PluginSurface>>,

    /// 현재 상태
    pub status: PluginStatus,

    /// 마지막 로드 에러
    pub last_error: Option<String>,

    /// 로드 순서 (최초 로드 시 부여)
    pub load_order: usize,

    /// 마지막 로드 시간
    pub loaded_at: Option<DateTime<Utc>>,
}

impl PluginInfo {
    fn discovered(manifest: PluginManifest) -> Self {
        Self {
            manifest,
            instance: None,
            status: PluginStatus::Discovered,
            last_error: None,
            load_order: 0,
            loaded_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.instance.is_some()
    }
}

/// 플러그인 요약 (조회용)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub status: PluginStatus,
    pub is_clone: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// 플러그인 레지스트리 - 모든 플러그인 관리
pub struct PluginRegistry {
    /// 코드 로더
    loader: Arc<dyn PluginLoader>,

    /// 플러그인 데이터 저장소 (컨텍스트 전달용)
    data: Arc<dyn ConfigStore>,

    /// 이벤트 버스 (컨텍스트 전달용)
    event_bus: Arc<EventBus>,

    /// 플러그인 저장소 (ID -> PluginInfo)
    plugins: RwLock<HashMap<String, PluginInfo>>,

    /// 로드 카운터
    load_counter: RwLock<usize>,
}

impl PluginRegistry {
    /// 새 레지스트리 생성
    pub fn new(
        loader: Arc<dyn PluginLoader>,
        data: Arc<dyn ConfigStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            loader,
            data,
            event_bus,
            plugins: RwLock::new(HashMap::new()),
            load_counter: RwLock::new(0),
        }
    }

    pub fn loader(&self) -> &Arc<dyn PluginLoader> {
        &self.loader
    }

    pub fn code_dir(&self, id: &str) -> PathBuf {
        self.loader.code_dir(id)
    }

    // ========================================================================
    // 발견
    // ========================================================================

    /// 디스크에서 플러그인 발견 - 새로 알게 된 플러그인 수 반환
    ///
    /// 실행 중 플러그인의 매니페스트는 다음 로드까지 유지한다.
    pub async fn discover(&self) -> Result<usize> {
        let manifests = self.loader.discover().await?;
        let mut plugins = self.plugins.write().await;
        let mut added = 0;
        for manifest in manifests {
            match plugins.get_mut(&manifest.id) {
                Some(info) if !info.is_running() => info.manifest = manifest,
                Some(_) => {}
                None => {
                    plugins.insert(manifest.id.clone(), PluginInfo::discovered(manifest));
                    added += 1;
                }
            }
        }
        debug!("Registry knows {} plugins ({} new)", plugins.len(), added);
        Ok(added)
    }

    /// 매니페스트로 직접 등록 (이미 있으면 false)
    pub async fn register(&self, manifest: PluginManifest) -> bool {
        let mut plugins = self.plugins.write().await;
        if plugins.contains_key(&manifest.id) {
            return false;
        }
        plugins.insert(manifest.id.clone(), PluginInfo::discovered(manifest));
        true
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 알려진 모든 플러그인 ID
    pub async fn known_plugin_ids(&self) -> BTreeSet<String> {
        self.plugins.read().await.keys().cloned().collect()
    }

    /// 실행 중인 플러그인 ID (로드 순서)
    pub async fn running_plugin_ids(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        let mut running: Vec<(&String, usize)> = plugins
            .iter()
            .filter(|(_, info)| info.is_running())
            .map(|(id, info)| (id, info.load_order))
            .collect();
        running.sort_by_key(|(_, order)| *order);
        running.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.plugins.read().await.contains_key(id)
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.plugins
            .read()
            .await
            .get(id)
            .map_or(false, PluginInfo::is_running)
    }

    pub async fn is_clone(&self, id: &str) -> bool {
        self.plugins
            .read()
            .await
            .get(id)
            .map_or(false, |info| info.manifest.is_clone)
    }

    /// 실행 중 인스턴스
    pub async fn get(&self, id: &str) -> Option<Arc<dyn PluginSurface>> {
        let plugins = self.plugins.read().await;
        plugins.get(id).and_then(|info| info.instance.clone())
    }

    /// 실행 중 인스턴스 - 없으면 NotFound
    pub async fn running(&self, id: &str) -> Result<Arc<dyn PluginSurface>> {
        self.get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Plugin {} is not running", id)))
    }

    pub async fn manifest(&self, id: &str) -> Option<PluginManifest> {
        let plugins = self.plugins.read().await;
        plugins.get(id).map(|info| info.manifest.clone())
    }

    /// 알려진 모든 매니페스트 (ID 순)
    pub async fn manifests(&self) -> Vec<PluginManifest> {
        let plugins = self.plugins.read().await;
        let mut manifests: Vec<PluginManifest> =
            plugins.values().map(|info| info.manifest.clone()).collect();
        manifests.sort_by(|a, b| a.id.cmp(&b.id));
        manifests
    }

    pub async fn summaries(&self) -> Vec<PluginSummary> {
        let plugins = self.plugins.read().await;
        let mut summaries: Vec<PluginSummary> = plugins
            .iter()
            .map(|(id, info)| PluginSummary {
                id: id.clone(),
                name: info.manifest.name.clone(),
                version: info.manifest.version.clone(),
                status: info.status,
                is_clone: info.manifest.is_clone,
                last_error: info.last_error.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// 플러그인이 현재 선언한 라우트
    pub async fn get_api_surface(&self, id: &str) -> Result<Vec<RouteDescriptor>> {
        let instance = self.running(id).await?;
        Ok(instance.routes())
    }

    // ========================================================================
    // 로드 / 언로드
    // ========================================================================

    /// 플러그인 (재)초기화
    ///
    /// 새 인스턴스를 만들고 초기화가 성공한 경우에만 교체한다.
    /// 실패하면 이전 인스턴스가 그대로 실행된다.
    pub async fn load_or_reload(&self, id: &str, config: Option<Value>) -> Result<()> {
        let instance = match self.build_instance(id, config).await {
            Ok(instance) => instance,
            Err(e) => {
                self.record_failure(id, &e).await;
                return Err(e);
            }
        };

        let manifest = instance.manifest();
        let previous = {
            let mut plugins = self.plugins.write().await;
            let info = plugins
                .entry(id.to_string())
                .or_insert_with(|| PluginInfo::discovered(manifest.clone()));

            if info.load_order == 0 {
                let mut counter = self.load_counter.write().await;
                *counter += 1;
                info.load_order = *counter;
            }
            info.manifest = manifest;
            info.status = PluginStatus::Running;
            info.last_error = None;
            info.loaded_at = Some(Utc::now());
            info.instance.replace(instance)
        };

        if let Some(old) = previous {
            if let Err(e) = old.teardown().await {
                warn!("Teardown of previous {} instance failed: {}", id, e);
            }
        }

        info!("Loaded plugin: {}", id);
        Ok(())
    }

    async fn build_instance(
        &self,
        id: &str,
        config: Option<Value>,
    ) -> Result<Arc<dyn PluginSurface>> {
        let instance = self.loader.load(id).await?;
        let ctx = PluginContext::new(
            id,
            config,
            self.loader.code_dir(id),
            Arc::clone(&self.data),
            Arc::clone(&self.event_bus),
        );
        instance
            .init(&ctx)
            .await
            .map_err(|e| Error::Plugin(format!("Plugin {} failed to initialize: {}", id, e)))?;
        Ok(instance)
    }

    async fn record_failure(&self, id: &str, error: &Error) {
        warn!("Failed to load plugin {}: {}", id, error);
        let mut plugins = self.plugins.write().await;
        if let Some(info) = plugins.get_mut(id) {
            info.last_error = Some(error.to_string());
            if !info.is_running() {
                info.status = PluginStatus::Failed;
            }
        }
    }

    /// 인스턴스 제거 (이미 언로드면 no-op)
    pub async fn unload(&self, id: &str) -> Result<()> {
        let instance = {
            let mut plugins = self.plugins.write().await;
            match plugins.get_mut(id) {
                Some(info) => {
                    info.status = PluginStatus::Discovered;
                    info.instance.take()
                }
                None => None,
            }
        };

        if let Some(instance) = instance {
            if let Err(e) = instance.teardown().await {
                warn!("Teardown of plugin {} failed: {}", id, e);
            }
            info!("Unloaded plugin: {}", id);
        }
        Ok(())
    }

    /// 플러그인 기록 삭제 - 언로드 이후에만 유효
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let mut plugins = self.plugins.write().await;
        if plugins.get(id).map_or(false, PluginInfo::is_running) {
            return Err(Error::Conflict(format!(
                "Plugin {} must be unloaded before removal",
                id
            )));
        }
        let removed = plugins.remove(id).is_some();
        if removed {
            info!("Removed plugin record: {}", id);
        }
        Ok(removed)
    }

    // ========================================================================
    // 복제
    // ========================================================================

    /// 플러그인 복제 - 새 ID 반환 (자동 로드하지 않음)
    pub async fn clone_plugin(&self, original_id: &str, spec: &CloneSpec) -> Result<String> {
        if spec.suffix.trim().is_empty() {
            return Err(Error::Validation("Clone suffix must not be empty".into()));
        }
        validate_plugin_id(original_id)?;
        let new_id = format!("{}{}", original_id, spec.suffix);
        validate_plugin_id(&new_id)?;

        {
            let plugins = self.plugins.read().await;
            if !plugins.contains_key(original_id) {
                return Err(Error::NotFound(format!("Plugin {} not found", original_id)));
            }
            if plugins.contains_key(&new_id) {
                return Err(Error::Conflict(format!("Plugin {} already exists", new_id)));
            }
        }

        let manifest = self
            .loader
            .clone_code(original_id, &new_id, spec)
            .await?;

        if !self.register(manifest).await {
            return Err(Error::Conflict(format!("Plugin {} already exists", new_id)));
        }

        info!("Cloned plugin {} -> {}", original_id, new_id);
        Ok(new_id)
    }
}

#[async_trait]
impl ApiSurfaceSource for PluginRegistry {
    async fn running_plugin_ids(&self) -> Vec<String> {
        PluginRegistry::running_plugin_ids(self).await
    }

    async fn api_surface(&self, plugin_id: &str) -> Result<Vec<RouteDescriptor>> {
        self.get_api_surface(plugin_id).await
    }
}
