//! Lifecycle Orchestrator - 플러그인 설치/재로드/설정/제거/복제/초기화 흐름
//!
//! 레지스트리, 라우트 동기화, 폴더 인덱스, 외부 협력자를 하나의 흐름으로 묶는다.
//! 협력자 실패는 로그만 남기고 전체 작업은 계속한다. 호출자에게는 항상
//! `{success, message}` 결과를 돌려주며 호스트 프로세스를 중단시키지 않는다.

use super::collaborators::{CommandRegistry, JobScheduler, LocalCommandRegistry, LocalScheduler};
use super::response::OpResponse;
use crate::plugin::{
    build_listing, mark_online, resolve_static_file, validate_plugin_id, ArchiveInstaller,
    CloneSpec, CodeInstaller, EventBus, EventType, FolderIndex, FolderMap, ListState,
    MarketCatalog, NoopCatalog, PluginBackup, PluginEvent, PluginRegistry, PluginStore,
    PluginView, RenderMode, StaticFile,
};
use crate::router::{
    Authenticator, RouteRequest, RouteResponse, RouteSynchronizer, SyncAction, SyncReport,
};
use reel_foundation::{Error, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 연합 모듈 조회에 쓰는 고정 토큰
pub const REMOTES_TOKEN: &str = "reel";

/// 연합 모듈 원격 진입점 파일
const REMOTE_ENTRY_FILE: &str = "remoteEntry.js";

/// 연합 모듈 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// 대시보드 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardEntry {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// 플러그인 라이프사이클 관리자
pub struct PluginLifecycle {
    registry: Arc<PluginRegistry>,
    store: Arc<PluginStore>,
    folders: FolderIndex,
    synchronizer: RouteSynchronizer,
    installer: Arc<dyn CodeInstaller>,
    catalog: Arc<dyn MarketCatalog>,
    scheduler: Arc<dyn JobScheduler>,
    commands: Arc<dyn CommandRegistry>,
    /// 컨테이너 모드에서만 설정
    backup: Option<PluginBackup>,
    event_bus: Arc<EventBus>,
}

impl PluginLifecycle {
    pub fn new(
        registry: Arc<PluginRegistry>,
        store: Arc<PluginStore>,
        synchronizer: RouteSynchronizer,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            folders: FolderIndex::new(Arc::clone(store.system())),
            registry,
            store,
            synchronizer,
            installer: Arc::new(ArchiveInstaller::new()),
            catalog: Arc::new(NoopCatalog),
            scheduler: Arc::new(LocalScheduler::new()),
            commands: Arc::new(LocalCommandRegistry::new()),
            backup: None,
            event_bus,
        }
    }

    pub fn with_installer(mut self, installer: Arc<dyn CodeInstaller>) -> Self {
        self.installer = installer;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn MarketCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn JobScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_commands(mut self, commands: Arc<dyn CommandRegistry>) -> Self {
        self.commands = commands;
        self
    }

    /// 백업/복구 활성화 (컨테이너 모드)
    pub fn with_backup(mut self, backup: PluginBackup) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<PluginStore> {
        &self.store
    }

    pub fn synchronizer(&self) -> &RouteSynchronizer {
        &self.synchronizer
    }

    pub fn folder_index(&self) -> &FolderIndex {
        &self.folders
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    // ========================================================================
    // 시작
    // ========================================================================

    /// 코드 발견 → 설치된 플러그인 로드 → 전체 라우트 재동기화
    pub async fn startup(&self) -> OpResponse {
        if let Err(e) = self.registry.discover().await {
            error!("Plugin discovery failed: {}", e);
        }

        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for id in self.store.installed_ids() {
            if !self.registry.contains(&id).await {
                warn!("Installed plugin {} has no code on disk", id);
                failed.push(id);
                continue;
            }
            match self
                .registry
                .load_or_reload(&id, self.store.get_config(&id))
                .await
            {
                Ok(()) => {
                    self.register_collaborators(&id).await;
                    loaded.push(id);
                }
                Err(e) => {
                    error!("Failed to start plugin {}: {}", id, e);
                    failed.push(id);
                }
            }
        }

        let report = self.synchronizer.sync(None, SyncAction::Add).await;
        self.publish_routes_changed(&report).await;

        info!(
            "Plugin startup finished: {} loaded, {} failed, {} routes",
            loaded.len(),
            failed.len(),
            report.added
        );
        OpResponse::ok(format!("Started {} plugins", loaded.len())).with_data(json!({
            "loaded": loaded,
            "failed": failed,
            "routes": report.added,
        }))
    }

    // ========================================================================
    // 라이프사이클 작업
    // ========================================================================

    /// 설치
    ///
    /// `force`가 아니고 이미 알려진 플러그인이면 다운로드 없이 통계만 기록한다.
    pub async fn install(&self, plugin_id: &str, repo_url: Option<&str>, force: bool) -> OpResponse {
        if let Err(e) = validate_plugin_id(plugin_id) {
            return e.into();
        }

        let known = if force {
            false
        } else {
            if let Err(e) = self.registry.discover().await {
                warn!("Plugin discovery failed: {}", e);
            }
            self.registry.contains(plugin_id).await
        };

        if !known {
            let Some(repo_url) = repo_url.map(str::trim).filter(|u| !u.is_empty()) else {
                return Error::Validation(format!(
                    "No repository URL given, cannot install plugin {}",
                    plugin_id
                ))
                .into();
            };
            let target = self.registry.code_dir(plugin_id);
            if let Err(e) = self.installer.install(plugin_id, repo_url, &target).await {
                error!("Failed to install plugin {}: {}", plugin_id, e);
                return e.into();
            }
        } else {
            info!("Plugin {} already present, recording install only", plugin_id);
        }

        if let Err(e) = self.store.record_install_stat(plugin_id) {
            warn!("Failed to record install statistic for {}: {}", plugin_id, e);
        }
        if let Err(e) = self.store.add_installed(plugin_id) {
            return e.into();
        }

        self.publish(PluginEvent::for_plugin(EventType::PluginInstalled, plugin_id))
            .await;
        self.reload(plugin_id).await
    }

    /// 재로드 - 영속화된 설정으로 재초기화 후 협력자/라우트 갱신
    pub async fn reload(&self, plugin_id: &str) -> OpResponse {
        if let Err(e) = validate_plugin_id(plugin_id) {
            return e.into();
        }
        let config = self.store.get_config(plugin_id);
        match self.reload_with(plugin_id, config).await {
            Ok(report) => {
                self.publish(PluginEvent::for_plugin(EventType::PluginReloaded, plugin_id))
                    .await;
                OpResponse::ok(format!("Plugin {} reloaded", plugin_id))
                    .with_data(json!({ "routes": report.added }))
            }
            Err(e) => e.into(),
        }
    }

    async fn reload_with(&self, plugin_id: &str, config: Option<Value>) -> Result<SyncReport> {
        self.registry.load_or_reload(plugin_id, config).await?;
        self.register_collaborators(plugin_id).await;

        let ids = vec![plugin_id.to_string()];
        let report = self
            .synchronizer
            .sync(Some(ids.as_slice()), SyncAction::Add)
            .await;
        self.publish_routes_changed(&report).await;
        Ok(report)
    }

    /// 스케줄러/명령 갱신 - 각각 독립적으로 수행
    async fn register_collaborators(&self, plugin_id: &str) {
        if let Err(e) = self.scheduler.update_plugin_job(plugin_id).await {
            warn!("{}", Error::collaborator("scheduler", format!("{}: {}", plugin_id, e)));
        }
        if let Err(e) = self.commands.init_commands(plugin_id).await {
            warn!("{}", Error::collaborator("command registry", format!("{}: {}", plugin_id, e)));
        }
    }

    /// 설정 저장 후 새 설정으로 재초기화
    pub async fn set_config(&self, plugin_id: &str, config: Value) -> OpResponse {
        if let Err(e) = validate_plugin_id(plugin_id) {
            return e.into();
        }
        if !config.is_object() {
            return Error::Validation("Plugin config must be a JSON object".into()).into();
        }
        if let Err(e) = self.store.set_config(plugin_id, config.clone()) {
            return e.into();
        }
        self.publish(PluginEvent::for_plugin(EventType::ConfigChanged, plugin_id))
            .await;

        match self.reload_with(plugin_id, Some(config)).await {
            Ok(_) => OpResponse::ok(format!("Config for {} saved", plugin_id)),
            Err(e) => e.into(),
        }
    }

    pub fn get_config(&self, plugin_id: &str) -> Option<Value> {
        self.store.get_config(plugin_id)
    }

    /// 제거
    ///
    /// 복제본은 설정, 데이터, 코드 디렉토리까지 삭제한다.
    /// 원본 플러그인의 코드 디렉토리는 재설치를 위해 남긴다.
    pub async fn uninstall(&self, plugin_id: &str) -> OpResponse {
        if let Err(e) = validate_plugin_id(plugin_id) {
            return e.into();
        }
        let known = self.registry.contains(plugin_id).await;
        if !known && !self.store.is_installed(plugin_id) {
            return Error::NotFound(format!("Plugin {} not found", plugin_id)).into();
        }

        if let Err(e) = self.store.remove_installed(plugin_id) {
            error!("Failed to update installed plugins for {}: {}", plugin_id, e);
        }

        let ids = vec![plugin_id.to_string()];
        let report = self
            .synchronizer
            .sync(Some(ids.as_slice()), SyncAction::Remove)
            .await;

        if let Err(e) = self.scheduler.remove_plugin_job(plugin_id).await {
            warn!("{}", Error::collaborator("scheduler", format!("{}: {}", plugin_id, e)));
        }

        let is_clone = self.registry.is_clone(plugin_id).await;
        if let Err(e) = self.registry.unload(plugin_id).await {
            warn!("Failed to unload plugin {}: {}", plugin_id, e);
        }

        if is_clone {
            if let Err(e) = self.store.delete_config(plugin_id) {
                error!("Failed to delete config of clone {}: {}", plugin_id, e);
            }
            if let Err(e) = self.store.delete_data(plugin_id) {
                error!("Failed to delete data of clone {}: {}", plugin_id, e);
            }
            if let Err(e) = self.registry.loader().remove_code(plugin_id).await {
                error!("Failed to delete code of clone {}: {}", plugin_id, e);
            }
        }

        if let Err(e) = self.folders.remove_plugin(plugin_id) {
            error!("Failed to remove {} from folders: {}", plugin_id, e);
        }
        if let Err(e) = self.registry.remove(plugin_id).await {
            warn!("Failed to remove plugin record {}: {}", plugin_id, e);
        }

        self.publish_routes_changed(&report).await;
        self.publish(PluginEvent::for_plugin(EventType::PluginUninstalled, plugin_id))
            .await;
        info!("Uninstalled plugin {}", plugin_id);
        OpResponse::ok(format!("Plugin {} uninstalled", plugin_id))
    }

    /// 설정과 데이터만 삭제 (코드 유지) 후 재로드
    pub async fn reset(&self, plugin_id: &str) -> OpResponse {
        if let Err(e) = validate_plugin_id(plugin_id) {
            return e.into();
        }
        if let Err(e) = self.store.delete_config(plugin_id) {
            return e.into();
        }
        if let Err(e) = self.store.delete_data(plugin_id) {
            return e.into();
        }
        self.publish(PluginEvent::for_plugin(EventType::PluginReset, plugin_id))
            .await;
        self.reload(plugin_id).await
    }

    /// 복제 → 설치 목록 추가 → 재로드 → 원본 폴더에 추가
    pub async fn clone_plugin(&self, plugin_id: &str, spec: &CloneSpec) -> OpResponse {
        let new_id = match self.registry.clone_plugin(plugin_id, spec).await {
            Ok(new_id) => new_id,
            Err(e) => {
                error!("Failed to clone plugin {}: {}", plugin_id, e);
                return e.into();
            }
        };

        if let Err(e) = self.store.add_installed(&new_id) {
            error!("Failed to add clone {} to installed plugins: {}", new_id, e);
        }

        let reloaded = self.reload(&new_id).await;

        if let Some(folder) = self.folders.find_containing(plugin_id) {
            if let Err(e) = self.folders.add_plugin(&folder, &new_id) {
                error!("Failed to add clone {} to folder {}: {}", new_id, folder, e);
            }
        }

        self.publish(
            PluginEvent::for_plugin(EventType::PluginCloned, &new_id)
                .with_data(json!({ "originalId": plugin_id })),
        )
        .await;

        if !reloaded.success {
            return OpResponse::fail(format!(
                "Clone {} created but failed to start: {}",
                new_id, reloaded.message
            ))
            .with_data(json!({ "id": new_id }));
        }
        OpResponse::ok(format!("Clone {} created", new_id)).with_data(json!({ "id": new_id }))
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 상태별 플러그인 목록
    pub async fn list_plugins(&self, state: ListState, force: bool) -> Vec<PluginView> {
        if let Err(e) = self.registry.discover().await {
            warn!("Plugin discovery failed: {}", e);
        }

        let installed: HashSet<String> = self.store.installed_ids().into_iter().collect();
        let running: HashSet<String> = self
            .registry
            .running_plugin_ids()
            .await
            .into_iter()
            .collect();

        let local: Vec<PluginView> = self
            .registry
            .manifests()
            .await
            .iter()
            .map(|m| {
                PluginView::from_manifest(m, true)
                    .with_installed(installed.contains(&m.id))
                    .with_running(running.contains(&m.id))
            })
            .collect();

        if state == ListState::Installed {
            return build_listing(state, local, Vec::new());
        }

        let online: Vec<PluginView> = self
            .catalog
            .online_plugins(force)
            .await
            .iter()
            .map(|m| PluginView::from_manifest(m, false))
            .collect();
        let online = mark_online(online, &local);
        build_listing(state, local, online)
    }

    pub fn installed_ids(&self) -> Vec<String> {
        self.store.installed_ids()
    }

    pub fn statistic(&self) -> Map<String, Value> {
        self.store.statistic()
    }

    /// 설정 폼 - `model`은 영속화된 설정이 있으면 그것을 쓴다
    pub async fn form(&self, plugin_id: &str) -> Result<Value> {
        let instance = self.registry.running(plugin_id).await?;
        let render_mode = instance.render_mode();
        match instance.form() {
            Ok(form) => Ok(json!({
                "render_mode": render_mode,
                "conf": form.conf,
                "model": self.store.get_config(plugin_id).unwrap_or(form.model),
            })),
            Err(e) => {
                error!("Plugin {} failed to build form: {}", plugin_id, e);
                Ok(json!({}))
            }
        }
    }

    pub async fn page(&self, plugin_id: &str) -> Result<Value> {
        let instance = self.registry.running(plugin_id).await?;
        let render_mode = instance.render_mode();
        match instance.page() {
            Ok(page) => Ok(json!({ "render_mode": render_mode, "page": page })),
            Err(e) => {
                error!("Plugin {} failed to build page: {}", plugin_id, e);
                Ok(json!({}))
            }
        }
    }

    /// 실행 중인 모든 플러그인의 대시보드 목록
    pub async fn dashboard_meta(&self) -> Vec<DashboardEntry> {
        let mut entries = Vec::new();
        for id in self.registry.running_plugin_ids().await {
            let Some(instance) = self.registry.get(&id).await else {
                continue;
            };
            match instance.dashboard_meta() {
                Ok(metas) => entries.extend(metas.into_iter().map(|meta| DashboardEntry {
                    id: id.clone(),
                    key: meta.key,
                    name: meta.name,
                })),
                Err(e) => error!("Plugin {} failed to list dashboards: {}", id, e),
            }
        }
        entries
    }

    /// 대시보드 문서 - 키가 없으면 첫 번째 대시보드
    pub async fn dashboard(&self, plugin_id: &str, key: Option<&str>) -> Result<Option<Value>> {
        let instance = self.registry.running(plugin_id).await?;
        let key = match key {
            Some(key) => key.to_string(),
            None => match instance.dashboard_meta() {
                Ok(metas) => match metas.into_iter().next() {
                    Some(meta) => meta.key,
                    None => return Ok(None),
                },
                Err(e) => {
                    error!("Plugin {} failed to list dashboards: {}", plugin_id, e);
                    return Ok(None);
                }
            },
        };
        match instance.dashboard(&key) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                error!("Plugin {} failed to build dashboard {}: {}", plugin_id, key, e);
                Ok(None)
            }
        }
    }

    /// Vue 렌더링 플러그인의 연합 모듈 목록 (로드 순)
    pub async fn remotes(&self, token: &str) -> Result<Vec<RemoteEntry>> {
        if token != REMOTES_TOKEN {
            return Err(Error::Unauthorized("Forbidden".into()));
        }
        let mut remotes = Vec::new();
        for id in self.registry.running_plugin_ids().await {
            let Some(instance) = self.registry.get(&id).await else {
                continue;
            };
            let RenderMode::Vue { assets_dir } = instance.render_mode() else {
                continue;
            };
            remotes.push(RemoteEntry {
                url: format!(
                    "{}/file/{}/{}/{}",
                    self.synchronizer.prefix(),
                    id.to_lowercase(),
                    assets_dir.trim_matches('/'),
                    REMOTE_ENTRY_FILE
                ),
                name: instance.manifest().name,
                id,
            });
        }
        Ok(remotes)
    }

    /// 플러그인 정적 파일
    pub fn static_file(&self, plugin_id: &str, file_path: &str) -> Result<StaticFile> {
        validate_plugin_id(plugin_id)?;
        resolve_static_file(&self.registry.code_dir(plugin_id), plugin_id, file_path)
    }

    /// 라우트 테이블로 요청 전달
    pub async fn dispatch(&self, request: RouteRequest, auth: &dyn Authenticator) -> RouteResponse {
        self.synchronizer.table().dispatch(request, auth).await
    }

    // ========================================================================
    // 폴더
    // ========================================================================

    pub fn folders(&self) -> FolderMap {
        self.folders.get()
    }

    pub fn save_folders(&self, folders: &FolderMap) -> OpResponse {
        match self.folders.save_all(folders) {
            Ok(()) => OpResponse::ok("Folders saved"),
            Err(e) => e.into(),
        }
    }

    pub fn create_folder(&self, name: &str) -> OpResponse {
        match self.folders.create(name) {
            Ok(()) => OpResponse::ok(format!("Folder {} created", name)),
            Err(e) => e.into(),
        }
    }

    pub fn delete_folder(&self, name: &str) -> OpResponse {
        match self.folders.delete(name) {
            Ok(()) => OpResponse::ok(format!("Folder {} deleted", name)),
            Err(e) => e.into(),
        }
    }

    pub fn set_folder_plugins(&self, name: &str, plugin_ids: Vec<String>) -> OpResponse {
        match self.folders.set_plugins(name, plugin_ids) {
            Ok(()) => OpResponse::ok(format!("Plugins in folder {} updated", name)),
            Err(e) => e.into(),
        }
    }

    // ========================================================================
    // 백업 / 복구
    // ========================================================================

    pub async fn backup(&self) -> OpResponse {
        let Some(backup) = &self.backup else {
            return OpResponse::ok("Plugin backup is only available in container mode");
        };
        match backup.backup().await {
            Ok(report) => OpResponse::ok(format!("Backed up {} items", report.copied.len()))
                .with_data(serde_json::to_value(&report).unwrap_or(Value::Null)),
            Err(e) => {
                error!("Plugin backup failed: {}", e);
                e.into()
            }
        }
    }

    pub async fn restore(&self, force: bool) -> OpResponse {
        let Some(backup) = &self.backup else {
            return OpResponse::ok("Plugin restore is only available in container mode");
        };
        match backup.restore(force).await {
            Ok(report) => OpResponse::ok(format!("Restored {} items", report.copied.len()))
                .with_data(serde_json::to_value(&report).unwrap_or(Value::Null)),
            Err(e) => {
                error!("Plugin restore failed: {}", e);
                e.into()
            }
        }
    }

    // ========================================================================
    // 이벤트
    // ========================================================================

    async fn publish(&self, event: PluginEvent) {
        self.event_bus.publish(event).await;
    }

    async fn publish_routes_changed(&self, report: &SyncReport) {
        if report.changed() {
            self.publish(PluginEvent::new(
                EventType::RoutesChanged,
                None,
                json!({
                    "plugins": report.plugins,
                    "added": report.added,
                    "removed": report.removed,
                }),
            ))
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{DirectoryLoader, MANIFEST_FILE};
    use crate::router::{ApiSurfaceSource, MemoryRouteTable, RouteTable};
    use reel_foundation::MemoryStore;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_plugin(root: &Path, id: &str) {
        let dir = root.join(id.to_lowercase());
        std::fs::create_dir_all(&dir).unwrap();
        let manifest = json!({
            "id": id,
            "name": id,
            "api": [{"path": "/status", "allowAnonymous": true}],
            "form": {"conf": [], "model": {"enabled": false}},
            "dashboards": {"main": {"name": "Main"}}
        });
        std::fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();
    }

    fn lifecycle(root: &Path) -> PluginLifecycle {
        let events = Arc::new(EventBus::new());
        let store = Arc::new(PluginStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        ));
        let registry = Arc::new(PluginRegistry::new(
            Arc::new(DirectoryLoader::new(root)),
            Arc::clone(store.data()),
            Arc::clone(&events),
        ));
        let table: Arc<dyn RouteTable> = Arc::new(MemoryRouteTable::new());
        let source: Arc<dyn ApiSurfaceSource> = registry.clone();
        let sync = RouteSynchronizer::new(table, source, "/api/v1/plugin");
        PluginLifecycle::new(registry, store, sync, events)
    }

    #[tokio::test]
    async fn test_install_known_plugin_skips_download() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "demo");
        let lifecycle = lifecycle(temp.path());

        let resp = lifecycle.install("demo", None, false).await;
        assert!(resp.success, "{}", resp.message);
        assert_eq!(lifecycle.installed_ids(), vec!["demo".to_string()]);
        assert_eq!(lifecycle.statistic()["demo"], 1);

        let table = lifecycle.synchronizer().table();
        assert!(table
            .resolve("/api/v1/plugin/demo/status", crate::router::Method::Get)
            .is_some());
    }

    #[tokio::test]
    async fn test_install_without_repo_url_fails() {
        let temp = TempDir::new().unwrap();
        let lifecycle = lifecycle(temp.path());
        let resp = lifecycle.install("ghost", None, false).await;
        assert!(!resp.success);
        assert!(lifecycle.installed_ids().is_empty());
    }

    #[tokio::test]
    async fn test_form_uses_persisted_config() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "demo");
        let lifecycle = lifecycle(temp.path());

        assert!(matches!(lifecycle.form("demo").await, Err(Error::NotFound(_))));

        lifecycle.install("demo", None, false).await;
        let form = lifecycle.form("demo").await.unwrap();
        assert_eq!(form["model"], json!({"enabled": false}));

        let resp = lifecycle.set_config("demo", json!({"enabled": true})).await;
        assert!(resp.success);
        let form = lifecycle.form("demo").await.unwrap();
        assert_eq!(form["model"], json!({"enabled": true}));
        assert_eq!(form["render_mode"], json!({"mode": "vuetify"}));

        assert!(!lifecycle.set_config("demo", json!([1])).await.success);
    }

    #[tokio::test]
    async fn test_remotes_list_vue_plugins_only() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "demo");
        let dir = temp.path().join("vuedemo");
        std::fs::create_dir_all(&dir).unwrap();
        let manifest = json!({"id": "VueDemo", "name": "Vue Demo", "renderMode": "vue"});
        std::fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();

        let lifecycle = lifecycle(temp.path());
        lifecycle.install("demo", None, false).await;
        assert!(lifecycle.remotes(REMOTES_TOKEN).await.unwrap().is_empty());

        assert!(lifecycle.install("VueDemo", None, false).await.success);
        let remotes = lifecycle.remotes(REMOTES_TOKEN).await.unwrap();
        assert_eq!(
            remotes,
            vec![RemoteEntry {
                id: "VueDemo".into(),
                name: "Vue Demo".into(),
                url: "/api/v1/plugin/file/vuedemo/dist/assets/remoteEntry.js".into(),
            }]
        );

        assert!(matches!(
            lifecycle.remotes("wrong").await,
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_queries() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "demo");
        let lifecycle = lifecycle(temp.path());
        lifecycle.install("demo", None, false).await;

        let metas = lifecycle.dashboard_meta().await;
        assert_eq!(
            metas,
            vec![DashboardEntry {
                id: "demo".into(),
                key: "main".into(),
                name: "Main".into()
            }]
        );
        let doc = lifecycle.dashboard("demo", None).await.unwrap().unwrap();
        assert_eq!(doc["name"], "Main");
        assert!(lifecycle.dashboard("demo", Some("none")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backup_disabled_outside_container() {
        let temp = TempDir::new().unwrap();
        let lifecycle = lifecycle(temp.path());
        let resp = lifecycle.backup().await;
        assert!(resp.success);
        assert!(resp.data.is_none());
    }
}
