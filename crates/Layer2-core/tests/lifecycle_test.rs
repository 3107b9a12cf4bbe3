//! 플러그인 라이프사이클 통합 테스트
//!
//! 외부 협력자(스케줄러, 명령 레지스트리, 코드 설치기)는 프로세스 내 가짜로,
//! 라우트 테이블은 재구성 시 보호 라우트를 잃는 테이블로 대체한다.

use async_trait::async_trait;
use parking_lot::Mutex;
use reel_core::router::BindingId;
use reel_core::{
    ApiSurfaceSource, CloneSpec, CodeInstaller, CommandRegistry, DirectoryLoader, EventBus,
    EventType, JobScheduler, MemoryRouteTable, Method, PluginLifecycle, PluginRegistry,
    PluginStore, RouteBinding, RouteRequest, RouteSynchronizer, RouteTable, StaticAuthenticator,
    SyncAction,
};
use reel_foundation::{ConfigStore, Error, MemoryStore, Result};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PREFIX: &str = "/api/v1/plugin";

fn protected_paths() -> Vec<String> {
    vec![
        "/api/v1/openapi.json".to_string(),
        "/docs".to_string(),
        "/docs/oauth2-redirect".to_string(),
        "/redoc".to_string(),
    ]
}

// ============================================================================
// Fakes
// ============================================================================

/// 재구성 시 보호 라우트를 잃는 테이블
struct LossyRouteTable {
    inner: MemoryRouteTable,
    rebuilds: AtomicUsize,
}

impl LossyRouteTable {
    fn new() -> Self {
        Self {
            inner: MemoryRouteTable::with_protected(&protected_paths()),
            rebuilds: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RouteTable for LossyRouteTable {
    fn bindings(&self) -> Arc<Vec<RouteBinding>> {
        self.inner.bindings()
    }

    fn add(&self, binding: RouteBinding) -> Result<BindingId> {
        self.inner.add(binding)
    }

    fn remove(&self, id: BindingId) -> bool {
        self.inner.remove(id)
    }

    fn invalidate_schema(&self) {
        self.inner.invalidate_schema()
    }

    fn rebuild(&self) -> Result<()> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        for binding in self.inner.bindings().iter().filter(|b| b.protected) {
            self.inner.remove(binding.id);
        }
        self.inner.rebuild()
    }

    fn schema(&self) -> Value {
        self.inner.schema()
    }
}

#[derive(Default)]
struct FakeInstaller {
    calls: AtomicUsize,
}

#[async_trait]
impl CodeInstaller for FakeInstaller {
    async fn install(&self, plugin_id: &str, _repo_url: &str, target_dir: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        write_manifest(target_dir, plugin_id, &["/status"]);
        Ok(())
    }
}

/// 항상 실패하는 스케줄러
#[derive(Default)]
struct BrokenScheduler {
    removed: Mutex<Vec<String>>,
}

#[async_trait]
impl JobScheduler for BrokenScheduler {
    async fn update_plugin_job(&self, plugin_id: &str) -> Result<()> {
        Err(Error::collaborator("scheduler", format!("cannot schedule {}", plugin_id)))
    }

    async fn remove_plugin_job(&self, plugin_id: &str) -> Result<()> {
        self.removed.lock().push(plugin_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingCommands {
    initialized: Mutex<BTreeSet<String>>,
}

#[async_trait]
impl CommandRegistry for RecordingCommands {
    async fn init_commands(&self, plugin_id: &str) -> Result<()> {
        self.initialized.lock().insert(plugin_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

fn write_manifest(dir: &Path, id: &str, routes: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    let api: Vec<Value> = routes
        .iter()
        .map(|p| json!({"path": p, "response": {"plugin": id}}))
        .collect();
    let manifest = json!({"id": id, "name": id, "version": "1.0.0", "api": api});
    std::fs::write(dir.join("plugin.json"), manifest.to_string()).unwrap();
}

struct Host {
    _temp: TempDir,
    plugins_dir: PathBuf,
    system: Arc<MemoryStore>,
    data: Arc<MemoryStore>,
    table: Arc<LossyRouteTable>,
    installer: Arc<FakeInstaller>,
    scheduler: Arc<BrokenScheduler>,
    commands: Arc<RecordingCommands>,
    lifecycle: PluginLifecycle,
}

impl Host {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let plugins_dir = temp.path().join("plugins");
        std::fs::create_dir_all(&plugins_dir).unwrap();

        let system = Arc::new(MemoryStore::new());
        let data = Arc::new(MemoryStore::new());
        let events = Arc::new(EventBus::new());
        let store = Arc::new(PluginStore::new(system.clone(), data.clone()));
        let registry = Arc::new(PluginRegistry::new(
            Arc::new(DirectoryLoader::new(&plugins_dir)),
            data.clone(),
            Arc::clone(&events),
        ));

        let table = Arc::new(LossyRouteTable::new());
        let source: Arc<dyn ApiSurfaceSource> = registry.clone();
        let synchronizer = RouteSynchronizer::new(table.clone(), source, PREFIX)
            .with_protected_paths(protected_paths());

        let installer = Arc::new(FakeInstaller::default());
        let scheduler = Arc::new(BrokenScheduler::default());
        let commands = Arc::new(RecordingCommands::default());
        let lifecycle = PluginLifecycle::new(registry, store, synchronizer, events)
            .with_installer(installer.clone())
            .with_scheduler(scheduler.clone())
            .with_commands(commands.clone());

        Self {
            _temp: temp,
            plugins_dir,
            system,
            data,
            table,
            installer,
            scheduler,
            commands,
            lifecycle,
        }
    }

    fn add_code(&self, id: &str, routes: &[&str]) {
        write_manifest(&self.plugins_dir.join(id.to_lowercase()), id, routes);
    }

    fn resolves(&self, path: &str) -> bool {
        self.table.resolve(path, Method::Get).is_some()
    }

    fn assert_protected_routes(&self) {
        for path in protected_paths() {
            assert!(self.resolves(&path), "protected route {} missing", path);
        }
    }

    fn assert_no_duplicate_scoped_paths(&self) {
        let bindings = self.table.bindings();
        let mut seen = BTreeSet::new();
        for binding in bindings.iter().filter(|b| b.path.starts_with(PREFIX)) {
            for method in &binding.methods {
                assert!(
                    seen.insert((binding.path.clone(), method.to_string())),
                    "duplicate binding {} {}",
                    method,
                    binding.path
                );
            }
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn install_known_plugin_only_records_statistic() {
    let host = Host::new();
    host.add_code("demo", &["/status", "/history"]);

    let resp = host
        .lifecycle
        .install("demo", Some("https://github.com/owner/plugins"), false)
        .await;
    assert!(resp.success, "{}", resp.message);

    assert_eq!(host.installer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(host.lifecycle.statistic()["demo"], 1);
    assert_eq!(host.lifecycle.installed_ids(), vec!["demo".to_string()]);
    assert!(host.resolves("/api/v1/plugin/demo/status"));
    assert!(host.resolves("/api/v1/plugin/demo/history"));
    assert!(host.table.rebuilds.load(Ordering::SeqCst) > 0);
    host.assert_protected_routes();
}

#[tokio::test]
async fn install_unknown_plugin_downloads_code() {
    let host = Host::new();

    let missing = host.lifecycle.install("fresh", None, false).await;
    assert!(!missing.success);
    assert_eq!(host.installer.calls.load(Ordering::SeqCst), 0);

    let resp = host
        .lifecycle
        .install("fresh", Some("https://github.com/owner/plugins"), false)
        .await;
    assert!(resp.success, "{}", resp.message);
    assert_eq!(host.installer.calls.load(Ordering::SeqCst), 1);
    assert!(host.resolves("/api/v1/plugin/fresh/status"));

    // 강제 설치는 이미 알려진 플러그인도 다시 받는다
    let forced = host
        .lifecycle
        .install("fresh", Some("https://github.com/owner/plugins"), true)
        .await;
    assert!(forced.success);
    assert_eq!(host.installer.calls.load(Ordering::SeqCst), 2);
    host.assert_no_duplicate_scoped_paths();
}

#[tokio::test]
async fn path_like_ids_never_reach_outside_plugins_dir() {
    let host = Host::new();
    let home = host.plugins_dir.parent().unwrap().to_path_buf();
    std::fs::create_dir_all(home.join("data")).unwrap();
    std::fs::write(home.join("data/system.json"), "{}").unwrap();

    for id in ["..", "../data", "/tmp/elsewhere", "demo/../.."] {
        let resp = host
            .lifecycle
            .install(id, Some("https://github.com/owner/plugins"), true)
            .await;
        assert!(!resp.success, "install {:?} should be rejected", id);
    }
    assert_eq!(host.installer.calls.load(Ordering::SeqCst), 0);
    assert!(home.join("data/system.json").exists());
    assert!(host.lifecycle.installed_ids().is_empty());

    host.add_code("demo", &["/status"]);
    assert!(host.lifecycle.install("demo", None, false).await.success);

    let escaped = host
        .lifecycle
        .clone_plugin("demo", &CloneSpec::new("/../../escaped"))
        .await;
    assert!(!escaped.success);
    assert!(!home.join("escaped").exists());
    assert_eq!(host.lifecycle.installed_ids(), vec!["demo".to_string()]);

    assert!(!host.lifecycle.uninstall("..").await.success);
    assert!(!host.lifecycle.reset("../data").await.success);
    assert!(!host.lifecycle.set_config("a/b", json!({})).await.success);
    assert!(host.lifecycle.static_file("/etc", "passwd").is_err());
    assert!(home.join("data").exists());
    assert!(host.resolves("/api/v1/plugin/demo/status"));
    host.assert_protected_routes();
}

#[tokio::test]
async fn scheduler_failure_does_not_block_routes() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);

    let resp = host.lifecycle.install("demo", None, false).await;
    assert!(resp.success);
    assert!(host.resolves("/api/v1/plugin/demo/status"));
    assert!(host.commands.initialized.lock().contains("demo"));
}

#[tokio::test]
async fn remove_sync_is_idempotent() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;

    let sync = host.lifecycle.synchronizer();
    let ids = vec!["demo".to_string()];
    let first = sync.sync(Some(ids.as_slice()), SyncAction::Remove).await;
    let after_first: Vec<String> = host.table.bindings().iter().map(|b| b.path.clone()).collect();

    let second = sync.sync(Some(ids.as_slice()), SyncAction::Remove).await;
    let after_second: Vec<String> = host.table.bindings().iter().map(|b| b.path.clone()).collect();

    assert!(first.changed());
    assert!(!second.changed());
    assert_eq!(after_first, after_second);
    host.assert_protected_routes();
}

#[tokio::test]
async fn protected_routes_survive_every_mutation() {
    let host = Host::new();
    host.add_code("a", &["/one"]);
    host.add_code("b", &["/two", "/three"]);

    host.lifecycle.install("a", None, false).await;
    host.assert_protected_routes();
    host.lifecycle.install("b", None, false).await;
    host.assert_protected_routes();
    host.lifecycle.reload("a").await;
    host.assert_protected_routes();
    host.lifecycle.uninstall("b").await;
    host.assert_protected_routes();

    let sync = host.lifecycle.synchronizer();
    sync.sync(None, SyncAction::Add).await;
    host.assert_protected_routes();
    sync.sync(None, SyncAction::Remove).await;
    host.assert_protected_routes();
    assert!(!host.resolves("/api/v1/plugin/a/one"));
}

#[tokio::test]
async fn repeated_reloads_never_duplicate_scoped_paths() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;

    for _ in 0..3 {
        assert!(host.lifecycle.reload("demo").await.success);
    }
    host.lifecycle
        .synchronizer()
        .sync(None, SyncAction::Add)
        .await;

    host.assert_no_duplicate_scoped_paths();
    let scoped = host
        .table
        .bindings()
        .iter()
        .filter(|b| b.path.starts_with("/api/v1/plugin/demo/"))
        .count();
    assert_eq!(scoped, 1);
}

#[tokio::test]
async fn clone_is_isolated_and_mirrors_folder() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;
    host.lifecycle.set_config("demo", json!({"name": "original"})).await;
    host.system
        .set(
            "PluginFolders",
            json!({"media": {"plugins": ["demo"], "order": 1, "icon": "mdi-movie"}}),
        )
        .unwrap();

    let resp = host
        .lifecycle
        .clone_plugin("demo", &CloneSpec::new("_b").with_name("Demo B"))
        .await;
    assert!(resp.success, "{}", resp.message);
    assert_eq!(resp.data.unwrap()["id"], "demo_b");

    assert!(host.resolves("/api/v1/plugin/demo_b/status"));
    assert!(host.lifecycle.installed_ids().contains(&"demo_b".to_string()));
    assert_eq!(
        host.system.get("PluginFolders").unwrap()["media"]["plugins"],
        json!(["demo", "demo_b"])
    );

    host.lifecycle.set_config("demo_b", json!({"name": "clone"})).await;
    assert_eq!(host.lifecycle.get_config("demo"), Some(json!({"name": "original"})));
    assert_eq!(host.lifecycle.get_config("demo_b"), Some(json!({"name": "clone"})));

    let duplicate = host
        .lifecycle
        .clone_plugin("demo", &CloneSpec::new("_b"))
        .await;
    assert!(!duplicate.success);
    let empty = host.lifecycle.clone_plugin("demo", &CloneSpec::new("")).await;
    assert!(!empty.success);
}

#[tokio::test]
async fn uninstall_clone_removes_all_of_its_state() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;
    host.lifecycle.set_config("demo", json!({"name": "original"})).await;
    host.lifecycle.create_folder("tools");
    host.lifecycle
        .set_folder_plugins("tools", vec!["demo".to_string()]);

    host.lifecycle
        .clone_plugin("demo", &CloneSpec::new("_b"))
        .await;
    host.lifecycle.set_config("demo_b", json!({"name": "clone"})).await;
    host.data.set("demo_b", json!({"history": [1, 2]})).unwrap();
    let clone_dir = host.plugins_dir.join("demo_b");
    assert!(clone_dir.exists());

    let resp = host.lifecycle.uninstall("demo_b").await;
    assert!(resp.success, "{}", resp.message);

    assert!(host.lifecycle.get_config("demo_b").is_none());
    assert!(host.data.get("demo_b").is_none());
    assert!(!clone_dir.exists());
    assert!(!host.resolves("/api/v1/plugin/demo_b/status"));
    assert!(!host.lifecycle.registry().contains("demo_b").await);
    assert!(host.lifecycle.folder_index().find_containing("demo_b").is_none());
    assert_eq!(host.scheduler.removed.lock().as_slice(), ["demo_b".to_string()]);

    // 원본은 그대로
    assert_eq!(host.lifecycle.get_config("demo"), Some(json!({"name": "original"})));
    assert!(host.resolves("/api/v1/plugin/demo/status"));
    assert_eq!(
        host.lifecycle.folder_index().find_containing("demo").as_deref(),
        Some("tools")
    );
}

#[tokio::test]
async fn uninstall_original_keeps_code_for_reinstall() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;

    assert!(host.lifecycle.uninstall("demo").await.success);
    assert!(host.plugins_dir.join("demo").join("plugin.json").exists());
    assert!(host.lifecycle.installed_ids().is_empty());
    assert!(!host.resolves("/api/v1/plugin/demo/status"));

    // 코드가 남아 있으므로 다운로드 없이 재설치
    assert!(host.lifecycle.install("demo", None, false).await.success);
    assert_eq!(host.installer.calls.load(Ordering::SeqCst), 0);
    assert!(host.resolves("/api/v1/plugin/demo/status"));

    assert!(!host.lifecycle.uninstall("ghost").await.success);
}

#[tokio::test]
async fn reset_clears_config_and_data_but_keeps_code() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;
    host.lifecycle.set_config("demo", json!({"enabled": true})).await;
    host.data.set("demo", json!({"runs": 3})).unwrap();

    let resp = host.lifecycle.reset("demo").await;
    assert!(resp.success, "{}", resp.message);
    assert!(host.lifecycle.get_config("demo").is_none());
    assert!(host.data.get("demo").is_none());
    assert!(host.plugins_dir.join("demo").exists());
    assert!(host.resolves("/api/v1/plugin/demo/status"));
}

#[tokio::test]
async fn failed_reload_keeps_previous_routes() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;

    std::fs::write(host.plugins_dir.join("demo").join("plugin.json"), "{broken").unwrap();
    let resp = host.lifecycle.reload("demo").await;
    assert!(!resp.success);

    assert!(host.lifecycle.registry().is_running("demo").await);
    assert!(host.resolves("/api/v1/plugin/demo/status"));
}

#[tokio::test]
async fn startup_loads_installed_plugins_and_dispatches() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.add_code("idle", &["/status"]);
    host.system
        .set("UserInstalledPlugins", json!(["demo", "missing"]))
        .unwrap();
    host.system
        .set("plugin.demo", json!({"mode": "fast"}))
        .unwrap();

    let resp = host.lifecycle.startup().await;
    assert!(resp.success);
    let data = resp.data.unwrap();
    assert_eq!(data["loaded"], json!(["demo"]));
    assert_eq!(data["failed"], json!(["missing"]));

    assert!(host.resolves("/api/v1/plugin/demo/status"));
    assert!(!host.resolves("/api/v1/plugin/idle/status"));
    host.assert_protected_routes();

    let auth = StaticAuthenticator::new(Some("secret".to_string()), None);
    let denied = host
        .lifecycle
        .dispatch(RouteRequest::new(Method::Get, "/api/v1/plugin/demo/status"), &auth)
        .await;
    assert_eq!(denied.status, 401);

    let allowed = host
        .lifecycle
        .dispatch(
            RouteRequest::new(Method::Get, "/api/v1/plugin/demo/status").with_query("apikey", "secret"),
            &auth,
        )
        .await;
    assert_eq!(allowed.status, 200);
    assert_eq!(allowed.body["plugin"], "demo");
    assert_eq!(allowed.body["config"], json!({"mode": "fast"}));
}

#[tokio::test]
async fn lifecycle_events_are_published() {
    let host = Host::new();
    host.add_code("demo", &["/status"]);
    host.lifecycle.install("demo", None, false).await;
    host.lifecycle.uninstall("demo").await;

    let bus = host.lifecycle.event_bus();
    assert_eq!(bus.history_by_type(EventType::PluginInstalled).await.len(), 1);
    assert_eq!(bus.history_by_type(EventType::PluginReloaded).await.len(), 1);
    assert_eq!(bus.history_by_type(EventType::PluginUninstalled).await.len(), 1);
    assert_eq!(bus.history_by_type(EventType::RoutesChanged).await.len(), 2);
}
