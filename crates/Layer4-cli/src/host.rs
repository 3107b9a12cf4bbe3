//! 호스트 부트스트랩
//!
//! 설정 → 저장소 → 로더/레지스트리 → 라우트 테이블 → 라이프사이클 순으로 조립한다.

use reel_core::{
    ApiSurfaceSource, DirectoryLoader, EventBus, IndexCatalog, MemoryRouteTable, OpResponse,
    PluginBackup, PluginLifecycle, PluginRegistry, PluginStore, RouteSynchronizer, RouteTable,
    StaticAuthenticator,
};
use reel_foundation::{
    ConfigStore, HostConfig, JsonFileStore, Result, PLUGIN_DATA_FILE, SYSTEM_STORE_FILE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 조립된 플러그인 호스트
pub struct Host {
    pub config: HostConfig,
    pub lifecycle: PluginLifecycle,
    pub auth: StaticAuthenticator,
}

impl Host {
    /// 설정 로드 (`--home` 지정 시 해당 디렉토리)
    pub fn load_config(home: Option<PathBuf>) -> Result<HostConfig> {
        match home {
            Some(home) => HostConfig::load_from(home),
            None => HostConfig::load(),
        }
    }

    /// 구성 요소 조립 (플러그인은 아직 로드하지 않음)
    pub fn build(config: HostConfig) -> Result<Self> {
        let data_dir = config.data_dir();
        let system: Arc<dyn ConfigStore> =
            Arc::new(JsonFileStore::open(&data_dir, SYSTEM_STORE_FILE)?);
        let data: Arc<dyn ConfigStore> = Arc::new(JsonFileStore::open(&data_dir, PLUGIN_DATA_FILE)?);

        let event_bus = Arc::new(EventBus::new());
        let loader = Arc::new(DirectoryLoader::new(config.plugins_dir()));
        let registry = Arc::new(PluginRegistry::new(loader, data.clone(), event_bus.clone()));
        let store = Arc::new(PluginStore::new(system, data));

        let table: Arc<dyn RouteTable> =
            Arc::new(MemoryRouteTable::with_protected(&config.protected_routes));
        let source: Arc<dyn ApiSurfaceSource> = registry.clone();
        let synchronizer = RouteSynchronizer::new(table, source, config.plugin_prefix())
            .with_protected_paths(config.protected_routes.clone());

        let mut lifecycle = PluginLifecycle::new(registry, store, synchronizer, event_bus)
            .with_catalog(Arc::new(IndexCatalog::new(config.market_index_urls.clone())));
        if config.container_mode {
            debug!("Container mode: backup dir {}", config.backup_dir().display());
            lifecycle = lifecycle.with_backup(PluginBackup::new(config.plugins_dir(), config.backup_dir()));
        }

        let auth = StaticAuthenticator::new(config.api_key.clone(), config.api_token.clone());

        Ok(Self {
            config,
            lifecycle,
            auth,
        })
    }

    /// 조립 후 설치된 플러그인 기동
    pub async fn boot(config: HostConfig) -> Result<(Self, OpResponse)> {
        let host = Self::build(config)?;
        let startup = host.lifecycle.startup().await;
        if startup.success {
            info!("Host ready: {}", startup.message);
        } else {
            warn!("Host started with errors: {}", startup.message);
        }
        Ok((host, startup))
    }
}
