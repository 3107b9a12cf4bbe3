//! reel-core: Plugin runtime for the Reel host
//!
//! Layer2 - 플러그인 라이프사이클과 동적 라우트 레지스트리
//!
//! # 주요 모듈
//!
//! - `plugin`: 플러그인 코드 로딩, 레지스트리, 영속 상태, 폴더, 마켓
//! - `router`: 라이브 라우트 테이블과 플러그인 라우트 동기화
//! - `lifecycle`: 설치/재로드/설정/제거/복제/초기화 흐름
//!
//! # 사용 예시
//!
//! ```ignore
//! use reel_core::{PluginLifecycle, ListState};
//!
//! let lifecycle = PluginLifecycle::new(registry, store, synchronizer, events);
//! lifecycle.startup().await;
//!
//! let resp = lifecycle.install("demo", Some("https://github.com/owner/plugins"), false).await;
//! if resp.success {
//!     let plugins = lifecycle.list_plugins(ListState::Installed, false).await;
//! }
//! ```

pub mod lifecycle;
pub mod plugin;
pub mod router;

// Re-exports: Lifecycle
pub use lifecycle::{
    CommandRegistry, DashboardEntry, JobScheduler, LocalCommandRegistry, LocalScheduler,
    OpResponse, PluginLifecycle, RemoteEntry, REMOTES_TOKEN,
};

// Re-exports: Plugin
pub use plugin::{
    validate_plugin_id, ArchiveInstaller, CloneSpec, CodeInstaller, DirectoryLoader, EventBus,
    EventType, FolderIndex, FolderMap, FolderRecord, IndexCatalog, ListState, ManifestPlugin,
    MarketCatalog, NoopCatalog, PluginBackup, PluginContext, PluginEvent, PluginLoader, PluginManifest,
    PluginRegistry, PluginStatus, PluginStore, PluginSurface, PluginView, StaticFile,
};

// Re-exports: Router
pub use router::{
    ApiSurfaceSource, AuthMode, Authenticator, MemoryRouteTable, Method, RouteBinding,
    RouteDescriptor, RouteRequest, RouteResponse, RouteSynchronizer, RouteTable,
    StaticAuthenticator, SyncAction, SyncReport,
};
