//! # Plugin System
//!
//! 런타임 확장 플러그인의 코드 로딩, 인스턴스 관리, 영속 상태
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PluginRegistry                         │
//! │  ┌────────────┬────────────┬────────────────────────────┐  │
//! │  │ demo       │ demo_b     │ other                      │  │
//! │  │ (running)  │ (clone)    │ (discovered)               │  │
//! │  └────────────┴────────────┴────────────────────────────┘  │
//! │         │ PluginLoader (DirectoryLoader)                    │
//! │         ▼                                                   │
//! │  <pluginsDir>/<id>/plugin.json → ManifestPlugin | factory   │
//! └─────────────────────────────────────────────────────────────┘
//!        │                    │                     │
//!   PluginStore          FolderIndex          MarketCatalog
//!   (installed, config,  (name -> list |      (online index)
//!    data, statistics)    record)
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let loader = Arc::new(DirectoryLoader::new(config.plugins_dir()));
//! let registry = PluginRegistry::new(loader, data_store, Arc::new(EventBus::new()));
//! registry.discover().await?;
//! registry.load_or_reload("demo", store.get_config("demo")).await?;
//! ```

mod backup;
mod declarative;
mod events;
mod folder;
mod fsutil;
mod installer;
mod loader;
mod manifest;
mod market;
mod registry;
mod static_files;
mod store;
mod traits;

pub use backup::{BackupReport, PluginBackup};
pub use declarative::ManifestPlugin;
pub use events::{EventBus, EventType, PluginEvent, PluginEventHandler};
pub use folder::{FolderIndex, FolderMap, FolderRecord};
pub use installer::{ArchiveInstaller, CodeInstaller, PluginSource};
pub use loader::{CloneSpec, DirectoryLoader, PluginFactory, PluginLoader};
pub use manifest::{validate_plugin_id, ApiSpec, PluginManifest, PluginVersion, MANIFEST_FILE};
pub use market::{
    build_listing, mark_online, parse_index, IndexCatalog, ListState, MarketCatalog, NoopCatalog,
    PluginView,
};
pub use registry::{PluginInfo, PluginRegistry, PluginSummary};
pub use static_files::{resolve_static_file, StaticFile};
pub use store::PluginStore;
pub use traits::{DashboardMeta, PluginContext, PluginForm, PluginStatus, PluginSurface, RenderMode};
