//! # reel-foundation
//!
//! Foundation layer for Reel:
//! - Error: 에러 분류 (Validation, NotFound, Conflict, Collaborator, Io ...)
//! - Storage: JsonStore (범용), ConfigStore (키-값 설정)
//! - Config: HostConfig (호스트 설정)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  HostConfig (<home>/config.json)            │
//! │        │                                    │
//! │        ▼                                    │
//! │  ConfigStore                                │
//! │  ├── system.json     (설치 목록, 폴더, 설정) │
//! │  └── plugindata.json (플러그인 데이터)        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{HostConfig, HOST_CONFIG_FILE, PLUGIN_DATA_FILE, SYSTEM_STORE_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{
    default_home, ConfigStore, JsonFileStore, JsonStore, MemoryStore, SystemConfigKey,
};
