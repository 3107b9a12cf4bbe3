//! Config - 호스트 설정 관리
//!
//! - `host.rs` - HostConfig (경로, API 접두사, 보호 라우트, 자격 증명)

mod host;

pub use host::{HostConfig, HOST_CONFIG_FILE, PLUGIN_DATA_FILE, SYSTEM_STORE_FILE};
