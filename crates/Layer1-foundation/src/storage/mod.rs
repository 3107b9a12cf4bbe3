//! Storage module for Reel
//!
//! - `json`: JSON - 범용 파일 저장/로드
//! - `kv`: 키-값 설정 저장소 (설치 목록, 폴더, 플러그인 설정/데이터)

mod json;
mod kv;

// JSON Storage (범용)
pub use json::{default_home, JsonStore};

// Key-Value Config Store
pub use kv::{ConfigStore, JsonFileStore, MemoryStore, SystemConfigKey};
