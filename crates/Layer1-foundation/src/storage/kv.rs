//! 키-값 설정 저장소
//!
//! 설치 목록, 폴더 정의, 플러그인 설정처럼 이름 붙은 키에
//! 임의의 JSON 값을 저장한다. 각 호출은 락 안에서 원자적으로 수행되지만
//! 여러 호출에 걸친 read-modify-write는 트랜잭션이 아니다 (last-write-wins).

use super::json::JsonStore;
use crate::Result;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// 시스템 설정 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemConfigKey {
    /// 사용자가 설치한 플러그인 ID 목록 (순서 유지)
    UserInstalledPlugins,
    /// 플러그인 폴더 정의 (name -> list | record)
    PluginFolders,
    /// 플러그인 설치 통계 (id -> count)
    PluginInstallReport,
}

impl SystemConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemConfigKey::UserInstalledPlugins => "UserInstalledPlugins",
            SystemConfigKey::PluginFolders => "PluginFolders",
            SystemConfigKey::PluginInstallReport => "PluginInstallReport",
        }
    }

    /// 플러그인별 설정 키
    pub fn plugin_config(plugin_id: &str) -> String {
        format!("plugin.{}", plugin_id)
    }
}

impl fmt::Display for SystemConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for SystemConfigKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// 설정 저장소 계약 - `get(key) -> JSON | null`, `set(key, JSON)`
pub trait ConfigStore: Send + Sync {
    /// 키 조회 (없으면 None)
    fn get(&self, key: &str) -> Option<Value>;

    /// 키 저장 (덮어쓰기)
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// 키 삭제 - 삭제되었으면 true
    fn delete(&self, key: &str) -> Result<bool>;

    /// 전체 키 목록
    fn keys(&self) -> Vec<String>;
}

// ============================================================================
// JsonFileStore
// ============================================================================

/// 파일 기반 저장소 (메모리 캐시 + write-through)
pub struct JsonFileStore {
    store: JsonStore,
    filename: String,
    cache: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// 파일을 열어 캐시를 채운다. 파일이 없으면 빈 저장소.
    pub fn open(base_dir: impl Into<PathBuf>, filename: impl Into<String>) -> Result<Self> {
        let store = JsonStore::new(base_dir);
        let filename = filename.into();
        let cache: Map<String, Value> = store.load_optional(&filename)?.unwrap_or_default();
        debug!("Opened config store {} ({} keys)", filename, cache.len());
        Ok(Self {
            store,
            filename,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.store.file_path(&self.filename)
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.cache.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut cache = self.cache.lock();
        let previous = cache.insert(key.to_string(), value);
        if let Err(e) = self.store.save(&self.filename, &*cache) {
            // 디스크 반영 실패 시 캐시도 되돌린다
            match previous {
                Some(v) => cache.insert(key.to_string(), v),
                None => cache.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut cache = self.cache.lock();
        let Some(previous) = cache.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.store.save(&self.filename, &*cache) {
            cache.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn keys(&self) -> Vec<String> {
        self.cache.lock().keys().cloned().collect()
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// 메모리 저장소 - 테스트 및 임시 호스트용
///
/// `set` 호출 횟수를 세어 불필요한 쓰기를 검증할 수 있다.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기값을 가진 저장소
    pub fn with_value(self, key: impl Into<String>, value: Value) -> Self {
        self.values.lock().insert(key.into(), value);
        self
    }

    /// 지금까지의 set/delete 횟수
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        *self.writes.lock() += 1;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.values.lock().remove(key).is_some();
        if removed {
            *self.writes.lock() += 1;
        }
        Ok(removed)
    }

    fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_key_names() {
        assert_eq!(
            SystemConfigKey::UserInstalledPlugins.as_str(),
            "UserInstalledPlugins"
        );
        assert_eq!(SystemConfigKey::plugin_config("Demo"), "plugin.Demo");
    }

    #[test]
    fn test_file_store_persists() {
        let temp = TempDir::new().unwrap();
        {
            let store = JsonFileStore::open(temp.path(), "system.json").unwrap();
            store
                .set(SystemConfigKey::UserInstalledPlugins.as_str(), json!(["a", "b"]))
                .unwrap();
            store.set("plugin.a", json!({"enabled": true})).unwrap();
        }

        let reopened = JsonFileStore::open(temp.path(), "system.json").unwrap();
        assert_eq!(
            reopened.get("UserInstalledPlugins"),
            Some(json!(["a", "b"]))
        );
        assert!(reopened.delete("plugin.a").unwrap());
        assert!(!reopened.delete("plugin.a").unwrap());
        assert!(reopened.get("plugin.a").is_none());
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryStore::new().with_value("x", json!(1));
        assert_eq!(store.write_count(), 0);
        store.set("x", json!(2)).unwrap();
        assert!(!store.delete("missing").unwrap());
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.keys(), vec!["x".to_string()]);
    }
}
