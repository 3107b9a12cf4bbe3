//! Plugin Store - 플러그인 영속 상태 관리
//!
//! 설치 목록, 플러그인 설정, 설치 통계는 시스템 저장소(`system.json`)에,
//! 플러그인 데이터는 데이터 저장소(`plugindata.json`)에 플러그인 ID 키로 저장한다.

use reel_foundation::{ConfigStore, Result, SystemConfigKey};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// 플러그인 저장소
pub struct PluginStore {
    /// 시스템 설정 저장소
    system: Arc<dyn ConfigStore>,

    /// 플러그인 데이터 저장소
    data: Arc<dyn ConfigStore>,
}

impl PluginStore {
    /// 새 저장소 생성
    pub fn new(system: Arc<dyn ConfigStore>, data: Arc<dyn ConfigStore>) -> Self {
        Self { system, data }
    }

    pub fn system(&self) -> &Arc<dyn ConfigStore> {
        &self.system
    }

    pub fn data(&self) -> &Arc<dyn ConfigStore> {
        &self.data
    }

    // ========================================================================
    // 설치 목록
    // ========================================================================

    /// 설치된 플러그인 ID (설치 순서)
    pub fn installed_ids(&self) -> Vec<String> {
        match self.system.get(SystemConfigKey::UserInstalledPlugins.as_str()) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_installed(&self, id: &str) -> bool {
        self.installed_ids().iter().any(|p| p == id)
    }

    /// 설치 목록에 추가 - 새로 추가되었으면 true
    pub fn add_installed(&self, id: &str) -> Result<bool> {
        let mut ids = self.installed_ids();
        if ids.iter().any(|p| p == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.save_installed(ids)?;
        info!("Added {} to installed plugins", id);
        Ok(true)
    }

    /// 설치 목록에서 제거 - 제거되었으면 true
    pub fn remove_installed(&self, id: &str) -> Result<bool> {
        let mut ids = self.installed_ids();
        let before = ids.len();
        ids.retain(|p| p != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.save_installed(ids)?;
        info!("Removed {} from installed plugins", id);
        Ok(true)
    }

    fn save_installed(&self, ids: Vec<String>) -> Result<()> {
        self.system.set(
            SystemConfigKey::UserInstalledPlugins.as_str(),
            Value::Array(ids.into_iter().map(Value::String).collect()),
        )
    }

    // ========================================================================
    // 설정 / 데이터
    // ========================================================================

    /// 영속화된 플러그인 설정
    pub fn get_config(&self, id: &str) -> Option<Value> {
        self.system
            .get(&SystemConfigKey::plugin_config(id))
            .filter(|v| !v.is_null())
    }

    pub fn set_config(&self, id: &str, config: Value) -> Result<()> {
        self.system.set(&SystemConfigKey::plugin_config(id), config)?;
        debug!("Saved config for plugin {}", id);
        Ok(())
    }

    pub fn delete_config(&self, id: &str) -> Result<bool> {
        self.system.delete(&SystemConfigKey::plugin_config(id))
    }

    /// 플러그인 데이터 전체
    pub fn get_data(&self, id: &str) -> Option<Value> {
        self.data.get(id)
    }

    pub fn delete_data(&self, id: &str) -> Result<bool> {
        self.data.delete(id)
    }

    // ========================================================================
    // 설치 통계
    // ========================================================================

    /// 설치 횟수 기록 - 새 횟수 반환
    pub fn record_install_stat(&self, id: &str) -> Result<u64> {
        let mut report = match self.system.get(SystemConfigKey::PluginInstallReport.as_str()) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let count = report.get(id).and_then(Value::as_u64).unwrap_or(0) + 1;
        report.insert(id.to_string(), Value::from(count));
        self.system
            .set(SystemConfigKey::PluginInstallReport.as_str(), Value::Object(report))?;
        debug!("Install statistic for {}: {}", id, count);
        Ok(count)
    }

    /// 설치 통계 (id -> count)
    pub fn statistic(&self) -> Map<String, Value> {
        match self.system.get(SystemConfigKey::PluginInstallReport.as_str()) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_foundation::MemoryStore;
    use serde_json::json;

    fn store() -> PluginStore {
        PluginStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_installed_list_keeps_order() {
        let store = store();
        assert!(store.add_installed("b").unwrap());
        assert!(store.add_installed("a").unwrap());
        assert!(!store.add_installed("b").unwrap());
        assert_eq!(store.installed_ids(), vec!["b", "a"]);

        assert!(store.remove_installed("b").unwrap());
        assert!(!store.remove_installed("b").unwrap());
        assert_eq!(store.installed_ids(), vec!["a"]);
        assert!(store.is_installed("a"));
    }

    #[test]
    fn test_config_per_plugin() {
        let store = store();
        store.set_config("demo", json!({"enabled": true})).unwrap();
        assert_eq!(store.get_config("demo"), Some(json!({"enabled": true})));
        assert!(store.get_config("demo_b").is_none());

        assert!(store.delete_config("demo").unwrap());
        assert!(store.get_config("demo").is_none());
    }

    #[test]
    fn test_install_statistic() {
        let store = store();
        assert_eq!(store.record_install_stat("demo").unwrap(), 1);
        assert_eq!(store.record_install_stat("demo").unwrap(), 2);
        assert_eq!(store.statistic()["demo"], 2);
    }

    #[test]
    fn test_malformed_installed_list_is_empty() {
        let system = MemoryStore::new().with_value("UserInstalledPlugins", json!("oops"));
        let store = PluginStore::new(Arc::new(system), Arc::new(MemoryStore::new()));
        assert!(store.installed_ids().is_empty());
    }
}
