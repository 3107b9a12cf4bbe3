//! Folder Index - 플러그인 폴더 관리
//!
//! 폴더는 `PluginFolders` 키 아래 `name -> record` 맵으로 저장된다.
//! 레코드는 두 가지 인코딩이 섞여 있을 수 있다.
//!
//! - 목록형: `["p1", "p2"]`
//! - 확장형: `{"plugins": ["p1"], "order": 1, "icon": "mdi-folder", ...}`
//!
//! 읽을 때는 둘 다 받고, 쓸 때는 이미 있는 인코딩을 유지한다.
//! `plugins` 배열이 없는 객체 등 그 밖의 값은 손대지 않고 그대로 다시 쓴다.
//! 폴더 순서는 저장된 순서(삽입 순)를 따른다.
//! 한 플러그인은 하나의 폴더에만 속한다는 것은 관례일 뿐 강제되지 않는다.

use reel_foundation::{ConfigStore, Error, Result, SystemConfigKey};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// FolderRecord
// ============================================================================

/// 폴더 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FolderRecord {
    /// 목록형
    List(Vec<String>),

    /// 확장형
    Extended {
        plugins: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<Value>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },

    /// 알 수 없는 형식 (그대로 보존)
    Unknown(Value),
}

impl Default for FolderRecord {
    fn default() -> Self {
        FolderRecord::List(Vec::new())
    }
}

impl FolderRecord {
    /// 폴더의 플러그인 목록
    pub fn plugins(&self) -> &[String] {
        match self {
            FolderRecord::List(plugins) => plugins,
            FolderRecord::Extended { plugins, .. } => plugins,
            FolderRecord::Unknown(_) => &[],
        }
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.plugins().iter().any(|p| p == plugin_id)
    }

    /// 목록 교체 - 인코딩은 유지 (알 수 없는 형식은 목록형으로)
    fn set_plugins(&mut self, ids: Vec<String>) {
        match self {
            FolderRecord::List(plugins) => *plugins = ids,
            FolderRecord::Extended { plugins, .. } => *plugins = ids,
            FolderRecord::Unknown(_) => *self = FolderRecord::List(ids),
        }
    }

    /// ID 제거 - 제거되었으면 true
    fn remove(&mut self, plugin_id: &str) -> bool {
        let plugins = match self {
            FolderRecord::List(plugins) => plugins,
            FolderRecord::Extended { plugins, .. } => plugins,
            FolderRecord::Unknown(_) => return false,
        };
        let before = plugins.len();
        plugins.retain(|p| p != plugin_id);
        plugins.len() != before
    }
}

/// 순서를 유지하며 중복 제거
fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !result.contains(&id) {
            result.push(id);
        }
    }
    result
}

// ============================================================================
// FolderIndex
// ============================================================================

/// 저장 순서를 유지하는 폴더 맵
pub type FolderMap = IndexMap<String, FolderRecord>;

/// 폴더 인덱스
///
/// 여러 호출에 걸친 수정은 트랜잭션이 아니다 (last-write-wins).
pub struct FolderIndex {
    store: Arc<dyn ConfigStore>,
}

impl FolderIndex {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// 전체 폴더 (저장 순)
    pub fn get(&self) -> FolderMap {
        match self.store.get(SystemConfigKey::PluginFolders.as_str()) {
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(name, value)| {
                    let record = serde_json::from_value(value.clone())
                        .unwrap_or(FolderRecord::Unknown(value));
                    (name, record)
                })
                .collect(),
            Some(Value::Null) | None => FolderMap::new(),
            Some(other) => {
                warn!("Ignoring malformed plugin folders value: {}", other);
                FolderMap::new()
            }
        }
    }

    /// 폴더 전체 저장
    pub fn save_all(&self, folders: &FolderMap) -> Result<()> {
        let value = serde_json::to_value(folders)?;
        self.store.set(SystemConfigKey::PluginFolders.as_str(), value)
    }

    /// 빈 목록형 폴더 생성
    pub fn create(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Folder name must not be empty".into()));
        }
        let mut folders = self.get();
        if folders.contains_key(name) {
            return Err(Error::Conflict(format!("Folder {} already exists", name)));
        }
        folders.insert(name.to_string(), FolderRecord::default());
        self.save_all(&folders)?;
        info!("Created plugin folder {}", name);
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let mut folders = self.get();
        if folders.shift_remove(name).is_none() {
            return Err(Error::NotFound(format!("Folder {} not found", name)));
        }
        self.save_all(&folders)?;
        info!("Deleted plugin folder {}", name);
        Ok(())
    }

    /// 폴더 멤버 교체 (없으면 생성)
    pub fn set_plugins(&self, name: &str, ids: Vec<String>) -> Result<()> {
        let ids = dedup_ids(ids);
        let mut folders = self.get();
        let count = ids.len();
        folders
            .entry(name.to_string())
            .or_default()
            .set_plugins(ids);
        self.save_all(&folders)?;
        info!("Set {} plugins in folder {}", count, name);
        Ok(())
    }

    /// 플러그인을 포함한 첫 번째 폴더 (저장 순)
    pub fn find_containing(&self, plugin_id: &str) -> Option<String> {
        self.get()
            .into_iter()
            .find(|(_, record)| record.contains(plugin_id))
            .map(|(name, _)| name)
    }

    /// 폴더 끝에 플러그인 추가 (없으면 폴더 생성, 이미 있으면 no-op)
    pub fn add_plugin(&self, name: &str, plugin_id: &str) -> Result<()> {
        let mut folders = self.get();
        let record = folders.entry(name.to_string()).or_default();
        if record.contains(plugin_id) {
            return Ok(());
        }
        let mut ids = record.plugins().to_vec();
        ids.push(plugin_id.to_string());
        record.set_plugins(ids);
        self.save_all(&folders)?;
        info!("Added plugin {} to folder {}", plugin_id, name);
        Ok(())
    }

    /// 모든 폴더에서 플러그인 제거 - 변경이 있을 때만 한 번 저장
    pub fn remove_plugin(&self, plugin_id: &str) -> Result<bool> {
        let mut folders = self.get();
        let mut changed = false;
        for (name, record) in folders.iter_mut() {
            if record.remove(plugin_id) {
                info!("Removed plugin {} from folder {}", plugin_id, name);
                changed = true;
            }
        }
        if changed {
            self.save_all(&folders)?;
        }
        Ok(changed)
    }
}
