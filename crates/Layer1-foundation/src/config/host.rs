//! Host Config - 플러그인 호스트 설정
//!
//! `<home>/config.json` 에서 로드한다. 경로 항목이 비어 있으면 home 기준 기본값.

use crate::storage::{default_home, JsonStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 설정 파일명
pub const HOST_CONFIG_FILE: &str = "config.json";

/// 키-값 시스템 설정 파일명
pub const SYSTEM_STORE_FILE: &str = "system.json";

/// 플러그인 데이터 파일명
pub const PLUGIN_DATA_FILE: &str = "plugindata.json";

/// 호스트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// 설정 파일이 위치한 홈 디렉토리 (직렬화하지 않음)
    #[serde(skip)]
    pub home: PathBuf,

    /// API 경로 접두사
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// 어떤 라우트 변경 후에도 사라지면 안 되는 호스트 경로
    #[serde(default = "default_protected_routes")]
    pub protected_routes: Vec<String>,

    /// 마켓 인덱스 URL 목록
    #[serde(default)]
    pub market_index_urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// 컨테이너 모드 (백업/복원 활성화)
    #[serde(default)]
    pub container_mode: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::new(),
            api_prefix: default_api_prefix(),
            plugins_dir: None,
            data_dir: None,
            backup_dir: None,
            protected_routes: default_protected_routes(),
            market_index_urls: Vec::new(),
            api_key: None,
            api_token: None,
            container_mode: false,
        }
    }
}

impl HostConfig {
    /// 지정한 홈 디렉토리 기준 기본 설정
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            ..Self::default()
        }
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 홈에서 로드
    pub fn load() -> Result<Self> {
        Self::load_from(default_home()?)
    }

    /// 지정한 홈에서 로드 - 파일이 없으면 기본값
    pub fn load_from(home: impl AsRef<Path>) -> Result<Self> {
        let home = home.as_ref();
        let store = JsonStore::new(home);
        let mut config = Self::with_home(home);
        if let Some(file_config) = store.load_optional::<HostConfig>(HOST_CONFIG_FILE)? {
            config.merge(file_config);
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        JsonStore::new(&self.home).save(HOST_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선, home은 유지)
    pub fn merge(&mut self, other: HostConfig) {
        self.api_prefix = other.api_prefix;
        self.protected_routes = other.protected_routes;
        self.container_mode = other.container_mode;

        if other.plugins_dir.is_some() {
            self.plugins_dir = other.plugins_dir;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.backup_dir.is_some() {
            self.backup_dir = other.backup_dir;
        }
        if !other.market_index_urls.is_empty() {
            self.market_index_urls = other.market_index_urls;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.api_token.is_some() {
            self.api_token = other.api_token;
        }
    }

    // ========================================================================
    // Derived
    // ========================================================================

    /// 플러그인 라우트 접두사 (`<apiPrefix>/plugin`)
    pub fn plugin_prefix(&self) -> String {
        format!("{}/plugin", self.api_prefix.trim_end_matches('/'))
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.resolve(self.plugins_dir.as_deref(), "plugins")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(self.data_dir.as_deref(), "data")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.resolve(self.backup_dir.as_deref(), "plugins_backup")
    }

    fn resolve(&self, configured: Option<&Path>, fallback: &str) -> PathBuf {
        match configured {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.home.join(p),
            None => self.home.join(fallback),
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    pub fn container_mode(mut self, enabled: bool) -> Self {
        self.container_mode = enabled;
        self
    }

    pub fn credentials(mut self, api_key: Option<String>, api_token: Option<String>) -> Self {
        self.api_key = api_key;
        self.api_token = api_token;
        self
    }

    pub fn market_index(mut self, url: impl Into<String>) -> Self {
        self.market_index_urls.push(url.into());
        self
    }
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_protected_routes() -> Vec<String> {
    vec![
        "/api/v1/openapi.json".to_string(),
        "/docs".to_string(),
        "/docs/oauth2-redirect".to_string(),
        "/redoc".to_string(),
    ]
}
