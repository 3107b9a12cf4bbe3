//! Plugin Market - 온라인 플러그인 목록과 상태별 목록 구성
//!
//! 온라인 목록은 JSON 인덱스에서 가져온다. 인덱스는 매니페스트 배열이거나
//! `id -> 매니페스트` 맵이다.

use super::manifest::PluginManifest;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use reel_foundation::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info, warn};

// ============================================================================
// ListState / PluginView
// ============================================================================

/// 목록 조회 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListState {
    #[default]
    All,
    Installed,
    Market,
}

impl FromStr for ListState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ListState::All),
            "installed" => Ok(ListState::Installed),
            "market" => Ok(ListState::Market),
            other => Err(Error::Validation(format!("Unknown plugin state: {}", other))),
        }
    }
}

/// 목록 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    pub installed: bool,
    pub running: bool,
    pub is_clone: bool,
    /// 로컬 코드가 있는지
    pub is_local: bool,
    pub has_update: bool,
}

impl PluginView {
    pub fn from_manifest(manifest: &PluginManifest, is_local: bool) -> Self {
        Self {
            id: manifest.id.clone(),
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            version: manifest.version.clone(),
            icon: manifest.icon.clone(),
            author: manifest.author.clone(),
            repo_url: manifest.repo_url.clone(),
            installed: false,
            running: false,
            is_clone: manifest.is_clone,
            is_local,
            has_update: false,
        }
    }

    pub fn with_installed(mut self, installed: bool) -> Self {
        self.installed = installed;
        self
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }
}

/// 온라인 항목에 설치 여부와 업데이트 여부 표시
pub fn mark_online(online: Vec<PluginView>, local: &[PluginView]) -> Vec<PluginView> {
    online
        .into_iter()
        .map(|mut view| {
            if let Some(installed) = local.iter().find(|l| l.id == view.id && l.installed) {
                view.installed = true;
                view.running = installed.running;
                view.has_update = PluginManifest::version_is_newer(&view.version, &installed.version);
            }
            view
        })
        .collect()
}

/// 상태별 목록 구성
///
/// 온라인 목록이 비어 있으면 로컬 목록으로 대체한다.
pub fn build_listing(
    state: ListState,
    local: Vec<PluginView>,
    online: Vec<PluginView>,
) -> Vec<PluginView> {
    let (installed, not_installed): (Vec<PluginView>, Vec<PluginView>) =
        local.into_iter().partition(|p| p.installed);

    if state == ListState::Installed {
        return installed;
    }

    if online.is_empty() {
        return match state {
            ListState::Market => not_installed,
            _ => installed.into_iter().chain(not_installed).collect(),
        };
    }

    let installed_ids: HashSet<&str> = installed.iter().map(|p| p.id.as_str()).collect();
    let mut market: Vec<PluginView> = online
        .into_iter()
        .filter(|p| !installed_ids.contains(p.id.as_str()) || p.has_update)
        .collect();

    let market_ids: HashSet<String> = market.iter().map(|p| p.id.clone()).collect();
    market.extend(
        not_installed
            .into_iter()
            .filter(|p| !market_ids.contains(&p.id)),
    );

    match state {
        ListState::Market => market,
        _ => installed.into_iter().chain(market).collect(),
    }
}

// ============================================================================
// MarketCatalog
// ============================================================================

/// 온라인 플러그인 목록 계약
#[async_trait]
pub trait MarketCatalog: Send + Sync {
    /// 온라인 플러그인 (`force`면 캐시 무시)
    async fn online_plugins(&self, force: bool) -> Vec<PluginManifest>;
}

/// 빈 카탈로그 (오프라인)
pub struct NoopCatalog;

#[async_trait]
impl MarketCatalog for NoopCatalog {
    async fn online_plugins(&self, _force: bool) -> Vec<PluginManifest> {
        Vec::new()
    }
}

/// JSON 인덱스 기반 카탈로그
pub struct IndexCatalog {
    urls: Vec<String>,
    client: Client,
    cache: Mutex<Option<Vec<PluginManifest>>>,
}

impl IndexCatalog {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            client: Client::new(),
            cache: Mutex::new(None),
        }
    }

    async fn fetch_index(&self, url: &str) -> Result<Vec<PluginManifest>> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "reel-market")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!("HTTP {} from {}", response.status(), url)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(parse_index(body, url))
    }
}

#[async_trait]
impl MarketCatalog for IndexCatalog {
    async fn online_plugins(&self, force: bool) -> Vec<PluginManifest> {
        if !force {
            if let Some(cached) = self.cache.lock().clone() {
                return cached;
            }
        }

        // 인덱스는 동시에 가져오되 결과는 설정 순서대로 병합
        let fetched = join_all(self.urls.iter().map(|url| self.fetch_index(url))).await;

        let mut plugins: Vec<PluginManifest> = Vec::new();
        for (url, result) in self.urls.iter().zip(fetched) {
            match result {
                Ok(found) => {
                    debug!("Market index {} lists {} plugins", url, found.len());
                    for manifest in found {
                        // 먼저 나온 인덱스가 우선
                        if !plugins.iter().any(|p| p.id == manifest.id) {
                            plugins.push(manifest);
                        }
                    }
                }
                Err(e) => warn!("Failed to fetch market index {}: {}", url, e),
            }
        }

        info!("Fetched {} online plugins", plugins.len());
        *self.cache.lock() = Some(plugins.clone());
        plugins
    }
}

/// 인덱스 문서 해석 - 잘못된 항목은 건너뛴다
pub fn parse_index(body: Value, index_url: &str) -> Vec<PluginManifest> {
    let entries: Vec<Value> = match body {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .map(|(id, mut entry)| {
                if let Value::Object(obj) = &mut entry {
                    obj.entry("id").or_insert(Value::String(id));
                }
                entry
            })
            .collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<PluginManifest>(entry) {
            Ok(mut manifest) => {
                if manifest.repo_url.is_none() {
                    manifest.repo_url = Some(index_url.to_string());
                }
                Some(manifest)
            }
            Err(e) => {
                warn!("Skipping invalid market entry in {}: {}", index_url, e);
                None
            }
        })
        .collect()
}
