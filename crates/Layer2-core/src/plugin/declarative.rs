//! Declarative Plugin - `plugin.json`만으로 동작하는 플러그인
//!
//! 폼/페이지/대시보드/라우트를 매니페스트에서 읽는다. 라우트는 매니페스트에 선언된
//! 응답 본문에 현재 설정을 `config` 필드로 붙여 돌려준다.

use super::manifest::PluginManifest;
use super::traits::{DashboardMeta, PluginContext, PluginForm, PluginSurface, RenderMode};
use crate::router::{handler_fn, RouteDescriptor, RouteResponse};
use async_trait::async_trait;
use parking_lot::RwLock;
use reel_foundation::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// 매니페스트 기반 플러그인
pub struct ManifestPlugin {
    manifest: PluginManifest,
    config: Arc<RwLock<Option<Value>>>,
}

impl ManifestPlugin {
    pub fn new(manifest: PluginManifest) -> Self {
        Self {
            manifest,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// 현재 설정
    pub fn config(&self) -> Option<Value> {
        self.config.read().clone()
    }
}

#[async_trait]
impl PluginSurface for ManifestPlugin {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }

    async fn init(&self, ctx: &PluginContext) -> Result<()> {
        *self.config.write() = ctx.config().cloned();
        debug!("Initialized declarative plugin {}", ctx.plugin_id());
        Ok(())
    }

    async fn teardown(&self) -> Result<()> {
        *self.config.write() = None;
        Ok(())
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::from_manifest(self.manifest.render_mode.as_deref())
    }

    fn form(&self) -> Result<PluginForm> {
        let Some(form) = &self.manifest.form else {
            return Ok(PluginForm::default());
        };
        let defaults = PluginForm::default();
        Ok(PluginForm {
            conf: form.get("conf").cloned().unwrap_or(defaults.conf),
            model: form.get("model").cloned().unwrap_or(defaults.model),
        })
    }

    fn page(&self) -> Result<Value> {
        Ok(self
            .manifest
            .page
            .clone()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    fn dashboard_meta(&self) -> Result<Vec<DashboardMeta>> {
        let mut metas: Vec<DashboardMeta> = self
            .manifest
            .dashboards
            .iter()
            .map(|(key, doc)| DashboardMeta {
                key: key.clone(),
                name: doc
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(key)
                    .to_string(),
            })
            .collect();
        metas.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(metas)
    }

    fn dashboard(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.manifest.dashboards.get(key).cloned())
    }

    fn routes(&self) -> Vec<RouteDescriptor> {
        self.manifest
            .api
            .iter()
            .map(|api| {
                let config = Arc::clone(&self.config);
                let response = api.response.clone();
                let handler = handler_fn(move |_| {
                    let mut body = match response.clone() {
                        Some(Value::Object(map)) => map,
                        Some(other) => {
                            let mut map = Map::new();
                            map.insert("data".to_string(), other);
                            map
                        }
                        None => Map::new(),
                    };
                    body.insert(
                        "config".to_string(),
                        config.read().clone().unwrap_or(Value::Null),
                    );
                    Ok(RouteResponse::ok(Value::Object(body)))
                });

                let mut descriptor = RouteDescriptor::new(api.path.clone(), handler)
                    .with_methods(api.parsed_methods())
                    .with_auth(api.auth_mode());
                if let Some(summary) = &api.summary {
                    descriptor = descriptor.with_summary(summary.clone());
                }
                descriptor
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::events::EventBus;
    use crate::plugin::manifest::ApiSpec;
    use crate::router::{AuthMode, Method, RouteRequest};
    use reel_foundation::MemoryStore;
    use serde_json::json;
    use std::path::PathBuf;

    fn manifest() -> PluginManifest {
        let mut status = ApiSpec::new("/status");
        status.allow_anonymous = true;
        status.response = Some(json!({"state": "idle"}));

        PluginManifest::new("demo", "Demo")
            .with_api(status)
            .with_form(json!({"conf": [{"component": "VSwitch"}], "model": {"enabled": false}}))
            .with_dashboard("summary", json!({"name": "Summary", "cols": 12}))
    }

    #[tokio::test]
    async fn test_routes_answer_with_config() {
        let plugin = ManifestPlugin::new(manifest());
        let ctx = PluginContext::new(
            "demo",
            Some(json!({"enabled": true})),
            PathBuf::from("/tmp/demo"),
            Arc::new(MemoryStore::new()),
            Arc::new(EventBus::new()),
        );
        plugin.init(&ctx).await.unwrap();

        let routes = plugin.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].auth, AuthMode::Anonymous);

        let resp = routes[0]
            .handler
            .call(RouteRequest::new(Method::Get, "/status"))
            .await
            .unwrap();
        assert_eq!(resp.body, json!({"state": "idle", "config": {"enabled": true}}));
    }

    #[test]
    fn test_form_and_dashboard() {
        let plugin = ManifestPlugin::new(manifest());
        let form = plugin.form().unwrap();
        assert_eq!(form.model, json!({"enabled": false}));

        let metas = plugin.dashboard_meta().unwrap();
        assert_eq!(metas, vec![DashboardMeta { key: "summary".into(), name: "Summary".into() }]);
        assert_eq!(plugin.dashboard("summary").unwrap().unwrap()["cols"], 12);
        assert!(plugin.dashboard("missing").unwrap().is_none());
    }
}
