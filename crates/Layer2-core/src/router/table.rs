//! Route Table - 호스트의 라이브 라우트 테이블
//!
//! `MemoryRouteTable`은 copy-on-write 벡터를 사용한다. 쓰기는 새 벡터를 만들어
//! 교체하고, 읽기는 `Arc`만 복제한 뒤 락 없이 탐색한다. 요청 처리 중 제거된
//! 라우트는 완료되거나 404가 될 수 있다 (draining 보장 없음).

use super::route::{
    handler_fn, Authenticator, BindingId, Method, RouteBinding, RouteRequest, RouteResponse,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reel_foundation::{Error, Result};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// RouteTable Trait
// ============================================================================

/// 라우트 테이블 계약
#[async_trait]
pub trait RouteTable: Send + Sync {
    /// 현재 바인딩 스냅샷 (등록 순서)
    fn bindings(&self) -> Arc<Vec<RouteBinding>>;

    /// 바인딩 추가 - 테이블이 부여한 식별자 반환
    fn add(&self, binding: RouteBinding) -> Result<BindingId>;

    /// 식별자로 바인딩 제거 - 제거되었으면 true
    fn remove(&self, id: BindingId) -> bool;

    /// 캐시된 스키마 문서 무효화
    fn invalidate_schema(&self);

    /// 대량 변경 후 재구성 단계
    fn rebuild(&self) -> Result<()>;

    /// 스키마 문서
    fn schema(&self) -> Value;

    /// 경로 + 메서드 해석 (충돌 시 마지막 등록이 우선)
    fn resolve(&self, path: &str, method: Method) -> Option<RouteBinding> {
        self.bindings()
            .iter()
            .rev()
            .find(|b| b.path == path && b.handles(method))
            .cloned()
    }

    /// 해석 → 의존성 검증 → 핸들러 호출
    async fn dispatch(&self, request: RouteRequest, auth: &dyn Authenticator) -> RouteResponse {
        let method = request.method.unwrap_or(Method::Get);
        let Some(binding) = self.resolve(&request.path, method) else {
            return RouteResponse::not_found(&request.path);
        };

        for dependency in &binding.dependencies {
            if let Err(e) = auth.verify(*dependency, &request) {
                debug!("Rejected {} {}: {}", method, request.path, e);
                return e.into();
            }
        }

        match binding.handler.call(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Handler for {} {} failed: {}", method, binding.path, e);
                e.into()
            }
        }
    }
}

// ============================================================================
// MemoryRouteTable
// ============================================================================

/// 메모리 라우트 테이블
pub struct MemoryRouteTable {
    bindings: RwLock<Arc<Vec<RouteBinding>>>,
    schema: Mutex<Option<Value>>,
    next_id: AtomicU64,
    title: String,
}

impl MemoryRouteTable {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(Arc::new(Vec::new())),
            schema: Mutex::new(None),
            next_id: AtomicU64::new(1),
            title: "reel".to_string(),
        }
    }

    /// 보호 라우트 (문서/스키마 경로) 로 초기화
    pub fn with_protected(protected_paths: &[String]) -> Self {
        let table = Self::new();
        for path in protected_paths {
            let doc_path = path.clone();
            let handler = handler_fn(move |_| Ok(RouteResponse::ok(json!({ "route": doc_path }))));
            let binding = RouteBinding::new(path.clone(), vec![Method::Get], handler).protected();
            if let Err(e) = table.add(binding) {
                error!("Failed to seed protected route {}: {}", path, e);
            }
        }
        table
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    fn build_schema(&self, bindings: &[RouteBinding]) -> Value {
        let mut paths = Map::new();
        for binding in bindings.iter().filter(|b| !b.protected) {
            let entry = paths
                .entry(binding.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = entry {
                for method in &binding.methods {
                    ops.insert(
                        method.as_str().to_ascii_lowercase(),
                        json!({
                            "tags": binding.tags,
                            "summary": binding.summary,
                            "security": binding.dependencies,
                        }),
                    );
                }
            }
        }
        json!({
            "openapi": "3.1.0",
            "info": { "title": self.title },
            "paths": paths,
        })
    }
}

impl Default for MemoryRouteTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteTable for MemoryRouteTable {
    fn bindings(&self) -> Arc<Vec<RouteBinding>> {
        self.bindings.read().clone()
    }

    fn add(&self, mut binding: RouteBinding) -> Result<BindingId> {
        if !binding.path.starts_with('/') {
            return Err(Error::Route(format!(
                "Route path must be absolute: {}",
                binding.path
            )));
        }
        if binding.methods.is_empty() {
            return Err(Error::Route(format!("Route {} has no methods", binding.path)));
        }

        binding.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = binding.id;

        let mut guard = self.bindings.write();
        for method in &binding.methods {
            if guard
                .iter()
                .any(|b| b.path == binding.path && b.handles(*method))
            {
                error!(
                    "Duplicate route registration {} {} (last registered wins)",
                    method, binding.path
                );
            }
        }
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(binding);
        *guard = Arc::new(next);
        Ok(id)
    }

    fn remove(&self, id: BindingId) -> bool {
        let mut guard = self.bindings.write();
        if !guard.iter().any(|b| b.id == id) {
            return false;
        }
        let next: Vec<RouteBinding> = guard.iter().filter(|b| b.id != id).cloned().collect();
        *guard = Arc::new(next);
        true
    }

    fn invalidate_schema(&self) {
        *self.schema.lock() = None;
    }

    fn rebuild(&self) -> Result<()> {
        let bindings = self.bindings();
        let schema = self.build_schema(&bindings);
        *self.schema.lock() = Some(schema);
        debug!("Route table rebuilt ({} bindings)", bindings.len());
        Ok(())
    }

    fn schema(&self) -> Value {
        let mut cached = self.schema.lock();
        if let Some(schema) = cached.as_ref() {
            return schema.clone();
        }
        let schema = self.build_schema(&self.bindings());
        *cached = Some(schema.clone());
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::route::{RouteDependency, StaticAuthenticator};

    fn echo(tag: &'static str) -> Arc<dyn crate::router::RouteHandler> {
        handler_fn(move |_| Ok(RouteResponse::ok(json!(tag))))
    }

    #[test]
    fn test_add_resolve_remove() {
        let table = MemoryRouteTable::new();
        let id = table
            .add(RouteBinding::new("/p/a", vec![Method::Get], echo("a")))
            .unwrap();

        assert!(table.resolve("/p/a", Method::Get).is_some());
        assert!(table.resolve("/p/a", Method::Post).is_none());
        assert!(table.remove(id));
        assert!(!table.remove(id));
        assert!(table.is_empty());
    }

    #[test]
    fn test_add_rejects_relative_path() {
        let table = MemoryRouteTable::new();
        let err = table
            .add(RouteBinding::new("relative", vec![Method::Get], echo("x")))
            .unwrap_err();
        assert!(matches!(err, Error::Route(_)));
    }

    #[tokio::test]
    async fn test_duplicate_last_registered_wins() {
        let table = MemoryRouteTable::new();
        table
            .add(RouteBinding::new("/dup", vec![Method::Get], echo("first")))
            .unwrap();
        table
            .add(RouteBinding::new("/dup", vec![Method::Get], echo("second")))
            .unwrap();

        let auth = StaticAuthenticator::default();
        let resp = table
            .dispatch(RouteRequest::new(Method::Get, "/dup"), &auth)
            .await;
        assert_eq!(resp.body, json!("second"));
    }

    #[tokio::test]
    async fn test_remove_targets_one_binding_by_identity() {
        let table = MemoryRouteTable::new();
        let first = table
            .add(RouteBinding::new("/dup", vec![Method::Get], echo("first")))
            .unwrap();
        let second = table
            .add(RouteBinding::new("/dup", vec![Method::Get], echo("second")))
            .unwrap();
        assert_ne!(first, second);

        assert!(table.remove(second));
        let auth = StaticAuthenticator::default();
        let resp = table
            .dispatch(RouteRequest::new(Method::Get, "/dup"), &auth)
            .await;
        assert_eq!(resp.body, json!("first"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let table = MemoryRouteTable::new();
        let id = table
            .add(RouteBinding::new("/a", vec![Method::Get], echo("a")))
            .unwrap();
        let snapshot = table.bindings();
        table.remove(id);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_runs_dependencies() {
        let table = MemoryRouteTable::new();
        table
            .add(
                RouteBinding::new("/secure", vec![Method::Get], echo("ok"))
                    .with_dependency(RouteDependency::VerifyApiKey),
            )
            .unwrap();
        let auth = StaticAuthenticator::new(Some("k".into()), None);

        let denied = table
            .dispatch(RouteRequest::new(Method::Get, "/secure"), &auth)
            .await;
        assert_eq!(denied.status, 401);

        let allowed = table
            .dispatch(
                RouteRequest::new(Method::Get, "/secure").with_query("apikey", "k"),
                &auth,
            )
            .await;
        assert_eq!(allowed.status, 200);

        let missing = table
            .dispatch(RouteRequest::new(Method::Get, "/nope"), &auth)
            .await;
        assert_eq!(missing.status, 404);
    }

    #[test]
    fn test_schema_cache_and_invalidate() {
        let table = MemoryRouteTable::with_protected(&["/docs".to_string()]);
        table
            .add(RouteBinding::new("/p/a", vec![Method::Post], echo("a")).with_tag("plugin"))
            .unwrap();

        let schema = table.schema();
        assert!(schema["paths"]["/p/a"]["post"].is_object());
        // 보호 라우트는 스키마에 포함되지 않음
        assert!(schema["paths"].get("/docs").is_none());

        table
            .add(RouteBinding::new("/p/b", vec![Method::Get], echo("b")))
            .unwrap();
        assert!(table.schema()["paths"].get("/p/b").is_none());

        table.invalidate_schema();
        assert!(table.schema()["paths"]["/p/b"]["get"].is_object());
    }
}
