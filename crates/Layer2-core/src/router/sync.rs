//! Route Synchronizer - 플러그인 API 표면과 라우트 테이블 동기화
//!
//! 한 번의 `sync` 호출은 단일 writer 구간 안에서
//! 스냅샷 → 제거 → 추가 → 재구성 → 보호 라우트 복원 순으로 진행된다.

use super::route::{RouteBinding, RouteDescriptor};
use super::snapshot::RouteSnapshot;
use super::table::RouteTable;
use async_trait::async_trait;
use reel_foundation::Result;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 플러그인 라우트에 붙는 태그
pub const PLUGIN_ROUTE_TAG: &str = "plugin";

// ============================================================================
// ApiSurfaceSource - 실행 중 플러그인의 API 표면 제공자
// ============================================================================

/// 실행 중 플러그인과 그 API 표면을 제공
#[async_trait]
pub trait ApiSurfaceSource: Send + Sync {
    /// 실행 중인 플러그인 ID (로드 순서)
    async fn running_plugin_ids(&self) -> Vec<String>;

    /// 플러그인이 현재 선언한 라우트 - 로드된 인스턴스가 없으면 NotFound
    async fn api_surface(&self, plugin_id: &str) -> Result<Vec<RouteDescriptor>>;
}

// ============================================================================
// SyncAction / SyncReport
// ============================================================================

/// 동기화 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Add,
    Remove,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Add => write!(f, "add"),
            SyncAction::Remove => write!(f, "remove"),
        }
    }
}

/// 동기화 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 대상 플러그인
    pub plugins: Vec<String>,
    /// 제거된 바인딩 수
    pub removed: usize,
    /// 추가된 바인딩 수
    pub added: usize,
    /// 등록 실패한 라우트 수
    pub failed: usize,
    /// 복원된 보호 라우트 수
    pub protected_restored: usize,
}

impl SyncReport {
    /// 라우트 테이블이 변경되었는지
    pub fn changed(&self) -> bool {
        self.removed > 0 || self.added > 0
    }
}

// ============================================================================
// RouteSynchronizer
// ============================================================================

/// 라우트 동기화기
pub struct RouteSynchronizer {
    table: Arc<dyn RouteTable>,
    source: Arc<dyn ApiSurfaceSource>,
    /// 플러그인 라우트 접두사 (예: `/api/v1/plugin`)
    prefix: String,
    protected_paths: Vec<String>,
    /// 단일 writer 구간
    write_lock: Mutex<()>,
}

impl RouteSynchronizer {
    pub fn new(
        table: Arc<dyn RouteTable>,
        source: Arc<dyn ApiSurfaceSource>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            table,
            source,
            prefix: prefix.into().trim_end_matches('/').to_string(),
            protected_paths: Vec::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_protected_paths(mut self, paths: Vec<String>) -> Self {
        self.protected_paths = paths;
        self
    }

    pub fn table(&self) -> &Arc<dyn RouteTable> {
        &self.table
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 플러그인 라우트 범위 접두사 (`<prefix>/<id>/`)
    pub fn scope_of(&self, plugin_id: &str) -> String {
        format!("{}/{}/", self.prefix, plugin_id)
    }

    /// 상대 경로를 플러그인 범위 경로로 변환
    pub fn scoped_path(&self, plugin_id: &str, relative: &str) -> String {
        format!("{}{}", self.scope_of(plugin_id), relative.trim_start_matches('/'))
    }

    /// 라우트 동기화
    ///
    /// - `plugin_ids`가 None이고 `Add`이면 실행 중인 모든 플러그인을 재동기화
    /// - `plugin_ids`가 None이고 `Remove`이면 플러그인 접두사 아래 모든 라우트 제거
    /// - 존재하지 않는 플러그인의 제거는 no-op
    pub async fn sync(&self, plugin_ids: Option<&[String]>, action: SyncAction) -> SyncReport {
        let _guard = self.write_lock.lock().await;

        // 1. 보호 라우트 스냅샷
        let snapshot = RouteSnapshot::capture(self.table.as_ref(), &self.protected_paths);

        let mut report = SyncReport::default();
        let targets: Vec<String> = match (plugin_ids, action) {
            (Some(ids), _) => ids.to_vec(),
            (None, SyncAction::Add) => self.source.running_plugin_ids().await,
            (None, SyncAction::Remove) => {
                report.removed += self.remove_matching(&format!("{}/", self.prefix));
                Vec::new()
            }
        };

        for plugin_id in &targets {
            // 2. 기존 라우트 제거
            report.removed += self.remove_matching(&self.scope_of(plugin_id));

            // 3. 새 라우트 등록
            if action == SyncAction::Add {
                self.register_plugin(plugin_id, &mut report).await;
            }
        }
        report.plugins = targets;

        // 4. 변경이 있으면 재구성 후 보호 라우트 복원
        if report.changed() {
            self.table.invalidate_schema();
            if let Err(e) = self.table.rebuild() {
                error!("Route table rebuild failed: {}", e);
            }
            let restored = snapshot.restore(self.table.as_ref());
            report.protected_restored = restored.restored;
        }

        info!(
            "Route sync ({}) {:?}: +{} -{} failed={}",
            action, report.plugins, report.added, report.removed, report.failed
        );
        report
    }

    /// 접두사로 시작하는 모든 비보호 바인딩 제거
    fn remove_matching(&self, scope: &str) -> usize {
        let mut removed = 0;
        for binding in self.table.bindings().iter() {
            if binding.protected || !binding.path.starts_with(scope) {
                continue;
            }
            if self.table.remove(binding.id) {
                debug!("Removed plugin route {} {:?}", binding.path, binding.methods);
                removed += 1;
            }
        }
        removed
    }

    /// 한 플러그인의 라우트 등록 (라우트 단위 best-effort)
    async fn register_plugin(&self, plugin_id: &str, report: &mut SyncReport) {
        let descriptors = match self.source.api_surface(plugin_id).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                warn!("Skipping routes for plugin {}: {}", plugin_id, e);
                return;
            }
        };

        for descriptor in descriptors {
            let binding = self.bind(plugin_id, descriptor);
            let path = binding.path.clone();
            match self.table.add(binding) {
                Ok(_) => {
                    debug!("Added plugin route: {}", path);
                    report.added += 1;
                }
                Err(e) => {
                    error!("Error adding plugin route {}: {}", path, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// 서술자 → 바인딩 (경로 재작성 + 인증 의존성)
    fn bind(&self, plugin_id: &str, descriptor: RouteDescriptor) -> RouteBinding {
        let path = self.scoped_path(plugin_id, &descriptor.path);
        let mut binding = RouteBinding::new(path, descriptor.methods, descriptor.handler)
            .with_summary(descriptor.summary)
            .with_tag(PLUGIN_ROUTE_TAG);
        if let Some(dependency) = descriptor.auth.dependency() {
            binding = binding.with_dependency(dependency);
        }
        binding
    }
}
