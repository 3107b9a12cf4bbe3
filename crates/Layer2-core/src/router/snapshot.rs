//! Protected Route Snapshot - 보호 라우트 스냅샷 및 복원
//!
//! 대량 재구성 단계가 고정 바인딩을 떨어뜨리거나 중복 등록할 수 있으므로
//! 변경 전에 보호 경로의 바인딩을 저장해 두고, 재구성 후 정확히 하나씩 남도록 되돌린다.

use super::route::RouteBinding;
use super::table::RouteTable;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, error, warn};

// ============================================================================
// RouteSnapshot
// ============================================================================

/// 특정 시점의 보호 라우트 바인딩
#[derive(Debug, Clone)]
pub struct RouteSnapshot {
    /// 스냅샷 ID
    pub id: String,

    /// 스냅샷 생성 시간
    pub created_at: DateTime<Utc>,

    /// 경로별 바인딩 (경로당 첫 번째 바인딩)
    entries: HashMap<String, RouteBinding>,
}

impl RouteSnapshot {
    /// 테이블에서 보호 경로 바인딩을 캡처
    ///
    /// `protected_paths`에 있지만 테이블에 없는 경로는 기록되지 않는다.
    pub fn capture(table: &dyn RouteTable, protected_paths: &[String]) -> Self {
        let mut entries = HashMap::new();
        for binding in table.bindings().iter() {
            let is_protected =
                binding.protected || protected_paths.iter().any(|p| p == &binding.path);
            if is_protected && !entries.contains_key(&binding.path) {
                entries.insert(binding.path.clone(), binding.clone());
            }
        }

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// 스냅샷 기준으로 보호 라우트 복원
    ///
    /// 경로마다 바인딩이 정확히 하나 남는다. 없어진 경로는 다시 추가하고
    /// 재구성 과정에서 중복된 바인딩은 첫 번째만 남긴다.
    pub fn restore(&self, table: &dyn RouteTable) -> RestoreResult {
        let mut result = RestoreResult::default();
        let current = table.bindings();

        for (path, binding) in &self.entries {
            let present: Vec<&RouteBinding> =
                current.iter().filter(|b| &b.path == path).collect();

            if present.is_empty() {
                match table.add(binding.clone()) {
                    Ok(_) => {
                        debug!("Restored protected route {}", path);
                        result.restored += 1;
                    }
                    Err(e) => {
                        error!("Failed to restore protected route {}: {}", path, e);
                        result.failed += 1;
                    }
                }
                continue;
            }

            for extra in present.iter().skip(1) {
                if table.remove(extra.id) {
                    warn!("Removed duplicate protected route {}", path);
                    result.deduplicated += 1;
                }
            }
        }

        result
    }
}

/// 복원 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreResult {
    /// 다시 추가된 경로 수
    pub restored: usize,
    /// 제거된 중복 바인딩 수
    pub deduplicated: usize,
    /// 복원 실패 수
    pub failed: usize,
}

impl RestoreResult {
    pub fn is_noop(&self) -> bool {
        self.restored == 0 && self.deduplicated == 0 && self.failed == 0
    }
}
