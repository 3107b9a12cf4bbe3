//! Plugin traits - 핵심 플러그인 인터페이스

use super::events::EventBus;
use super::manifest::PluginManifest;
use crate::router::RouteDescriptor;
use async_trait::async_trait;
use reel_foundation::{ConfigStore, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// RenderMode / PluginForm / DashboardMeta
// ============================================================================

/// 플러그인 UI 렌더링 방식
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RenderMode {
    /// JSON 선언형 UI
    #[default]
    Vuetify,
    /// 플러그인이 제공하는 정적 자산
    Vue {
        #[serde(rename = "assetsDir")]
        assets_dir: String,
    },
}

impl RenderMode {
    /// 매니페스트 표기 해석 (`"vue"` 이외는 Vuetify)
    pub fn from_manifest(mode: Option<&str>) -> Self {
        match mode {
            Some(m) if m.eq_ignore_ascii_case("vue") => RenderMode::Vue {
                assets_dir: "dist/assets".to_string(),
            },
            _ => RenderMode::Vuetify,
        }
    }
}

/// 설정 폼 - 폼 정의와 기본 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginForm {
    pub conf: Value,
    pub model: Value,
}

impl Default for PluginForm {
    fn default() -> Self {
        Self {
            conf: Value::Array(Vec::new()),
            model: Value::Object(Map::new()),
        }
    }
}

/// 대시보드 메타 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardMeta {
    /// 플러그인 내 대시보드 키
    pub key: String,
    /// 표시 이름
    pub name: String,
}

// ============================================================================
// PluginContext - 플러그인에 제공되는 컨텍스트
// ============================================================================

/// 플러그인 컨텍스트 - 초기화 시 플러그인에 전달
pub struct PluginContext {
    plugin_id: String,

    /// 영속화된 설정 (없으면 None)
    config: Option<Value>,

    /// 코드 디렉토리
    code_dir: PathBuf,

    /// 플러그인 데이터 저장소 (플러그인 ID 키 아래 객체)
    data: Arc<dyn ConfigStore>,

    /// 이벤트 버스
    event_bus: Arc<EventBus>,
}

impl PluginContext {
    pub fn new(
        plugin_id: impl Into<String>,
        config: Option<Value>,
        code_dir: PathBuf,
        data: Arc<dyn ConfigStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            config,
            code_dir,
            data,
            event_bus,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn config(&self) -> Option<&Value> {
        self.config.as_ref()
    }

    pub fn code_dir(&self) -> &Path {
        &self.code_dir
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    // ========================================================================
    // 데이터
    // ========================================================================

    /// 데이터 값 조회
    pub fn get_data(&self, key: &str) -> Option<Value> {
        self.data.get(&self.plugin_id)?.get(key).cloned()
    }

    /// 데이터 값 저장
    pub fn save_data(&self, key: impl Into<String>, value: Value) -> Result<()> {
        let mut map = match self.data.get(&self.plugin_id) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(key.into(), value);
        self.data.set(&self.plugin_id, Value::Object(map))
    }

    /// 데이터 값 삭제
    pub fn del_data(&self, key: &str) -> Result<()> {
        if let Some(Value::Object(mut map)) = self.data.get(&self.plugin_id) {
            if map.remove(key).is_some() {
                self.data.set(&self.plugin_id, Value::Object(map))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// PluginSurface - 로드된 플러그인 인스턴스가 구현하는 기능 인터페이스
// ============================================================================

/// 플러그인 기능 인터페이스
///
/// 기능이 없는 것은 오류가 아니다. 기본 구현은 빈 결과를 돌려준다.
/// 라우트 핸들러는 플러그인 인스턴스가 소유한다.
#[async_trait]
pub trait PluginSurface: Send + Sync {
    /// 플러그인 매니페스트
    fn manifest(&self) -> PluginManifest;

    /// 초기화 - 영속화된 설정과 함께 호출
    async fn init(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 종료 - 인스턴스 교체/언로드 시 호출
    async fn teardown(&self) -> Result<()> {
        Ok(())
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::Vuetify
    }

    fn form(&self) -> Result<PluginForm> {
        Ok(PluginForm::default())
    }

    fn page(&self) -> Result<Value> {
        Ok(Value::Array(Vec::new()))
    }

    fn dashboard_meta(&self) -> Result<Vec<DashboardMeta>> {
        Ok(Vec::new())
    }

    fn dashboard(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    /// 현재 선언한 라우트 (상대 경로)
    fn routes(&self) -> Vec<RouteDescriptor> {
        Vec::new()
    }
}

/// 플러그인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// 코드 발견됨 (로드되지 않음)
    Discovered,

    /// 초기화 완료, 실행 중
    Running,

    /// 마지막 로드 실패
    Failed,
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovered => write!(f, "discovered"),
            Self::Running => write!(f, "running"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
