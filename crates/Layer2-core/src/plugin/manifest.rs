//! Plugin Manifest - 플러그인 메타데이터 정의 (`plugin.json`)

use crate::router::{AuthMode, Method};
use reel_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// 매니페스트 파일명
pub const MANIFEST_FILE: &str = "plugin.json";

/// 플러그인 ID 검증
///
/// ID는 `<pluginsDir>` 아래 한 단계 디렉토리 이름이 되므로 경로 구분자,
/// `..`, 드라이브 접두사, 제어 문자를 허용하지 않는다.
pub fn validate_plugin_id(plugin_id: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::Validation(format!("Invalid plugin id {:?}: {}", plugin_id, reason)))
    };
    if plugin_id.trim().is_empty() {
        return invalid("must not be empty");
    }
    if plugin_id != plugin_id.trim() {
        return invalid("must not have surrounding whitespace");
    }
    if plugin_id.contains('/') || plugin_id.contains('\\') {
        return invalid("must not contain path separators");
    }
    if plugin_id.contains("..") || plugin_id == "." {
        return invalid("must not reference a parent directory");
    }
    if plugin_id.contains(':') || plugin_id.chars().any(char::is_control) {
        return invalid("contains a forbidden character");
    }
    Ok(())
}

// ============================================================================
// PluginVersion
// ============================================================================

/// 플러그인 버전 - 비교용
///
/// `v` 접두사와 누락된 부분 (`1.2` → `1.2.0`) 을 허용한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PluginVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// 버전 문자열 파싱 (예: "1.2.3", "v2.0")
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches(['v', 'V']);
        let mut parts = s.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
        let patch = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
        if parts.next().is_some() {
            return None;
        }
        Some(Self { major, minor, patch })
    }

    /// 두 버전 문자열 비교 - 파싱 실패 시 None
    pub fn compare(a: &str, b: &str) -> Option<Ordering> {
        Some(Self::parse(a)?.cmp(&Self::parse(b)?))
    }
}

impl std::fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for PluginVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

// ============================================================================
// ApiSpec - 매니페스트에 선언된 라우트
// ============================================================================

/// 선언형 라우트
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    /// 플러그인 기준 상대 경로
    pub path: String,

    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    /// "anonymous" | "apikey" | "bear"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,

    #[serde(default)]
    pub allow_anonymous: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// 고정 응답 본문 (설정과 병합되어 반환)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl ApiSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: default_methods(),
            auth: None,
            allow_anonymous: false,
            summary: None,
            response: None,
        }
    }

    pub fn auth_mode(&self) -> AuthMode {
        AuthMode::from_manifest(self.auth.as_deref(), self.allow_anonymous)
    }

    /// 알 수 없는 메서드는 건너뛴다
    pub fn parsed_methods(&self) -> Vec<Method> {
        self.methods.iter().filter_map(|m| m.parse().ok()).collect()
    }
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

// ============================================================================
// PluginManifest
// ============================================================================

/// 플러그인 매니페스트
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// 고유 플러그인 ID (대소문자 구분)
    pub id: String,

    /// 표시 이름
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// 배포 저장소 URL (마켓 항목)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// 복제 플러그인 여부
    #[serde(default)]
    pub is_clone: bool,

    /// 복제 원본 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,

    /// "vuetify" | "vue"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_mode: Option<String>,

    /// 선언형 설정 폼 `{conf, model}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<Value>,

    /// 선언형 상세 페이지
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Value>,

    /// 선언형 대시보드 (key -> 문서)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub dashboards: HashMap<String, Value>,

    /// 선언형 라우트
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api: Vec<ApiSpec>,

    /// 추가 메타데이터
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl PluginManifest {
    /// 새 매니페스트 생성
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: default_version(),
            author: None,
            icon: None,
            repo_url: None,
            is_clone: false,
            original_id: None,
            render_mode: None,
            form: None,
            page: None,
            dashboards: HashMap::new(),
            api: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// 빌더 패턴: 버전 설정
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 빌더 패턴: 설명 설정
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = Some(url.into());
        self
    }

    pub fn with_api(mut self, api: ApiSpec) -> Self {
        self.api.push(api);
        self
    }

    pub fn with_form(mut self, form: Value) -> Self {
        self.form = Some(form);
        self
    }

    pub fn with_dashboard(mut self, key: impl Into<String>, doc: Value) -> Self {
        self.dashboards.insert(key.into(), doc);
        self
    }

    /// 파싱된 버전 (실패 시 None)
    pub fn parsed_version(&self) -> Option<PluginVersion> {
        PluginVersion::parse(&self.version)
    }

    /// `other`보다 새 버전인지 (파싱 실패 시 문자열 불일치로 판단)
    pub fn is_newer_than(&self, other: &str) -> bool {
        Self::version_is_newer(&self.version, other)
    }

    /// `candidate`가 `current`보다 새 버전인지
    pub fn version_is_newer(candidate: &str, current: &str) -> bool {
        match PluginVersion::compare(candidate, current) {
            Some(ordering) => ordering == Ordering::Greater,
            None => candidate != current,
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_plugin_id() {
        for ok in ["demo", "Demo_b", "my-plugin.v2"] {
            assert!(validate_plugin_id(ok).is_ok(), "{} should be valid", ok);
        }
        for bad in ["", "  ", "..", ".", "a/b", "demo/../../escaped", "..\\x", "/etc", "C:x", " demo"] {
            assert!(
                matches!(validate_plugin_id(bad), Err(Error::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(PluginVersion::parse("1.2.3"), Some(PluginVersion::new(1, 2, 3)));
        assert_eq!(PluginVersion::parse("v2.1"), Some(PluginVersion::new(2, 1, 0)));
        assert_eq!(PluginVersion::parse("3"), Some(PluginVersion::new(3, 0, 0)));
        assert!(PluginVersion::parse("1.2.3.4").is_none());
        assert!(PluginVersion::parse("abc").is_none());
    }

    #[test]
    fn test_is_newer_than() {
        let manifest = PluginManifest::new("demo", "Demo").with_version("1.10.0");
        assert!(manifest.is_newer_than("1.9.9"));
        assert!(!manifest.is_newer_than("1.10.0"));
        assert!(!manifest.is_newer_than("2.0"));
    }

    #[test]
    fn test_manifest_from_json() {
        let raw = r#"{
            "id": "Demo",
            "name": "Demo Plugin",
            "version": "0.3.1",
            "isClone": true,
            "originalId": "Base",
            "api": [
                {"path": "/status", "allowAnonymous": true},
                {"path": "/run", "methods": ["POST"], "auth": "bear"}
            ]
        }"#;
        let manifest: PluginManifest = serde_json::from_str(raw).unwrap();

        assert!(manifest.is_clone);
        assert_eq!(manifest.original_id.as_deref(), Some("Base"));
        assert_eq!(manifest.api[0].auth_mode(), AuthMode::Anonymous);
        assert_eq!(manifest.api[0].parsed_methods(), vec![Method::Get]);
        assert_eq!(manifest.api[1].auth_mode(), AuthMode::BearerToken);
        assert_eq!(manifest.api[1].parsed_methods(), vec![Method::Post]);
    }
}
