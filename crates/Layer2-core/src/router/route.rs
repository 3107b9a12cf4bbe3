//! Route model - 라우트 서술자, 바인딩, 핸들러, 인증 의존성

use async_trait::async_trait;
use reel_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Method
// ============================================================================

/// HTTP 메서드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(Error::Validation(format!("Unsupported method: {}", other))),
        }
    }
}

// ============================================================================
// AuthMode / RouteDependency
// ============================================================================

/// 플러그인이 선언하는 인증 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Anonymous,
    #[default]
    ApiKey,
    BearerToken,
}

impl AuthMode {
    /// 매니페스트 표기 해석
    ///
    /// `allow_anonymous`가 켜져 있으면 항상 Anonymous. `"bear"`/`"bearer"`는 토큰,
    /// 그 외 (생략 포함) 는 API 키.
    pub fn from_manifest(auth: Option<&str>, allow_anonymous: bool) -> Self {
        if allow_anonymous {
            return AuthMode::Anonymous;
        }
        match auth.map(|a| a.to_ascii_lowercase()) {
            Some(a) if a == "anonymous" => AuthMode::Anonymous,
            Some(a) if a == "bear" || a == "bearer" => AuthMode::BearerToken,
            _ => AuthMode::ApiKey,
        }
    }

    /// 이 인증 방식이 요구하는 의존성
    pub fn dependency(&self) -> Option<RouteDependency> {
        match self {
            AuthMode::Anonymous => None,
            AuthMode::ApiKey => Some(RouteDependency::VerifyApiKey),
            AuthMode::BearerToken => Some(RouteDependency::VerifyToken),
        }
    }
}

/// 핸들러 호출 전에 실행되는 의존성
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDependency {
    VerifyApiKey,
    VerifyToken,
}

// ============================================================================
// Request / Response
// ============================================================================

/// 라우트 요청
#[derive(Debug, Clone, Default)]
pub struct RouteRequest {
    pub method: Option<Method>,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl RouteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method: Some(method),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// API 키 (`apikey` 쿼리 또는 `x-api-key` 헤더)
    pub fn api_key(&self) -> Option<&str> {
        self.query
            .get("apikey")
            .or_else(|| self.headers.get("x-api-key"))
            .map(String::as_str)
    }

    /// Bearer 토큰 (`authorization: Bearer ...`)
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(str::trim)
    }
}

/// 라우트 응답
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResponse {
    pub status: u16,
    pub body: Value,
}

impl RouteResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": message.into() }),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::error(404, format!("Not Found: {}", path))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<Error> for RouteResponse {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            _ => 500,
        };
        RouteResponse::error(status, err.to_string())
    }
}

// ============================================================================
// RouteHandler
// ============================================================================

/// 라우트 핸들러 - 플러그인 인스턴스가 소유하고 라우트 테이블은 참조만 보관
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn call(&self, request: RouteRequest) -> Result<RouteResponse>;
}

/// 동기 클로저 핸들러
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> RouteHandler for FnHandler<F>
where
    F: Fn(RouteRequest) -> Result<RouteResponse> + Send + Sync,
{
    async fn call(&self, request: RouteRequest) -> Result<RouteResponse> {
        (self.0)(request)
    }
}

/// 클로저로 핸들러 생성
pub fn handler_fn<F>(f: F) -> Arc<dyn RouteHandler>
where
    F: Fn(RouteRequest) -> Result<RouteResponse> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

// ============================================================================
// RouteDescriptor - 플러그인이 선언한 라우트
// ============================================================================

/// 플러그인이 선언한 라우트 (상대 경로)
#[derive(Clone)]
pub struct RouteDescriptor {
    pub path: String,
    pub methods: Vec<Method>,
    pub auth: AuthMode,
    pub summary: Option<String>,
    pub handler: Arc<dyn RouteHandler>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, handler: Arc<dyn RouteHandler>) -> Self {
        Self {
            path: path.into(),
            methods: vec![Method::Get],
            auth: AuthMode::default(),
            summary: None,
            handler,
        }
    }

    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("auth", &self.auth)
            .field("summary", &self.summary)
            .finish()
    }
}

// ============================================================================
// RouteBinding - 라우트 테이블에 등록된 항목
// ============================================================================

/// 라우트 테이블이 부여하는 바인딩 식별자
pub type BindingId = u64;

/// 라우트 테이블에 등록된 바인딩 (절대 경로)
#[derive(Clone)]
pub struct RouteBinding {
    /// 테이블이 `add` 시점에 부여 (등록 전에는 0)
    pub id: BindingId,
    pub path: String,
    pub methods: Vec<Method>,
    pub handler: Arc<dyn RouteHandler>,
    pub dependencies: Vec<RouteDependency>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    /// 호스트 보호 라우트 여부
    pub protected: bool,
}

impl RouteBinding {
    pub fn new(path: impl Into<String>, methods: Vec<Method>, handler: Arc<dyn RouteHandler>) -> Self {
        Self {
            id: 0,
            path: path.into(),
            methods,
            handler,
            dependencies: Vec::new(),
            tags: Vec::new(),
            summary: None,
            protected: false,
        }
    }

    /// 의존성 추가 (이미 있으면 무시)
    pub fn with_dependency(mut self, dependency: RouteDependency) -> Self {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn handles(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("dependencies", &self.dependencies)
            .field("tags", &self.tags)
            .field("protected", &self.protected)
            .finish()
    }
}

// ============================================================================
// Authenticator
// ============================================================================

/// 의존성 검증기
pub trait Authenticator: Send + Sync {
    fn verify(&self, dependency: RouteDependency, request: &RouteRequest) -> Result<()>;
}

/// 호스트 설정의 고정 자격 증명으로 검증
///
/// 자격 증명이 설정되지 않았으면 해당 의존성을 가진 라우트는 모두 거부된다.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    api_key: Option<String>,
    api_token: Option<String>,
}

impl StaticAuthenticator {
    pub fn new(api_key: Option<String>, api_token: Option<String>) -> Self {
        Self { api_key, api_token }
    }
}

impl Authenticator for StaticAuthenticator {
    fn verify(&self, dependency: RouteDependency, request: &RouteRequest) -> Result<()> {
        let (expected, presented, what) = match dependency {
            RouteDependency::VerifyApiKey => (&self.api_key, request.api_key(), "api key"),
            RouteDependency::VerifyToken => (&self.api_token, request.bearer_token(), "token"),
        };
        match (expected, presented) {
            (Some(expected), Some(presented)) if expected == presented => Ok(()),
            (None, _) => Err(Error::Unauthorized(format!("{} is not configured", what))),
            _ => Err(Error::Unauthorized(format!("invalid {}", what))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_from_manifest() {
        assert_eq!(AuthMode::from_manifest(None, false), AuthMode::ApiKey);
        assert_eq!(AuthMode::from_manifest(Some("bear"), false), AuthMode::BearerToken);
        assert_eq!(AuthMode::from_manifest(Some("apikey"), false), AuthMode::ApiKey);
        assert_eq!(AuthMode::from_manifest(Some("anonymous"), false), AuthMode::Anonymous);
        assert_eq!(AuthMode::from_manifest(Some("bear"), true), AuthMode::Anonymous);
    }

    #[test]
    fn test_binding_dependency_not_duplicated() {
        let handler = handler_fn(|_| Ok(RouteResponse::ok(Value::Null)));
        let binding = RouteBinding::new("/a", vec![Method::Get], handler)
            .with_dependency(RouteDependency::VerifyApiKey)
            .with_dependency(RouteDependency::VerifyApiKey);
        assert_eq!(binding.dependencies, vec![RouteDependency::VerifyApiKey]);
    }

    #[test]
    fn test_request_credentials() {
        let req = RouteRequest::new(Method::Get, "/x")
            .with_query("apikey", "k1")
            .with_header("Authorization", "Bearer t1");
        assert_eq!(req.api_key(), Some("k1"));
        assert_eq!(req.bearer_token(), Some("t1"));
    }

    #[test]
    fn test_static_authenticator() {
        let auth = StaticAuthenticator::new(Some("k".into()), None);
        let good = RouteRequest::new(Method::Get, "/x").with_header("X-Api-Key", "k");
        let bad = RouteRequest::new(Method::Get, "/x").with_query("apikey", "nope");

        assert!(auth.verify(RouteDependency::VerifyApiKey, &good).is_ok());
        assert!(auth.verify(RouteDependency::VerifyApiKey, &bad).is_err());
        // 토큰 미설정
        assert!(auth.verify(RouteDependency::VerifyToken, &good).is_err());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn test_error_to_response_status() {
        let resp: RouteResponse = Error::Unauthorized("x".into()).into();
        assert_eq!(resp.status, 401);
        let resp: RouteResponse = Error::NotFound("x".into()).into();
        assert_eq!(resp.status, 404);
    }
}
