//! Error types for Reel
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Reel 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 입력 / 조회
    // ========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // ========================================================================
    // 외부 협력자 (scheduler, command registry, route table ...)
    // ========================================================================
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    // ========================================================================
    // 설정 / 저장소
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 플러그인 / 라우트
    // ========================================================================
    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Route error: {0}")]
    Route(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 `{success: false, message}` 형태로 돌려줄 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::NotFound(_)
                | Error::Conflict(_)
                | Error::Plugin(_)
                | Error::Unauthorized(_)
        )
    }

    /// 로그로만 남기고 삼켜야 하는 에러인지 확인
    pub fn is_swallowed(&self) -> bool {
        matches!(self, Error::Collaborator { .. } | Error::Io(_))
    }

    /// 협력자 에러 생성 헬퍼
    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
