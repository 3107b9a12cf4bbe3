//! 라이프사이클 작업 결과

use reel_foundation::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 작업 결과 - `{success, message, data?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OpResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<Error> for OpResponse {
    fn from(error: Error) -> Self {
        OpResponse::fail(error.to_string())
    }
}
