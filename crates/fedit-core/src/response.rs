//! JSON payloads returned by the edit, refetch and action endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FeditError;

/// Response of an edit submission, a refetch, or an auxiliary action.
///
/// `success: false` means the form failed validation and `html` holds the
/// page to redisplay. On success the shape depends on the variant; fields
/// the core does not know about are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Set by the refetch endpoint. A refetched region never cascades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refetch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<FuncCall>,
    /// Human-readable failure from action endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Field errors of a failed validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    /// The object is locked by another user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Page-side function to run with a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuncCall {
    #[serde(default)]
    pub name: Option<String>,
    /// Selector resolved against the whole page.
    #[serde(default)]
    pub target: Option<String>,
}

impl ServerResponse {
    pub fn from_json(body: &str) -> Result<Self, FeditError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn success(html: impl Into<String>) -> Self {
        Self {
            success: true,
            html: Some(html.into()),
            ..Default::default()
        }
    }

    /// Whether a replace-in-place edit should ask related regions to refetch.
    ///
    /// Only a response produced by the refetch endpoint (`refetch: true`)
    /// suppresses the cascade.
    pub fn cascades_to_related(&self) -> bool {
        self.refetch != Some(true)
    }

    pub fn is_locked(&self) -> bool {
        self.locked == Some(true)
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
