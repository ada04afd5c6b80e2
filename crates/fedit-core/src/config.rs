//! Runtime configuration for the editing layer.
//!
//! Every field has a default matching what the server-side templates expect,
//! so an empty JSON object (or no config at all) is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::FeditError;
use crate::events::EditorEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeditConfig {
    /// Prefix for custom event names (`<namespace>:<event>`).
    pub namespace: String,
    /// How often an auto-resizing frame polls its content height.
    pub resize_poll_interval_ms: u32,
    /// Duration of each half of the replace-in-place fade.
    pub fade_duration_ms: u32,
    /// Cookie holding the CSRF token for authenticated requests.
    pub csrf_cookie_name: String,
    /// Header the CSRF token is sent in.
    pub csrf_header_name: String,
    /// Query parameter carrying the shared context token.
    pub shared_context_param: String,
}

impl Default for FeditConfig {
    fn default() -> Self {
        Self {
            namespace: "wagtail-fedit".to_owned(),
            resize_poll_interval_ms: 25,
            fade_duration_ms: 350,
            csrf_cookie_name: "csrftoken".to_owned(),
            csrf_header_name: "X-CSRFToken".to_owned(),
            shared_context_param: "shared_context".to_owned(),
        }
    }
}

impl FeditConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, FeditError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Full, namespaced name of a lifecycle event.
    pub fn event_name(&self, event: EditorEvent) -> String {
        format!("{}:{}", self.namespace, event.as_str())
    }

    /// Prefix `name` with the namespace unless it already carries it.
    pub fn namespaced(&self, name: &str) -> String {
        let prefix = format!("{}:", self.namespace);
        if name.starts_with(&prefix) {
            name.to_owned()
        } else {
            format!("{prefix}{name}")
        }
    }
}
