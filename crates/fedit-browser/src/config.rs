//! Page-provided configuration.
//!
//! The server may render a JSON script element:
//!
//! ```html
//! <script type="application/json" id="wagtail-fedit-config">
//!   {"resize_poll_interval_ms": 50}
//! </script>
//! ```
//!
//! Missing fields take their defaults; a missing or malformed element yields
//! the default configuration.

use tracing::{debug, warn};
use web_sys::Document;

use fedit_core::FeditConfig;

pub const CONFIG_ELEMENT_ID: &str = "wagtail-fedit-config";

pub fn load_config(document: &Document) -> FeditConfig {
    let Some(text) = document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|element| element.text_content())
    else {
        debug!("no page configuration, using defaults");
        return FeditConfig::default();
    };
    match FeditConfig::from_json(&text) {
        Ok(config) => config,
        Err(err) => {
            warn!(%err, "ignoring malformed page configuration");
            FeditConfig::default()
        }
    }
}
