//! Browser platform for frontend editing.
//!
//! Implements the `fedit-core` platform traits on top of `web-sys`. It
//! assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `platform`: `BrowserPlatform`, window services, timers and fades
//! - `dom`: the `Dom` implementation over live elements
//! - `frame`: iframe surfaces for embedded edit forms
//! - `fetch`: the `Transport` implementation over `window.fetch`
//! - `observer`: subtree-insertion observation via `MutationObserver`
//! - `events`: custom-event dispatch and JS detail objects
//! - `config`: reading `FeditConfig` from the page
//!
//! # Re-exports
//!
//! This crate re-exports `fedit-core` for convenience, so consumers only need
//! to depend on `fedit-browser`.

// Re-export core crate
pub use fedit_core;
pub use fedit_core::*;

pub mod config;
pub mod dom;
pub mod events;
pub mod fetch;
pub mod frame;
pub mod observer;
pub mod platform;

pub use config::load_config;
pub use dom::Subscription;
pub use events::{DetailExporter, detail_object};
pub use frame::IframeSurface;
pub use platform::{BrowserPlatform, response_func};

use wasm_bindgen::{JsCast, JsValue};

/// Best-effort human-readable text for a thrown JS value.
pub fn describe(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{err:?}")
}

pub(crate) fn platform_error(err: JsValue) -> FeditError {
    FeditError::Platform(describe(&err))
}
