//! WASM bindings for frontend editing.
//!
//! Loading the module installs `window.wagtailFedit` (a `FeditRuntime`),
//! announces it with a `wagtail-fedit:ready` event so page scripts can
//! register their variants, and starts discovery once the document has
//! loaded.

mod api;
mod handler;
mod runtime;
mod types;

pub use api::*;
pub use runtime::*;
pub use types::*;

use gloo_events::EventListener;
use js_sys::Reflect;
use wasm_bindgen::prelude::*;

use fedit_browser::events::dispatch_custom;

/// Global the runtime is installed under.
const GLOBAL_NAME: &str = "wagtailFedit";

/// Initialize panic hook, logging, and the page runtime.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    init_tracing();

    if let Err(err) = install() {
        tracing::error!(err = %fedit_browser::describe(&err), "could not start frontend editing");
    }
}

fn init_tracing() {
    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let reg = Registry::default().with(wasm_layer);

    let _ = set_global_default(reg);
}

fn install() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let runtime = JsFeditRuntime::new(JsValue::UNDEFINED)?;
    let ready_event = format!("{}:ready", runtime.namespace());
    let starter = runtime.handle();
    let global = JsValue::from(runtime);
    Reflect::set(&window, &JsValue::from_str(GLOBAL_NAME), &global)?;
    dispatch_custom(&document, &ready_event, &global)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", move |_| {
            starter.start();
        })
        .forget();
    } else {
        starter.start();
    }
    Ok(())
}
