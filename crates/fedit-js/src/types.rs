//! Types exposed to JavaScript via wasm-bindgen.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

use fedit_core::{EditorEvent, EditorState, FeditConfig, FeditError, FrameTuning};

/// Namespaced names of the lifecycle events, keyed the way page scripts
/// refer to them (`wagtailFedit.EVENTS.SUBMIT_ERROR`).
#[derive(Debug, Clone, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EventNames {
    pub submit: String,
    pub change: String,
    pub editor_open: String,
    pub editor_load: String,
    pub editor_close: String,
    pub submit_error: String,
}

impl EventNames {
    pub fn new(config: &FeditConfig) -> Self {
        Self {
            submit: config.event_name(EditorEvent::Submit),
            change: config.event_name(EditorEvent::Change),
            editor_open: config.event_name(EditorEvent::EditorOpen),
            editor_load: config.event_name(EditorEvent::EditorLoad),
            editor_close: config.event_name(EditorEvent::EditorClose),
            submit_error: config.event_name(EditorEvent::SubmitError),
        }
    }
}

/// How a variant registered with `registerHandler` is presented and which
/// behaviors it carries. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerOptions {
    /// Show the form inside the region instead of the overlay.
    pub in_place: bool,
    pub movable: bool,
    pub addable: bool,
    /// Extra class on the frame element.
    #[tsify(optional)]
    pub class_name: Option<String>,
    /// Wait for the embedded document's own ready signal before `editorLoad`.
    pub wait_for_ready: bool,
}

impl HandlerOptions {
    pub fn frame_tuning(&self) -> FrameTuning {
        FrameTuning {
            class_name: self.class_name.clone(),
            execute_onload_immediately: !self.wait_for_ready,
            auto_resize: self.in_place,
        }
    }
}

/// Name of an editor state as page scripts see it.
pub fn state_name(state: EditorState) -> &'static str {
    match state {
        EditorState::Idle => "idle",
        EditorState::Opening => "opening",
        EditorState::Open => "open",
        EditorState::SubmitPending => "submitPending",
    }
}

/// Serialize for JS as plain objects, never `Map`s.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

pub fn js_error(err: FeditError) -> JsError {
    JsError::new(&err.to_string())
}

pub fn js_reject(err: FeditError) -> JsValue {
    JsValue::from(js_error(err))
}
