//! Response strategies backed by page JavaScript.

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use js_sys::{Function, Promise};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use fedit_browser::{BrowserPlatform, describe};
use fedit_core::{Editor, FeditError, FrameTuning, ResponseStrategy, ServerResponse};

use crate::api::JsEditorApi;
use crate::types::to_js;

/// Success hook calling `handler(element, response, api)`.
///
/// A returned promise is awaited before the editor closes; a throw or a
/// rejection fails the edit.
pub struct JsHandler {
    function: Function,
    tuning: FrameTuning,
}

impl JsHandler {
    pub fn new(function: Function, tuning: FrameTuning) -> Self {
        Self { function, tuning }
    }
}

impl ResponseStrategy<BrowserPlatform> for JsHandler {
    fn on_response(
        &self,
        editor: &Editor<BrowserPlatform>,
        response: ServerResponse,
    ) -> LocalBoxFuture<'static, Result<(), FeditError>> {
        let function = self.function.clone();
        let element = editor.element();
        let api = JsValue::from(JsEditorApi::new(editor.api()));
        let payload = to_js(&response);
        async move {
            let payload = payload.map_err(|err| FeditError::Platform(describe(&err)))?;
            let result = function
                .call3(&JsValue::NULL, &element, &payload, &api)
                .map_err(|err| FeditError::Platform(describe(&err)))?;
            if let Some(promise) = result.dyn_ref::<Promise>() {
                JsFuture::from(promise.clone())
                    .await
                    .map_err(|err| FeditError::Platform(describe(&err)))?;
            }
            Ok(())
        }
        .boxed_local()
    }

    fn frame_tuning(&self) -> FrameTuning {
        self.tuning.clone()
    }
}
