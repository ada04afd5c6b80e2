//! JsEditorApi - the editor capability facade for JavaScript.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use serde_json::{Map, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{CustomEvent, CustomEventInit, Element, FormData};

use fedit_browser::{BrowserPlatform, describe, detail_object};
use fedit_core::editor::WeakEditor;
use fedit_core::{EditorApi, EventDetail, FetchBody, HtmlSwap, ListenerId, Method};

use crate::types::{js_error, js_reject, state_name, to_js};

/// Handle to one editor, handed to page scripts through `apiFor`, event
/// details and handler arguments.
#[wasm_bindgen(js_name = EditorApi)]
pub struct JsEditorApi {
    api: EditorApi<BrowserPlatform>,
}

/// Returned by `addEventListener`; pass it back to remove the listener.
#[wasm_bindgen]
pub struct JsListener {
    id: ListenerId,
}

impl JsEditorApi {
    pub fn new(api: EditorApi<BrowserPlatform>) -> Self {
        Self { api }
    }
}

#[wasm_bindgen(js_class = EditorApi)]
impl JsEditorApi {
    /// The region element currently owned by this editor.
    #[wasm_bindgen(getter)]
    pub fn element(&self) -> Element {
        self.api.element()
    }

    #[wasm_bindgen(getter, js_name = regionId)]
    pub fn region_id(&self) -> String {
        self.api.editor().region_id()
    }

    /// `idle`, `opening`, `open` or `submitPending`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        state_name(self.api.editor().state()).to_owned()
    }

    #[wasm_bindgen(js_name = openEditor)]
    pub fn open_editor(&self) {
        self.api.open_editor();
    }

    #[wasm_bindgen(js_name = closeEditor)]
    pub fn close_editor(&self) {
        self.api.close_editor();
    }

    #[wasm_bindgen(js_name = openModal)]
    pub fn open_modal(&self) {
        self.api.open_modal();
    }

    #[wasm_bindgen(js_name = closeModal)]
    pub fn close_modal(&self) {
        self.api.close_modal();
    }

    /// Replace the region. Accepts the new HTML, or a function that receives
    /// `update(html)` and calls it when ready (e.g. after a fade).
    ///
    /// Resolves with the new region element.
    #[wasm_bindgen(js_name = updateHtml)]
    pub fn update_html(&self, html: JsValue) -> Result<Promise, JsError> {
        if let Some(html) = html.as_string() {
            let element = self.api.update_html(&html).map_err(js_error)?;
            return Ok(Promise::resolve(&JsValue::from(element)));
        }
        let callback = html
            .dyn_into::<Function>()
            .map_err(|_| JsError::new("updateHtml expects an HTML string or a function"))?;

        let pending = self.api.update_html_with(move |swap| {
            let slot: Rc<RefCell<Option<HtmlSwap<BrowserPlatform>>>> =
                Rc::new(RefCell::new(Some(swap)));
            let taken = slot.clone();
            let update = Closure::once_into_js(move |html: String| -> JsValue {
                let swap = taken.borrow_mut().take();
                swap.and_then(|swap| swap.apply(&html))
                    .map(JsValue::from)
                    .unwrap_or(JsValue::NULL)
            });
            if let Err(err) = callback.call1(&JsValue::NULL, &update) {
                tracing::warn!(err = %describe(&err), "updateHtml callback threw");
                // Dropping the unused swap rejects the pending promise.
                slot.borrow_mut().take();
            }
        });

        Ok(future_to_promise(async move {
            pending.await.map(JsValue::from).map_err(js_reject)
        }))
    }

    /// Ask the server for this region's current HTML and swap it in.
    /// Resolves with the response, or `undefined` when it was not usable.
    pub fn refetch(&self) -> Promise {
        let pending = self.api.refetch();
        future_to_promise(async move {
            match pending.await.map_err(js_reject)? {
                Some(response) => to_js(&response),
                None => Ok(JsValue::UNDEFINED),
            }
        })
    }

    /// Call `callback(api)` for every other region sharing this wrapper id.
    #[wasm_bindgen(js_name = execRelated)]
    pub fn exec_related(&self, callback: &Function) {
        self.api.exec_related(|related| {
            let handle = JsValue::from(JsEditorApi::new(related));
            if let Err(err) = callback.call1(&JsValue::NULL, &handle) {
                tracing::warn!(err = %describe(&err), "execRelated callback threw");
            }
        });
    }

    /// Authenticated request. `body` may be a `FormData` or any JSON value;
    /// `method` defaults to POST with a body and GET without.
    pub fn fetch(&self, url: &str, method: Option<String>, body: JsValue) -> Result<Promise, JsError> {
        let body = if body.is_undefined() || body.is_null() {
            FetchBody::Empty
        } else if let Some(form) = body.dyn_ref::<FormData>() {
            FetchBody::Form(form.clone())
        } else {
            let value: Value = serde_wasm_bindgen::from_value(body)
                .map_err(|err| JsError::new(&format!("Invalid fetch body: {}", err)))?;
            FetchBody::Json(value)
        };
        let method = match method.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("GET") => Method::Get,
            Some("POST") => Method::Post,
            None if matches!(body, FetchBody::Empty) => Method::Get,
            None => Method::Post,
            Some(other) => return Err(JsError::new(&format!("Unsupported method: {}", other))),
        };

        let pending = self.api.fetch(url, method, body);
        Ok(future_to_promise(async move {
            let response = pending.await.map_err(js_reject)?;
            to_js(&response)
        }))
    }

    /// Listen for a lifecycle or custom event on this editor. The callback
    /// receives a `CustomEvent` carrying the same `detail` the DOM event has.
    #[wasm_bindgen(js_name = addEventListener)]
    pub fn add_event_listener(&self, name: &str, callback: Function) -> JsListener {
        let weak: WeakEditor<BrowserPlatform> = self.api.editor().downgrade();
        let id = self.api.add_event_listener(
            name,
            Rc::new(move |name: &str, detail: &EventDetail<Element>| {
                let handle = weak
                    .upgrade()
                    .map(|editor| JsValue::from(JsEditorApi::new(editor.api())));
                let event = detail_object(detail, handle.as_ref())
                    .map_err(|err| JsValue::from(js_error(err)))
                    .and_then(|detail| {
                        let init = CustomEventInit::new();
                        init.set_detail(&detail);
                        CustomEvent::new_with_event_init_dict(name, &init)
                    });
                match event {
                    Ok(event) => {
                        if let Err(err) = callback.call1(&JsValue::NULL, &event) {
                            tracing::warn!(name, err = %describe(&err), "event listener threw");
                        }
                    }
                    Err(err) => tracing::warn!(name, err = %describe(&err), "could not build event"),
                }
            }),
        );
        JsListener { id }
    }

    /// Returns false if the listener was already removed.
    #[wasm_bindgen(js_name = removeEventListener)]
    pub fn remove_event_listener(&self, listener: &JsListener) -> bool {
        self.api.remove_event_listener(listener.id)
    }

    /// Dispatch a custom event (namespaced) to this editor's listeners, the
    /// region element and the document.
    #[wasm_bindgen(js_name = executeEvent)]
    pub fn execute_event(&self, name: &str, detail: JsValue) -> Result<(), JsError> {
        let context: Map<String, Value> = if detail.is_undefined() || detail.is_null() {
            Map::new()
        } else {
            serde_wasm_bindgen::from_value(detail)
                .map_err(|err| JsError::new(&format!("Invalid event detail: {}", err)))?
        };
        self.api.dispatch_event(name, context);
        Ok(())
    }
}
