//! The browser implementation of the editor platform.
//!
//! `BrowserPlatform` owns handles to the window and document and implements
//! every `fedit-core` platform trait. Each trait impl lives next to the
//! concern it covers: `Dom` in `dom`, `Transport` in `fetch`, `Frames` in
//! `frame`; window services, timers and fades are here.

use std::cell::RefCell;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use gloo_timers::callback::Interval;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Array, Function, Object, Promise, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, HtmlDocument, Window};

use fedit_core::{
    Animator, Browsing, FeditConfig, FeditError, InstanceId, ResponseFunc, ServerResponse, Timers,
};

use crate::events::{DetailExporter, set};
use crate::{describe, platform_error};

pub struct BrowserPlatform {
    window: Window,
    document: Document,
    namespace: String,
    exporter: RefCell<Option<DetailExporter>>,
}

impl BrowserPlatform {
    pub fn new(config: &FeditConfig) -> Result<Self, FeditError> {
        let window = web_sys::window().ok_or(FeditError::Platform("no window".into()))?;
        let document = window
            .document()
            .ok_or(FeditError::Platform("no document".into()))?;
        Ok(Self {
            window,
            document,
            namespace: config.namespace.clone(),
            exporter: RefCell::new(None),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Install the producer of `detail.editor` handles for dispatched events.
    pub fn set_exporter(&self, exporter: DetailExporter) {
        *self.exporter.borrow_mut() = Some(exporter);
    }

    pub(crate) fn export(&self, id: InstanceId) -> Option<JsValue> {
        let exporter = self.exporter.borrow().clone();
        exporter.and_then(|exporter| exporter(id))
    }
}

/// Adapt a page function `(element, response) => void | Promise` to a
/// response function. A returned promise is awaited; a rejection or a throw
/// becomes an error.
pub fn response_func(function: Function) -> ResponseFunc<BrowserPlatform> {
    Rc::new(
        move |_platform: &BrowserPlatform, element: &Element, response: &ServerResponse| {
            let function = function.clone();
            let element = element.clone();
            let payload = JsValue::from_serde(response);
            async move {
                let payload = payload?;
                let result = function
                    .call2(&JsValue::NULL, &element, &payload)
                    .map_err(platform_error)?;
                if let Some(promise) = result.dyn_ref::<Promise>() {
                    JsFuture::from(promise.clone())
                        .await
                        .map_err(platform_error)?;
                }
                Ok(())
            }
            .boxed_local()
        },
    )
}

impl Browsing for BrowserPlatform {
    fn location(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn title(&self) -> String {
        self.document.title()
    }

    fn set_title(&self, title: &str) {
        self.document.set_title(title);
    }

    fn push_state(&self, title: &str, url: &str) {
        let result = self
            .window
            .history()
            .and_then(|history| history.push_state_with_url(&JsValue::NULL, title, Some(url)));
        if let Err(err) = result {
            warn!(url, err = %describe(&err), "could not push history entry");
        }
    }

    fn reload(&self) {
        if let Err(err) = self.window.location().reload() {
            warn!(err = %describe(&err), "could not reload page");
        }
    }

    fn alert(&self, message: &str) {
        if let Err(err) = self.window.alert_with_message(message) {
            warn!(message, err = %describe(&err), "could not show alert");
        }
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|height| height.as_f64())
            .unwrap_or(0.0)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let cookies = self.document.dyn_ref::<HtmlDocument>()?.cookie().ok()?;
        let raw = cookies.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })?;
        match js_sys::decode_uri_component(raw) {
            Ok(decoded) => Some(String::from(decoded)),
            Err(_) => Some(raw.to_owned()),
        }
    }

    fn global_function(&self, name: &str) -> Option<ResponseFunc<Self>> {
        let value = Reflect::get(&self.window, &JsValue::from_str(name)).ok()?;
        let function = value.dyn_into::<Function>().ok()?;
        debug!(name, "resolved global response function");
        Some(response_func(function))
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

impl Timers for BrowserPlatform {
    type Interval = Interval;

    fn interval(&self, millis: u32, tick: Rc<dyn Fn()>) -> Interval {
        Interval::new(millis, move || tick())
    }
}

impl Animator for BrowserPlatform {
    fn fade(&self, element: &Element, from: f64, to: f64, duration_ms: u32) -> LocalBoxFuture<'static, ()> {
        let finished = start_fade(element, from, to, duration_ms);
        async move {
            match finished {
                Ok(promise) => {
                    // A cancelled animation still counts as done.
                    let _ = JsFuture::from(promise).await;
                }
                Err(err) => debug!(%err, "fade unavailable, skipping"),
            }
        }
        .boxed_local()
    }
}

/// Start an opacity animation through `Element.animate` and return its
/// `finished` promise.
fn start_fade(element: &Element, from: f64, to: f64, duration_ms: u32) -> Result<Promise, FeditError> {
    let animate = Reflect::get(element, &JsValue::from_str("animate"))
        .map_err(platform_error)?
        .dyn_into::<Function>()
        .map_err(|_| FeditError::Platform("Element.animate is not supported".into()))?;

    let keyframes = Array::new();
    for opacity in [from, to] {
        let frame = Object::new();
        set(&frame, "opacity", &JsValue::from(opacity))?;
        keyframes.push(&frame);
    }
    let options = Object::new();
    set(&options, "duration", &JsValue::from(duration_ms))?;
    set(&options, "easing", &JsValue::from_str("ease-in-out"))?;

    let animation = animate
        .call2(element, &keyframes, &options)
        .map_err(platform_error)?;
    Reflect::get(&animation, &JsValue::from_str("finished"))
        .map_err(platform_error)?
        .dyn_into::<Promise>()
        .map_err(|_| FeditError::Platform("animation has no finished promise".into()))
}
