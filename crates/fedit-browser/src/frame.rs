//! Iframe-backed embedded documents.
//!
//! The iframe element reports `Load`/`Error` from its own events; everything
//! else goes through the same-origin `contentDocument`. When that document
//! is inaccessible every probe answers `false`/`None` and fallible calls
//! return `FrameInaccessible`.

use std::cell::RefCell;

use gloo_events::{EventListener, EventListenerOptions};
use js_sys::{Function, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, FormData, HtmlElement, HtmlIFrameElement, HtmlTemplateElement};

use fedit_core::markers::frame as sel;
use fedit_core::{FeditError, FrameSignal, FrameSink, FrameSource, FrameSurface, Frames};

use crate::describe;
use crate::platform::BrowserPlatform;

/// Global the embedded editor page defines for late block widgets.
const INIT_WIDGET_FN: &str = "initBlockWidget";

pub struct IframeSurface {
    frame: HtmlIFrameElement,
    sink: FrameSink<FormData>,
    _element_listeners: [EventListener; 2],
    submit: RefCell<Option<EventListener>>,
    cancel: RefCell<Option<EventListener>>,
    ready: RefCell<Option<EventListener>>,
}

impl IframeSurface {
    fn document(&self) -> Option<Document> {
        self.frame.content_document()
    }

    fn find(&self, selector: &str) -> Option<Element> {
        self.document()?.query_selector(selector).ok().flatten()
    }
}

impl Frames for BrowserPlatform {
    type Surface = IframeSurface;

    fn create_frame(
        &self,
        source: &FrameSource,
        id: &str,
        class_name: Option<&str>,
        sink: FrameSink<FormData>,
    ) -> Result<IframeSurface, FeditError> {
        let frame: HtmlIFrameElement = self
            .document()
            .create_element("iframe")
            .map_err(crate::platform_error)?
            .dyn_into()
            .map_err(|_| FeditError::Platform("iframe element has the wrong type".into()))?;
        frame.set_id(id);
        if let Some(class_name) = class_name {
            frame.set_class_name(class_name);
        }
        match source {
            FrameSource::Url(url) => frame.set_src(url),
            FrameSource::Inline(html) => frame.set_srcdoc(html),
        }

        let on_load = sink.clone();
        let on_error = sink.clone();
        let listeners = [
            EventListener::new(&frame, "load", move |_| on_load(FrameSignal::Load)),
            EventListener::new(&frame, "error", move |_| on_error(FrameSignal::Error)),
        ];
        debug!(id, "frame created");

        Ok(IframeSurface {
            frame,
            sink,
            _element_listeners: listeners,
            submit: RefCell::new(None),
            cancel: RefCell::new(None),
            ready: RefCell::new(None),
        })
    }
}

impl FrameSurface for IframeSurface {
    type Element = Element;

    fn element(&self) -> Element {
        self.frame.clone().into()
    }

    fn is_ready(&self) -> bool {
        self.document()
            .is_some_and(|doc| doc.ready_state() == "complete")
    }

    fn title(&self) -> Option<String> {
        self.document().map(|doc| doc.title())
    }

    fn contains(&self, selector: &str) -> bool {
        self.find(selector).is_some()
    }

    fn has_class(&self, selector: &str, class: &str) -> bool {
        self.find(selector)
            .is_some_and(|element| element.class_list().contains(class))
    }

    fn attribute(&self, selector: &str, name: &str) -> Option<String> {
        self.find(selector)?.get_attribute(name)
    }

    fn content_height(&self, selector: &str) -> Result<f64, FeditError> {
        let doc = self.document().ok_or(FeditError::FrameInaccessible)?;
        let element = doc
            .query_selector(selector)
            .ok()
            .flatten()
            .ok_or_else(|| FeditError::MissingElement(selector.to_owned()))?;
        // The form itself is measured as laid out; wrappers by their
        // scrollable content.
        let height = if selector == sel::FORM {
            element.client_height()
        } else {
            element.scroll_height()
        };
        Ok(f64::from(height))
    }

    fn replace_section(&self, selector: &str, html: &str) -> Result<(), FeditError> {
        let doc = self.document().ok_or(FeditError::FrameInaccessible)?;
        let target = doc
            .query_selector(selector)
            .ok()
            .flatten()
            .ok_or_else(|| FeditError::MissingElement(selector.to_owned()))?;

        let template: HtmlTemplateElement = doc
            .create_element("template")
            .map_err(crate::platform_error)?
            .dyn_into()
            .map_err(|_| FeditError::Platform("template element has the wrong type".into()))?;
        template.set_inner_html(html);
        let source = template
            .content()
            .query_selector(selector)
            .ok()
            .flatten()
            .ok_or_else(|| FeditError::MissingElement(format!("{selector} in response")))?;

        target.set_inner_html(&source.inner_html());
        Ok(())
    }

    fn init_widget(&self, selector: &str) -> bool {
        let Some(element) = self.find(selector) else {
            return false;
        };
        let Some(window) = self.frame.content_window() else {
            return false;
        };
        let init = Reflect::get(&window, &JsValue::from_str(INIT_WIDGET_FN))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok());
        let Some(init) = init else {
            warn!("embedded document defines no {INIT_WIDGET_FN}");
            return false;
        };
        match init.call1(&window, &JsValue::from_str(&element.id())) {
            Ok(_) => true,
            Err(err) => {
                warn!(err = %describe(&err), "widget initialisation failed");
                false
            }
        }
    }

    fn bind_submit(&self, selector: &str) -> bool {
        let Some(form) = self.find(selector) else {
            return false;
        };
        let Ok(form) = form.dyn_into::<web_sys::HtmlFormElement>() else {
            return false;
        };
        let sink = self.sink.clone();
        let target = form.clone();
        let listener = EventListener::new_with_options(
            &form,
            "submit",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                event.prevent_default();
                match FormData::new_with_form(&target) {
                    Ok(data) => sink(FrameSignal::Submit(data)),
                    Err(err) => warn!(err = %describe(&err), "could not read form data"),
                }
            },
        );
        *self.submit.borrow_mut() = Some(listener);
        true
    }

    fn bind_cancel(&self, selector: &str) -> bool {
        let Some(button) = self.find(selector) else {
            return false;
        };
        let sink = self.sink.clone();
        let listener = EventListener::new_with_options(
            &button,
            "click",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                event.prevent_default();
                sink(FrameSignal::Cancel);
            },
        );
        *self.cancel.borrow_mut() = Some(listener);
        true
    }

    fn watch_ready(&self) {
        let Some(doc) = self.document() else {
            return;
        };
        let sink = self.sink.clone();
        let listener = EventListener::once(&doc, "DOMContentLoaded", move |_| {
            sink(FrameSignal::Ready);
        });
        *self.ready.borrow_mut() = Some(listener);
    }

    fn set_height(&self, px: f64) {
        let html: &HtmlElement = self.frame.as_ref();
        if let Err(err) = html.style().set_property("height", &format!("{px}px")) {
            warn!(err = %describe(&err), "could not size frame");
        }
    }
}
