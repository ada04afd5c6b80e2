//! `Dom` over the live document.
//!
//! Handles are plain `web_sys::Element`s; equality is JS identity.

use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Object, Reflect};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, HtmlTemplateElement};

use fedit_core::{Dom, EventDetail, FeditError, InstanceId};

use crate::events::{detail_object, dispatch_custom};
use crate::observer::InsertionObserver;
use crate::platform::BrowserPlatform;
use crate::platform_error;

/// Property holding the owning instance on a region element.
const INSTANCE_KEY: &str = "__feditInstance";

/// Keeps a DOM listener or observer alive.
pub enum Subscription {
    Listener(EventListener),
    Observer(InsertionObserver),
    /// Nothing could be bound; dropping it is a no-op.
    Inert,
}

fn elements_of(list: web_sys::NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Options for the tooltip widget: `content` from the title, plus every
/// `data-tooltip-<key>` attribute.
pub fn tooltip_config(element: &Element) -> Map<String, Value> {
    let mut config = Map::new();
    if let Some(title) = element.get_attribute("title") {
        config.insert("content".to_owned(), Value::String(title));
    }
    for name in element.get_attribute_names().iter() {
        let Some(name) = name.as_string() else {
            continue;
        };
        if let Some(key) = name.strip_prefix("data-tooltip-") {
            if let Some(value) = element.get_attribute(&name) {
                config.insert(key.to_owned(), Value::String(value));
            }
        }
    }
    config
}

impl Dom for BrowserPlatform {
    type Element = Element;
    type Subscription = Subscription;

    fn body(&self) -> Option<Element> {
        self.document().body().map(Element::from)
    }

    fn query(&self, scope: &Element, selector: &str) -> Option<Element> {
        match scope.query_selector(selector) {
            Ok(found) => found,
            Err(err) => {
                warn!(selector, err = %crate::describe(&err), "invalid selector");
                None
            }
        }
    }

    fn query_all(&self, scope: &Element, selector: &str) -> Vec<Element> {
        match scope.query_selector_all(selector) {
            Ok(list) => elements_of(list),
            Err(err) => {
                warn!(selector, err = %crate::describe(&err), "invalid selector");
                Vec::new()
            }
        }
    }

    fn closest(&self, element: &Element, selector: &str) -> Option<Element> {
        element.closest(selector).ok().flatten()
    }

    fn parent(&self, element: &Element) -> Option<Element> {
        element.parent_element()
    }

    fn children(&self, element: &Element) -> Vec<Element> {
        let children = element.children();
        (0..children.length())
            .filter_map(|i| children.item(i))
            .collect()
    }

    fn id(&self, element: &Element) -> String {
        element.id()
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn set_attribute(&self, element: &Element, name: &str, value: &str) {
        if let Err(err) = element.set_attribute(name, value) {
            warn!(name, err = %crate::describe(&err), "could not set attribute");
        }
    }

    fn remove_attribute(&self, element: &Element, name: &str) {
        if let Err(err) = element.remove_attribute(name) {
            warn!(name, err = %crate::describe(&err), "could not remove attribute");
        }
    }

    fn has_class(&self, element: &Element, class: &str) -> bool {
        element.class_list().contains(class)
    }

    fn add_class(&self, element: &Element, class: &str) {
        if let Err(err) = element.class_list().add_1(class) {
            warn!(class, err = %crate::describe(&err), "could not add class");
        }
    }

    fn remove_class(&self, element: &Element, class: &str) {
        if let Err(err) = element.class_list().remove_1(class) {
            warn!(class, err = %crate::describe(&err), "could not remove class");
        }
    }

    fn set_style(&self, element: &Element, property: &str, value: &str) {
        let Some(html) = element.dyn_ref::<HtmlElement>() else {
            return;
        };
        if let Err(err) = html.style().set_property(property, value) {
            warn!(property, err = %crate::describe(&err), "could not set style");
        }
    }

    fn inner_html(&self, element: &Element) -> String {
        element.inner_html()
    }

    fn set_inner_html(&self, element: &Element, html: &str) {
        element.set_inner_html(html);
    }

    fn create_element(&self, tag: &str) -> Result<Element, FeditError> {
        self.document().create_element(tag).map_err(platform_error)
    }

    fn parse_fragment(&self, html: &str) -> Option<Element> {
        let template = self
            .document()
            .create_element("template")
            .ok()?
            .dyn_into::<HtmlTemplateElement>()
            .ok()?;
        template.set_inner_html(html.trim());
        template.content().first_element_child()
    }

    fn insert_before(&self, new: &Element, reference: &Element) -> Result<(), FeditError> {
        let parent = reference
            .parent_node()
            .ok_or_else(|| FeditError::MissingElement("parent of reference node".into()))?;
        parent
            .insert_before(new, Some(reference))
            .map_err(platform_error)?;
        Ok(())
    }

    fn append_child(&self, parent: &Element, child: &Element) -> Result<(), FeditError> {
        parent.append_child(child).map_err(platform_error)?;
        Ok(())
    }

    fn remove(&self, element: &Element) {
        element.remove();
    }

    fn is_connected(&self, element: &Element) -> bool {
        element.is_connected()
    }

    fn focus(&self, element: &Element) {
        if let Some(html) = element.dyn_ref::<HtmlElement>() {
            if let Err(err) = html.focus() {
                warn!(err = %crate::describe(&err), "could not focus element");
            }
        }
    }

    fn on_click(&self, element: &Element, handler: Rc<dyn Fn()>) -> Subscription {
        let listener = EventListener::new_with_options(
            element,
            "click",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                event.prevent_default();
                event.stop_propagation();
                handler();
            },
        );
        Subscription::Listener(listener)
    }

    fn observe_insertions(&self, root: &Element, on_added: Rc<dyn Fn(Element)>) -> Subscription {
        match InsertionObserver::new(root, on_added) {
            Ok(observer) => Subscription::Observer(observer),
            Err(err) => {
                tracing::error!(%err, "could not observe insertions");
                Subscription::Inert
            }
        }
    }

    fn dispatch(&self, target: Option<&Element>, name: &str, detail: &EventDetail<Element>) {
        let handle = self.export(detail.instance);
        let object = match detail_object(detail, handle.as_ref()) {
            Ok(object) => object,
            Err(err) => {
                warn!(name, %err, "could not build event detail");
                return;
            }
        };
        let result = match target {
            Some(element) => dispatch_custom(element, name, &object),
            None => dispatch_custom(self.document(), name, &object),
        };
        if let Err(err) = result {
            warn!(name, %err, "could not dispatch event");
        }
    }

    fn bind_tooltip(&self, element: &Element) {
        let config = tooltip_config(element);
        let config = match JsValue::from_serde(&config) {
            Ok(config) => config,
            Err(err) => {
                warn!(%err, "could not encode tooltip options");
                return;
            }
        };
        let tippy = Reflect::get(self.window(), &JsValue::from_str("tippy"))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        match tippy {
            Some(tippy) => {
                if let Err(err) = tippy.call2(&JsValue::NULL, element, &config) {
                    warn!(err = %crate::describe(&err), "tooltip widget failed");
                }
            }
            None => {
                // No widget on the page: leave it to page scripts.
                let name = format!("{}:tooltip", self.namespace());
                if let Err(err) = dispatch_custom(element, &name, &config) {
                    warn!(%err, "could not dispatch tooltip event");
                }
            }
        }
    }

    fn attach_instance(&self, element: &Element, id: InstanceId) {
        let descriptor = Object::new();
        let entries = [
            ("value", JsValue::from(id.0)),
            ("writable", JsValue::TRUE),
            ("configurable", JsValue::TRUE),
            ("enumerable", JsValue::FALSE),
        ];
        for (key, value) in entries {
            if let Err(err) = Reflect::set(&descriptor, &JsValue::from_str(key), &value) {
                warn!(key, err = %crate::describe(&err), "could not build instance descriptor");
            }
        }
        Object::define_property(
            element.unchecked_ref::<Object>(),
            &JsValue::from_str(INSTANCE_KEY),
            &descriptor,
        );
        debug!(instance = %id, region = %element.id(), "instance attached");
    }

    fn detach_instance(&self, element: &Element) {
        if let Err(err) = Reflect::delete_property(
            element.unchecked_ref::<Object>(),
            &JsValue::from_str(INSTANCE_KEY),
        ) {
            warn!(err = %crate::describe(&err), "could not detach instance");
        }
    }

    fn instance_of(&self, element: &Element) -> Option<InstanceId> {
        let value = Reflect::get(element, &JsValue::from_str(INSTANCE_KEY))
            .ok()?
            .as_f64()?;
        let id = instance_id(value);
        if id.is_none() {
            warn!(value, region = %element.id(), "ignoring malformed instance id");
        }
        id
    }
}

/// Instance ids are stored as JS numbers; only exact `u32` values count.
fn instance_id(value: f64) -> Option<InstanceId> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
        .then(|| InstanceId(value as u32))
}
