//! Custom-event dispatch.
//!
//! Lifecycle events reach page scripts as non-bubbling `CustomEvent`s whose
//! `detail` carries the event context plus `element`, `instance` and the
//! JS-facing editor handle.

use std::rc::Rc;

use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CustomEvent, CustomEventInit, Element, EventTarget};

use fedit_core::{EventDetail, FeditError, InstanceId};

use crate::platform_error;

/// Produces the JS handle exposed as `detail.editor` and `detail.api`.
///
/// Installed by the JS bindings; without one, details carry no handle.
pub type DetailExporter = Rc<dyn Fn(InstanceId) -> Option<JsValue>>;

/// Build the `detail` object for an event.
pub fn detail_object(
    detail: &EventDetail<Element>,
    handle: Option<&JsValue>,
) -> Result<Object, FeditError> {
    let context = JsValue::from_serde(&detail.context)?;
    let object: Object = context.dyn_into().unwrap_or_else(|_| Object::new());
    set(&object, "element", detail.element.as_ref())?;
    set(&object, "instance", &JsValue::from(detail.instance.0))?;
    if let Some(handle) = handle {
        set(&object, "editor", handle)?;
        set(&object, "api", handle)?;
    }
    Ok(object)
}

pub(crate) fn set(object: &Object, key: &str, value: &JsValue) -> Result<(), FeditError> {
    Reflect::set(object, &JsValue::from_str(key), value).map_err(platform_error)?;
    Ok(())
}

/// Dispatch a non-bubbling `CustomEvent` named `name` on `target`.
pub fn dispatch_custom(target: &EventTarget, name: &str, detail: &JsValue) -> Result<(), FeditError> {
    let init = CustomEventInit::new();
    init.set_bubbles(false);
    init.set_detail(detail);
    let event = CustomEvent::new_with_event_init_dict(name, &init).map_err(platform_error)?;
    target.dispatch_event(&event).map_err(platform_error)?;
    Ok(())
}
