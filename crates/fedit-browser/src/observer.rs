//! Subtree-insertion observation.
//!
//! Wraps a `MutationObserver` watching `childList` changes over a whole
//! subtree and reports every inserted element node. Text and comment nodes
//! are ignored.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, MutationRecord};

use fedit_core::FeditError;

use crate::platform_error;

/// Live observer. Disconnects when dropped.
pub struct InsertionObserver {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

impl InsertionObserver {
    pub fn new(root: &Element, on_added: Rc<dyn Fn(Element)>) -> Result<Self, FeditError> {
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                for record in records.iter() {
                    let record: MutationRecord = record.unchecked_into();
                    let added = record.added_nodes();
                    for i in 0..added.length() {
                        let Some(node) = added.item(i) else {
                            continue;
                        };
                        if let Ok(element) = node.dyn_into::<Element>() {
                            on_added(element);
                        }
                    }
                }
            },
        );

        let observer =
            MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(platform_error)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(root, &init)
            .map_err(platform_error)?;

        tracing::debug!("observing subtree insertions");
        Ok(Self {
            observer,
            _callback: callback,
        })
    }
}

impl Drop for InsertionObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
