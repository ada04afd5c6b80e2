//! JsFeditRuntime - the `window.wagtailFedit` object.

use std::rc::Rc;

use js_sys::Function;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use fedit_browser::{BrowserPlatform, load_config, response_func};
use fedit_core::{
    Addable, Dom, FeditConfig, Movable, Page, Presentation, Registry, VariantSpec,
};

use crate::api::JsEditorApi;
use crate::handler::JsHandler;
use crate::types::{EventNames, HandlerOptions, js_error};

/// Registry and discovery for one page.
///
/// Page scripts register custom variants and response functions here, then
/// `start()` scans the body and keeps watching it for new regions.
#[wasm_bindgen(js_name = FeditRuntime)]
pub struct JsFeditRuntime {
    page: Page<BrowserPlatform>,
    events: EventNames,
}

impl JsFeditRuntime {
    pub fn from_config(config: FeditConfig) -> Result<Self, JsError> {
        let platform = Rc::new(BrowserPlatform::new(&config).map_err(js_error)?);
        let events = EventNames::new(&config);
        let page = Page::new(platform.clone(), config, Registry::with_defaults().shared());

        // Event details expose the JS handle of the editor they concern.
        let weak = page.weak();
        platform.set_exporter(Rc::new(move |id| {
            let editor = weak.upgrade()?.editor(id)?;
            Some(JsValue::from(JsEditorApi::new(editor.api())))
        }));

        Ok(Self { page, events })
    }

    /// A second JS handle onto the same page.
    pub fn handle(&self) -> Self {
        Self {
            page: self.page.clone(),
            events: self.events.clone(),
        }
    }
}

#[wasm_bindgen(js_class = FeditRuntime)]
impl JsFeditRuntime {
    /// Create a runtime. `config` overrides the page's
    /// `#wagtail-fedit-config` element when given.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsFeditRuntime, JsError> {
        let config = if config.is_undefined() || config.is_null() {
            let document = web_sys::window()
                .and_then(|window| window.document())
                .ok_or_else(|| JsError::new("no document"))?;
            load_config(&document)
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?
        };
        Self::from_config(config)
    }

    #[wasm_bindgen(getter, js_name = NAMESPACE)]
    pub fn namespace(&self) -> String {
        self.page.config().namespace.clone()
    }

    #[wasm_bindgen(getter, js_name = EVENTS)]
    pub fn events(&self) -> EventNames {
        self.events.clone()
    }

    /// Scan the page and watch it for inserted regions. Returns the number
    /// of editors created by the initial scan.
    pub fn start(&self) -> u32 {
        self.page.start() as u32
    }

    /// Initialise the regions inside `scope`.
    #[wasm_bindgen(js_name = initNewEditors)]
    pub fn init_new_editors(&self, scope: &Element) -> u32 {
        self.page.init_new_editors(scope) as u32
    }

    /// Make `key` resolve to the variant registered as `base`.
    pub fn register(&self, key: &str, base: &str) -> Result<(), JsError> {
        self.page
            .registry()
            .borrow_mut()
            .alias(key, base)
            .map_err(js_error)
    }

    /// Register a variant whose success hook is `handler(element, response, api)`.
    #[wasm_bindgen(js_name = registerHandler)]
    pub fn register_handler(
        &self,
        key: &str,
        handler: JsValue,
        options: JsValue,
    ) -> Result<(), JsError> {
        let function = handler
            .dyn_into::<Function>()
            .map_err(|_| JsError::new(&format!("Handler for {} is not a function", key)))?;
        let options: HandlerOptions = if options.is_undefined() || options.is_null() {
            HandlerOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| JsError::new(&format!("Invalid handler options: {}", e)))?
        };

        let presentation = if options.in_place {
            Presentation::InPlace
        } else {
            Presentation::Modal
        };
        let mut variant = VariantSpec::new(
            Rc::new(JsHandler::new(function, options.frame_tuning())),
            presentation,
        );
        if options.movable {
            variant = variant.with_behavior(Movable);
        }
        if options.addable {
            variant = variant.with_behavior(Addable);
        }
        self.page.registry().borrow_mut().register(key, variant);
        Ok(())
    }

    /// Register a response function `func(element, response)` for the
    /// function-dispatch variant.
    #[wasm_bindgen(js_name = registerFunc)]
    pub fn register_func(&self, key: &str, func: JsValue) -> Result<(), JsError> {
        let function = func
            .dyn_into::<Function>()
            .map_err(|_| JsError::new(&format!("Function {} is not callable", key)))?;
        self.page
            .registry()
            .borrow_mut()
            .register_func(key, response_func(function));
        Ok(())
    }

    /// Registered variant keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.page.registry().borrow().keys()
    }

    /// The editor API of the region `element` belongs to, if any.
    #[wasm_bindgen(js_name = apiFor)]
    pub fn api_for(&self, element: &Element) -> Option<JsEditorApi> {
        let platform = self.page.platform();
        let region = platform.closest(element, fedit_core::markers::ADAPTER_WRAPPER)?;
        self.page.api_for(&region).map(JsEditorApi::new)
    }
}
