//! Class names, selectors and attributes the server-rendered HTML carries.

pub const ADAPTER_WRAPPER_CLASS: &str = "wagtail-fedit-adapter-wrapper";
pub const ADAPTER_WRAPPER: &str = ".wagtail-fedit-adapter-wrapper";
pub const INITIALIZED_CLASS: &str = "wagtail-fedit-initialized";

pub const EDIT_BUTTON: &str = ".wagtail-fedit-edit-button";
pub const MOVE_BUTTON: &str = ".wagtail-fedit-move-button";
pub const ADD_BUTTON: &str = ".wagtail-fedit-add-button";
pub const CLOSE_BUTTON_CLASS: &str = "wagtail-fedit-close-button";

/// Slots used by the in-place presentation.
pub const ADAPTER_FORM: &str = ".wagtail-fedit-adapter-form";
pub const ADAPTER_CONTENT: &str = ".wagtail-fedit-adapter-content";

pub const TOOLTIP_OPT_IN: &str = "[data-tooltip=\"true\"]";

/// Selectors inside the embedded edit document.
pub mod frame {
    pub const IFRAME_ID: &str = "wagtail-fedit-iframe";
    pub const ADD_IFRAME_ID: &str = "wagtail-fedit-add-iframe";
    pub const FORM: &str = "#wagtail-fedit-form";
    pub const FORM_WRAPPER: &str = ".wagtail-fedit-form-wrapper";
    pub const FORM_BUTTONS: &str = ".wagtail-fedit-form-buttons";
    pub const MAIN: &str = "#main";
    pub const CANCEL_BUTTON: &str = ".wagtail-fedit-cancel-button";
    pub const UNINITIALIZED_BLOCK: &str = "#value[data-block]";
}

pub mod attr {
    pub const EDIT_URL: &str = "data-edit-url";
    pub const REFETCH_URL: &str = "data-refetch-url";
    pub const SHARED_CONTEXT: &str = "data-shared-context";
    pub const WRAPPER_ID: &str = "data-wrapper-id";
    pub const CONSTRUCTOR: &str = "data-fedit-constructor";
    pub const ACTION_URL: &str = "data-action-url";
    pub const EDITOR_SIZE: &str = "data-editor-size";
    pub const TOOLTIP: &str = "data-tooltip";
}

/// Size variants a form can ask for, largest last.
pub const SIZE_VARIANTS: [&str; 2] = ["large", "full"];

/// `[name="value"]` with the value escaped for a double-quoted string.
pub fn attr_selector(name: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{name}=\"{escaped}\"]")
}
