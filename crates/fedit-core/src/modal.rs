//! Page-level overlay hosting an editor's frame.
//!
//! There is one overlay wrapper per page and at most one modal surface in it.
//! A `Modal` is a handle keyed by its modal id: asking for its surface while
//! another modal's surface is resident tears the other one down first.

use std::rc::Rc;

use tracing::debug;

use crate::error::FeditError;
use crate::markers::CLOSE_BUTTON_CLASS;
use crate::platform::Dom;

pub const WRAPPER_ID: &str = "wagtail-fedit-modal-wrapper";
pub const WRAPPER_CLASS: &str = "wagtail-fedit-modal-wrapper";
pub const SURFACE_CLASS: &str = "wagtail-fedit-modal";
pub const OPEN_CLASS: &str = "open";

#[derive(Clone, Default)]
pub struct ModalOptions {
    pub modal_id: String,
    pub on_open: Option<Rc<dyn Fn()>>,
    pub on_close: Option<Rc<dyn Fn()>>,
    pub on_destroy: Option<Rc<dyn Fn()>>,
}

impl ModalOptions {
    pub fn new(modal_id: impl Into<String>) -> Self {
        Self {
            modal_id: modal_id.into(),
            ..Default::default()
        }
    }
}

pub struct Modal<P: Dom> {
    platform: Rc<P>,
    options: ModalOptions,
}

impl<P: Dom> Modal<P> {
    pub fn new(platform: Rc<P>, options: ModalOptions) -> Self {
        Self { platform, options }
    }

    pub fn modal_id(&self) -> &str {
        &self.options.modal_id
    }

    pub fn surface_id(&self) -> String {
        format!("{SURFACE_CLASS}-{}-modal", self.options.modal_id)
    }

    /// The page's overlay wrapper, created on first use.
    pub fn wrapper(&self) -> Result<P::Element, FeditError> {
        let platform = &self.platform;
        let body = platform
            .body()
            .ok_or_else(|| FeditError::MissingElement("body".into()))?;
        if let Some(wrapper) = platform.query(&body, &format!("#{WRAPPER_ID}")) {
            return Ok(wrapper);
        }
        let wrapper = platform.create_element("div")?;
        platform.set_attribute(&wrapper, "id", WRAPPER_ID);
        platform.add_class(&wrapper, WRAPPER_CLASS);
        platform.append_child(&body, &wrapper)?;
        Ok(wrapper)
    }

    fn resident(&self) -> Option<P::Element> {
        let body = self.platform.body()?;
        let wrapper = self.platform.query(&body, &format!("#{WRAPPER_ID}"))?;
        self.platform
            .query(&wrapper, &format!(".{SURFACE_CLASS}"))
    }

    fn is_resident(&self) -> bool {
        self.resident()
            .is_some_and(|surface| self.platform.id(&surface) == self.surface_id())
    }

    /// Ensure the wrapper holds exactly this modal's surface and return it.
    pub fn build_modal(&self) -> Result<P::Element, FeditError> {
        let platform = &self.platform;
        let wrapper = self.wrapper()?;
        let id = self.surface_id();
        if let Some(existing) = platform.query(&wrapper, &format!(".{SURFACE_CLASS}")) {
            if platform.id(&existing) == id {
                return Ok(existing);
            }
            debug!(resident = %platform.id(&existing), modal = %id, "replacing resident modal");
            platform.remove(&existing);
        }
        let surface = platform.create_element("div")?;
        platform.add_class(&surface, SURFACE_CLASS);
        platform.set_attribute(&surface, "id", &id);
        platform.append_child(&wrapper, &surface)?;
        Ok(surface)
    }

    pub fn surface(&self) -> Result<P::Element, FeditError> {
        self.build_modal()
    }

    pub fn open_modal(&self) -> Result<(), FeditError> {
        let wrapper = self.wrapper()?;
        self.platform.add_class(&wrapper, OPEN_CLASS);
        if let Some(on_open) = &self.options.on_open {
            on_open();
        }
        Ok(())
    }

    /// Hide the overlay and empty this modal's surface. The wrapper stays.
    ///
    /// When another modal has taken over the wrapper in the meantime its
    /// content and visibility are left alone.
    pub fn close_modal(&self) {
        if self.is_resident() || self.resident().is_none() {
            if let Some(body) = self.platform.body() {
                if let Some(wrapper) = self.platform.query(&body, &format!("#{WRAPPER_ID}")) {
                    self.platform.remove_class(&wrapper, OPEN_CLASS);
                }
            }
            if let Some(surface) = self.resident() {
                self.platform.set_inner_html(&surface, "");
            }
        }
        if let Some(on_close) = &self.options.on_close {
            on_close();
        }
    }

    /// Remove the overlay from the page entirely.
    pub fn destroy(&self) {
        if let Some(body) = self.platform.body() {
            if let Some(wrapper) = self.platform.query(&body, &format!("#{WRAPPER_ID}")) {
                self.platform.remove(&wrapper);
            }
        }
        if let Some(on_destroy) = &self.options.on_destroy {
            on_destroy();
        }
    }

    pub fn add_class(&self, class: &str) -> Result<(), FeditError> {
        let surface = self.surface()?;
        self.platform.add_class(&surface, class);
        Ok(())
    }

    pub fn remove_class(&self, class: &str) -> Result<(), FeditError> {
        let surface = self.surface()?;
        self.platform.remove_class(&surface, class);
        Ok(())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.resident()
            .filter(|surface| self.platform.id(surface) == self.surface_id())
            .is_some_and(|surface| self.platform.has_class(&surface, class))
    }

    pub fn inner_html(&self) -> Result<String, FeditError> {
        Ok(self.platform.inner_html(&self.surface()?))
    }

    pub fn set_inner_html(&self, html: &str) -> Result<(), FeditError> {
        self.platform.set_inner_html(&self.surface()?, html);
        Ok(())
    }

    pub fn set_style(&self, property: &str, value: &str) -> Result<(), FeditError> {
        self.platform.set_style(&self.surface()?, property, value);
        Ok(())
    }

    pub fn children(&self) -> Result<Vec<P::Element>, FeditError> {
        Ok(self.platform.children(&self.surface()?))
    }

    pub fn append_child(&self, child: &P::Element) -> Result<(), FeditError> {
        self.platform.append_child(&self.surface()?, child)
    }
}

/// A `×` button that runs `on_click`. Keep the subscription alive as long
/// as the button should work.
pub fn close_button<P: Dom>(
    platform: &P,
    on_click: Rc<dyn Fn()>,
) -> Result<(P::Element, P::Subscription), FeditError> {
    let button = platform.create_element("button")?;
    platform.set_inner_html(&button, "&times;");
    platform.add_class(&button, CLOSE_BUTTON_CLASS);
    let subscription = platform.on_click(&button, on_click);
    Ok((button, subscription))
}
