//! Editor variants: what a successful edit does to the page, and how the
//! editor is presented.
//!
//! A variant is a `ResponseStrategy` (the success hook) plus a
//! `Presentation` plus any number of `Behavior`s composed at construction.

mod func;
pub(crate) mod positioned;
mod replace;

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;

pub use func::{FuncDispatch, FuncSource, background_image};
pub use replace::ReplaceInPlace;

use crate::editor::Editor;
use crate::error::FeditError;
use crate::platform::{Dom, Platform};
use crate::response::ServerResponse;

/// Where the edit form is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// A frame inside the page-level overlay.
    Modal,
    /// A frame inside the region's own form slot, replacing its content
    /// while open. Always auto-resizes.
    InPlace,
}

/// Per-variant adjustments to the frame an editor opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTuning {
    pub class_name: Option<String>,
    pub execute_onload_immediately: bool,
    pub auto_resize: bool,
}

impl Default for FrameTuning {
    fn default() -> Self {
        Self {
            class_name: None,
            execute_onload_immediately: true,
            auto_resize: false,
        }
    }
}

/// The success hook of a variant.
///
/// Runs after a successful submission and after a successful refetch. The
/// editor closes only once the returned future settles, so the page is
/// updated before `change` listeners hear about it.
pub trait ResponseStrategy<P: Platform> {
    fn on_response(
        &self,
        editor: &Editor<P>,
        response: ServerResponse,
    ) -> LocalBoxFuture<'static, Result<(), FeditError>>;

    fn frame_tuning(&self) -> FrameTuning {
        FrameTuning::default()
    }
}

/// Extra bindings layered onto a region, re-run whenever the region node is
/// replaced.
pub trait Behavior<P: Platform> {
    fn bind(&self, editor: &Editor<P>) -> Vec<<P as Dom>::Subscription>;
}

pub struct VariantSpec<P: Platform> {
    pub strategy: Rc<dyn ResponseStrategy<P>>,
    pub presentation: Presentation,
    pub behaviors: Vec<Rc<dyn Behavior<P>>>,
}

impl<P: Platform> Clone for VariantSpec<P> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
            presentation: self.presentation,
            behaviors: self.behaviors.clone(),
        }
    }
}

impl<P: Platform> VariantSpec<P> {
    pub fn new(strategy: Rc<dyn ResponseStrategy<P>>, presentation: Presentation) -> Self {
        Self {
            strategy,
            presentation,
            behaviors: Vec::new(),
        }
    }

    pub fn modal(strategy: impl ResponseStrategy<P> + 'static) -> Self {
        Self::new(Rc::new(strategy), Presentation::Modal)
    }

    pub fn in_place(strategy: impl ResponseStrategy<P> + 'static) -> Self {
        Self::new(Rc::new(strategy), Presentation::InPlace)
    }

    pub fn with_behavior(mut self, behavior: impl Behavior<P> + 'static) -> Self {
        self.behaviors.push(Rc::new(behavior));
        self
    }

    pub fn frame_tuning(&self) -> FrameTuning {
        let mut tuning = self.strategy.frame_tuning();
        if self.presentation == Presentation::InPlace {
            tuning.auto_resize = true;
        }
        tuning
    }
}
