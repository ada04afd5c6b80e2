use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, ready};
use tracing::error;

use super::ResponseStrategy;
use crate::editor::Editor;
use crate::error::FeditError;
use crate::platform::{Platform, ResponseFunc};
use crate::response::ServerResponse;

/// Where a function-dispatch variant looks function names up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncSource {
    /// The registry's function table.
    Registry,
    /// Functions defined on the page's global object.
    Global,
}

/// Run a named page-side function against a target element.
///
/// The response names the function and a selector resolved against the whole
/// page. A missing name, target or function is logged and skipped.
#[derive(Debug, Clone, Copy)]
pub struct FuncDispatch {
    pub source: FuncSource,
}

impl FuncDispatch {
    pub fn registry() -> Self {
        Self {
            source: FuncSource::Registry,
        }
    }

    pub fn global() -> Self {
        Self {
            source: FuncSource::Global,
        }
    }

    fn lookup<P: Platform>(&self, editor: &Editor<P>, name: &str) -> Option<ResponseFunc<P>> {
        match self.source {
            FuncSource::Registry => {
                let registry = editor.page()?.registry().clone();
                let func = registry.borrow().func(name);
                func
            }
            FuncSource::Global => editor.platform().global_function(name),
        }
    }
}

impl<P: Platform> ResponseStrategy<P> for FuncDispatch {
    fn on_response(
        &self,
        editor: &Editor<P>,
        response: ServerResponse,
    ) -> LocalBoxFuture<'static, Result<(), FeditError>> {
        let call = response.func.clone().unwrap_or_default();
        let (Some(name), Some(target)) = (call.name, call.target) else {
            error!(region = %editor.region_id(), "response has no function name or target");
            return ready(Ok(())).boxed_local();
        };

        let platform = editor.platform().clone();
        let Some(element) = platform
            .body()
            .and_then(|body| platform.query(&body, &target))
        else {
            error!(%target, "function target not found");
            return ready(Ok(())).boxed_local();
        };

        let Some(func) = self.lookup(editor, &name) else {
            error!(%name, source = ?self.source, "function not found");
            return ready(Ok(())).boxed_local();
        };

        async move { func(&platform, &element, &response).await }.boxed_local()
    }
}

/// Set `url(<url>)` as a background image on the target.
///
/// The property is `css_variable_name` from the response when present, so a
/// template can route the image through a custom property.
pub fn background_image<P: Platform>() -> ResponseFunc<P> {
    Rc::new(|platform: &P, element: &P::Element, response: &ServerResponse| {
        let Some(url) = response.extra_str("url") else {
            return ready(Err(FeditError::MissingField("url"))).boxed_local();
        };
        let property = response
            .extra_str("css_variable_name")
            .filter(|name| !name.is_empty())
            .unwrap_or("background-image");
        platform.set_style(element, property, &format!("url({url})"));
        ready(Ok(())).boxed_local()
    })
}
