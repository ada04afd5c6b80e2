//! Capability facade handed to variants, behaviors and page scripts.

use std::rc::Rc;

use futures_channel::oneshot;
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use serde_json::{Map, Value};
use tracing::warn;

use crate::editor::{AJAX_HEADER, Editor};
use crate::error::FeditError;
use crate::events::{Listener, ListenerId};
use crate::platform::{EventDetail, HttpRequest, Method, Platform, RequestBody};
use crate::response::ServerResponse;

/// Body of an authenticated `fetch`.
#[derive(Debug, Clone)]
pub enum FetchBody<F> {
    Empty,
    Form(F),
    /// Sent as `application/json`.
    Json(Value),
}

pub struct EditorApi<P: Platform> {
    editor: Editor<P>,
}

impl<P: Platform> Clone for EditorApi<P> {
    fn clone(&self) -> Self {
        Self {
            editor: self.editor.clone(),
        }
    }
}

/// One-shot handle passed to an `update_html_with` callback.
pub struct HtmlSwap<P: Platform> {
    editor: Editor<P>,
    done: oneshot::Sender<Result<P::Element, FeditError>>,
}

impl<P: Platform> HtmlSwap<P> {
    pub fn element(&self) -> P::Element {
        self.editor.element()
    }

    /// Perform the swap and resolve the pending `update_html_with` future.
    /// Returns the new region node on success.
    pub fn apply(self, html: &str) -> Option<P::Element> {
        let result = self.editor.replace_region(html);
        let element = result.as_ref().ok().cloned();
        // The caller may have stopped waiting.
        let _ = self.done.send(result);
        element
    }
}

impl<P: Platform> EditorApi<P> {
    pub fn new(editor: Editor<P>) -> Self {
        Self { editor }
    }

    pub fn editor(&self) -> &Editor<P> {
        &self.editor
    }

    pub fn element(&self) -> P::Element {
        self.editor.element()
    }

    pub fn open_editor(&self) {
        self.editor.open();
    }

    pub fn close_editor(&self) {
        self.editor.close();
    }

    pub fn open_modal(&self) {
        self.editor.open();
    }

    pub fn close_modal(&self) {
        self.editor.close();
    }

    /// Replace the region with the first element of `html`.
    pub fn update_html(&self, html: &str) -> Result<P::Element, FeditError> {
        self.editor.replace_region(html)
    }

    /// Let `update` decide when the swap happens, e.g. after an animation.
    ///
    /// The future resolves with the new region node once `HtmlSwap::apply`
    /// runs, or with `SwapAbandoned` if the handle is dropped unused.
    pub fn update_html_with<F>(
        &self,
        update: F,
    ) -> LocalBoxFuture<'static, Result<P::Element, FeditError>>
    where
        F: FnOnce(HtmlSwap<P>),
    {
        let (done, applied) = oneshot::channel();
        update(HtmlSwap {
            editor: self.editor.clone(),
            done,
        });
        async move { applied.await.map_err(|_| FeditError::SwapAbandoned)? }.boxed_local()
    }

    pub fn refetch(&self) -> LocalBoxFuture<'static, Result<Option<ServerResponse>, FeditError>> {
        self.editor.refetch()
    }

    /// Run `f` with the API of every other region sharing this wrapper id.
    pub fn exec_related(&self, mut f: impl FnMut(EditorApi<P>)) {
        for related in self.editor.related() {
            f(related.api());
        }
    }

    /// Authenticated JSON request: CSRF token from the cookie, the ajax
    /// marker header, and a JSON-decoded response whatever the status.
    pub fn fetch(
        &self,
        url: &str,
        method: Method,
        body: FetchBody<P::FormData>,
    ) -> LocalBoxFuture<'static, Result<ServerResponse, FeditError>> {
        let platform = self.editor.platform();
        let config = self.editor.config();
        let body = match body {
            FetchBody::Empty => RequestBody::Empty,
            FetchBody::Form(form) => RequestBody::Form(form),
            FetchBody::Json(value) => RequestBody::Text(value.to_string()),
        };
        let json = matches!(body, RequestBody::Text(_));
        let mut request = HttpRequest {
            url: url.to_owned(),
            method,
            headers: Vec::new(),
            body,
        }
        .header(AJAX_HEADER.0, AJAX_HEADER.1);
        match platform.cookie(&config.csrf_cookie_name) {
            Some(token) => request = request.header(config.csrf_header_name.clone(), token),
            None => warn!(cookie = %config.csrf_cookie_name, "no CSRF token available"),
        }
        if json {
            request = request.header("Content-Type", "application/json");
        }
        self.editor.request(request)
    }

    pub fn add_event_listener(&self, name: &str, listener: Listener<P::Element>) -> ListenerId {
        let name = self.editor.config().namespaced(name);
        self.editor.add_listener(&name, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.editor.remove_listener(id)
    }

    /// Dispatch a custom event the same three ways lifecycle events go.
    pub fn dispatch_event(&self, name: &str, context: Map<String, Value>) {
        let name = self.editor.config().namespaced(name);
        self.editor.dispatch(&name, context);
    }

    pub fn on(
        &self,
        name: &str,
        f: impl Fn(&str, &EventDetail<P::Element>) + 'static,
    ) -> ListenerId {
        self.add_event_listener(name, Rc::new(f))
    }
}
