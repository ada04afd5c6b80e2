//! The per-region editor state machine.
//!
//! ```text
//! Idle -> Opening -> Open <-> SubmitPending
//!   ^________|_________|__________|   (close / cancel / load error)
//! ```
//!
//! Every route back to `Idle` goes through `close`, which restores history
//! and title before anything else is torn down.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::api::EditorApi;
use crate::config::FeditConfig;
use crate::error::FeditError;
use crate::events::{EditorEvent, EventListeners, Listener, ListenerId};
use crate::frame::{Frame, FrameCallbacks, FrameOptions};
use crate::markers::{
    self, ADAPTER_WRAPPER, EDIT_BUTTON, INITIALIZED_CLASS, SIZE_VARIANTS, attr,
    frame::{FORM, FORM_BUTTONS, FORM_WRAPPER, IFRAME_ID},
};
use crate::modal::{Modal, ModalOptions, close_button};
use crate::page::{Page, PageInner};
use crate::platform::{
    EventDetail, FrameSource, FrameSurface, HttpRequest, InstanceId, Platform, RequestBody,
};
use crate::region::RegionAttrs;
use crate::response::ServerResponse;
use crate::url::{endpoint_url, fragment, without_fragment};
use crate::variants::{Presentation, VariantSpec, positioned};

pub(crate) const AJAX_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    /// Edit trigger clicked, frame loading.
    Opening,
    /// Form loaded and interactive.
    Open,
    /// A submission is in flight.
    SubmitPending,
}

#[derive(Debug, Clone)]
struct HistorySnapshot {
    url: String,
    title: String,
}

pub struct Editor<P: Platform> {
    inner: Rc<EditorInner<P>>,
}

impl<P: Platform> Clone for Editor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct WeakEditor<P: Platform>(Weak<EditorInner<P>>);

impl<P: Platform> Clone for WeakEditor<P> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<P: Platform> WeakEditor<P> {
    pub fn upgrade(&self) -> Option<Editor<P>> {
        self.0.upgrade().map(|inner| Editor { inner })
    }
}

struct EditorInner<P: Platform> {
    id: InstanceId,
    platform: Rc<P>,
    config: Rc<FeditConfig>,
    page: Weak<PageInner<P>>,
    variant: VariantSpec<P>,
    element: RefCell<P::Element>,
    attrs: RefCell<RegionAttrs>,
    state: Cell<EditorState>,
    initial_title: String,
    snapshot: RefCell<Option<HistorySnapshot>>,
    frame: RefCell<Option<Frame<P>>>,
    modal: RefCell<Option<Rc<Modal<P>>>>,
    close_binding: RefCell<Option<P::Subscription>>,
    bindings: RefCell<Vec<P::Subscription>>,
    listeners: EventListeners<P::Element>,
}

impl<P: Platform> Editor<P> {
    /// Take ownership of a region node. Opens immediately when the page
    /// location's fragment names this region.
    pub fn new(
        page: &Page<P>,
        id: InstanceId,
        element: P::Element,
        variant: VariantSpec<P>,
    ) -> Result<Self, FeditError> {
        let platform = page.platform().clone();
        let attrs = RegionAttrs::read(&*platform, &element)?;
        platform.attach_instance(&element, id);

        let editor = Self {
            inner: Rc::new(EditorInner {
                id,
                initial_title: platform.title(),
                config: page.config().clone(),
                page: page.downgrade(),
                variant,
                element: RefCell::new(element),
                attrs: RefCell::new(attrs),
                state: Cell::new(EditorState::Idle),
                snapshot: RefCell::new(None),
                frame: RefCell::new(None),
                modal: RefCell::new(None),
                close_binding: RefCell::new(None),
                bindings: RefCell::new(Vec::new()),
                listeners: EventListeners::default(),
                platform,
            }),
        };
        editor.init();

        let region_id = editor.region_id();
        let location = editor.platform().location();
        if !region_id.is_empty() && fragment(&location) == Some(region_id.as_str()) {
            info!(region = %region_id, "opening editor from location fragment");
            editor.open();
            editor.focus();
        }
        Ok(editor)
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn region_id(&self) -> String {
        self.inner.attrs.borrow().id.clone()
    }

    pub fn element(&self) -> P::Element {
        self.inner.element.borrow().clone()
    }

    pub fn attrs(&self) -> RegionAttrs {
        self.inner.attrs.borrow().clone()
    }

    pub fn state(&self) -> EditorState {
        self.inner.state.get()
    }

    pub fn platform(&self) -> &Rc<P> {
        &self.inner.platform
    }

    pub fn config(&self) -> &FeditConfig {
        &self.inner.config
    }

    pub fn variant(&self) -> &VariantSpec<P> {
        &self.inner.variant
    }

    pub fn page(&self) -> Option<Page<P>> {
        self.inner.page.upgrade().map(Page::from_inner)
    }

    pub fn frame(&self) -> Option<Frame<P>> {
        self.inner.frame.borrow().clone()
    }

    pub fn modal(&self) -> Option<Rc<Modal<P>>> {
        self.inner.modal.borrow().clone()
    }

    pub fn api(&self) -> EditorApi<P> {
        EditorApi::new(self.clone())
    }

    pub fn downgrade(&self) -> WeakEditor<P> {
        WeakEditor(Rc::downgrade(&self.inner))
    }

    pub fn focus(&self) {
        self.inner.platform.focus(&self.element());
    }

    pub(crate) fn set_frame(&self, frame: Option<Frame<P>>) -> Option<Frame<P>> {
        self.inner.frame.replace(frame)
    }

    /// Drop `value` on the next turn of the event loop.
    ///
    /// Used for handles whose callbacks may be on the stack right now.
    pub(crate) fn release<T: 'static>(&self, value: T) {
        self.inner
            .platform
            .spawn_local(async move { drop(value) }.boxed_local());
    }

    /// Elements matching `selector` that belong to this region and not to a
    /// nested one.
    pub fn owned(&self, selector: &str) -> Vec<P::Element> {
        let platform = &self.inner.platform;
        let region = self.element();
        platform
            .query_all(&region, selector)
            .into_iter()
            .filter(|el| platform.closest(el, ADAPTER_WRAPPER).as_ref() == Some(&region))
            .collect()
    }

    /// Rebind the edit trigger and every behavior on the current node.
    pub fn init(&self) {
        let platform = &self.inner.platform;
        let mut bindings = Vec::new();
        match self.owned(EDIT_BUTTON).into_iter().next() {
            Some(button) => {
                let weak = self.downgrade();
                bindings.push(platform.on_click(
                    &button,
                    Rc::new(move || {
                        if let Some(editor) = weak.upgrade() {
                            if editor.state() == EditorState::Idle {
                                editor.open();
                            }
                        }
                    }),
                ));
            }
            None => warn!(region = %self.region_id(), "region has no edit button"),
        }
        for behavior in &self.inner.variant.behaviors {
            bindings.extend(behavior.bind(self));
        }
        let old = self.inner.bindings.replace(bindings);
        drop(old);
    }

    /// Resolve one of this region's endpoint paths against the page URL.
    pub fn endpoint(&self, path: &str) -> Result<String, FeditError> {
        let shared_context = self.inner.attrs.borrow().shared_context.clone();
        endpoint_url(
            &self.inner.platform.location(),
            path,
            shared_context.as_deref(),
            &self.inner.config.shared_context_param,
        )
    }

    pub fn edit_url(&self) -> Result<String, FeditError> {
        let path = self.inner.attrs.borrow().edit_url.clone();
        self.endpoint(&path)
    }

    pub fn open(&self) {
        let inner = &self.inner;
        if inner.state.get() != EditorState::Idle {
            debug!(region = %self.region_id(), state = ?inner.state.get(), "editor already open");
            return;
        }
        inner.state.set(EditorState::Opening);
        *inner.snapshot.borrow_mut() = Some(HistorySnapshot {
            url: inner.platform.location(),
            title: inner.platform.title(),
        });
        debug!(region = %self.region_id(), "opening editor");

        let opened = match inner.variant.presentation {
            Presentation::Modal => self.open_modal(),
            Presentation::InPlace => positioned::open(self),
        };
        match opened {
            Ok(()) => self.emit(EditorEvent::EditorOpen, Map::new()),
            Err(err) => {
                error!(region = %self.region_id(), %err, "failed to open editor");
                self.close();
            }
        }
    }

    fn open_modal(&self) -> Result<(), FeditError> {
        let inner = &self.inner;
        let modal = inner
            .modal
            .borrow_mut()
            .get_or_insert_with(|| {
                Rc::new(Modal::new(
                    inner.platform.clone(),
                    ModalOptions::new(format!("{}-modal", self.region_id())),
                ))
            })
            .clone();
        modal.build_modal()?;

        let frame = self.create_frame()?;
        self.set_frame(Some(frame.clone()));
        if let Some(element) = frame.element() {
            modal.append_child(&element)?;
        }

        let weak = self.downgrade();
        let (button, subscription) = close_button(
            &*inner.platform,
            Rc::new(move || {
                if let Some(editor) = weak.upgrade() {
                    editor.close();
                }
            }),
        )?;
        modal.append_child(&button)?;
        if let Some(old) = inner.close_binding.replace(Some(subscription)) {
            self.release(old);
        }
        modal.open_modal()
    }

    pub(crate) fn create_frame(&self) -> Result<Frame<P>, FeditError> {
        let tuning = self.inner.variant.frame_tuning();
        let options = FrameOptions {
            id: IFRAME_ID.to_owned(),
            class_name: tuning.class_name,
            source: FrameSource::Url(self.edit_url()?),
            execute_onload_immediately: tuning.execute_onload_immediately,
            resize_poll_ms: self.inner.config.resize_poll_interval_ms,
        };

        let on_load = self.downgrade();
        let on_error = self.downgrade();
        let on_cancel = self.downgrade();
        let on_submit = self.downgrade();
        let on_resize = self.downgrade();
        let callbacks = FrameCallbacks {
            on_load: Some(Rc::new(move || {
                if let Some(editor) = on_load.upgrade() {
                    editor.frame_loaded();
                }
            })),
            on_error: Some(Rc::new(move || {
                if let Some(editor) = on_error.upgrade() {
                    warn!(region = %editor.region_id(), "edit form failed to load");
                    editor.close();
                }
            })),
            on_cancel: Some(Rc::new(move || {
                if let Some(editor) = on_cancel.upgrade() {
                    editor.close();
                }
            })),
            on_submit: Some(Rc::new(move |form| {
                if let Some(editor) = on_submit.upgrade() {
                    editor.submit(form);
                }
            })),
            on_resize: tuning.auto_resize.then(|| {
                Rc::new(move |_old: f64, new: f64| {
                    if let Some(frame) = on_resize.upgrade().and_then(|e| e.frame()) {
                        frame.set_height(new);
                    }
                }) as Rc<dyn Fn(f64, f64)>
            }),
        };
        Frame::new(self.inner.platform.clone(), options, callbacks)
    }

    fn frame_loaded(&self) {
        let inner = &self.inner;
        let Some(frame) = self.frame() else {
            return;
        };
        if inner.state.get() == EditorState::Idle {
            return;
        }
        if !frame.bind_form() {
            warn!(region = %self.region_id(), "edit form not found in embedded document");
        }
        self.apply_size(&frame);

        let title = frame.title().unwrap_or_default();
        let location = inner.platform.location();
        let url = format!("{}#{}", without_fragment(&location), self.region_id());
        inner.platform.push_state(&title, &url);
        inner.platform.set_title(&title);

        if inner.variant.presentation == Presentation::InPlace {
            match frame.form_height() {
                Ok(height) => frame.set_height(height),
                Err(err) => debug!(%err, "could not measure edit form"),
            }
        }
        inner.state.set(EditorState::Open);
        self.emit(EditorEvent::EditorLoad, Map::new());
    }

    fn size_target(&self) -> Option<P::Element> {
        match self.inner.variant.presentation {
            Presentation::Modal => self.modal().and_then(|modal| modal.surface().ok()),
            Presentation::InPlace => positioned::size_target(self),
        }
    }

    /// Server hints win; otherwise a form taller than the viewport goes full.
    fn apply_size(&self, frame: &Frame<P>) {
        let platform = &self.inner.platform;
        let (Some(target), Some(surface)) = (self.size_target(), frame.surface()) else {
            return;
        };
        for variant in SIZE_VARIANTS {
            platform.remove_class(&target, &format!("fedit-{variant}"));
        }

        let declared = surface
            .attribute(FORM, attr::EDITOR_SIZE)
            .map(|size| size.to_lowercase());
        let hinted = SIZE_VARIANTS.into_iter().find(|variant| {
            let class = format!("fedit-{variant}");
            surface.has_class(FORM_WRAPPER, &class)
                || surface.has_class(FORM_BUTTONS, &class)
                || declared.as_deref() == Some(*variant)
        });
        let size = hinted.or_else(|| {
            let height = frame.form_height().ok()?;
            (height > platform.viewport_height()).then_some("full")
        });
        if let Some(size) = size {
            debug!(region = %self.region_id(), size, "applying editor size");
            platform.add_class(&target, &format!("fedit-{size}"));
        }
    }

    fn submit(&self, form: P::FormData) {
        let inner = &self.inner;
        if inner.state.get() != EditorState::Open {
            debug!(region = %self.region_id(), state = ?inner.state.get(), "submit ignored");
            return;
        }
        inner.state.set(EditorState::SubmitPending);
        self.emit(EditorEvent::Submit, Map::new());

        let url = match self.edit_url() {
            Ok(url) => url,
            Err(err) => {
                self.submit_failed(err);
                return;
            }
        };
        let request = HttpRequest::post(url, RequestBody::Form(form))
            .header(AJAX_HEADER.0, AJAX_HEADER.1);
        let response = self.request(request);
        let editor = self.clone();
        inner.platform.spawn_local(
            async move {
                match response.await {
                    Ok(response) if response.success => editor.submit_succeeded(response).await,
                    Ok(response) => editor.submit_rejected(response),
                    Err(err) => editor.submit_failed(err),
                }
            }
            .boxed_local(),
        );
    }

    async fn submit_succeeded(&self, response: ServerResponse) {
        let applied = self
            .inner
            .variant
            .strategy
            .on_response(self, response)
            .await;
        if let Err(err) = applied {
            error!(region = %self.region_id(), %err, "failed to apply edit to page");
        }
        if self.state() != EditorState::Idle {
            self.close();
        }
        self.emit(EditorEvent::Change, Map::new());
    }

    /// Validation failure: redisplay the form, keep the session.
    fn submit_rejected(&self, response: ServerResponse) {
        warn!(
            region = %self.region_id(),
            locked = response.is_locked(),
            errors = ?response.errors,
            "submission rejected"
        );
        if let (Some(frame), Some(html)) = (self.frame(), response.html.as_deref()) {
            if let Err(err) = frame.redisplay(html) {
                error!(%err, "could not redisplay edit form");
            }
        }
        self.back_to_open();
        let mut context = Map::new();
        context.insert("response".into(), response.to_value());
        self.emit(EditorEvent::SubmitError, context);
    }

    fn submit_failed(&self, err: FeditError) {
        error!(region = %self.region_id(), %err, "submission failed");
        self.inner
            .platform
            .alert("Your changes could not be saved. Please try again.");
        self.back_to_open();
        let mut context = Map::new();
        context.insert("error".into(), Value::String(err.to_string()));
        self.emit(EditorEvent::SubmitError, context);
    }

    fn back_to_open(&self) {
        if self.state() == EditorState::SubmitPending {
            self.inner.state.set(EditorState::Open);
        }
    }

    /// Return to `Idle`. Every close route converges here.
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.state.get() == EditorState::Idle && self.frame().is_none() {
            return;
        }

        let snapshot = inner.snapshot.borrow_mut().take();
        let (url, title) = match snapshot {
            Some(snapshot) => (snapshot.url, snapshot.title),
            None => (
                without_fragment(&inner.platform.location()).to_owned(),
                inner.initial_title.clone(),
            ),
        };
        if inner.platform.location() != url {
            inner.platform.push_state(&title, &url);
        }
        inner.platform.set_title(&title);
        inner.state.set(EditorState::Idle);
        debug!(region = %self.region_id(), "editor closed");
        self.emit(EditorEvent::EditorClose, Map::new());

        match inner.variant.presentation {
            Presentation::Modal => {
                if let Some(binding) = inner.close_binding.borrow_mut().take() {
                    self.release(binding);
                }
                if let Some(modal) = self.modal() {
                    modal.close_modal();
                }
                if let Some(frame) = self.set_frame(None) {
                    frame.destroy();
                    self.release(frame);
                }
            }
            Presentation::InPlace => positioned::close(self),
        }
    }

    /// Deliver a lifecycle event to instance listeners, the region element
    /// and the document, in that order.
    pub fn emit(&self, event: EditorEvent, context: Map<String, Value>) {
        let name = self.inner.config.event_name(event);
        self.dispatch(&name, context);
    }

    pub fn dispatch(&self, name: &str, context: Map<String, Value>) {
        let element = self.element();
        let detail = EventDetail {
            element: element.clone(),
            instance: self.inner.id,
            context,
        };
        self.inner.listeners.notify(name, &detail);
        self.inner.platform.dispatch(Some(&element), name, &detail);
        self.inner.platform.dispatch(None, name, &detail);
    }

    pub fn add_listener(&self, name: &str, listener: Listener<P::Element>) -> ListenerId {
        self.inner.listeners.add(name, listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Swap the region node for the first element of `html`.
    ///
    /// The new node is inserted before the old one, which is then removed;
    /// discovery runs on the new node and this editor rebinds to it.
    pub fn replace_region(&self, html: &str) -> Result<P::Element, FeditError> {
        let platform = &self.inner.platform;
        let fresh = platform
            .parse_fragment(html)
            .ok_or(FeditError::EmptyFragment)?;
        let old = self.element();

        platform.add_class(&fresh, INITIALIZED_CLASS);
        platform.insert_before(&fresh, &old)?;
        platform.remove(&old);
        platform.detach_instance(&old);
        platform.attach_instance(&fresh, self.inner.id);

        match RegionAttrs::read(&**platform, &fresh) {
            Ok(attrs) => *self.inner.attrs.borrow_mut() = attrs,
            Err(err) => {
                debug!(%err, "replacement node keeps previous endpoints");
                self.inner.attrs.borrow_mut().id = platform.id(&fresh);
            }
        }
        *self.inner.element.borrow_mut() = fresh.clone();

        if let Some(page) = self.page() {
            page.init_new_editors(&fresh);
        }
        self.init();
        Ok(fresh)
    }

    /// Other live editors sharing this region's wrapper id.
    pub fn related(&self) -> Vec<Editor<P>> {
        let platform = &self.inner.platform;
        let (Some(group), Some(body), Some(page)) = (
            self.inner.attrs.borrow().wrapper_id.clone(),
            platform.body(),
            self.page(),
        ) else {
            return Vec::new();
        };
        let element = self.element();
        platform
            .query_all(&body, &markers::attr_selector(attr::WRAPPER_ID, &group))
            .into_iter()
            .filter(|el| *el != element)
            .filter_map(|el| platform.instance_of(&el))
            .filter_map(|id| page.editor(id))
            .collect()
    }

    /// Re-render this region from its refetch endpoint.
    ///
    /// Resolves to `None` when the server reports failure; the page is left
    /// untouched in that case.
    pub fn refetch(&self) -> LocalBoxFuture<'static, Result<Option<ServerResponse>, FeditError>> {
        let editor = self.clone();
        async move {
            let attrs = editor.attrs();
            let path = attrs
                .refetch_url
                .ok_or_else(|| FeditError::NoRefetchUrl(attrs.id.clone()))?;
            let url = editor.endpoint(&path)?;
            debug!(region = %attrs.id, %url, "refetching region");
            let response = editor
                .request(HttpRequest::get(url).header(AJAX_HEADER.0, AJAX_HEADER.1))
                .await?;
            if !response.success {
                error!(region = %attrs.id, errors = ?response.errors, "refetch failed to render");
                return Ok(None);
            }
            editor
                .inner
                .variant
                .strategy
                .on_response(&editor, response.clone())
                .await?;
            Ok(Some(response))
        }
        .boxed_local()
    }

    /// Refetch the nearest initialized ancestor region, or reload the page
    /// when there is none.
    pub fn refetch_parent_or_reload(&self) {
        let platform = &self.inner.platform;
        let body = platform.body();
        let page = self.page();
        let mut cursor = platform.parent(&self.element());
        while let Some(node) = cursor {
            if Some(&node) == body.as_ref() {
                break;
            }
            if platform.has_class(&node, INITIALIZED_CLASS) {
                let parent = platform
                    .instance_of(&node)
                    .and_then(|id| page.as_ref()?.editor(id));
                if let Some(parent) = parent {
                    debug!(region = %self.region_id(), parent = %parent.region_id(), "refetching parent region");
                    let refetch = parent.refetch();
                    platform.spawn_local(
                        async move {
                            if let Err(err) = refetch.await {
                                error!(%err, "parent refetch failed");
                            }
                        }
                        .boxed_local(),
                    );
                    return;
                }
            }
            cursor = platform.parent(&node);
        }
        info!(region = %self.region_id(), "no editable ancestor, reloading page");
        platform.reload();
    }

    /// One JSON exchange. The body is parsed whatever the status, since
    /// validation failures arrive as 400 or 423 with a JSON body.
    pub(crate) fn request(
        &self,
        request: HttpRequest<P::FormData>,
    ) -> LocalBoxFuture<'static, Result<ServerResponse, FeditError>> {
        let sent = self.inner.platform.send(request);
        async move {
            let response = sent.await?;
            ServerResponse::from_json(&response.body)
        }
        .boxed_local()
    }
}
