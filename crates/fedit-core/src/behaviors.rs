//! Composable region behaviors: re-ordering and adding siblings.
//!
//! Both end the same way on success: the nearest editable ancestor refetches
//! itself, or the page reloads when there is none.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures_util::FutureExt;
use tracing::{debug, error, warn};

use crate::api::FetchBody;
use crate::editor::{AJAX_HEADER, Editor, WeakEditor};
use crate::error::FeditError;
use crate::frame::{Frame, FrameCallbacks, FrameOptions};
use crate::markers::{ADD_BUTTON, MOVE_BUTTON, attr, frame::ADD_IFRAME_ID};
use crate::modal::{Modal, ModalOptions, close_button};
use crate::platform::{FrameSource, HttpRequest, Method, Platform, RequestBody};
use crate::variants::Behavior;

const MOVE_FAILED: &str = "Could not move the block.";
const ADD_FAILED: &str = "Could not add the block.";

/// Directional re-order buttons. Each POSTs to its `data-action-url`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Movable;

impl<P: Platform> Behavior<P> for Movable {
    fn bind(&self, editor: &Editor<P>) -> Vec<P::Subscription> {
        let platform = editor.platform();
        editor
            .owned(MOVE_BUTTON)
            .into_iter()
            .filter_map(|button| {
                let Some(url) = platform.attribute(&button, attr::ACTION_URL) else {
                    warn!(region = %editor.region_id(), "move button has no action url");
                    return None;
                };
                let weak = editor.downgrade();
                Some(platform.on_click(
                    &button,
                    Rc::new(move || {
                        if let Some(editor) = weak.upgrade() {
                            Movable::run(&editor, &url);
                        }
                    }),
                ))
            })
            .collect()
    }
}

impl Movable {
    fn run<P: Platform>(editor: &Editor<P>, path: &str) {
        let url = match editor.endpoint(path) {
            Ok(url) => url,
            Err(err) => {
                error!(%err, "invalid move url");
                editor.platform().alert(MOVE_FAILED);
                return;
            }
        };
        debug!(region = %editor.region_id(), %url, "moving region");
        let moved = editor.api().fetch(&url, Method::Post, FetchBody::Empty);
        let editor = editor.clone();
        editor.platform().clone().spawn_local(
            async move {
                match moved.await {
                    Ok(response) if response.success => editor.refetch_parent_or_reload(),
                    Ok(response) => {
                        warn!(error = ?response.error, "move rejected");
                        editor
                            .platform()
                            .alert(response.error.as_deref().unwrap_or(MOVE_FAILED));
                    }
                    Err(err) => {
                        error!(%err, "move request failed");
                        editor.platform().alert(MOVE_FAILED);
                    }
                }
            }
            .boxed_local(),
        );
    }
}

/// "Add sibling" button opening a creation form in its own modal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Addable;

/// An open creation form. Dropping it takes the form off the page, so a
/// region rebound while the form is open does not strand it.
struct AddSession<P: Platform> {
    modal: Modal<P>,
    frame: Frame<P>,
    closed: Cell<bool>,
    _close: P::Subscription,
}

impl<P: Platform> AddSession<P> {
    fn shut(&self) {
        if self.closed.replace(true) {
            return;
        }
        self.modal.close_modal();
        self.frame.destroy();
    }
}

impl<P: Platform> Drop for AddSession<P> {
    fn drop(&mut self) {
        self.shut();
    }
}

type SessionSlot<P> = Rc<RefCell<Option<AddSession<P>>>>;

impl<P: Platform> Behavior<P> for Addable {
    fn bind(&self, editor: &Editor<P>) -> Vec<P::Subscription> {
        let platform = editor.platform();
        let Some(button) = editor.owned(ADD_BUTTON).into_iter().next() else {
            warn!(region = %editor.region_id(), "addable region has no add button");
            return Vec::new();
        };
        let Some(url) = platform.attribute(&button, attr::ACTION_URL) else {
            warn!(region = %editor.region_id(), "add button has no action url");
            return Vec::new();
        };
        let slot: SessionSlot<P> = Rc::default();
        let weak = editor.downgrade();
        vec![platform.on_click(
            &button,
            Rc::new(move || {
                if let Some(editor) = weak.upgrade() {
                    if let Err(err) = Addable::open(&editor, &url, &slot) {
                        error!(%err, "could not open add form");
                        Addable::close(&editor, &slot);
                    }
                }
            }),
        )]
    }
}

impl Addable {
    fn open<P: Platform>(
        editor: &Editor<P>,
        path: &str,
        slot: &SessionSlot<P>,
    ) -> Result<(), FeditError> {
        if slot.borrow().is_some() {
            return Ok(());
        }
        let platform = editor.platform();
        let url = editor.endpoint(path)?;
        let modal = Modal::new(
            platform.clone(),
            ModalOptions::new(format!("{}-add", editor.region_id())),
        );
        modal.build_modal()?;

        let weak_slot = Rc::downgrade(slot);
        let frame = Frame::new(
            platform.clone(),
            FrameOptions {
                id: ADD_IFRAME_ID.to_owned(),
                class_name: None,
                source: FrameSource::Url(url.clone()),
                execute_onload_immediately: true,
                resize_poll_ms: editor.config().resize_poll_interval_ms,
            },
            Self::callbacks(editor.downgrade(), weak_slot, url),
        )?;
        if let Some(element) = frame.element() {
            modal.append_child(&element)?;
        }

        let (editor_weak, slot_weak) = (editor.downgrade(), Rc::downgrade(slot));
        let (button, close) = close_button(
            &**platform,
            Rc::new(move || {
                if let (Some(editor), Some(slot)) = (editor_weak.upgrade(), slot_weak.upgrade()) {
                    Addable::close(&editor, &slot);
                }
            }),
        )?;
        modal.append_child(&button)?;
        modal.open_modal()?;
        *slot.borrow_mut() = Some(AddSession {
            modal,
            frame,
            closed: Cell::new(false),
            _close: close,
        });
        Ok(())
    }

    fn callbacks<P: Platform>(
        editor: WeakEditor<P>,
        slot: Weak<RefCell<Option<AddSession<P>>>>,
        url: String,
    ) -> FrameCallbacks<P::FormData> {
        let closer = {
            let (editor, slot) = (editor.clone(), slot.clone());
            Rc::new(move || {
                if let (Some(editor), Some(slot)) = (editor.upgrade(), slot.upgrade()) {
                    Addable::close(&editor, &slot);
                }
            }) as Rc<dyn Fn()>
        };
        let loaded = slot.clone();
        FrameCallbacks {
            on_load: Some(Rc::new(move || {
                let frame = loaded
                    .upgrade()
                    .and_then(|slot| slot.borrow().as_ref().map(|s| s.frame.clone()));
                if let Some(frame) = frame {
                    if !frame.bind_form() {
                        warn!("add form not found in embedded document");
                    }
                }
            })),
            on_error: Some(closer.clone()),
            on_cancel: Some(closer),
            on_resize: None,
            on_submit: Some(Rc::new(move |form| {
                if let (Some(editor), Some(slot)) = (editor.upgrade(), slot.upgrade()) {
                    Addable::submit(&editor, &slot, &url, form);
                }
            })),
        }
    }

    fn submit<P: Platform>(editor: &Editor<P>, slot: &SessionSlot<P>, url: &str, form: P::FormData) {
        let request = HttpRequest::post(url, RequestBody::Form(form))
            .header(AJAX_HEADER.0, AJAX_HEADER.1);
        let sent = editor.request(request);
        let (editor, slot) = (editor.clone(), slot.clone());
        editor.platform().clone().spawn_local(
            async move {
                match sent.await {
                    Ok(response) if response.success => {
                        Addable::close(&editor, &slot);
                        editor.refetch_parent_or_reload();
                    }
                    Ok(response) => {
                        let frame = slot.borrow().as_ref().map(|s| s.frame.clone());
                        match (frame, response.html.as_deref()) {
                            (Some(frame), Some(html)) => {
                                if let Err(err) = frame.redisplay(html) {
                                    error!(%err, "could not redisplay add form");
                                }
                            }
                            _ => editor.platform().alert(ADD_FAILED),
                        }
                    }
                    Err(err) => {
                        error!(%err, "add request failed");
                        editor.platform().alert(ADD_FAILED);
                    }
                }
            }
            .boxed_local(),
        );
    }

    fn close<P: Platform>(editor: &Editor<P>, slot: &SessionSlot<P>) {
        let session = slot.borrow_mut().take();
        if let Some(session) = session {
            session.shut();
            editor.release(session);
        }
    }
}
