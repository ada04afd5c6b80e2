//! Frame controller: one embedded edit document and its lifecycle.
//!
//! The controller owns the current `FrameSurface`, turns the signals it
//! reports into the caller's callbacks, and runs the optional auto-resize
//! poll. `update` loads a replacement surface next to the current one and
//! swaps them only once the replacement has loaded.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::error::FeditError;
use crate::markers::frame as sel;
use crate::platform::{FrameSignal, FrameSink, FrameSource, FrameSurface, Platform};

/// Static shape of an embedded document.
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub id: String,
    pub class_name: Option<String>,
    pub source: FrameSource,
    /// Fire `on_load` straight from the load event instead of waiting for
    /// the document's own ready signal.
    pub execute_onload_immediately: bool,
    pub resize_poll_ms: u32,
}

impl FrameOptions {
    pub fn new(id: impl Into<String>, source: FrameSource) -> Self {
        Self {
            id: id.into(),
            class_name: None,
            source,
            execute_onload_immediately: false,
            resize_poll_ms: 25,
        }
    }
}

/// Callbacks a frame reports to. `on_resize` also enables the height poll.
pub struct FrameCallbacks<F> {
    pub on_load: Option<Rc<dyn Fn()>>,
    pub on_error: Option<Rc<dyn Fn()>>,
    pub on_cancel: Option<Rc<dyn Fn()>>,
    pub on_resize: Option<Rc<dyn Fn(f64, f64)>>,
    pub on_submit: Option<Rc<dyn Fn(F)>>,
}

impl<F> Default for FrameCallbacks<F> {
    fn default() -> Self {
        Self {
            on_load: None,
            on_error: None,
            on_cancel: None,
            on_resize: None,
            on_submit: None,
        }
    }
}

pub struct Frame<P: Platform> {
    inner: Rc<FrameInner<P>>,
}

impl<P: Platform> Clone for Frame<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Loaded<S> {
    generation: u64,
    surface: Rc<S>,
}

struct FrameInner<P: Platform> {
    platform: Rc<P>,
    options: RefCell<FrameOptions>,
    current: RefCell<Option<Loaded<P::Surface>>>,
    pending: RefCell<Option<Loaded<P::Surface>>>,
    next_generation: Cell<u64>,
    callbacks: FrameCallbacks<P::FormData>,
    poll: RefCell<Option<P::Interval>>,
    last_height: Cell<f64>,
    awaiting_ready: Cell<bool>,
    destroyed: Cell<bool>,
}

impl<P: Platform> Frame<P> {
    /// Create the embedded document element. It starts loading once the
    /// caller inserts `element()` into the page.
    pub fn new(
        platform: Rc<P>,
        options: FrameOptions,
        callbacks: FrameCallbacks<P::FormData>,
    ) -> Result<Self, FeditError> {
        let source = options.source.clone();
        let inner = Rc::new(FrameInner {
            platform,
            options: RefCell::new(options),
            current: RefCell::new(None),
            pending: RefCell::new(None),
            next_generation: Cell::new(0),
            callbacks,
            poll: RefCell::new(None),
            last_height: Cell::new(0.0),
            awaiting_ready: Cell::new(false),
            destroyed: Cell::new(false),
        });
        let loaded = FrameInner::create_surface(&inner, &source)?;
        *inner.current.borrow_mut() = Some(loaded);
        Ok(Self { inner })
    }

    /// Host-side element of the current document.
    pub fn element(&self) -> Option<P::Element> {
        self.inner.surface().map(|surface| surface.element())
    }

    pub fn surface(&self) -> Option<Rc<P::Surface>> {
        self.inner.surface()
    }

    pub fn source(&self) -> FrameSource {
        self.inner.options.borrow().source.clone()
    }

    pub fn title(&self) -> Option<String> {
        self.inner.surface().and_then(|surface| surface.title())
    }

    /// Route the edit form's submissions to `on_submit`.
    pub fn bind_form(&self) -> bool {
        self.inner
            .surface()
            .is_some_and(|surface| surface.bind_submit(sel::FORM))
    }

    pub fn form_height(&self) -> Result<f64, FeditError> {
        self.inner
            .surface()
            .ok_or(FeditError::FrameInaccessible)?
            .content_height(sel::FORM)
    }

    pub fn set_height(&self, px: f64) {
        if let Some(surface) = self.inner.surface() {
            surface.set_height(px);
        }
    }

    /// Show a rejected submission: swap the main content for the one in
    /// `html` and rebind everything that lived inside it.
    pub fn redisplay(&self, html: &str) -> Result<(), FeditError> {
        let surface = self.inner.surface().ok_or(FeditError::FrameInaccessible)?;
        surface.replace_section(sel::MAIN, html)?;
        if !surface.bind_submit(sel::FORM) {
            warn!("redisplayed document has no edit form");
        }
        if surface.init_widget(sel::UNINITIALIZED_BLOCK) {
            debug!("initialised nested block widget");
        }
        surface.bind_cancel(sel::CANCEL_BUTTON);
        Ok(())
    }

    /// Load `source` into a fresh document placed next to the current one.
    ///
    /// The old element stays visible until the new one reports `Load`, then
    /// the two are swapped and `on_load` runs again.
    pub fn update(&self, source: FrameSource) -> Result<(), FeditError> {
        let inner = &self.inner;
        if inner.destroyed.get() {
            return Ok(());
        }
        let current = inner.surface().ok_or(FeditError::FrameInaccessible)?;
        let loaded = FrameInner::create_surface(inner, &source)?;
        let element = loaded.surface.element();
        inner.platform.set_style(&element, "display", "none");
        inner.platform.insert_before(&element, &current.element())?;
        if let Some(stale) = inner.pending.borrow_mut().replace(loaded) {
            inner.platform.remove(&stale.surface.element());
        }
        inner.options.borrow_mut().source = source;
        Ok(())
    }

    /// Remove the document and stop polling. Safe to call repeatedly.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }
        inner.stop_poll();
        let current = inner.current.borrow().as_ref().map(|l| l.surface.clone());
        let pending = inner.pending.borrow_mut().take();
        if let Some(surface) = current {
            inner.platform.remove(&surface.element());
        }
        if let Some(pending) = pending {
            inner.platform.remove(&pending.surface.element());
        }
    }
}

impl<P: Platform> FrameInner<P> {
    fn surface(&self) -> Option<Rc<P::Surface>> {
        self.current.borrow().as_ref().map(|l| l.surface.clone())
    }

    fn create_surface(
        this: &Rc<Self>,
        source: &FrameSource,
    ) -> Result<Loaded<P::Surface>, FeditError> {
        let generation = this.next_generation.get();
        this.next_generation.set(generation + 1);

        let weak = Rc::downgrade(this);
        let sink: FrameSink<P::FormData> = Rc::new(move |signal| {
            if let Some(inner) = weak.upgrade() {
                FrameInner::handle(&inner, generation, signal);
            }
        });
        let options = this.options.borrow().clone();
        let surface = this.platform.create_frame(
            source,
            &options.id,
            options.class_name.as_deref(),
            sink,
        )?;
        Ok(Loaded {
            generation,
            surface: Rc::new(surface),
        })
    }

    fn handle(this: &Rc<Self>, generation: u64, signal: FrameSignal<P::FormData>) {
        if this.destroyed.get() {
            return;
        }
        let is_pending = this
            .pending
            .borrow()
            .as_ref()
            .is_some_and(|l| l.generation == generation);
        if is_pending {
            match &signal {
                FrameSignal::Load => this.promote_pending(),
                FrameSignal::Error => {
                    if let Some(stale) = this.pending.borrow_mut().take() {
                        this.platform.remove(&stale.surface.element());
                    }
                    this.fire(&this.callbacks.on_error);
                    return;
                }
                // A hidden document has nothing to report yet.
                _ => return,
            }
        } else {
            let is_current = this
                .current
                .borrow()
                .as_ref()
                .is_some_and(|l| l.generation == generation);
            if !is_current {
                debug!(generation, "ignoring signal from replaced frame");
                return;
            }
        }

        match signal {
            FrameSignal::Load => Self::loaded(this),
            FrameSignal::Ready => {
                if this.awaiting_ready.replace(false) {
                    this.fire(&this.callbacks.on_load);
                }
            }
            FrameSignal::Error => {
                this.stop_poll();
                this.fire(&this.callbacks.on_error);
            }
            FrameSignal::Cancel => {
                this.stop_poll();
                this.fire(&this.callbacks.on_cancel);
            }
            FrameSignal::Submit(form) => {
                let on_submit = this.callbacks.on_submit.clone();
                if let Some(on_submit) = on_submit {
                    on_submit(form);
                }
            }
        }
    }

    fn promote_pending(&self) {
        let Some(fresh) = self.pending.borrow_mut().take() else {
            return;
        };
        let element = fresh.surface.element();
        let old = self.current.borrow_mut().replace(fresh);
        if let Some(old) = old {
            self.platform.remove(&old.surface.element());
        }
        self.platform.set_style(&element, "display", "");
    }

    fn loaded(this: &Rc<Self>) {
        let Some(surface) = this.surface() else {
            return;
        };
        if !surface.contains(sel::FORM_WRAPPER) {
            warn!("embedded document has no form wrapper");
            this.fire(&this.callbacks.on_error);
            return;
        }
        surface.bind_cancel(sel::CANCEL_BUTTON);

        if let Some(on_resize) = this.callbacks.on_resize.clone() {
            this.stop_poll();
            match surface.content_height(sel::FORM_WRAPPER) {
                Ok(height) => {
                    this.last_height.set(height);
                    on_resize(0.0, height);
                    Self::start_poll(this);
                }
                Err(err) => {
                    warn!(%err, "could not measure embedded document");
                    this.fire(&this.callbacks.on_error);
                    return;
                }
            }
        }

        let immediate = this.options.borrow().execute_onload_immediately;
        if immediate || surface.is_ready() {
            this.fire(&this.callbacks.on_load);
        } else {
            this.awaiting_ready.set(true);
            surface.watch_ready();
        }
    }

    fn start_poll(this: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(this);
        let millis = this.options.borrow().resize_poll_ms;
        let handle = this.platform.interval(
            millis,
            Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.poll_tick();
                }
            }),
        );
        *this.poll.borrow_mut() = Some(handle);
    }

    fn poll_tick(&self) {
        if self.poll.borrow().is_none() {
            return;
        }
        let Some(surface) = self.surface() else {
            self.stop_poll();
            return;
        };
        match surface.content_height(sel::FORM_WRAPPER) {
            Ok(height) => {
                let old = self.last_height.get();
                if height != old {
                    self.last_height.set(height);
                    if let Some(on_resize) = self.callbacks.on_resize.clone() {
                        on_resize(old, height);
                    }
                }
            }
            Err(err) => {
                warn!(%err, "embedded document became inaccessible");
                self.stop_poll();
                self.fire(&self.callbacks.on_error);
            }
        }
    }

    fn stop_poll(&self) {
        let handle = self.poll.borrow_mut().take();
        if let Some(handle) = handle {
            // Dropped on the next turn: this may run inside the interval's
            // own callback.
            self.platform
                .spawn_local(async move { drop(handle) }.boxed_local());
        }
    }

    fn fire(&self, callback: &Option<Rc<dyn Fn()>>) {
        if let Some(callback) = callback.clone() {
            callback();
        }
    }
}
