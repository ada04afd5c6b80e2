//! Platform abstraction traits for frontend editing.
//!
//! These traits define the interface between the editor state machine and a
//! host environment. The browser implementation lives in `fedit-browser`;
//! the unit tests in this crate run against an in-memory page.
//!
//! The embedded edit form is modelled as a remote peer: the core only sees
//! the signals a `FrameSurface` reports through its `FrameSink` and the narrow
//! set of probes the surface answers.

use std::fmt;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use serde_json::{Map, Value};

use crate::error::FeditError;
use crate::response::ServerResponse;

/// Identifier of a live editor instance, stored on its region element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a lifecycle event.
///
/// `context` carries event-specific fields (`response`, `error`, ...). The
/// browser layer adds the JS-facing `editor`/`api` handles itself.
#[derive(Debug, Clone)]
pub struct EventDetail<E> {
    pub element: E,
    pub instance: InstanceId,
    pub context: Map<String, Value>,
}

impl<E> EventDetail<E> {
    pub fn new(element: E, instance: InstanceId) -> Self {
        Self {
            element,
            instance,
            context: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_owned(), value.into());
        self
    }
}

/// Document access for the host page.
///
/// Element handles are cheap clones of a reference to a live node; equality
/// is node identity.
pub trait Dom {
    type Element: Clone + PartialEq + fmt::Debug + 'static;
    /// Keeps a listener or observer alive. Dropping it unsubscribes.
    type Subscription: 'static;

    fn body(&self) -> Option<Self::Element>;

    /// First descendant of `scope` matching `selector`.
    fn query(&self, scope: &Self::Element, selector: &str) -> Option<Self::Element>;

    /// All descendants of `scope` matching `selector`, in document order.
    fn query_all(&self, scope: &Self::Element, selector: &str) -> Vec<Self::Element>;

    /// `element` itself or its nearest ancestor matching `selector`.
    fn closest(&self, element: &Self::Element, selector: &str) -> Option<Self::Element>;

    fn parent(&self, element: &Self::Element) -> Option<Self::Element>;
    fn children(&self, element: &Self::Element) -> Vec<Self::Element>;

    fn id(&self, element: &Self::Element) -> String;
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;
    fn set_attribute(&self, element: &Self::Element, name: &str, value: &str);
    fn remove_attribute(&self, element: &Self::Element, name: &str);

    fn has_class(&self, element: &Self::Element, class: &str) -> bool;
    fn add_class(&self, element: &Self::Element, class: &str);
    fn remove_class(&self, element: &Self::Element, class: &str);

    /// Set an inline style property; custom properties (`--x`) included.
    fn set_style(&self, element: &Self::Element, property: &str, value: &str);

    fn inner_html(&self, element: &Self::Element) -> String;
    fn set_inner_html(&self, element: &Self::Element, html: &str);

    fn create_element(&self, tag: &str) -> Result<Self::Element, FeditError>;

    /// Parse an HTML fragment and return its first element, detached.
    fn parse_fragment(&self, html: &str) -> Option<Self::Element>;

    fn insert_before(
        &self,
        new: &Self::Element,
        reference: &Self::Element,
    ) -> Result<(), FeditError>;
    fn append_child(&self, parent: &Self::Element, child: &Self::Element)
    -> Result<(), FeditError>;

    /// Detach `element` from its parent. No-op when already detached.
    fn remove(&self, element: &Self::Element);

    fn is_connected(&self, element: &Self::Element) -> bool;
    fn focus(&self, element: &Self::Element);

    /// Bind a click handler. The default action and propagation are stopped.
    fn on_click(&self, element: &Self::Element, handler: Rc<dyn Fn()>) -> Self::Subscription;

    /// Report every element inserted anywhere below `root`.
    fn observe_insertions(
        &self,
        root: &Self::Element,
        on_added: Rc<dyn Fn(Self::Element)>,
    ) -> Self::Subscription;

    /// Dispatch a non-bubbling custom event on `target`, or on the document
    /// when `target` is `None`.
    fn dispatch(&self, target: Option<&Self::Element>, name: &str, detail: &EventDetail<Self::Element>);

    /// Hand an opted-in node to the tooltip widget.
    fn bind_tooltip(&self, element: &Self::Element);

    /// Record the owning instance on the element (non-enumerable in browsers).
    fn attach_instance(&self, element: &Self::Element, id: InstanceId);
    fn detach_instance(&self, element: &Self::Element);
    fn instance_of(&self, element: &Self::Element) -> Option<InstanceId>;
}

/// A page-side function invoked with a target element and the full response.
pub type ResponseFunc<P> = Rc<
    dyn Fn(&P, &<P as Dom>::Element, &ServerResponse) -> LocalBoxFuture<'static, Result<(), FeditError>>,
>;

/// Window-level services: location, history, title, dialogs, tasks.
pub trait Browsing: Dom {
    fn location(&self) -> String;
    fn title(&self) -> String;
    fn set_title(&self, title: &str);
    fn push_state(&self, title: &str, url: &str);
    fn reload(&self);
    fn alert(&self, message: &str);
    fn viewport_height(&self) -> f64;
    fn cookie(&self, name: &str) -> Option<String>;

    /// Look up a function defined on the page's global object.
    fn global_function(&self, name: &str) -> Option<ResponseFunc<Self>>
    where
        Self: Sized;

    /// Run a detached task on the page's event loop.
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}

pub trait Timers {
    /// Dropping the handle cancels the interval.
    type Interval: 'static;

    fn interval(&self, millis: u32, tick: Rc<dyn Fn()>) -> Self::Interval;
}

pub trait Animator: Dom {
    /// Animate opacity from `from` to `to`, resolving when finished.
    fn fade(
        &self,
        element: &Self::Element,
        from: f64,
        to: f64,
        duration_ms: u32,
    ) -> LocalBoxFuture<'static, ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody<F> {
    Empty,
    Form(F),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct HttpRequest<F> {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody<F>,
}

impl<F> HttpRequest<F> {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody<F>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    /// Encoded form contents as captured from the embedded form.
    type FormData: Clone + 'static;

    /// One HTTP exchange. Non-2xx statuses are returned, not raised.
    fn send(
        &self,
        request: HttpRequest<Self::FormData>,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, FeditError>>;
}

/// Where an embedded document gets its content from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    Url(String),
    Inline(String),
}

/// Signals an embedded document reports back to its frame controller.
#[derive(Debug, Clone)]
pub enum FrameSignal<F> {
    /// The frame element's load event fired.
    Load,
    /// The embedded document finished its own ready handling.
    Ready,
    /// The frame failed to load.
    Error,
    /// The cancel control inside the document was clicked.
    Cancel,
    /// The edit form was submitted; default submission already prevented.
    Submit(F),
}

pub type FrameSink<F> = Rc<dyn Fn(FrameSignal<F>)>;

/// One embedded document instance.
///
/// Probes take selectors relative to the embedded document and answer
/// conservatively (`false`/`None`) when the document is inaccessible.
pub trait FrameSurface {
    type Element;

    /// The host-side element (the iframe).
    fn element(&self) -> Self::Element;

    fn is_ready(&self) -> bool;
    fn title(&self) -> Option<String>;
    fn contains(&self, selector: &str) -> bool;
    fn has_class(&self, selector: &str, class: &str) -> bool;
    fn attribute(&self, selector: &str, name: &str) -> Option<String>;

    /// Content height of the matched element. Errors when the document
    /// became inaccessible or the element vanished.
    fn content_height(&self, selector: &str) -> Result<f64, FeditError>;

    /// Replace the inner HTML of `selector` with the inner HTML of the same
    /// selector inside `html`, leaving the rest of the document intact.
    fn replace_section(&self, selector: &str, html: &str) -> Result<(), FeditError>;

    /// Initialise a not-yet-initialised widget matched by `selector`.
    fn init_widget(&self, selector: &str) -> bool;

    /// Report `Submit` for the form matched by `selector`.
    fn bind_submit(&self, selector: &str) -> bool;

    /// Report `Cancel` for clicks on the control matched by `selector`.
    fn bind_cancel(&self, selector: &str) -> bool;

    /// Report `Ready` once the embedded document's own ready signal fires.
    fn watch_ready(&self);

    fn set_height(&self, px: f64);
}

pub trait Frames: Dom + Transport {
    type Surface: FrameSurface<Element = Self::Element> + 'static;

    /// Create an embedded document element, detached. Content starts loading
    /// once the element is inserted into the page.
    fn create_frame(
        &self,
        source: &FrameSource,
        id: &str,
        class_name: Option<&str>,
        sink: FrameSink<Self::FormData>,
    ) -> Result<Self::Surface, FeditError>;
}

/// Everything the editor needs from its host.
pub trait Platform: Dom + Browsing + Timers + Animator + Transport + Frames + 'static {}

impl<T> Platform for T where T: Dom + Browsing + Timers + Animator + Transport + Frames + 'static {}
