//! fedit-core: frontend editing logic without browser dependencies.
//!
//! This crate provides:
//! - Platform traits (`Dom`, `Browsing`, `Transport`, `Frames`, ...) that a
//!   host environment implements
//! - `Frame` and `Modal` - the embedded edit form and the overlay hosting it
//! - `Editor<P>` - the per-region state machine, and `EditorApi<P>` - its
//!   capability facade
//! - Editor variants (`ReplaceInPlace`, `FuncDispatch`, in-place presentation)
//!   and composable behaviors (`Movable`, `Addable`)
//! - `Registry<P>` and `Page<P>` - variant lookup and region discovery

pub mod api;
pub mod behaviors;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod frame;
pub mod markers;
pub mod modal;
pub mod page;
pub mod platform;
pub mod region;
pub mod registry;
pub mod response;
pub mod url;
pub mod variants;

#[cfg(test)]
pub(crate) mod fake;

pub use api::{EditorApi, FetchBody, HtmlSwap};
pub use behaviors::{Addable, Movable};
pub use config::FeditConfig;
pub use editor::{Editor, EditorState};
pub use error::FeditError;
pub use events::{EditorEvent, ListenerId};
pub use frame::{Frame, FrameCallbacks, FrameOptions};
pub use modal::{Modal, ModalOptions};
pub use page::{Page, WeakPage};
pub use platform::{
    Animator, Browsing, Dom, EventDetail, FrameSignal, FrameSink, FrameSource, FrameSurface,
    Frames, HttpRequest, HttpResponse, InstanceId, Method, Platform, RequestBody, ResponseFunc,
    Timers, Transport,
};
pub use region::RegionAttrs;
pub use registry::{Registry, SharedRegistry};
pub use response::{FuncCall, ServerResponse};
pub use variants::{
    Behavior, FrameTuning, FuncDispatch, FuncSource, Presentation, ReplaceInPlace,
    ResponseStrategy, VariantSpec, background_image,
};
