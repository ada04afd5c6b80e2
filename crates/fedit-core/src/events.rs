//! Lifecycle events and in-process listeners.
//!
//! Every lifecycle event is delivered three ways: to listeners registered on
//! the editor instance, to the region element, and to the document. The
//! in-process half lives here; the DOM half goes through `Dom::dispatch`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::platform::EventDetail;

/// The fixed vocabulary of editor lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorEvent {
    /// Form submission intercepted, before the network call.
    Submit,
    /// A successful edit has been applied to the page and the editor closed.
    Change,
    /// Editor surface shown, frame still loading.
    EditorOpen,
    /// Embedded form loaded and interactive.
    EditorLoad,
    /// Editor closed, history and title restored.
    EditorClose,
    /// Submission failed validation or transport; editor stays open.
    SubmitError,
}

impl EditorEvent {
    /// Event name without namespace.
    pub fn as_str(self) -> &'static str {
        match self {
            EditorEvent::Submit => "submit",
            EditorEvent::Change => "change",
            EditorEvent::EditorOpen => "editorOpen",
            EditorEvent::EditorLoad => "editorLoad",
            EditorEvent::EditorClose => "editorClose",
            EditorEvent::SubmitError => "submitError",
        }
    }
}

/// Handle returned by `EventListeners::add`, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener<E> = Rc<dyn Fn(&str, &EventDetail<E>)>;

/// Listeners registered directly on an editor instance.
pub struct EventListeners<E> {
    next: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, String, Listener<E>)>>,
}

impl<E> Default for EventListeners<E> {
    fn default() -> Self {
        Self {
            next: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<E> EventListeners<E> {
    pub fn add(&self, name: impl Into<String>, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next.get());
        self.next.set(id.0 + 1);
        self.entries
            .borrow_mut()
            .push((id, name.into(), listener));
        id
    }

    /// Returns false if the listener was already removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry, _, _)| *entry != id);
        entries.len() != before
    }

    pub fn notify(&self, name: &str, detail: &EventDetail<E>) {
        // Collect first: a listener may add or remove listeners.
        let matching: Vec<Listener<E>> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, entry, _)| entry == name)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in matching {
            listener(name, detail);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
