//! Region discovery and the set of live editors on a page.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use crate::api::EditorApi;
use crate::config::FeditConfig;
use crate::editor::Editor;
use crate::markers::{ADAPTER_WRAPPER, ADAPTER_WRAPPER_CLASS, INITIALIZED_CLASS, TOOLTIP_OPT_IN, attr};
use crate::platform::{InstanceId, Platform};
use crate::registry::SharedRegistry;

pub struct Page<P: Platform> {
    inner: Rc<PageInner<P>>,
}

impl<P: Platform> Clone for Page<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Non-owning page handle for callbacks the platform keeps.
pub struct WeakPage<P: Platform>(Weak<PageInner<P>>);

impl<P: Platform> Clone for WeakPage<P> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<P: Platform> WeakPage<P> {
    pub fn upgrade(&self) -> Option<Page<P>> {
        self.0.upgrade().map(Page::from_inner)
    }
}

pub(crate) struct PageInner<P: Platform> {
    platform: Rc<P>,
    config: Rc<FeditConfig>,
    registry: SharedRegistry<P>,
    editors: RefCell<BTreeMap<InstanceId, Editor<P>>>,
    next_id: Cell<u32>,
    observer: RefCell<Option<P::Subscription>>,
}

impl<P: Platform> Page<P> {
    pub fn new(platform: Rc<P>, config: FeditConfig, registry: SharedRegistry<P>) -> Self {
        Self {
            inner: Rc::new(PageInner {
                platform,
                config: Rc::new(config),
                registry,
                editors: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(1),
                observer: RefCell::new(None),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<PageInner<P>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<PageInner<P>> {
        Rc::downgrade(&self.inner)
    }

    pub fn weak(&self) -> WeakPage<P> {
        WeakPage(self.downgrade())
    }

    pub fn platform(&self) -> &Rc<P> {
        &self.inner.platform
    }

    pub fn config(&self) -> &Rc<FeditConfig> {
        &self.inner.config
    }

    pub fn registry(&self) -> &SharedRegistry<P> {
        &self.inner.registry
    }

    /// Scan the whole body, then keep scanning every inserted subtree.
    /// Returns the number of editors created by the initial scan.
    pub fn start(&self) -> usize {
        let Some(body) = self.inner.platform.body() else {
            error!("page has no body");
            return 0;
        };
        let created = self.init_new_editors(&body);
        if self.inner.observer.borrow().is_none() {
            let weak = self.downgrade();
            let observer = self.inner.platform.observe_insertions(
                &body,
                Rc::new(move |node| {
                    if let Some(inner) = weak.upgrade() {
                        Page::from_inner(inner).init_new_editors(&node);
                    }
                }),
            );
            *self.inner.observer.borrow_mut() = Some(observer);
        }
        debug!(created, "frontend editing started");
        created
    }

    /// Initialise every uninitialised region in `scope`, or `scope` itself
    /// when it is one. Safe to run repeatedly over the same nodes.
    pub fn init_new_editors(&self, scope: &P::Element) -> usize {
        let platform = &self.inner.platform;
        self.prune();

        let candidates = if platform.has_class(scope, ADAPTER_WRAPPER_CLASS)
            && !platform.has_class(scope, INITIALIZED_CLASS)
        {
            vec![scope.clone()]
        } else {
            platform.query_all(scope, ADAPTER_WRAPPER)
        };

        let mut created = 0;
        for node in candidates {
            if platform.has_class(&node, INITIALIZED_CLASS) {
                continue;
            }
            // Marked first so a scan triggered during construction skips it.
            platform.add_class(&node, INITIALIZED_CLASS);

            let region = platform.id(&node);
            let Some(key) = platform.attribute(&node, attr::CONSTRUCTOR) else {
                error!(%region, "region declares no editor variant");
                continue;
            };
            let variant = self.inner.registry.borrow().variant(&key);
            let Some(variant) = variant else {
                error!(%region, %key, "no editor variant registered under key");
                continue;
            };

            let id = InstanceId(self.inner.next_id.get());
            self.inner.next_id.set(id.0 + 1);
            match Editor::new(self, id, node, variant) {
                Ok(editor) => {
                    debug!(%region, instance = %id, %key, "editor initialised");
                    self.inner.editors.borrow_mut().insert(id, editor);
                    created += 1;
                }
                Err(err) => error!(%region, %err, "could not initialise editor"),
            }
        }

        for node in platform.query_all(scope, TOOLTIP_OPT_IN) {
            platform.bind_tooltip(&node);
            platform.remove_attribute(&node, attr::TOOLTIP);
        }
        created
    }

    /// Forget editors whose region left the document.
    fn prune(&self) {
        let platform = &self.inner.platform;
        let stale: Vec<Editor<P>> = {
            let mut editors = self.inner.editors.borrow_mut();
            let ids: Vec<InstanceId> = editors
                .iter()
                .filter(|(_, editor)| !platform.is_connected(&editor.element()))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| editors.remove(id)).collect()
        };
        for editor in stale {
            debug!(instance = %editor.id(), "dropping editor for detached region");
            editor.close();
        }
    }

    pub fn editor(&self, id: InstanceId) -> Option<Editor<P>> {
        self.inner.editors.borrow().get(&id).cloned()
    }

    pub fn editor_for(&self, element: &P::Element) -> Option<Editor<P>> {
        self.inner
            .platform
            .instance_of(element)
            .and_then(|id| self.editor(id))
    }

    pub fn api_for(&self, element: &P::Element) -> Option<EditorApi<P>> {
        self.editor_for(element).map(|editor| editor.api())
    }

    pub fn editors(&self) -> Vec<Editor<P>> {
        self.inner.editors.borrow().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.editors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
