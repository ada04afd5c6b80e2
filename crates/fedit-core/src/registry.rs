//! Variant and response-function lookup by the keys server templates use.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::behaviors::{Addable, Movable};
use crate::error::FeditError;
use crate::platform::{Platform, ResponseFunc};
use crate::variants::{FuncDispatch, ReplaceInPlace, VariantSpec, background_image};

pub const FIELD_EDITOR: &str = "wagtail_fedit.editors.FieldEditor";
pub const BLOCK_EDITOR: &str = "wagtail_fedit.editors.BlockEditor";
pub const DOM_POSITIONED_FIELD_EDITOR: &str = "wagtail_fedit.editors.DomPositionedFieldEditor";
pub const DOM_POSITIONED_BLOCK_EDITOR: &str = "wagtail_fedit.editors.DomPositionedBlockEditor";
pub const ADDABLE_BLOCK_EDITOR: &str = "wagtail_fedit.editors.AddableBlockEditor";
pub const DOM_POSITIONED_ADDABLE_BLOCK_EDITOR: &str =
    "wagtail_fedit.editors.DomPositionedAddableBlockEditor";
pub const BASE_FUNC_EDITOR: &str = "wagtail_fedit.editors.BaseFuncEditor";
pub const FUNC_EDITOR: &str = "wagtail_fedit.editors.WagtailFeditFuncEditor";

pub const BACKGROUND_IMAGE_FUNC: &str = "wagtail_fedit.funcs.backgroundImageFunc";

/// Shared handle passed to discovery and to the JS bindings.
pub type SharedRegistry<P> = Rc<RefCell<Registry<P>>>;

pub struct Registry<P: Platform> {
    variants: HashMap<String, VariantSpec<P>>,
    funcs: HashMap<String, ResponseFunc<P>>,
}

impl<P: Platform> Default for Registry<P> {
    fn default() -> Self {
        Self {
            variants: HashMap::new(),
            funcs: HashMap::new(),
        }
    }
}

impl<P: Platform> Registry<P> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in variants and response functions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FIELD_EDITOR, VariantSpec::modal(ReplaceInPlace));
        registry.register(
            BLOCK_EDITOR,
            VariantSpec::modal(ReplaceInPlace).with_behavior(Movable),
        );
        registry.register(DOM_POSITIONED_FIELD_EDITOR, VariantSpec::in_place(ReplaceInPlace));
        registry.register(
            DOM_POSITIONED_BLOCK_EDITOR,
            VariantSpec::in_place(ReplaceInPlace).with_behavior(Movable),
        );
        registry.register(
            ADDABLE_BLOCK_EDITOR,
            VariantSpec::modal(ReplaceInPlace)
                .with_behavior(Movable)
                .with_behavior(Addable),
        );
        registry.register(
            DOM_POSITIONED_ADDABLE_BLOCK_EDITOR,
            VariantSpec::in_place(ReplaceInPlace)
                .with_behavior(Movable)
                .with_behavior(Addable),
        );
        registry.register(BASE_FUNC_EDITOR, VariantSpec::modal(FuncDispatch::global()));
        registry.register(FUNC_EDITOR, VariantSpec::modal(FuncDispatch::registry()));
        registry.register_func(BACKGROUND_IMAGE_FUNC, background_image());
        registry
    }

    pub fn shared(self) -> SharedRegistry<P> {
        Rc::new(RefCell::new(self))
    }

    /// Register or replace the variant under `key`.
    pub fn register(&mut self, key: impl Into<String>, variant: VariantSpec<P>) {
        let key = key.into();
        debug!(%key, "registering editor variant");
        self.variants.insert(key, variant);
    }

    pub fn register_func(&mut self, key: impl Into<String>, func: ResponseFunc<P>) {
        let key = key.into();
        debug!(%key, "registering response function");
        self.funcs.insert(key, func);
    }

    /// Make `key` resolve to the variant currently registered as `base`.
    pub fn alias(&mut self, key: impl Into<String>, base: &str) -> Result<(), FeditError> {
        let variant = self
            .variant(base)
            .ok_or_else(|| FeditError::UnknownVariant(base.to_owned()))?;
        self.register(key, variant);
        Ok(())
    }

    pub fn variant(&self, key: &str) -> Option<VariantSpec<P>> {
        self.variants.get(key).cloned()
    }

    pub fn func(&self, key: &str) -> Option<ResponseFunc<P>> {
        self.funcs.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variants.contains_key(key)
    }

    /// Registered variant keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.variants.keys().cloned().collect();
        keys.sort();
        keys
    }
}
