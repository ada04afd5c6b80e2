//! The data attributes an editable region carries.

use crate::error::FeditError;
use crate::markers::attr;
use crate::platform::Dom;

/// Snapshot of a region element's declared endpoints and keys.
///
/// Read fresh whenever the region node is replaced, since the server may
/// render different URLs or a different shared context for the new node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionAttrs {
    pub id: String,
    pub edit_url: String,
    pub refetch_url: Option<String>,
    pub shared_context: Option<String>,
    pub wrapper_id: Option<String>,
    pub constructor: Option<String>,
}

impl RegionAttrs {
    pub fn read<D: Dom>(dom: &D, element: &D::Element) -> Result<Self, FeditError> {
        let id = dom.id(element);
        let edit_url = non_empty(dom.attribute(element, attr::EDIT_URL)).ok_or_else(|| {
            FeditError::MissingAttribute {
                region: id.clone(),
                attribute: attr::EDIT_URL,
            }
        })?;
        Ok(Self {
            edit_url,
            refetch_url: non_empty(dom.attribute(element, attr::REFETCH_URL)),
            shared_context: non_empty(dom.attribute(element, attr::SHARED_CONTEXT)),
            wrapper_id: non_empty(dom.attribute(element, attr::WRAPPER_ID)),
            constructor: non_empty(dom.attribute(element, attr::CONSTRUCTOR)),
            id,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
