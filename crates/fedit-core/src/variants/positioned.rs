//! In-place presentation: the frame lives in the region's form slot.

use tracing::debug;

use crate::editor::Editor;
use crate::error::FeditError;
use crate::markers::{ADAPTER_CONTENT, ADAPTER_FORM};
use crate::platform::Platform;

pub(crate) fn open<P: Platform>(editor: &Editor<P>) -> Result<(), FeditError> {
    let platform = editor.platform();
    let region = editor.element();
    let slot = platform
        .query(&region, ADAPTER_FORM)
        .ok_or_else(|| FeditError::MissingElement(ADAPTER_FORM.into()))?;

    let frame = match editor.frame() {
        Some(frame) => {
            debug!(region = %editor.region_id(), "reusing in-place frame");
            frame
        }
        None => {
            let frame = editor.create_frame()?;
            editor.set_frame(Some(frame.clone()));
            frame
        }
    };
    if let Some(element) = frame.element() {
        platform.append_child(&slot, &element)?;
    }
    if let Some(content) = platform.query(&region, ADAPTER_CONTENT) {
        platform.set_style(&content, "display", "none");
    }
    Ok(())
}

pub(crate) fn close<P: Platform>(editor: &Editor<P>) {
    let platform = editor.platform();
    let region = editor.element();
    if let Some(content) = platform.query(&region, ADAPTER_CONTENT) {
        platform.set_style(&content, "display", "block");
    }
    if let Some(frame) = editor.set_frame(None) {
        frame.destroy();
        editor.release(frame);
    }
}

/// The slot size classes are applied to.
pub(crate) fn size_target<P: Platform>(editor: &Editor<P>) -> Option<P::Element> {
    editor.platform().query(&editor.element(), ADAPTER_FORM)
}
