use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

use super::ResponseStrategy;
use crate::editor::Editor;
use crate::error::FeditError;
use crate::platform::Platform;
use crate::response::ServerResponse;

/// Swap the region for the rendered HTML in the response, with a fade.
///
/// Unless the response came from the refetch endpoint, every related region
/// is asked to refetch so duplicated renderings stay in sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceInPlace;

impl<P: Platform> ResponseStrategy<P> for ReplaceInPlace {
    fn on_response(
        &self,
        editor: &Editor<P>,
        response: ServerResponse,
    ) -> LocalBoxFuture<'static, Result<(), FeditError>> {
        let editor = editor.clone();
        async move {
            let html = response.html.as_deref().ok_or(FeditError::MissingField("html"))?;
            let platform = editor.platform().clone();
            let duration = editor.config().fade_duration_ms;

            platform.fade(&editor.element(), 1.0, 0.0, duration).await;
            let fresh = editor.api().update_html(html)?;

            if response.cascades_to_related() {
                editor.api().exec_related(|related| {
                    debug!(region = %related.editor().region_id(), "refetching related region");
                    let refetch = related.refetch();
                    platform.spawn_local(
                        async move {
                            if let Err(err) = refetch.await {
                                warn!(%err, "related region refetch failed");
                            }
                        }
                        .boxed_local(),
                    );
                });
            }

            platform.fade(&fresh, 0.0, 1.0, duration).await;
            platform.set_style(&fresh, "opacity", "1");
            Ok(())
        }
        .boxed_local()
    }
}
