//! `Transport` over `window.fetch`.
//!
//! Requests are same-origin with credentials so the session cookie rides
//! along. Any HTTP status is returned as a response; only network failures
//! and platform errors become `FeditError::Transport`.

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tracing::{debug, trace};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{FormData, Headers, RequestCredentials, RequestInit, Response};

use fedit_core::{FeditError, HttpRequest, HttpResponse, RequestBody, Transport};

use crate::describe;
use crate::platform::BrowserPlatform;

impl Transport for BrowserPlatform {
    type FormData = FormData;

    fn send(
        &self,
        request: HttpRequest<FormData>,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, FeditError>> {
        let window = self.window().clone();
        async move {
            let url = request.url.clone();
            let failed = |err: JsValue| FeditError::Transport {
                url: url.clone(),
                reason: describe(&err),
            };

            let headers = Headers::new().map_err(&failed)?;
            for (name, value) in &request.headers {
                headers.set(name, value).map_err(&failed)?;
            }

            let init = RequestInit::new();
            init.set_method(request.method.as_str());
            init.set_credentials(RequestCredentials::SameOrigin);
            init.set_headers(&headers);
            match &request.body {
                RequestBody::Empty => {}
                RequestBody::Form(form) => init.set_body(form),
                RequestBody::Text(text) => init.set_body(&JsValue::from_str(text)),
            }

            debug!(method = request.method.as_str(), url = %request.url, "sending request");
            let response: Response = JsFuture::from(window.fetch_with_str_and_init(&request.url, &init))
                .await
                .map_err(&failed)?
                .dyn_into()
                .map_err(&failed)?;
            let status = response.status();
            let body = JsFuture::from(response.text().map_err(&failed)?)
                .await
                .map_err(&failed)?
                .as_string()
                .unwrap_or_default();
            trace!(status, bytes = body.len(), "response received");

            Ok(HttpResponse { status, body })
        }
        .boxed_local()
    }
}
