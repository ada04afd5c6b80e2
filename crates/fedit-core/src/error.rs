//! Error types for frontend editing operations.

use miette::Diagnostic;

/// Errors raised while driving an editor session.
///
/// Validation failures are not errors: a `success: false` response is the
/// expected redisplay path and never surfaces as a `FeditError`.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum FeditError {
    /// Network request failed or was rejected by the platform.
    #[error("request to {url} failed: {reason}")]
    #[diagnostic(code(fedit::transport))]
    Transport { url: String, reason: String },

    /// Response body was not the JSON shape we expect.
    #[error("invalid JSON response: {0}")]
    #[diagnostic(code(fedit::json))]
    Json(#[from] serde_json::Error),

    /// A URL could not be parsed or joined.
    #[error("invalid url {url}: {reason}")]
    #[diagnostic(code(fedit::url))]
    InvalidUrl { url: String, reason: String },

    /// Expected element is not in the document.
    #[error("element not found: {0}")]
    #[diagnostic(code(fedit::missing_element))]
    MissingElement(String),

    /// A region is missing one of its data attributes.
    #[error("region {region} has no {attribute} attribute")]
    #[diagnostic(code(fedit::missing_attribute))]
    MissingAttribute {
        region: String,
        attribute: &'static str,
    },

    /// A successful response lacks a field the variant needs.
    #[error("response is missing field `{0}`")]
    #[diagnostic(code(fedit::missing_field))]
    MissingField(&'static str),

    /// HTML fragment has no root element to swap in.
    #[error("HTML fragment has no root element")]
    #[diagnostic(code(fedit::empty_fragment))]
    EmptyFragment,

    /// The embedded document navigated away or is cross-origin.
    #[error("embedded document is not accessible")]
    #[diagnostic(code(fedit::frame_inaccessible))]
    FrameInaccessible,

    /// An `update_html_with` callback dropped its swap handle unused.
    #[error("html swap was dropped before it was applied")]
    #[diagnostic(code(fedit::swap_abandoned))]
    SwapAbandoned,

    /// Registry has no variant under this key.
    #[error("unknown editor variant: {0}")]
    #[diagnostic(code(fedit::unknown_variant), help("register it with `register(key, ...)` first"))]
    UnknownVariant(String),

    /// Region has no refetch endpoint.
    #[error("region {0} has no refetch url")]
    #[diagnostic(code(fedit::no_refetch_url))]
    NoRefetchUrl(String),

    /// Anything the host platform reports that has no better home.
    #[error("platform error: {0}")]
    #[diagnostic(code(fedit::platform))]
    Platform(String),
}
