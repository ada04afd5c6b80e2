//! Endpoint URL construction and location helpers.

use url::Url;

use crate::error::FeditError;

/// Resolve a region's endpoint path against the current page URL.
///
/// The page's origin is kept; its query and fragment are dropped in favour of
/// the path's own query. A non-empty shared context token is appended as
/// `<param>=<token>`, so the same region works whether the page is served at
/// its canonical or a context-specific URL.
pub fn endpoint_url(
    page: &str,
    path: &str,
    shared_context: Option<&str>,
    param: &str,
) -> Result<String, FeditError> {
    let base = Url::parse(page).map_err(|e| FeditError::InvalidUrl {
        url: page.to_owned(),
        reason: e.to_string(),
    })?;
    let mut url = base.join(path).map_err(|e| FeditError::InvalidUrl {
        url: path.to_owned(),
        reason: e.to_string(),
    })?;
    url.set_fragment(None);
    if let Some(token) = shared_context.filter(|token| !token.is_empty()) {
        url.query_pairs_mut().append_pair(param, token);
    }
    Ok(url.into())
}

/// `href` without its fragment.
pub fn without_fragment(href: &str) -> &str {
    href.split_once('#').map_or(href, |(base, _)| base)
}

/// Fragment of `href`, without the `#`.
pub fn fragment(href: &str) -> Option<&str> {
    href.split_once('#').map(|(_, fragment)| fragment)
}
