// ABOUTME: Resolves link and image references found on listing pages into absolute URLs.
// ABOUTME: Absolute references pass through; relative ones are anchored at the source's origin.

use tracing::debug;
use url::Url;

/// Resolves `reference` against the origin of `base_url`.
///
/// Already-absolute references (any scheme) are returned unchanged. Relative
/// references, including protocol-relative ones, are joined onto the origin of
/// the base URL. Returns `None` for empty input or when either side is malformed.
pub fn resolve_url(base_url: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if Url::parse(reference).is_ok() {
        return Some(reference.to_string());
    }

    let mut origin = match Url::parse(base_url) {
        Ok(u) => u,
        Err(e) => {
            debug!(base_url, error = %e, "cannot resolve against malformed base URL");
            return None;
        }
    };
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);

    match origin.join(reference) {
        Ok(u) => Some(u.to_string()),
        Err(e) => {
            debug!(base_url, reference, error = %e, "failed to join relative URL");
            None
        }
    }
}
