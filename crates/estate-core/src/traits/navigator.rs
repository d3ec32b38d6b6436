//! Redirect primitive supplied by the surrounding UI layer.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in a query component: everything except the RFC 3986
/// unreserved set.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Moves the user to another page of the console.
pub trait Navigator: Send + Sync + std::fmt::Debug + 'static {
    /// Loads `url`.
    fn navigate(&self, url: &str);

    /// Navigates to `destination` with `reason` attached as a query parameter.
    fn redirect(&self, destination: &str, reason: &str) {
        self.navigate(&redirect_url(destination, reason));
    }
}

/// Builds the URL a navigator should load: the reason is appended as a
/// percent-encoded `reason` query parameter.
pub fn redirect_url(destination: &str, reason: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!(
        "{destination}{separator}reason={}",
        utf8_percent_encode(reason, QUERY_COMPONENT)
    )
}
