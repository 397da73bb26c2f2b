//! Request metadata for object operations
//!
//! Extracts the header-derived parameters the object pipeline needs.

use axum::http::{header, HeaderMap};

/// Content coding used for compressed bodies in both directions.
pub const GZIP_ENCODING: &str = "gzip";

/// Header-derived parameters of an object request.
///
/// # Fields
/// - `accepts_gzip`: caller accepts a gzip-encoded response body
/// - `content_type`: declared type of a PUT body
/// - `content_encoding`: declared transfer coding of a PUT body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub accepts_gzip: bool,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

impl RequestMeta {
    /// Builds request metadata from HTTP headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let accepts_gzip = text(header::ACCEPT_ENCODING)
            .map(|v| accepts_coding(&v, GZIP_ENCODING))
            .unwrap_or(false);

        Self {
            accepts_gzip,
            content_type: text(header::CONTENT_TYPE),
            content_encoding: text(header::CONTENT_ENCODING),
        }
    }

    /// True when the body was sent gzip-encoded.
    pub fn body_is_gzip(&self) -> bool {
        self.content_encoding
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case(GZIP_ENCODING))
    }
}

/// Checks an `Accept-Encoding` list for `coding`, honouring `q=0`.
fn accepts_coding(accept: &str, coding: &str) -> bool {
    accept.split(',').any(|item| {
        let mut parts = item.split(';').map(str::trim);
        let name = parts.next().unwrap_or_default();
        let rejected = parts.any(|param| {
            param
                .strip_prefix("q=")
                .and_then(|q| q.parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        });
        name.eq_ignore_ascii_case(coding) && !rejected
    })
}
