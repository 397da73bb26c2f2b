//! Object Response
//!
//! Transport-neutral result of an object operation, converted into an HTTP
//! response at the edge.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::backend::ObjectMetadata;
use crate::cache::CacheEntry;

/// HTTP date format used for `Last-Modified`.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

// == Cache Status ==
/// How the cache participated in serving a request.
///
/// Attached to the HTTP response extensions for the instrumentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Mutations, which only invalidate
    Bypass,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
        }
    }
}

// == Object Response ==
#[derive(Debug, Clone)]
pub struct ObjectResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<String>,
    /// Explicit length; for HEAD this is the object size, not the body size
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub content_encoding: Option<&'static str>,
    pub cache_status: CacheStatus,
}

impl ObjectResponse {
    /// A bodiless response without object metadata.
    pub fn empty(status: StatusCode, cache_status: CacheStatus) -> Self {
        Self {
            status,
            body: Bytes::new(),
            content_type: None,
            content_length: None,
            last_modified: None,
            etag: None,
            content_encoding: None,
            cache_status,
        }
    }

    /// 200 carrying `body`, described by a cached entry.
    pub fn from_entry(
        entry: &CacheEntry,
        body: Bytes,
        content_encoding: Option<&'static str>,
    ) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some(entry.content_type.clone()),
            content_length: Some(body.len() as u64),
            last_modified: Some(entry.last_modified),
            etag: Some(entry.etag.clone()),
            content_encoding,
            cache_status: CacheStatus::Hit,
            body,
        }
    }

    /// 200 carrying `body`, described by backend metadata.
    pub fn from_metadata(
        metadata: &ObjectMetadata,
        body: Bytes,
        content_encoding: Option<&'static str>,
    ) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some(metadata.content_type.clone()),
            content_length: Some(body.len() as u64),
            last_modified: Some(metadata.last_modified),
            etag: Some(metadata.etag.clone()),
            content_encoding,
            cache_status: CacheStatus::Miss,
            body,
        }
    }

    /// Drops the body but keeps headers, with `length` as Content-Length.
    pub fn headers_only(mut self, length: u64) -> Self {
        self.body = Bytes::new();
        self.content_length = Some(length);
        self
    }
}

fn insert_header(response: &mut Response, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, value);
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ObjectResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        if let Some(content_type) = &self.content_type {
            insert_header(&mut response, header::CONTENT_TYPE, content_type);
        }
        if let Some(length) = self.content_length {
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        }
        if let Some(last_modified) = self.last_modified {
            let formatted = last_modified.format(HTTP_DATE_FORMAT).to_string();
            insert_header(&mut response, header::LAST_MODIFIED, &formatted);
        }
        if let Some(etag) = &self.etag {
            insert_header(&mut response, header::ETAG, etag);
        }
        if let Some(encoding) = self.content_encoding {
            response
                .headers_mut()
                .insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
            response
                .headers_mut()
                .insert(header::VARY, HeaderValue::from_static("accept-encoding"));
        }

        response.extensions_mut().insert(self.cache_status);
        response
    }
}
