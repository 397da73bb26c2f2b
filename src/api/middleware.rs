//! Middleware Chain
//!
//! Cross-cutting layers wrapped around the object routes, composed once at
//! startup in a fixed order:
//!
//! 1. request logging (outermost, sees the final response)
//! 2. metrics capture
//! 3. bucket access policy (may short-circuit with 403)
//! 4. object pipeline

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Router,
};
use metrics::{counter, histogram};
use tower::ServiceBuilder;
use tracing::{info, warn};

use crate::error::ObjectError;
use crate::objects::CacheStatus;
use crate::policy::AccessPolicy;

/// Path prefix under which objects are addressed.
pub const OBJECTS_PREFIX: &str = "/objects/";

// == Access Control ==
/// State of the access-policy layer.
#[derive(Debug, Clone)]
pub struct AccessControl {
    pub policy: Arc<AccessPolicy>,
    /// When false every request passes
    pub enabled: bool,
}

impl AccessControl {
    pub fn new(policy: AccessPolicy, enabled: bool) -> Self {
        Self {
            policy: Arc::new(policy),
            enabled,
        }
    }

    /// A layer that lets everything through.
    pub fn disabled() -> Self {
        Self::new(AccessPolicy::new(), false)
    }
}

// == Chain ==
/// Wraps `router` with the middleware chain.
pub fn apply_chain<S>(router: Router<S>, access: AccessControl) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if access.enabled {
        info!(buckets = access.policy.len(), "Bucket access control enabled");
    } else {
        info!("Bucket policies are disabled");
    }

    router.layer(
        ServiceBuilder::new()
            .layer(from_fn(log_request))
            .layer(from_fn(record_metrics))
            .layer(from_fn_with_state(access, enforce_bucket_policy)),
    )
}

/// First path segment after the objects prefix, if non-empty.
pub fn bucket_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(OBJECTS_PREFIX)?
        .split('/')
        .next()
        .filter(|bucket| !bucket.is_empty())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn cache_status(response: &Response) -> Option<CacheStatus> {
    response.extensions().get::<CacheStatus>().copied()
}

// == Logging ==
/// Emits one structured event per request once the response is ready.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        size = response.body().size_hint().exact().unwrap_or(0),
        cache = cache_status(&response).map_or("none", CacheStatus::as_str),
        user_agent = %user_agent,
        "http request completed"
    );

    response
}

// == Metrics ==
/// Records request/response counters and histograms.
pub async fn record_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let bucket = bucket_from_path(request.uri().path()).map(str::to_string);

    if let Some(length) = content_length(request.headers()) {
        histogram!("http_request_size_bytes").record(length as f64);
    }
    counter!("http_requests_total").increment(1);

    let response = next.run(request).await;

    histogram!("http_response_time_seconds").record(start.elapsed().as_secs_f64());
    counter!("http_response_status_total", "code" => response.status().as_u16().to_string())
        .increment(1);
    histogram!("http_response_size_bytes")
        .record(response.body().size_hint().exact().unwrap_or(0) as f64);

    match cache_status(&response) {
        Some(CacheStatus::Hit) => counter!("cache_hits_total").increment(1),
        Some(CacheStatus::Miss) => counter!("cache_misses_total").increment(1),
        _ => {}
    }

    if let Some(bucket) = bucket {
        counter!("bucket_operations_total", "bucket" => bucket, "method" => method).increment(1);
    }

    response
}

// == Access Policy ==
/// Rejects requests the bucket policy does not allow, before any cache or
/// backend work.
pub async fn enforce_bucket_policy(
    State(access): State<AccessControl>,
    request: Request,
    next: Next,
) -> Response {
    if !access.enabled {
        return next.run(request).await;
    }

    let bucket = match bucket_from_path(request.uri().path()) {
        Some(bucket) => bucket.to_string(),
        None => return ObjectError::Validation("invalid path".to_string()).into_response(),
    };
    let method: &Method = request.method();

    if !access.policy.is_allowed(&bucket, method) {
        counter!("access_denied_total").increment(1);
        warn!(bucket = %bucket, method = %method, "operation not allowed by bucket policy");
        return ObjectError::Forbidden(format!(
            "operation {} not allowed on bucket {}",
            method, bucket
        ))
        .into_response();
    }

    next.run(request).await
}
