//! JSON response helpers

use crate::api::ErrorBody;
use crate::error::ServerError;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, RETRY_AFTER};
use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use tracing::error;

pub type ApiResponse = Response<Full<Bytes>>;

const JSON: &str = "application/json";

/// Serialize `value` as the response body
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> ApiResponse {
    match serde_json::to_vec(value) {
        Ok(body) => with_body(status, body),
        Err(e) => {
            error!("response serialization failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "response serialization failed",
            )
        }
    }
}

/// `{"error": message, "code": code}`
pub fn error_response(status: StatusCode, code: &str, message: &str) -> ApiResponse {
    let body = ErrorBody {
        error: message.to_string(),
        code: code.to_string(),
        missing: None,
    };
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    with_body(status, bytes)
}

/// Response for a failed action
pub fn from_error(err: &ServerError) -> ApiResponse {
    let missing = match err {
        ServerError::Engine(oasis_core::Error::InsufficientResources { missing }) => {
            Some(*missing)
        }
        _ => None,
    };
    let body = ErrorBody {
        error: err.to_string(),
        code: err.code().to_string(),
        missing,
    };
    json(err.status(), &body)
}

pub fn not_found() -> ApiResponse {
    error_response(StatusCode::NOT_FOUND, "route_not_found", "no such route")
}

pub fn method_not_allowed(allowed: &[Method]) -> ApiResponse {
    let mut response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        "method not allowed for this route",
    );
    let list = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&list) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

pub fn too_many_requests(retry_after_secs: u64) -> ApiResponse {
    let mut response = error_response(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "too many requests",
    );
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

fn with_body(status: StatusCode, body: Vec<u8>) -> ApiResponse {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    response
}
