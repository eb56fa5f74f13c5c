//! Error types and JSON error responses for the UI server

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// Failure talking to the backend API
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The request never produced a response
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The backend answered with a non-success status
    #[error("{method} {url} returned {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
    },

    /// The response body did not match the expected shape
    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Error codes for UI server errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiErrorCode {
    /// No route matches the request
    NotFound,
    /// Clicked element has no registered handler
    UnknownElement,
    /// Malformed request body or query
    BadRequest,
    /// The backend API failed or was unreachable
    BackendUnavailable,
    /// Internal server error
    InternalError,
}

impl UiErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UiErrorCode::NotFound => StatusCode::NOT_FOUND,
            UiErrorCode::UnknownElement => StatusCode::NOT_FOUND,
            UiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            UiErrorCode::BackendUnavailable => StatusCode::BAD_GATEWAY,
            UiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value for the X-UI-Error header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            UiErrorCode::NotFound => "NOT_FOUND",
            UiErrorCode::UnknownElement => "UNKNOWN_ELEMENT",
            UiErrorCode::BadRequest => "BAD_REQUEST",
            UiErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            UiErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: UiErrorCode,
    pub message: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(code: UiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code().as_u16(),
            code,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"code":"{}","message":"{}","status":{}}}"#,
                self.code.as_header_value(),
                self.message.replace('\"', "\\\""),
                self.status
            )
        })
    }
}

/// Create a JSON error response with X-UI-Error header
pub fn json_error_response(code: UiErrorCode, message: impl Into<String>) -> Response<Full<Bytes>> {
    let body = ErrorResponse::new(code, message).to_json();

    Response::builder()
        .status(code.status_code())
        .header("Content-Type", "application/json")
        .header("X-UI-Error", code.as_header_value())
        .body(Full::new(Bytes::from(body)))
        .expect("valid response with StatusCode enum and static headers")
}
