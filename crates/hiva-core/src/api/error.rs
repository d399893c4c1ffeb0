use reqwest::{Method, StatusCode};
use thiserror::Error;
use tracing::error;

/// Maximum length for error response bodies kept in errors
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Coarse failure class of a rejected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with a non-success status.
    HttpStatus,
    /// The request went out but nothing came back (network, timeout).
    NoResponse,
    /// The request could not be built or its answer could not be used.
    Request,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{label}: {message}")]
    Status {
        status: StatusCode,
        label: &'static str,
        /// Server-supplied `message` field, or the fixed phrase for the status
        message: String,
        /// Raw response body, truncated
        body: String,
    },

    #[error("No response received from the server: {0}")]
    NoResponse(#[source] reqwest::Error),

    #[error("Request could not be sent: {0}")]
    Request(String),

    #[error("Invalid response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Short label logged in front of a status failure.
pub fn status_label(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Server Error",
        _ => "Error",
    }
}

/// Message for a status failure. A non-empty server message wins over the
/// fixed phrase for the status.
pub fn status_message(status: StatusCode, server_message: Option<&str>) -> String {
    if let Some(message) = server_message.filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    let fallback = match status.as_u16() {
        400 => "Invalid request.",
        401 => "You need to log in.",
        403 => "You don't have access.",
        404 => "The resource was not found.",
        500 => "Something went wrong on the server.",
        _ => "An unexpected error occurred.",
    };
    fallback.to_string()
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the `message` field out of a JSON error body.
    fn server_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let server_message = Self::server_message(body);
        ApiError::Status {
            status,
            label: status_label(status),
            message: status_message(status, server_message.as_deref()),
            body: Self::truncate_body(body),
        }
    }

    /// Classify an error returned by `RequestBuilder::send`.
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Request(err.to_string())
        } else {
            ApiError::NoResponse(err)
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Status { .. } => FailureKind::HttpStatus,
            ApiError::NoResponse(_) => FailureKind::NoResponse,
            ApiError::Request(_) | ApiError::Decode { .. } => FailureKind::Request,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::NoResponse(e) if e.is_timeout())
    }

    /// The line written to the diagnostic log for this failure.
    pub fn log_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::NoResponse(_) => "No response received from the server.".to_string(),
            ApiError::Request(message) => message.clone(),
            ApiError::Decode { source, .. } => source.to_string(),
        }
    }

    /// Record the failure. Never alters or consumes the error.
    pub fn log(&self, method: &Method, path: &str) {
        match self {
            ApiError::Status { status, label, message, .. } => error!(
                method = %method,
                path = path,
                status = status.as_u16(),
                "{}: {}",
                label,
                message
            ),
            ApiError::NoResponse(source) => error!(
                method = %method,
                path = path,
                timeout = source.is_timeout(),
                "Network Error: {}",
                self.log_message()
            ),
            ApiError::Request(_) | ApiError::Decode { .. } => error!(
                method = %method,
                path = path,
                "Error: {}",
                self.log_message()
            ),
        }
    }
}
