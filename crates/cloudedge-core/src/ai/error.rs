//! Model service error types

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Failure talking to a model service, classified by cause
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Connection refused, DNS failure, broken stream
    Network,
    Timeout,
    /// 401 / 403
    Auth,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// 400
    InvalidRequest,
    /// Unexpected status or a body we could not decode
    InvalidResponse,
}

impl ModelErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Timeout => "timeout",
            Self::Auth => "authentication failed",
            Self::RateLimit => "rate limited",
            Self::Server => "server error",
            Self::InvalidRequest => "invalid request",
            Self::InvalidResponse => "invalid response",
        }
    }
}

impl fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Timeout, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::InvalidResponse, message)
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timeout: {}", err))
        } else if err.is_decode() {
            Self::invalid_response(format!("Failed to decode response: {}", err))
        } else {
            Self::network(format!("Request failed: {}", err))
        }
    }

    /// Classify a non-success HTTP response. All three providers nest a
    /// human-readable message under `error.message`; fall back to the raw
    /// body when it isn't there.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string());

        let kind = match status.as_u16() {
            400 => ModelErrorKind::InvalidRequest,
            401 | 403 => ModelErrorKind::Auth,
            429 => ModelErrorKind::RateLimit,
            500..=599 => ModelErrorKind::Server,
            _ => ModelErrorKind::InvalidResponse,
        };

        Self::new(kind, format!("HTTP {}: {}", status, detail))
    }
}
