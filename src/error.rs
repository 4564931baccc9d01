//! Error types for enrollment and renewal operations.
//!
//! This module defines all error kinds the crate can produce: key storage
//! failures, CSR construction failures, codec errors, transport and
//! authentication failures, and persistence errors. Every error is terminal
//! for the operation that produced it; nothing is retried internally.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using [`EstError`].
pub type Result<T> = std::result::Result<T, EstError>;

/// Errors that can occur during enrollment, renewal, and persistence.
#[derive(Debug, Error)]
pub enum EstError {
    /// Key material storage could not be read or written.
    #[error("Key access error: {0}")]
    KeyAccess(String),

    /// A certificate signing request could not be constructed.
    #[error("CSR construction error: {0}")]
    CsrConstruction(String),

    /// Malformed PEM armor or an invalid base64/DER payload.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Connection, TLS, or HTTP transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server rejected the supplied credentials (HTTP 401/403).
    #[error("Authentication rejected (HTTP {status})")]
    Authentication {
        /// HTTP status code, 401 or 403.
        status: u16,
        /// WWW-Authenticate challenge from the server, when present.
        challenge: Option<String>,
    },

    /// The CA declined to issue a certificate.
    #[error("Enrollment rejected (HTTP {status}): {message}")]
    EnrollmentRejected {
        /// HTTP status code.
        status: u16,
        /// Response body or status text from the server.
        message: String,
    },

    /// Enrollment deferred for manual approval (HTTP 202).
    ///
    /// Retrying is the caller's responsibility; the operation itself is
    /// single-shot.
    #[error("Enrollment pending, retry after {retry_after} seconds")]
    EnrollmentPending {
        /// Seconds to wait before retrying, from the Retry-After header.
        retry_after: u64,
    },

    /// The client certificate presented for renewal is no longer valid.
    #[error("Expired credential: {0}")]
    ExpiredCredential(String),

    /// The EST response body could not be parsed into a certificate.
    #[error("Response parse error: {0}")]
    ResponseParse(String),

    /// A persisted artifact is missing from storage.
    #[error("Not found: {}", path.display())]
    NotFound {
        /// Path that was expected to hold the artifact.
        path: PathBuf,
    },

    /// Endpoint URL is invalid.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// I/O error outside the named storage cases.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EstError {
    /// Create a key access error with the given message.
    pub fn key_access(msg: impl Into<String>) -> Self {
        Self::KeyAccess(msg.into())
    }

    /// Create a CSR construction error with the given message.
    pub fn csr_construction(msg: impl Into<String>) -> Self {
        Self::CsrConstruction(msg.into())
    }

    /// Create a decoding error with the given message.
    pub fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }

    /// Create an authentication error from a rejected status.
    pub fn authentication(status: u16, challenge: Option<String>) -> Self {
        Self::Authentication { status, challenge }
    }

    /// Create an enrollment rejection from a server status and body.
    pub fn enrollment_rejected(status: u16, message: impl Into<String>) -> Self {
        Self::EnrollmentRejected {
            status,
            message: message.into(),
        }
    }

    /// Create an enrollment pending error.
    pub fn enrollment_pending(retry_after: u64) -> Self {
        Self::EnrollmentPending { retry_after }
    }

    /// Create an expired credential error with the given message.
    pub fn expired_credential(msg: impl Into<String>) -> Self {
        Self::ExpiredCredential(msg.into())
    }

    /// Create a response parse error with the given message.
    pub fn response_parse(msg: impl Into<String>) -> Self {
        Self::ResponseParse(msg.into())
    }

    /// Create a not-found error for the given path.
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns true if the server rejected the presented credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns true if a persisted artifact was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a retryable error.
    ///
    /// Pending approvals and transport failures may succeed on a later
    /// attempt; rejections and credential errors will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EnrollmentPending { .. } | Self::Transport(_))
    }

    /// Returns the retry-after value if this is an EnrollmentPending error.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::EnrollmentPending { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
