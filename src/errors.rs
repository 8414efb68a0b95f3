use crate::media::MediaSlot;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Typed error hierarchy for the relay pipeline.
///
/// Use at stage boundaries (gate, decode, validate, relay). Internal/leaf
/// functions can continue using `anyhow::Result`; the `Internal` variant
/// converts via the `?` operator.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid origin")]
    InvalidOrigin,

    #[error("Failed to parse form: {0}")]
    ParseForm(String),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    #[error("chat_id is required")]
    ChatIdMissing,

    #[error("chat_id must be an integer id")]
    ChatIdInvalid,

    #[error("Caption is fixed and cannot be overridden")]
    CaptionMismatch,

    #[error("No media provided: attach a photo or an audio file")]
    NoMediaProvided,

    #[error("Invalid {slot}: unsupported or unrecognized file type")]
    InvalidType { slot: MediaSlot },

    #[error("Invalid {slot}: larger than the {limit_mib} MiB limit")]
    TooLarge { slot: MediaSlot, limit_mib: usize },

    #[error("Sending {slot} failed: {description}")]
    UpstreamRejected { slot: MediaSlot, description: String },

    #[error("Sending {slot} failed: {reason}")]
    UpstreamUnreachable { slot: MediaSlot, reason: String },

    #[error("Bot token not configured")]
    CredentialMissing,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using RelayError.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// HTTP status for the error class: policy violations map to 405/403,
    /// malformed input and rejected content to 400, upstream and internal
    /// faults to 500.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::InvalidOrigin => StatusCode::FORBIDDEN,
            RelayError::ParseForm(_)
            | RelayError::UnexpectedField(_)
            | RelayError::DuplicateField(_)
            | RelayError::ChatIdMissing
            | RelayError::ChatIdInvalid
            | RelayError::CaptionMismatch
            | RelayError::NoMediaProvided
            | RelayError::InvalidType { .. }
            | RelayError::TooLarge { .. } => StatusCode::BAD_REQUEST,
            RelayError::UpstreamRejected { .. }
            | RelayError::UpstreamUnreachable { .. }
            | RelayError::CredentialMissing
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text for the client. Configuration and internal faults collapse
    /// to a generic message; everything else, including upstream
    /// descriptions, passes through verbatim.
    pub fn client_message(&self) -> String {
        match self {
            RelayError::CredentialMissing | RelayError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // The handler logs the request-scoped outcome; only the internal
        // chain (with its full context) is logged here.
        if let RelayError::Internal(err) = &self {
            error!("internal fault: {:#}", err);
        }
        let body = Json(serde_json::json!({
            "ok": false,
            "error": self.client_message(),
        }));
        (self.status(), body).into_response()
    }
}
