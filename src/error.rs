//! Error types for authentication, transport, streaming, and API calls.

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::stream::SessionState;

/// Authentication and signing errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A user-context request was attempted with no linked account.
    #[error("no account is linked; user-context requests need an access token pair")]
    MissingAccountToken,

    /// The app-only bearer token exchange returned a non-success response.
    #[error("bearer token exchange failed with status {status}: {body}")]
    TokenExchangeFailed {
        status: u16,
        body: String,
    },

    /// Signature generation failed.
    #[error("signature error: {0}")]
    Signature(String),
}

/// Transport-level errors, propagated from the HTTP layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, TLS, or timeout failure from the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be constructed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Stream session errors.
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// The initial streaming handshake failed. Not retried automatically.
    #[error("stream connect failed: {0}")]
    ConnectFailed(String),

    /// The operation requires an idle session.
    #[error("session is {0}, expected idle")]
    AlreadyRunning(SessionState),

    /// The session exhausted its reconnect budget and stopped.
    #[error("gave up after {attempts} consecutive failed reconnects")]
    GaveUp {
        attempts: u32,
    },
}

/// One entry of the API's error payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorCode {
    pub code: i32,
    pub message: String,
}

/// A non-success HTTP response from the API, with the server's error payload.
#[derive(Error, Debug)]
#[error("api error {status}: {message}")]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Human-readable message (first error entry, or the raw body).
    pub message: String,
    /// Parsed error entries, empty if the body was not the standard shape.
    pub errors: Vec<ApiErrorCode>,
}

impl ApiError {
    /// Build an `ApiError` from a response status and body.
    ///
    /// The standard payload is `{"errors": [{"code": .., "message": ..}]}`;
    /// anything else is carried verbatim as the message.
    pub(crate) fn from_response(status: u16, body: &Bytes) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            errors: Vec<ApiErrorCode>,
        }

        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => Self {
                status,
                message: parsed.errors[0].message.clone(),
                errors: parsed.errors,
            },
            _ => Self {
                status,
                message: String::from_utf8_lossy(body).into_owned(),
                errors: Vec::new(),
            },
        }
    }
}

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A success response body failed to deserialize.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_parses_standard_payload() {
        let body = Bytes::from_static(
            br#"{"errors":[{"code":32,"message":"Could not authenticate you."}]}"#,
        );
        let err = ApiError::from_response(401, &body);
        assert_eq!(err.status, 401);
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code, 32);
        assert_eq!(err.message, "Could not authenticate you.");
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        let body = Bytes::from_static(b"Exceeded connection limit");
        let err = ApiError::from_response(420, &body);
        assert_eq!(err.status, 420);
        assert!(err.errors.is_empty());
        assert_eq!(err.message, "Exceeded connection limit");
    }
}
