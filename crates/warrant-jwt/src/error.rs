//! Error types for the codec.

use thiserror::Error;

/// Errors that can occur while encoding or decoding credentials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Claims could not be serialized or signed. Indicates misconfiguration.
    #[error("failed to encode token: {0}")]
    Encoding(String),

    /// The authentication tag does not match, or the token was signed with a
    /// key this codec does not hold.
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    /// The input is not a structurally valid token.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token carries an `exp` claim that has passed.
    #[error("token has expired")]
    Expired,

    /// The signing secret is too short or not valid base64.
    #[error("weak or invalid secret: {0}")]
    WeakSecret(String),
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature => CodecError::InvalidSignature(err.to_string()),
            ErrorKind::ExpiredSignature => CodecError::Expired,
            // Bad base64, bad JSON, missing claims, wrong algorithm
            _ => CodecError::Malformed(err.to_string()),
        }
    }
}
