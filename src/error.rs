//! Unified error model for the session/authorization core.
//! Identity-provider failures carry a provider code (`AuthCode`); unknown
//! provider codes fold into `AuthCode::Unknown` rather than failing the
//! mapping. Store failures are structured (`StoreError`) and never escape the
//! mutator or session-manager boundaries as panics.

use serde::{Deserialize, Serialize};

/// Provider-defined failure codes for sign-in / sign-up operations.
///
/// The wire form is the provider's string code; anything unrecognized maps to
/// `Unknown` so a new provider code can never crash the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthCode {
    EmailExists,
    BadCredential,
    InvalidEmail,
    WeakPassword,
    RateLimited,
    Unknown,
}

impl AuthCode {
    /// Map a provider code string to a known code; unrecognized codes become
    /// `Unknown` by contract.
    pub fn from_provider(code: &str) -> Self {
        match code {
            "email-exists" | "email-already-in-use" => AuthCode::EmailExists,
            "bad-credential" | "wrong-password" | "user-not-found" => AuthCode::BadCredential,
            "invalid-email" | "invalid-identifier" => AuthCode::InvalidEmail,
            "weak-password" => AuthCode::WeakPassword,
            "rate-limited" | "too-many-requests" => AuthCode::RateLimited,
            _ => AuthCode::Unknown,
        }
    }

    /// User-facing message for a provider failure, mirroring the enrollment
    /// and login screens.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthCode::EmailExists => "This email is already registered. Please log in.",
            AuthCode::BadCredential => "Incorrect email or password.",
            AuthCode::InvalidEmail => "Please enter a valid email address.",
            AuthCode::WeakPassword => "Password must be at least 6 characters long.",
            AuthCode::RateLimited => "Too many attempts. Please wait a moment and try again.",
            AuthCode::Unknown => "Could not complete the request. Please try again.",
        }
    }
}

/// Failure reported by the identity provider during sign-in/sign-up/sign-out.
#[derive(Debug, Clone, thiserror::Error)]
#[error("identity error ({code:?}): {message}")]
pub struct IdentityError {
    pub code: AuthCode,
    pub message: String,
}

impl IdentityError {
    pub fn new(code: AuthCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Build from a raw provider code string, folding unknown codes.
    pub fn from_provider(code: &str, message: impl Into<String>) -> Self {
        Self { code: AuthCode::from_provider(code), message: message.into() }
    }
}

/// Failure reported by the profile document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the backing folder is gone.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Read/write error against a document.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    /// A document exists but could not be decoded.
    #[error("corrupt document for key '{key}': {detail}")]
    Corrupt { key: String, detail: String },
    /// A fetched record's uid does not match the key it was read under.
    #[error("record key mismatch: fetched '{found}' under key '{key}'")]
    KeyMismatch { key: String, found: String },
    /// An upsert for an absent key is missing a required field.
    #[error("cannot create profile '{key}': missing field '{field}'")]
    MissingField { key: String, field: &'static str },
}

pub type StoreResult<T> = Result<T, StoreError>;
