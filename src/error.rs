// src/error.rs

use uuid::Uuid;

/// Errors raised by the registry services.
///
/// Match absence and ambiguity are never errors; they are reported through
/// [`crate::models::MatchStatus`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid search params: {0}")]
    InvalidSearchParams(String),

    #[error("Invalid country code: {0}")]
    InvalidCountry(String),

    #[error("Entity not found: {kind} {key}")]
    NotFound { kind: String, key: Uuid },

    #[error("Registry snapshot error: {0}")]
    Snapshot(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
