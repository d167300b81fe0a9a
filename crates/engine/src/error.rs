//! The module contains the errors the engine can return.
//!
//! They fall in three groups:
//!
//! - validation errors ([`InvalidAmount`], [`InvalidLabel`], [`InvalidMonth`],
//!   [`InvalidId`]) raised before any I/O happens;
//! - remote failures ([`RemoteWrite`], [`RemoteRead`]) raised when the store
//!   rejects a write or a subscription breaks;
//! - lower level store errors ([`Database`], [`Json`], [`InvalidDocument`]).
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidLabel`]: EngineError::InvalidLabel
//!  [`InvalidMonth`]: EngineError::InvalidMonth
//!  [`InvalidId`]: EngineError::InvalidId
//!  [`RemoteWrite`]: EngineError::RemoteWrite
//!  [`RemoteRead`]: EngineError::RemoteRead
//!  [`Database`]: EngineError::Database
//!  [`Json`]: EngineError::Json
//!  [`InvalidDocument`]: EngineError::InvalidDocument
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid label: {0}")]
    InvalidLabel(String),
    #[error("Invalid month: {0}")]
    InvalidMonth(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("No active scope: {0}")]
    NoScope(String),
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),
    #[error("Remote read failed: {0}")]
    RemoteRead(String),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Returns `true` for errors raised by local input checks, before any I/O.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidLabel(_)
                | Self::InvalidMonth(_)
                | Self::InvalidId(_)
        )
    }

    /// Wraps a store error raised while writing.
    pub(crate) fn remote_write(err: EngineError) -> Self {
        match err {
            Self::RemoteWrite(_) => err,
            other => Self::RemoteWrite(other.to_string()),
        }
    }

    /// Wraps a store error raised while reading or subscribing.
    pub(crate) fn remote_read(err: EngineError) -> Self {
        match err {
            Self::RemoteRead(_) => err,
            other => Self::RemoteRead(other.to_string()),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidLabel(a), Self::InvalidLabel(b)) => a == b,
            (Self::InvalidMonth(a), Self::InvalidMonth(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidDocument(a), Self::InvalidDocument(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::NoScope(a), Self::NoScope(b)) => a == b,
            (Self::RemoteWrite(a), Self::RemoteWrite(b)) => a == b,
            (Self::RemoteRead(a), Self::RemoteRead(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Json(a), Self::Json(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
