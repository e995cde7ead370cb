//! The module contains the errors the engine can throw.
//!
//! The taxonomy is deliberately small:
//!
//! - [`Validation`] for malformed or out-of-range input.
//! - [`NotFound`] for an expense/parcel/obligation absent or outside the
//!   caller's scope.
//! - [`Conflict`] for state-machine violations (double payment, paying a
//!   closed obligation, moving an expense status backwards).
//! - [`Database`] for transaction or connection failures, surfaced
//!   immediately and never silently retried.
//!
//! [`Validation`]: EngineError::Validation
//! [`NotFound`]: EngineError::NotFound
//! [`Conflict`]: EngineError::Conflict
//! [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
