use std::error::Error;
use std::fmt;

use crate::domain::{BayColumn, Matrix};
use crate::locks::LockError;

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

/// Durable home of the authoritative matrix. Every call is all-or-nothing;
/// implementations serialise their own writers.
pub trait MatrixStore: Send + Sync {
    fn read_matrix(&self) -> Result<Matrix, StoreError>;

    /// Replaces every level of `column.bay()`; levels that are empty in
    /// `column` end up empty in the store.
    fn write_bay(&self, column: &BayColumn) -> Result<(), StoreError>;

    fn write_matrix(&self, matrix: &Matrix) -> Result<(), StoreError>;
}

impl<S: MatrixStore + ?Sized> MatrixStore for Box<S> {
    fn read_matrix(&self) -> Result<Matrix, StoreError> {
        (**self).read_matrix()
    }

    fn write_bay(&self, column: &BayColumn) -> Result<(), StoreError> {
        (**self).write_bay(column)
    }

    fn write_matrix(&self, matrix: &Matrix) -> Result<(), StoreError> {
        (**self).write_matrix(matrix)
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    Lock(LockError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "store I/O error: {}", err),
            StoreError::Db(err) => write!(f, "store database error: {}", err),
            StoreError::Json(err) => write!(f, "store JSON error: {}", err),
            StoreError::Lock(err) => write!(f, "{}", err),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Db(err) => Some(err),
            StoreError::Json(err) => Some(err),
            StoreError::Lock(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

impl From<LockError> for StoreError {
    fn from(value: LockError) -> Self {
        StoreError::Lock(value)
    }
}
