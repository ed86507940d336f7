use serde_json::Value;

use super::{interpret_response, MatrixGateway};
use crate::domain::{Bay, BayColumn, Matrix};
use crate::error::SyncError;
use crate::store::MatrixStore;
use crate::wire::{self, BayReplacement, WireResponse, MATRIX_PATH};

/// Talks to a store in the same process by going through the wire contract,
/// so local and remote stores reject the same requests the same way.
#[derive(Debug)]
pub struct LocalGateway<S> {
    store: S,
}

impl<S: MatrixStore> LocalGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn exchange(&self, method: &str, body: &[u8]) -> Result<Matrix, SyncError> {
        let WireResponse { status, body } = wire::handle(&self.store, method, MATRIX_PATH, body);
        let body = match body {
            Value::Null => None,
            other => Some(other),
        };
        interpret_response(status, body)
    }
}

impl<S: MatrixStore> MatrixGateway for LocalGateway<S> {
    fn fetch_full_matrix(&self) -> Result<Matrix, SyncError> {
        self.exchange("GET", b"")
    }

    fn replace_bay(&self, bay: Bay, column: &BayColumn) -> Result<Matrix, SyncError> {
        let body = serde_json::to_vec(&BayReplacement {
            bay,
            levels: column,
        })
        .map_err(|err| SyncError::Validation(format!("could not encode bay: {}", err)))?;
        self.exchange("PATCH", &body)
    }

    fn replace_matrix(&self, matrix: &Matrix) -> Result<Matrix, SyncError> {
        let body = serde_json::to_vec(matrix)
            .map_err(|err| SyncError::Validation(format!("could not encode matrix: {}", err)))?;
        self.exchange("PUT", &body)
    }
}
