//! Client-side access to the authoritative matrix. The engine only ever sees
//! this trait; whether the store sits behind HTTP or in-process is decided at
//! startup.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{Bay, BayColumn, Matrix};
use crate::error::SyncError;
use crate::normalize::normalize_matrix;

mod http;
mod local;

pub use http::HttpGateway;
pub use local::LocalGateway;

pub trait MatrixGateway: Send + Sync {
    fn fetch_full_matrix(&self) -> Result<Matrix, SyncError>;

    /// Replaces all ten levels of `bay` and returns the store's full matrix
    /// afterwards.
    fn replace_bay(&self, bay: Bay, column: &BayColumn) -> Result<Matrix, SyncError>;

    fn replace_matrix(&self, matrix: &Matrix) -> Result<Matrix, SyncError>;
}

impl<G: MatrixGateway + ?Sized> MatrixGateway for Box<G> {
    fn fetch_full_matrix(&self) -> Result<Matrix, SyncError> {
        (**self).fetch_full_matrix()
    }

    fn replace_bay(&self, bay: Bay, column: &BayColumn) -> Result<Matrix, SyncError> {
        (**self).replace_bay(bay, column)
    }

    fn replace_matrix(&self, matrix: &Matrix) -> Result<Matrix, SyncError> {
        (**self).replace_matrix(matrix)
    }
}

impl<G: MatrixGateway + ?Sized> MatrixGateway for Arc<G> {
    fn fetch_full_matrix(&self) -> Result<Matrix, SyncError> {
        (**self).fetch_full_matrix()
    }

    fn replace_bay(&self, bay: Bay, column: &BayColumn) -> Result<Matrix, SyncError> {
        (**self).replace_bay(bay, column)
    }

    fn replace_matrix(&self, matrix: &Matrix) -> Result<Matrix, SyncError> {
        (**self).replace_matrix(matrix)
    }
}

/// Turns a response into a matrix or a categorized failure. A success body
/// that is not a JSON object is a decode error; anything else is normalized.
pub(crate) fn interpret_response(status: u16, body: Option<Value>) -> Result<Matrix, SyncError> {
    if !(200..300).contains(&status) {
        let message = body
            .as_ref()
            .and_then(|body| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(SyncError::from_status(status, message));
    }
    match body {
        Some(body @ Value::Object(_)) => Ok(normalize_matrix(&body)),
        Some(_) => Err(SyncError::Decode("expected a JSON object".to_string())),
        None => Err(SyncError::Decode("response body is not JSON".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::interpret_response;
    use crate::domain::{Bay, Level, Matrix};
    use crate::error::SyncError;
    use serde_json::json;

    #[test]
    fn success_bodies_are_normalized() {
        let matrix = interpret_response(
            200,
            Some(json!({ "B05": { "L02": { "items": [{ "size_id": "45x90", "pieces": 3 }] } } })),
        )
        .expect("object body should decode");
        assert_eq!(
            matrix
                .cell(Bay::B05, Level::L02)
                .map(|cell| cell.items[0].pieces),
            Some(3)
        );
        assert_eq!(
            interpret_response(200, Some(json!({}))).expect("empty object decodes"),
            Matrix::empty()
        );
    }

    #[test]
    fn non_object_success_is_a_decode_error() {
        assert!(matches!(
            interpret_response(200, Some(json!([1, 2]))),
            Err(SyncError::Decode(_))
        ));
        assert!(matches!(
            interpret_response(200, None),
            Err(SyncError::Decode(_))
        ));
    }

    #[test]
    fn failures_carry_the_server_message() {
        let err = interpret_response(500, Some(json!({ "error": "Internal server error" })))
            .expect_err("500 should fail");
        assert_eq!(
            err,
            SyncError::Server {
                status: 500,
                message: "Internal server error".to_string()
            }
        );
        let err = interpret_response(400, Some(json!({ "error": "Bay is out of range" })))
            .expect_err("400 should fail");
        assert_eq!(err, SyncError::Validation("Bay is out of range".to_string()));
        let err = interpret_response(502, None).expect_err("502 should fail");
        assert_eq!(err.message(), "Bad Gateway");
    }
}
