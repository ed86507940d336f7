//! The HTTP-shaped contract a matrix store answers to, as a pure dispatcher.
//! Transport is someone else's problem: callers hand in method, path and raw
//! body bytes and get back a status plus JSON body.

use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::Bay;
use crate::normalize::{normalize_bay_column, normalize_matrix};
use crate::store::{MatrixStore, StoreError};

pub const MATRIX_PATH: &str = "/matrix";
pub const HEALTH_PATH: &str = "/healthz";
pub const MAX_BODY_BYTES: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireResponse {
    pub status: u16,
    pub body: Value,
}

impl WireResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    /// The `error` string of a failure body, if there is one.
    #[cfg(test)]
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Patch,
    Options,
    Other,
}

impl Method {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "OPTIONS" => Method::Options,
            _ => Method::Other,
        }
    }
}

/// Request body of a bay replacement.
#[derive(Debug, Serialize)]
pub struct BayReplacement<'a> {
    pub bay: Bay,
    pub levels: &'a crate::domain::BayColumn,
}

pub fn handle<S: MatrixStore + ?Sized>(
    store: &S,
    method: &str,
    path: &str,
    body: &[u8],
) -> WireResponse {
    let method = Method::parse(method);
    let path = path.split('?').next().unwrap_or_default();

    if method == Method::Options {
        return WireResponse {
            status: 204,
            body: Value::Null,
        };
    }

    let response = match (method, path) {
        (Method::Get, HEALTH_PATH) => Ok(WireResponse::ok(json!({ "status": "ok" }))),
        (Method::Get, MATRIX_PATH) => read_response(store),
        (Method::Put, MATRIX_PATH) => match parse_body(body) {
            Ok(payload) => replace_matrix(store, &payload),
            Err(rejection) => Ok(rejection),
        },
        (Method::Patch, MATRIX_PATH) => match parse_body(body) {
            Ok(payload) => replace_bay(store, &payload),
            Err(rejection) => Ok(rejection),
        },
        (_, MATRIX_PATH) => Ok(WireResponse::error(405, "Method not allowed")),
        _ => Ok(WireResponse::error(404, "Not found")),
    };

    response.unwrap_or_else(|err| {
        tracing::error!(error = %err, path, "matrix store failure");
        WireResponse::error(500, "Internal server error")
    })
}

fn parse_body(body: &[u8]) -> Result<Value, WireResponse> {
    if body.len() > MAX_BODY_BYTES {
        return Err(WireResponse::error(413, "Payload too large"));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|_| WireResponse::error(400, "Invalid JSON"))
}

fn read_response<S: MatrixStore + ?Sized>(store: &S) -> Result<WireResponse, StoreError> {
    let matrix = store.read_matrix()?;
    Ok(WireResponse::ok(serde_json::to_value(&matrix)?))
}

fn replace_matrix<S: MatrixStore + ?Sized>(
    store: &S,
    payload: &Value,
) -> Result<WireResponse, StoreError> {
    if !payload.is_object() {
        return Ok(WireResponse::error(400, "Matrix payload must be an object"));
    }
    store.write_matrix(&normalize_matrix(payload))?;
    read_response(store)
}

fn replace_bay<S: MatrixStore + ?Sized>(
    store: &S,
    payload: &Value,
) -> Result<WireResponse, StoreError> {
    let Some(code) = payload.get("bay").and_then(Value::as_str) else {
        return Ok(WireResponse::error(400, "Invalid bay payload"));
    };
    let Some(bay) = Bay::from_code(code) else {
        return Ok(WireResponse::error(400, "Bay is out of range"));
    };
    let levels = payload.get("levels").unwrap_or(&Value::Null);
    store.write_bay(&normalize_bay_column(bay, levels))?;
    read_response(store)
}

#[cfg(test)]
mod tests {
    use super::{handle, BayReplacement, Method, MAX_BODY_BYTES};
    use crate::domain::{Bay, BayColumn, Level, Matrix};
    use crate::test_support::{sample_cell, MemoryStore};
    use serde_json::{json, Value};

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).expect("body should serialize")
    }

    #[test]
    fn get_returns_complete_matrix() {
        let store = MemoryStore::default();
        let response = handle(&store, "GET", "/matrix", b"");
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            serde_json::to_value(Matrix::empty()).expect("serialize")
        );
    }

    #[test]
    fn health_and_preflight_answer_without_store() {
        let store = MemoryStore::failing();
        assert_eq!(
            handle(&store, "GET", "/healthz", b"").body,
            json!({ "status": "ok" })
        );
        let preflight = handle(&store, "OPTIONS", "/matrix", b"");
        assert_eq!(preflight.status, 204);
        assert!(preflight.body.is_null());
    }

    #[test]
    fn patch_replaces_one_bay_and_returns_matrix() {
        let store = MemoryStore::default();
        let mut column = BayColumn::empty(Bay::B03);
        column.set(Level::L01, Some(sample_cell(Bay::B03, Level::L01, 4)));
        let request = serde_json::to_vec(&BayReplacement {
            bay: Bay::B03,
            levels: &column,
        })
        .expect("request should serialize");

        let response = handle(&store, "PATCH", "/matrix", &request);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["B03"]["L01"]["items"][0]["pieces"], json!(4));
        assert!(response.body["B03"]["L02"].is_null());
        assert!(store.snapshot().cell(Bay::B03, Level::L01).is_some());
    }

    #[test]
    fn patch_rejects_out_of_range_bay_without_writing() {
        let store = MemoryStore::default();
        let response = handle(
            &store,
            "PATCH",
            "/matrix",
            &body(json!({ "bay": "B99", "levels": { "L01": { "items": [{ "pieces": 1 }] } } })),
        );
        assert_eq!(response.status, 400);
        assert_eq!(response.error_message(), Some("Bay is out of range"));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn patch_requires_bay_string() {
        let store = MemoryStore::default();
        for payload in [json!({}), json!({ "bay": 3 }), json!([1])] {
            let response = handle(&store, "PATCH", "/matrix", &body(payload));
            assert_eq!(response.status, 400);
            assert_eq!(response.error_message(), Some("Invalid bay payload"));
        }
    }

    #[test]
    fn put_rejects_non_objects_and_normalizes_objects() {
        let store = MemoryStore::default();
        let rejected = handle(&store, "PUT", "/matrix", &body(json!([])));
        assert_eq!(rejected.status, 400);
        assert_eq!(
            rejected.error_message(),
            Some("Matrix payload must be an object")
        );

        let accepted = handle(
            &store,
            "PUT",
            "/matrix",
            &body(json!({ "B02": { "L02": { "items": [{ "size_id": "45x90", "pieces": 2 }] } } })),
        );
        assert_eq!(accepted.status, 200);
        assert_eq!(accepted.body["B02"]["L02"]["bay"], json!("B02"));
        assert_eq!(accepted.body["B02"]["L02"]["level"], json!("L02"));
    }

    #[test]
    fn malformed_and_oversized_bodies_are_rejected() {
        let store = MemoryStore::default();
        let invalid = handle(&store, "PUT", "/matrix", b"{ nope");
        assert_eq!(invalid.status, 400);
        assert_eq!(invalid.error_message(), Some("Invalid JSON"));

        let huge = vec![b' '; MAX_BODY_BYTES + 1];
        let too_large = handle(&store, "PATCH", "/matrix", &huge);
        assert_eq!(too_large.status, 413);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn unknown_routes_and_methods() {
        let store = MemoryStore::default();
        assert_eq!(handle(&store, "GET", "/nope", b"").status, 404);
        let response = handle(&store, "DELETE", "/matrix", b"");
        assert_eq!(response.status, 405);
        assert_eq!(response.error_message(), Some("Method not allowed"));
        assert_eq!(handle(&store, "get", "/matrix?fresh=1", b"").status, 200);
    }

    #[test]
    fn store_failures_become_internal_errors() {
        let store = MemoryStore::failing();
        let response = handle(&store, "GET", "/matrix", b"");
        assert_eq!(response.status, 500);
        assert_eq!(response.error_message(), Some("Internal server error"));
    }

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!(Method::parse("patch"), Method::Patch);
        assert_eq!(Method::parse(" Put "), Method::Put);
        assert_eq!(Method::parse("TRACE"), Method::Other);
    }
}
