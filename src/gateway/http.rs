use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;

use super::{interpret_response, MatrixGateway};
use crate::domain::{Bay, BayColumn, Matrix};
use crate::error::SyncError;
use crate::wire::{BayReplacement, MATRIX_PATH};

/// Remote store reached over HTTP at `{base_url}/matrix`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    endpoint: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), MATRIX_PATH),
        })
    }

    fn exchange(&self, request: RequestBuilder) -> Result<Matrix, SyncError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .map_err(|err| SyncError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|err| SyncError::Transport(err.to_string()))?;
        let body = serde_json::from_str::<Value>(&text).ok();
        tracing::debug!(endpoint = %self.endpoint, status, "matrix store answered");
        interpret_response(status, body)
    }
}

impl MatrixGateway for HttpGateway {
    fn fetch_full_matrix(&self) -> Result<Matrix, SyncError> {
        self.exchange(self.client.get(&self.endpoint))
    }

    fn replace_bay(&self, bay: Bay, column: &BayColumn) -> Result<Matrix, SyncError> {
        self.exchange(self.client.patch(&self.endpoint).json(&BayReplacement {
            bay,
            levels: column,
        }))
    }

    fn replace_matrix(&self, matrix: &Matrix) -> Result<Matrix, SyncError> {
        self.exchange(self.client.put(&self.endpoint).json(matrix))
    }
}
