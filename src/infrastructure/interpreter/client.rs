//! HTTP adapter for the interpretation backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::InterpreterApiError;
use super::types::{InterpretRequest, InterpretResponse};
use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{CaseDocument, InterpreterConfig, ParsedUpdate, WorkflowPhase};
use crate::domain::ports::UpdateInterpreter;

/// Reqwest-backed client for the interpretation service.
///
/// A pure boundary: one POST per interpret call, no retries and no rate
/// limiting (those are the hosting UI's concerns), timeout owned by the
/// transport. Connection pooling comes with the reused
/// `reqwest::Client`.
pub struct HttpInterpreterClient {
    http_client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    max_snapshot_bytes: usize,
}

impl HttpInterpreterClient {
    /// Build a client from configuration.
    pub fn new(config: &InterpreterConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_snapshot_bytes: config.max_snapshot_bytes,
        })
    }

    async fn send_request(
        &self,
        request: &InterpretRequest<'_>,
    ) -> Result<InterpretResponse, InterpreterApiError> {
        let mut builder = self
            .http_client
            .post(format!("{}/v1/interpret", self.base_url))
            .header("content-type", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                InterpreterApiError::Timeout
            } else {
                InterpreterApiError::Network(err)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(InterpreterApiError::from_status(status, body));
        }

        let body = response.text().await.map_err(InterpreterApiError::Network)?;
        let parsed: InterpretResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}

#[async_trait]
impl UpdateInterpreter for HttpInterpreterClient {
    #[instrument(skip_all, fields(phase = phase.as_str()))]
    async fn interpret(
        &self,
        instruction: &str,
        phase: WorkflowPhase,
        snapshot: &CaseDocument,
    ) -> EngineResult<ParsedUpdate> {
        let snapshot_size = serde_json::to_vec(snapshot)
            .map_err(|err| EngineError::Interpretation(err.to_string()))?
            .len();
        if snapshot_size > self.max_snapshot_bytes {
            return Err(EngineError::Interpretation(format!(
                "document snapshot of {snapshot_size} bytes exceeds the configured limit"
            )));
        }

        let request = InterpretRequest {
            instruction,
            phase: phase.as_str(),
            case: snapshot,
        };
        debug!(snapshot_size, "sending interpretation request");

        self.send_request(&request)
            .await
            .map(ParsedUpdate::from)
            .map_err(|err| EngineError::Interpretation(err.to_string()))
    }
}
