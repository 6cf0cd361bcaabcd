use std::time::Duration;

use reqwest::Client;
use uuid::Uuid;

use crate::emergence::types::{
    CreateWorkflowRequest, CreateWorkflowResponse, PollResponse, WorkflowData, WorkflowStatus,
};
use crate::error::{AppError, Result};

const POLL_INTERVAL: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const NO_API_KEY_ADVISORY: &str =
    "No Emergence API Key configured. Please set EMERGENCE_API_KEY.";
const NO_OUTPUT: &str = "No output provided by Emergence.";

/// Client for Emergence AI's web-orchestrator workflow API.
///
/// Drives one complete create-then-poll cycle per [`run`](Self::run) call
/// and reduces it to a single result string; errors never escape past that
/// boundary.
pub struct WorkflowClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    poll_interval: Duration,
    request_timeout: Duration,
}

impl WorkflowClient {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            poll_interval: POLL_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the fixed inter-poll delay (15 seconds by default).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the per-request timeout (30 seconds by default).
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Submit `prompt` as a new workflow and poll until it reaches a
    /// terminal state.
    ///
    /// Always returns a string: the workflow output on success, or a
    /// human-readable description of the failure, terminal status, or
    /// missing configuration. Polling has no iteration bound -- a workflow
    /// that never reports a terminal status keeps this call pending.
    pub async fn run(&self, prompt: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("No Emergence API key configured, skipping workflow");
            return NO_API_KEY_ADVISORY.to_string();
        };

        // One correlation ID per run call, sent identically on the create
        // request and every poll of this workflow.
        let client_id = Uuid::new_v4().to_string();

        let workflow_id = match self.create_workflow(api_key, &client_id, prompt).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Workflow creation failed");
                return format!("Error creating Emergence workflow: {e}");
            }
        };
        tracing::info!(workflow_id = %workflow_id, "Created workflow");

        let mut attempt = 1u32;
        loop {
            tracing::info!(attempt, workflow_id = %workflow_id, "Polling workflow");
            attempt += 1;
            tokio::time::sleep(self.poll_interval).await;

            let data = match self.poll_workflow(api_key, &client_id, &workflow_id).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(error = %e, workflow_id = %workflow_id, "Workflow poll failed");
                    return format!("Polling error: {e}");
                }
            };

            match data.status {
                WorkflowStatus::Success => {
                    return data.output.unwrap_or_else(|| NO_OUTPUT.to_string());
                }
                WorkflowStatus::Failed | WorkflowStatus::Timeout => {
                    return format!("Workflow ended with status {}", data.status);
                }
                WorkflowStatus::Unknown => {}
            }
        }
    }

    async fn create_workflow(
        &self,
        api_key: &str,
        client_id: &str,
        prompt: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .header("apikey", api_key)
            .header("content-type", "application/json")
            .header("Client-ID", client_id)
            .timeout(self.request_timeout)
            .json(&CreateWorkflowRequest { prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmergenceApi(format!(
                "API returned {status}: {body}"
            )));
        }

        let body = response.json::<CreateWorkflowResponse>().await?;
        Ok(body.workflow_id)
    }

    async fn poll_workflow(
        &self,
        api_key: &str,
        client_id: &str,
        workflow_id: &str,
    ) -> Result<WorkflowData> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, workflow_id))
            .header("apikey", api_key)
            .header("content-type", "application/json")
            .header("Client-ID", client_id)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmergenceApi(format!(
                "API returned {status}: {body}"
            )));
        }

        let body = response.json::<PollResponse>().await?;
        Ok(body.data)
    }
}
