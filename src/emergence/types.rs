use serde::{Deserialize, Serialize};

// --- Request types ---

#[derive(Debug, Serialize)]
pub struct CreateWorkflowRequest<'a> {
    pub prompt: &'a str,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowResponse {
    /// Remote-assigned workflow identifier; the handle for all polling.
    pub workflow_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PollResponse {
    #[serde(default)]
    pub data: WorkflowData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkflowData {
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: WorkflowStatus,
    pub output: Option<String>,
}

// The orchestrator sometimes reports `"status": null` before a workflow
// has made progress; treat that the same as an absent field.
fn status_or_unknown<'de, D>(deserializer: D) -> Result<WorkflowStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<WorkflowStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Workflow state as reported by the orchestrator on each poll.
///
/// The service reports uppercase strings; anything it sends outside the
/// three recognized terminal states is treated as `Unknown` and keeps the
/// poll loop going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStatus {
    Success,
    Failed,
    Timeout,
    #[serde(other)]
    Unknown,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Success | WorkflowStatus::Failed | WorkflowStatus::Timeout
        )
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        WorkflowStatus::Unknown
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            WorkflowStatus::Success => "SUCCESS",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::Timeout => "TIMEOUT",
            WorkflowStatus::Unknown => "UNKNOWN",
        };
        f.write_str(status)
    }
}
