use async_trait::async_trait;
use serde_json::json;

use crate::agent::tools::Tool;
use crate::emergence::WorkflowClient;

/// Bridges the Emergence workflow client into the conversational runtime
/// as the `run_emergence_query` capability. Relays the invocation to
/// [`WorkflowClient::run`] and returns its result string verbatim.
pub struct EmergenceQueryTool {
    client: WorkflowClient,
}

impl EmergenceQueryTool {
    pub fn new(client: WorkflowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for EmergenceQueryTool {
    fn name(&self) -> &str {
        "run_emergence_query"
    }

    fn description(&self) -> &str {
        "Run a query through the Emergence Web Orchestrator to get real-time information"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The query to send to the Emergence Web Orchestrator"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: serde_json::Value) -> String {
        let Some(query) = args["query"].as_str() else {
            return "Missing 'query' parameter".to_string();
        };

        self.client.run(query).await
    }
}
