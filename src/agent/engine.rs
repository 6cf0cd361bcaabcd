use crate::agent::openai::{ChatMessage, ChatRequest, OpenAiClient, ToolCall};
use crate::agent::prompt;
use crate::agent::tools::ToolRegistry;
use crate::error::{AppError, Result};

/// Outcome of one conversation.
#[derive(Debug)]
pub enum ChatOutcome {
    /// The assistant produced a final answer.
    Answered { reply: String },
    /// The assistant kept requesting tools past the round limit.
    RoundLimitReached { message: String },
    /// The conversation could not be completed.
    Failed { error: String },
}

pub struct ChatEngine {
    client: OpenAiClient,
    tools: ToolRegistry,
    max_tool_rounds: u32,
}

impl ChatEngine {
    pub fn new(client: OpenAiClient, tools: ToolRegistry, max_tool_rounds: u32) -> Self {
        Self {
            client,
            tools,
            max_tool_rounds,
        }
    }

    /// Run one conversation: seed the system and user messages, dispatch
    /// any tool calls the assistant makes, and return its final reply.
    pub async fn run(&self, user_prompt: &str) -> ChatOutcome {
        let tool_definitions = self.tools.definitions();

        let mut messages = vec![
            ChatMessage::system(prompt::assistant_system_prompt()),
            ChatMessage::user(user_prompt),
        ];

        let mut tool_rounds = 0u32;

        loop {
            let request = ChatRequest {
                model: self.client.model().to_string(),
                messages: messages.clone(),
                temperature: self.client.temperature(),
                tools: tool_definitions.clone(),
            };

            let response = match self.client.send_chat(&request).await {
                Ok(r) => r,
                Err(e) => {
                    return ChatOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            if let Some(usage) = &response.usage {
                tracing::debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Chat response"
                );
            }

            let Some(choice) = response.choices.into_iter().next() else {
                return ChatOutcome::Failed {
                    error: "OpenAI response contained no choices".to_string(),
                };
            };
            let message = choice.message;

            // Branch on the tool_calls field; finish_reason is not
            // reliable across gateways.
            let tool_calls = message.tool_calls.clone().unwrap_or_default();

            if tool_calls.is_empty() {
                let reply = strip_terminate(message.content.as_deref().unwrap_or_default());
                tracing::info!(tool_rounds, "Assistant answered");
                return ChatOutcome::Answered { reply };
            }

            if tool_rounds >= self.max_tool_rounds {
                tracing::warn!(
                    max_tool_rounds = self.max_tool_rounds,
                    "Tool round limit reached without a final answer"
                );
                return ChatOutcome::RoundLimitReached {
                    message: "The assistant did not produce a final answer within the allowed number of tool calls.".to_string(),
                };
            }
            tool_rounds += 1;

            // Echo the assistant's tool-call message back into the
            // conversation, then answer each call with a tool message.
            messages.push(message);

            for call in &tool_calls {
                tracing::info!(tool = %call.function.name, "Executing tool");

                let content = match self.execute_tool(call).await {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::warn!(tool = %call.function.name, error = %e, "Tool call failed");
                        format!("Error: {e}")
                    }
                };

                messages.push(ChatMessage::tool_result(call.id.clone(), content));
            }
        }
    }

    async fn execute_tool(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .tools
            .get(&call.function.name)
            .ok_or_else(|| AppError::Agent(format!("Unknown tool: {}", call.function.name)))?;

        let args: serde_json::Value = serde_json::from_str(&call.function.arguments)?;

        Ok(tool.invoke(args).await)
    }
}

/// Drop the trailing `TERMINATE` marker the system prompt asks the
/// assistant to end with.
fn strip_terminate(reply: &str) -> String {
    let trimmed = reply.trim();
    match trimmed.strip_suffix("TERMINATE") {
        Some(rest) => rest.trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::agent::tools::Tool;

    struct StubTool {
        calls: Arc<Mutex<Vec<Value>>>,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            "stub_lookup"
        }

        fn description(&self) -> &str {
            "Stub lookup for tests"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            })
        }

        async fn invoke(&self, args: Value) -> String {
            self.calls.lock().unwrap().push(args);
            self.reply.to_string()
        }
    }

    fn engine_for(server: &MockServer, tools: ToolRegistry, max_tool_rounds: u32) -> ChatEngine {
        let client = OpenAiClient::new("test-key", "gpt-4", 0.7)
            .with_api_url(format!("{}/v1/chat/completions", server.uri()));
        ChatEngine::new(client, tools, max_tool_rounds)
    }

    fn assistant_text(content: &str) -> Value {
        json!({
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    fn assistant_tool_call(name: &str, arguments: &str) -> Value {
        json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": name, "arguments": arguments }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_tool_call(
                "stub_lookup",
                r#"{"query": "capital of France"}"#,
            )))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(assistant_text("The capital of France is Paris.\nTERMINATE")),
            )
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(StubTool {
            calls: Arc::clone(&calls),
            reply: "Paris is the capital of France.",
        }));

        let outcome = engine_for(&server, tools, 2).run("capital of France").await;

        match outcome {
            ChatOutcome::Answered { reply } => {
                assert_eq!(reply, "The capital of France is Paris.");
            }
            other => panic!("expected final answer, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0], json!({ "query": "capital of France" }));
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_text("Just Paris.")))
            .mount(&server)
            .await;

        let outcome = engine_for(&server, ToolRegistry::new(), 2).run("capital?").await;

        match outcome {
            ChatOutcome::Answered { reply } => assert_eq!(reply, "Just Paris."),
            other => panic!("expected final answer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_round_limit_stops_tool_loop() {
        let server = MockServer::start().await;
        // The assistant keeps asking for the same tool on every turn.
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_tool_call(
                "stub_lookup",
                r#"{"query": "again"}"#,
            )))
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(StubTool {
            calls: Arc::clone(&calls),
            reply: "partial",
        }));

        let outcome = engine_for(&server, tools, 1).run("loop forever").await;

        assert!(matches!(outcome, ChatOutcome::RoundLimitReached { .. }));
        // One executed round, then the limit cuts the second one off.
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_api_failure_surfaces_as_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let outcome = engine_for(&server, ToolRegistry::new(), 2).run("hello").await;

        match outcome {
            ChatOutcome::Failed { error } => {
                assert!(error.contains("OpenAI API error"), "got: {error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let outcome = engine_for(&server, ToolRegistry::new(), 2).run("hello").await;

        match outcome {
            ChatOutcome::Failed { error } => {
                assert!(error.contains("no choices"), "got: {error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparsable_arguments_become_error_tool_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(assistant_tool_call("stub_lookup", "{not json")),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_text("Recovered.")))
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(StubTool {
            calls: Arc::clone(&calls),
            reply: "unused",
        }));

        let outcome = engine_for(&server, tools, 2).run("hello").await;

        match outcome {
            ChatOutcome::Answered { reply } => assert_eq!(reply, "Recovered."),
            other => panic!("expected recovery, got {other:?}"),
        }
        // The tool itself must never run on malformed arguments.
        assert!(calls.lock().unwrap().is_empty());

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
        let last = body["messages"].as_array().unwrap().last().unwrap();
        assert_eq!(last["role"], "tool");
        assert!(last["content"].as_str().unwrap().starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_back_to_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_tool_call(
                "nonexistent",
                r#"{"query": "x"}"#,
            )))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(assistant_text("Recovered.")))
            .mount(&server)
            .await;

        let outcome = engine_for(&server, ToolRegistry::new(), 2).run("hello").await;

        match outcome {
            ChatOutcome::Answered { reply } => assert_eq!(reply, "Recovered."),
            other => panic!("expected recovery, got {other:?}"),
        }

        // The second request must carry the error back as a tool message.
        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
        let last = body["messages"].as_array().unwrap().last().unwrap();
        assert_eq!(last["role"], "tool");
        assert!(last["content"]
            .as_str()
            .unwrap()
            .contains("Unknown tool: nonexistent"));
    }

    #[test]
    fn test_strip_terminate() {
        assert_eq!(strip_terminate("Paris.\nTERMINATE"), "Paris.");
        assert_eq!(strip_terminate("Paris."), "Paris.");
        assert_eq!(strip_terminate("TERMINATE"), "");
        assert_eq!(strip_terminate("  Paris.  "), "Paris.");
    }
}
