//! `OpenAI`-compatible chat-completions provider

use super::types::{
    ContentBlock, LlmMessage, LlmRequest, LlmResponse, MessageRole, ResponseFormat, Usage,
};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions client for `OpenAI` or any compatible gateway
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAIService {
    pub fn new(
        api_key: String,
        model: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub(super) fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::new();

        if !request.system.is_empty() {
            let system_text = request
                .system
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(system_text),
                tool_calls: None,
            });
        }

        messages.extend(request.messages.iter().map(Self::translate_message));

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| OpenAITool {
                        r#type: "function".to_string(),
                        function: OpenAIFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            tools,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.response_format.as_ref().map(translate_format),
            stream: false,
        }
    }

    /// Conversation history is text only; tool calls are never replayed.
    pub(super) fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
        let role = match msg.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        OpenAIMessage {
            role: role.to_string(),
            content: Some(msg.text()),
            tool_calls: None,
        }
    }

    pub(super) fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let mut content = Vec::new();

        if let Some(text) = choice.message.content {
            if !text.is_empty() {
                content.push(ContentBlock::Text { text });
            }
        }

        if let Some(tool_calls) = choice.message.tool_calls {
            for tc in tool_calls {
                if tc.function.name.is_empty() {
                    continue;
                }

                let input = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or_else(|_| serde_json::json!({}));

                content.push(ContentBlock::ToolUse {
                    id: tc.id,
                    name: tc.function.name,
                    input,
                });
            }
        }

        if content.is_empty() {
            return Err(LlmError::unknown("Empty response from model"));
        }

        let end_turn = choice.finish_reason.as_deref() == Some("stop");
        let usage = resp.usage.unwrap_or_default();

        Ok(LlmResponse {
            content,
            end_turn,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_tokens),
                output_tokens: u64::from(usage.completion_tokens),
            },
        })
    }
}

fn translate_format(format: &ResponseFormat) -> OpenAIResponseFormat {
    let ResponseFormat::JsonSchema { name, schema } = format;
    OpenAIResponseFormat {
        r#type: "json_schema".to_string(),
        json_schema: OpenAIJsonSchema {
            name: name.clone(),
            schema: schema.clone(),
            strict: false,
        },
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(&body) {
                return Err(LlmError::from_status(status.as_u16(), &error_resp.error.message));
            }
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
pub(super) struct OpenAIRequest {
    pub(super) model: String,
    pub(super) messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) response_format: Option<OpenAIResponseFormat>,
    pub(super) stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct OpenAIMessage {
    pub(super) role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Serialize)]
pub(super) struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(super) struct OpenAIResponseFormat {
    pub(super) r#type: String,
    json_schema: OpenAIJsonSchema,
}

#[derive(Debug, Serialize)]
struct OpenAIJsonSchema {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct OpenAIToolCall {
    pub(super) id: String,
    pub(super) r#type: String,
    pub(super) function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct OpenAIFunctionCall {
    pub(super) name: String,
    pub(super) arguments: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIResponse {
    pub(super) choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub(super) usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIChoice {
    pub(super) message: OpenAIMessage,
    pub(super) finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
pub(super) struct OpenAIUsage {
    pub(super) prompt_tokens: u32,
    pub(super) completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}
