//! Intent classification stage

use super::prompts::{classification_schema, CLASSIFICATION_SCHEMA_NAME, CLASSIFIER_PROMPT};
use crate::config::AgentConfig;
use crate::llm::{LlmMessage, LlmRequest, ResponseFormat, SystemContent};
use crate::runtime::LlmClient;
use crate::state_machine::{ConversationState, Intent, OperationKind, ResourceScope, StateUpdate};
use serde::Deserialize;

/// Structured reply of the classifier. Every field is optional so unknown
/// or missing values degrade to absence instead of a parse failure.
#[derive(Debug, Default, Deserialize)]
struct ClassificationRecord {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    resource_type: Option<String>,
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    requires_clarification: Option<bool>,
}

/// Classify the turn's query. Never fails: a call or parse failure yields
/// `general_question` plus a recorded failure.
pub async fn classify<L: LlmClient + ?Sized>(
    llm: &L,
    state: &ConversationState,
    config: &AgentConfig,
) -> StateUpdate {
    let request = LlmRequest::new(
        vec![SystemContent::new(CLASSIFIER_PROMPT)],
        vec![LlmMessage::user(state.query())],
    )
    .with_temperature(config.temperature)
    .with_response_format(ResponseFormat::JsonSchema {
        name: CLASSIFICATION_SCHEMA_NAME.to_string(),
        schema: classification_schema(),
    });

    let reply = match llm.complete(&request).await {
        Ok(response) => response.text(),
        Err(e) => return fallback(format!("Intent classification failed: {e}")),
    };

    match parse_classification(&reply) {
        Ok(update) => {
            tracing::info!(
                intent = update.intent.map(Intent::as_str),
                resource_type = update.resource_kind.map(ResourceScope::as_str),
                operation = update.operation_kind.map(OperationKind::as_str),
                "Query classified"
            );
            update
        }
        Err(e) => fallback(format!("Intent classification failed: {e}")),
    }
}

fn fallback(reason: String) -> StateUpdate {
    tracing::warn!(error = %reason, "Falling back to general_question");
    StateUpdate {
        intent: Some(Intent::GeneralQuestion),
        failure: Some(reason),
        ..StateUpdate::default()
    }
}

/// Parse the classifier's reply, tolerating a surrounding Markdown fence
pub(crate) fn parse_classification(reply: &str) -> Result<StateUpdate, serde_json::Error> {
    let record: ClassificationRecord = serde_json::from_str(strip_code_fence(reply))?;

    let intent = match record.intent.as_deref().and_then(Intent::parse) {
        Some(intent) => Some(intent),
        None if record.requires_clarification == Some(true) => Some(Intent::ClarificationNeeded),
        None => None,
    };

    Ok(StateUpdate {
        intent,
        resource_kind: record.resource_type.as_deref().and_then(ResourceScope::parse),
        operation_kind: record.operation.as_deref().and_then(OperationKind::parse),
        ..StateUpdate::default()
    })
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    // Language tag ("json"), on its own line or not
    body.trim_start_matches(|c: char| c.is_ascii_alphanumeric()).trim()
}
