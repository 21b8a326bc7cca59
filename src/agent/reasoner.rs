//! Reasoning / tool-execution stage
//!
//! One tool-enabled generation call, sequential execution of whatever tools
//! it requests, then a grounding call that sees only the tool results.

use super::prompts::{grounding_prompt, reasoner_system_prompt, NO_TOOL_RESULTS};
use crate::config::AgentConfig;
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmResponse, SystemContent};
use crate::runtime::{LlmClient, ToolExecutor};
use crate::state_machine::{ConversationState, HistoryEntry, Role, StateUpdate};

const ALL_FAILED_NOTE: &str = "Note: an error occurred while retrieving data from the FHIR server, so no patient data could be retrieved.";

/// A tool call that was actually dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub success: bool,
}

#[derive(Debug)]
pub struct ReasoningOutcome {
    pub update: StateUpdate,
    pub invocations: Vec<Invocation>,
}

/// Run the reasoning stage. Never fails: generation errors become an
/// apologetic answer with `failure` set.
pub async fn reason<L, T>(
    llm: &L,
    tools: &T,
    state: &ConversationState,
    config: &AgentConfig,
) -> ReasoningOutcome
where
    L: LlmClient + ?Sized,
    T: ToolExecutor + ?Sized,
{
    let system = vec![SystemContent::new(reasoner_system_prompt(state))];
    let mut invocations = Vec::new();

    match run_passes(llm, tools, state, config, system, &mut invocations).await {
        Ok(answer) => {
            let executed = invocations.len();
            let all_failed = executed > 0 && invocations.iter().all(|i| !i.success);

            let (answer, failure) = if all_failed {
                tracing::warn!(executed, "Every data request failed");
                (
                    acknowledge_failure(&answer),
                    Some(format!("all {executed} data requests failed")),
                )
            } else {
                (answer, None)
            };

            ReasoningOutcome {
                update: StateUpdate {
                    append_history: vec![HistoryEntry::assistant(answer.clone())],
                    answer: Some(answer),
                    failure,
                    iteration_increment: 1,
                    ..StateUpdate::default()
                },
                invocations,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, kind = ?e.kind, "Reasoning stage failed");
            let answer = format!(
                "I apologize, but I encountered an error while trying to fetch data from the FHIR server: {e}"
            );
            ReasoningOutcome {
                update: StateUpdate {
                    append_history: vec![HistoryEntry::assistant(answer.clone())],
                    answer: Some(answer),
                    failure: Some(e.to_string()),
                    ..StateUpdate::default()
                },
                invocations,
            }
        }
    }
}

async fn run_passes<L, T>(
    llm: &L,
    tools: &T,
    state: &ConversationState,
    config: &AgentConfig,
    system: Vec<SystemContent>,
    invocations: &mut Vec<Invocation>,
) -> Result<String, LlmError>
where
    L: LlmClient + ?Sized,
    T: ToolExecutor + ?Sized,
{
    let messages = state
        .recent_history(config.context_window)
        .iter()
        .map(|entry| match entry.role {
            Role::User => LlmMessage::user(entry.content.clone()),
            Role::Assistant => LlmMessage::assistant(entry.content.clone()),
        })
        .collect();

    let request = LlmRequest::new(system.clone(), messages)
        .with_tools(tools.definitions())
        .with_temperature(config.temperature);
    let first = llm.complete(&request).await?;

    if !first.has_tool_use() {
        return Ok(first.text());
    }

    let tool_results = execute_requested(tools, &first, invocations).await;
    let grounding = LlmRequest::new(
        system,
        vec![LlmMessage::user(grounding_prompt(&tool_results, state.query()))],
    )
    .with_temperature(config.temperature);

    Ok(llm.complete(&grounding).await?.text())
}

/// Execute requested tools one after another, in requested order.
/// Returns the labelled result blocks joined by blank lines.
async fn execute_requested<T: ToolExecutor + ?Sized>(
    tools: &T,
    response: &LlmResponse,
    invocations: &mut Vec<Invocation>,
) -> String {
    let mut blocks = Vec::new();

    for (id, name, input) in response.tool_uses() {
        let Some(output) = tools.execute(name, input.clone()).await else {
            tracing::warn!(tool = %name, tool_use_id = %id, "Skipping unknown tool");
            continue;
        };

        tracing::info!(
            tool = %name,
            tool_use_id = %id,
            success = output.success,
            output_len = output.output.len(),
            "Tool executed"
        );
        invocations.push(Invocation {
            name: name.to_string(),
            success: output.success,
        });
        blocks.push(format!("Tool: {name}\nResult: {}", output.output));
    }

    if blocks.is_empty() {
        NO_TOOL_RESULTS.to_string()
    } else {
        blocks.join("\n\n")
    }
}

fn acknowledge_failure(answer: &str) -> String {
    let answer = answer.trim_end();
    if answer.is_empty() {
        ALL_FAILED_NOTE.to_string()
    } else {
        format!("{answer}\n\n{ALL_FAILED_NOTE}")
    }
}
