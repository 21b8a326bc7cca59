//! Runtime for executing turns
//!
//! [`TurnRuntime`] is the graph controller: it feeds events to the pure
//! transition function and executes the effects it returns against the
//! generation and tool collaborators.

pub mod traits;

#[cfg(test)]
pub mod testing;

pub use traits::*;

use crate::agent::{self, Invocation, FALLBACK_ANSWER};
use crate::config::AgentConfig;
use crate::state_machine::{
    transition, ConversationState, Effect, Event, HistoryEntry, Intent, OperationKind,
    ResourceScope, TurnPhase,
};
use std::sync::Arc;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = TurnRuntime<ServiceLlmClient, ToolRegistryExecutor>;

/// Everything a caller gets back from one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn_id: String,
    /// Formatted answer, never empty
    pub answer: String,
    /// Prior history plus every entry appended during the turn
    pub history: Vec<HistoryEntry>,
    pub failure: Option<String>,
    pub intent: Option<Intent>,
    pub resource_kind: Option<ResourceScope>,
    pub operation_kind: Option<OperationKind>,
    pub iteration_count: u32,
    /// Tool calls dispatched by the reasoner, in order
    pub invocations: Vec<Invocation>,
}

/// Generic turn runtime that can work with any LLM and tool implementations
pub struct TurnRuntime<L, T>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    llm_client: Arc<L>,
    tool_executor: Arc<T>,
    config: AgentConfig,
}

impl<L, T> TurnRuntime<L, T>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    pub fn new(llm_client: L, tool_executor: T, config: AgentConfig) -> Self {
        Self {
            llm_client: Arc::new(llm_client),
            tool_executor: Arc::new(tool_executor),
            config,
        }
    }

    /// Run one query through classifier, reasoner and formatter
    pub async fn run_turn(&self, history: Vec<HistoryEntry>, query: &str) -> TurnOutcome {
        let turn_id = uuid::Uuid::new_v4().to_string();
        let prior_len = history.len();
        tracing::info!(
            turn_id = %turn_id,
            model = %self.llm_client.model_id(),
            history_len = prior_len,
            "Starting turn"
        );

        let mut state = ConversationState::new(history, query);
        let mut phase = TurnPhase::Idle;
        let mut event = Event::TurnStarted;
        let mut invocations = Vec::new();
        let mut formatted = false;

        loop {
            let result = match transition(&phase, &state, &self.config, event) {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(turn_id = %turn_id, error = %e, ?phase, "Invalid transition");
                    if !formatted {
                        let update = agent::format_response(&state);
                        state.apply(update);
                    }
                    break;
                }
            };

            tracing::debug!(turn_id = %turn_id, from = ?phase, to = ?result.new_phase, "Phase transition");
            phase = result.new_phase;
            event = match result.effect {
                Effect::Classify => {
                    let update = agent::classify(self.llm_client.as_ref(), &state, &self.config).await;
                    state.apply(update);
                    Event::Classified
                }
                Effect::Reason => {
                    let outcome = agent::reason(
                        self.llm_client.as_ref(),
                        self.tool_executor.as_ref(),
                        &state,
                        &self.config,
                    )
                    .await;
                    invocations.extend(outcome.invocations);
                    state.apply(outcome.update);
                    Event::Reasoned
                }
                Effect::Format => {
                    let update = agent::format_response(&state);
                    state.apply(update);
                    formatted = true;
                    Event::Formatted
                }
                Effect::Complete => break,
            };
        }

        let answer = state
            .answer
            .clone()
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());

        tracing::info!(
            turn_id = %turn_id,
            intent = state.intent.map(Intent::as_str),
            tool_calls = invocations.len(),
            degraded = state.failure.is_some(),
            appended = state.history.len() - prior_len,
            "Turn completed"
        );

        TurnOutcome {
            turn_id,
            answer,
            history: state.history,
            failure: state.failure,
            intent: state.intent,
            resource_kind: state.resource_kind,
            operation_kind: state.operation_kind,
            iteration_count: state.iteration_count,
            invocations,
        }
    }
}
