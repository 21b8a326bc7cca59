//! Pure phase transition function

use super::state::{ConversationState, Intent};
use super::{Effect, Event};
use crate::config::AgentConfig;
use thiserror::Error;

/// Where a turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Constructed, nothing run yet
    Idle,
    Classifying,
    Reasoning,
    Formatting,
    /// Terminal: the state is handed back to the caller
    Done,
}

/// Result of a state transition
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_phase: TurnPhase,
    pub effect: Effect,
}

impl TransitionResult {
    pub fn new(phase: TurnPhase, effect: Effect) -> Self {
        Self {
            new_phase: phase,
            effect,
        }
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Turn already completed")]
    TurnCompleted,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. The only side
/// effect is the iteration-guard warning in [`route_after_reasoning`].
pub fn transition(
    phase: &TurnPhase,
    state: &ConversationState,
    config: &AgentConfig,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (phase, event) {
        (TurnPhase::Idle, Event::TurnStarted) => {
            Ok(TransitionResult::new(TurnPhase::Classifying, Effect::Classify))
        }

        (TurnPhase::Classifying, Event::Classified) => {
            let next = route_after_intent(state);
            Ok(TransitionResult::new(next, effect_for(next)))
        }

        (TurnPhase::Reasoning, Event::Reasoned) => {
            let next = route_after_reasoning(state, config);
            Ok(TransitionResult::new(next, effect_for(next)))
        }

        (TurnPhase::Formatting, Event::Formatted) => {
            Ok(TransitionResult::new(TurnPhase::Done, Effect::Complete))
        }

        (TurnPhase::Done, _) => Err(TransitionError::TurnCompleted),

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while {phase:?}"
        ))),
    }
}

/// Branch after classification. Every intent continues to reasoning;
/// greetings are answered by the model like any other query.
pub fn route_after_intent(state: &ConversationState) -> TurnPhase {
    match state.intent {
        Some(
            Intent::Greeting
            | Intent::PatientDataQuery
            | Intent::SearchQuery
            | Intent::GeneralQuestion
            | Intent::ClarificationNeeded,
        )
        | None => TurnPhase::Reasoning,
    }
}

/// Branch after reasoning. Reaching the iteration guard is reported but ends
/// in formatting exactly like the normal path.
pub fn route_after_reasoning(state: &ConversationState, config: &AgentConfig) -> TurnPhase {
    if state.iteration_count >= config.max_iterations {
        tracing::warn!(
            iteration_count = state.iteration_count,
            max_iterations = config.max_iterations,
            "Iteration guard reached"
        );
    }
    TurnPhase::Formatting
}

fn effect_for(phase: TurnPhase) -> Effect {
    match phase {
        TurnPhase::Idle | TurnPhase::Classifying => Effect::Classify,
        TurnPhase::Reasoning => Effect::Reason,
        TurnPhase::Formatting => Effect::Format,
        TurnPhase::Done => Effect::Complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> ConversationState {
        ConversationState::new(vec![], "hello")
    }

    #[test]
    fn test_linear_path() {
        let state = fresh();
        let config = AgentConfig::default();
        let mut phase = TurnPhase::Idle;
        let mut effects = Vec::new();

        for event in [
            Event::TurnStarted,
            Event::Classified,
            Event::Reasoned,
            Event::Formatted,
        ] {
            let result = transition(&phase, &state, &config, event).unwrap();
            phase = result.new_phase;
            effects.push(result.effect);
        }

        assert_eq!(phase, TurnPhase::Done);
        assert_eq!(
            effects,
            vec![Effect::Classify, Effect::Reason, Effect::Format, Effect::Complete]
        );
    }

    #[test]
    fn test_out_of_order_event_rejected() {
        let result = transition(
            &TurnPhase::Classifying,
            &fresh(),
            &AgentConfig::default(),
            Event::Reasoned,
        );
        assert!(matches!(result, Err(TransitionError::InvalidTransition(_))));
    }

    #[test]
    fn test_done_is_terminal() {
        let result = transition(
            &TurnPhase::Done,
            &fresh(),
            &AgentConfig::default(),
            Event::TurnStarted,
        );
        assert_eq!(result, Err(TransitionError::TurnCompleted));
    }

    #[test]
    fn test_iteration_guard_routes_to_formatting() {
        let mut state = fresh();
        state.iteration_count = 7;
        let config = AgentConfig::default();
        assert_eq!(route_after_reasoning(&state, &config), TurnPhase::Formatting);
    }
}
