//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::config::AgentConfig;
use crate::fhir::ResourceKind;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_intent() -> impl Strategy<Value = Option<Intent>> {
    prop_oneof![
        Just(None),
        Just(Some(Intent::Greeting)),
        Just(Some(Intent::PatientDataQuery)),
        Just(Some(Intent::SearchQuery)),
        Just(Some(Intent::GeneralQuestion)),
        Just(Some(Intent::ClarificationNeeded)),
    ]
}

fn arb_scope() -> impl Strategy<Value = Option<ResourceScope>> {
    prop_oneof![
        Just(None),
        Just(Some(ResourceScope::All)),
        proptest::sample::select(ResourceKind::ALL.to_vec())
            .prop_map(|kind| Some(ResourceScope::Kind(kind))),
    ]
}

fn arb_entry() -> impl Strategy<Value = HistoryEntry> {
    (any::<bool>(), "[a-zA-Z0-9 ]{0,30}").prop_map(|(user, content)| {
        if user {
            HistoryEntry::user(content)
        } else {
            HistoryEntry::assistant(content)
        }
    })
}

fn arb_update() -> impl Strategy<Value = StateUpdate> {
    (
        proptest::collection::vec(arb_entry(), 0..3),
        arb_intent(),
        arb_scope(),
        proptest::option::of("[a-z ]{1,20}"),
        proptest::option::of("[a-z ]{1,20}"),
        0u32..3,
    )
        .prop_map(
            |(append_history, intent, resource_kind, answer, failure, iteration_increment)| {
                StateUpdate {
                    append_history,
                    intent,
                    resource_kind,
                    operation_kind: None,
                    answer,
                    failure,
                    iteration_increment,
                }
            },
        )
}

fn arb_state() -> impl Strategy<Value = ConversationState> {
    (
        proptest::collection::vec(arb_entry(), 0..20),
        "[a-zA-Z ]{1,30}",
        arb_intent(),
        0u32..12,
    )
        .prop_map(|(history, query, intent, iteration_count)| {
            let mut state = ConversationState::new(history, query);
            state.intent = intent;
            state.iteration_count = iteration_count;
            state
        })
}

fn arb_phase() -> impl Strategy<Value = TurnPhase> {
    prop_oneof![
        Just(TurnPhase::Idle),
        Just(TurnPhase::Classifying),
        Just(TurnPhase::Reasoning),
        Just(TurnPhase::Formatting),
        Just(TurnPhase::Done),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::TurnStarted),
        Just(Event::Classified),
        Just(Event::Reasoned),
        Just(Event::Formatted),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Merging updates never drops history or lowers the iteration count
    #[test]
    fn prop_apply_is_monotonic(
        mut state in arb_state(),
        updates in proptest::collection::vec(arb_update(), 0..6)
    ) {
        for update in updates {
            let before_history = state.history.clone();
            let before_iterations = state.iteration_count;
            let before_query = state.query().to_string();
            let appended = update.append_history.clone();

            state.apply(update);

            prop_assert!(state.history.starts_with(&before_history));
            prop_assert_eq!(&state.history[before_history.len()..], appended.as_slice());
            prop_assert!(state.iteration_count >= before_iterations);
            prop_assert_eq!(state.query(), before_query.as_str());
        }
    }

    /// A recorded failure is never erased by a later update
    #[test]
    fn prop_failure_is_sticky(
        mut state in arb_state(),
        first in "[a-z]{1,10}",
        updates in proptest::collection::vec(arb_update(), 0..6)
    ) {
        state.apply(StateUpdate { failure: Some(first.clone()), ..StateUpdate::default() });
        for update in updates {
            state.apply(update);
            let failure = state.failure.clone().unwrap_or_default();
            prop_assert!(failure.starts_with(&first));
        }
    }

    /// Every intent, including none, continues to reasoning
    #[test]
    fn prop_intent_routing_is_degenerate(state in arb_state()) {
        prop_assert_eq!(route_after_intent(&state), TurnPhase::Reasoning);
    }

    /// Every iteration count ends in formatting
    #[test]
    fn prop_reasoning_routing_is_degenerate(state in arb_state(), max in 0u32..10) {
        let config = AgentConfig { max_iterations: max, ..AgentConfig::default() };
        prop_assert_eq!(route_after_reasoning(&state, &config), TurnPhase::Formatting);
    }

    /// Nothing leaves the terminal phase
    #[test]
    fn prop_done_is_terminal(state in arb_state(), event in arb_event()) {
        let result = transition(&TurnPhase::Done, &state, &AgentConfig::default(), event);
        prop_assert_eq!(result, Err(TransitionError::TurnCompleted));
    }

    /// Each phase accepts exactly one event
    #[test]
    fn prop_one_event_per_phase(
        state in arb_state(),
        phase in arb_phase(),
        event in arb_event()
    ) {
        let expected = matches!(
            (phase, event),
            (TurnPhase::Idle, Event::TurnStarted)
                | (TurnPhase::Classifying, Event::Classified)
                | (TurnPhase::Reasoning, Event::Reasoned)
                | (TurnPhase::Formatting, Event::Formatted)
        );
        let result = transition(&phase, &state, &AgentConfig::default(), event);
        prop_assert_eq!(result.is_ok(), expected);
    }
}
