//! Response formatting stage

use crate::state_machine::{ConversationState, HistoryEntry, StateUpdate};

/// Prefix of every degraded answer
pub const WARNING_MARKER: &str = "\u{26a0}\u{fe0f}";

/// Shown when the pipeline produced no answer text at all
pub const FALLBACK_ANSWER: &str = "I couldn't process your request.";

/// Final stage. Total over every reachable state.
pub fn format_response(state: &ConversationState) -> StateUpdate {
    let text = render(state.answer.as_deref(), state.failure.is_some());
    StateUpdate {
        append_history: vec![HistoryEntry::assistant(text.clone())],
        answer: Some(text),
        ..StateUpdate::default()
    }
}

/// Visible answer text: unchanged when healthy, marked exactly once when degraded
pub fn render(answer: Option<&str>, degraded: bool) -> String {
    let answer = answer.unwrap_or_default();

    if !degraded {
        return if answer.trim().is_empty() {
            FALLBACK_ANSWER.to_string()
        } else {
            answer.to_string()
        };
    }

    let body = match strip_markers(answer).trim() {
        "" => FALLBACK_ANSWER,
        body => body,
    };
    format!("{WARNING_MARKER} {body}")
}

/// Remove warning signs (and their emoji variation selectors) that already
/// lead the answer. Signs inside the text are kept.
fn strip_markers(text: &str) -> &str {
    let mut rest = text.trim_start();
    while let Some(after) = rest.strip_prefix('\u{26a0}') {
        rest = after.strip_prefix('\u{fe0f}').unwrap_or(after).trim_start();
    }
    rest
}
