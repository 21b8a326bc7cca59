//! The three turn stages
//!
//! Each stage reads the [`ConversationState`](crate::state_machine::ConversationState)
//! and returns a [`StateUpdate`](crate::state_machine::StateUpdate); none of
//! them can fail the turn.

mod classifier;
mod formatter;
pub mod prompts;
#[cfg(test)]
mod proptests;
mod reasoner;

pub use classifier::classify;
#[cfg(test)]
pub use formatter::WARNING_MARKER;
pub use formatter::{format_response, FALLBACK_ANSWER};
pub use reasoner::{reason, Invocation};
