//! Per-turn conversation state machine
//!
//! Elm-style: stages return partial updates, and a pure transition function
//! decides which stage runs next.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{
    ConversationState, HistoryEntry, Intent, OperationKind, ResourceScope, Role, StateUpdate,
};
pub use transition::{transition, TurnPhase};
