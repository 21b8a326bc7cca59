//! Caller-owned conversation history across turns

use crate::runtime::{LlmClient, ToolExecutor, TurnOutcome, TurnRuntime};
use crate::state_machine::HistoryEntry;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Query must not be empty")]
    EmptyQuery,
}

/// One user's conversation. `ask` borrows the session mutably, so a
/// session never runs two turns at once.
pub struct Session<L, T>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    runtime: TurnRuntime<L, T>,
    history: Vec<HistoryEntry>,
    /// Oldest entries beyond this are dropped after each turn
    history_limit: Option<usize>,
}

impl<L, T> Session<L, T>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    pub fn new(runtime: TurnRuntime<L, T>, history_limit: Option<usize>) -> Self {
        Self {
            runtime,
            history: Vec::new(),
            history_limit,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub async fn ask(&mut self, query: &str) -> Result<TurnOutcome, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }

        let outcome = self.runtime.run_turn(self.history.clone(), query).await;

        // Intermediate stage entries stay inside the turn
        self.history.push(HistoryEntry::user(query));
        self.history.push(HistoryEntry::assistant(outcome.answer.clone()));
        if let Some(limit) = self.history_limit {
            let excess = self.history.len().saturating_sub(limit);
            if excess > 0 {
                tracing::debug!(dropped = excess, limit, "Trimming session history");
                self.history.drain(..excess);
            }
        }

        Ok(outcome)
    }
}
