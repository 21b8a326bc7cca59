//! Effects produced by phase transitions

/// Stage the runtime must run next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Run the intent classifier
    Classify,
    /// Run the reasoning / tool-execution stage
    Reason,
    /// Run the response formatter
    Format,
    /// Hand the final state back to the caller
    Complete,
}
