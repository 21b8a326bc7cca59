//! Events that advance a turn

/// Events that trigger phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A new query entered the pipeline
    TurnStarted,
    /// Classifier update has been merged
    Classified,
    /// Reasoner update has been merged
    Reasoned,
    /// Formatter update has been merged
    Formatted,
}
