//! Per-turn conversation state

use crate::fhir::ResourceKind;

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Classification descriptors
// ============================================================================

/// What the user is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    PatientDataQuery,
    SearchQuery,
    GeneralQuestion,
    ClarificationNeeded,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::PatientDataQuery => "patient_data_query",
            Intent::SearchQuery => "search_query",
            Intent::GeneralQuestion => "general_question",
            Intent::ClarificationNeeded => "clarification_needed",
        }
    }

    /// Unknown values are absence, not an error
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "greeting" => Some(Intent::Greeting),
            "patient_data_query" => Some(Intent::PatientDataQuery),
            "search_query" => Some(Intent::SearchQuery),
            "general_question" => Some(Intent::GeneralQuestion),
            "clarification_needed" => Some(Intent::ClarificationNeeded),
            _ => None,
        }
    }
}

/// Which records a request targets: one FHIR kind, or everything for a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Kind(ResourceKind),
    All,
}

impl ResourceScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceScope::Kind(kind) => kind.as_str(),
            ResourceScope::All => "All",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value.trim() == "All" {
            Some(ResourceScope::All)
        } else {
            ResourceKind::parse(value).map(ResourceScope::Kind)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Search,
    Create,
    Update,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Search => "search",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "read" => Some(OperationKind::Read),
            "search" => Some(OperationKind::Search),
            "create" => Some(OperationKind::Create),
            "update" => Some(OperationKind::Update),
            _ => None,
        }
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// State threaded through classifier, reasoner and formatter for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub history: Vec<HistoryEntry>,
    query: String,
    pub intent: Option<Intent>,
    pub resource_kind: Option<ResourceScope>,
    pub operation_kind: Option<OperationKind>,
    pub answer: Option<String>,
    pub failure: Option<String>,
    pub iteration_count: u32,
}

impl ConversationState {
    /// Fresh state for a turn. The query is recorded as the newest user entry;
    /// every other field starts empty.
    pub fn new(mut history: Vec<HistoryEntry>, query: impl Into<String>) -> Self {
        let query = query.into();
        history.push(HistoryEntry::user(query.clone()));
        Self {
            history,
            query,
            intent: None,
            resource_kind: None,
            operation_kind: None,
            answer: None,
            failure: None,
            iteration_count: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The most recent `window` history entries, oldest first
    pub fn recent_history(&self, window: usize) -> &[HistoryEntry] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }

    /// Merge a stage's partial update
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            append_history,
            intent,
            resource_kind,
            operation_kind,
            answer,
            failure,
            iteration_increment,
        } = update;

        self.history.extend(append_history);
        if intent.is_some() {
            self.intent = intent;
        }
        if resource_kind.is_some() {
            self.resource_kind = resource_kind;
        }
        if operation_kind.is_some() {
            self.operation_kind = operation_kind;
        }
        if answer.is_some() {
            self.answer = answer;
        }
        if let Some(failure) = failure {
            self.failure = Some(match self.failure.take() {
                Some(previous) => format!("{previous}; {failure}"),
                None => failure,
            });
        }
        self.iteration_count = self.iteration_count.saturating_add(iteration_increment);
    }
}

/// Partial update returned by a stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub append_history: Vec<HistoryEntry>,
    pub intent: Option<Intent>,
    pub resource_kind: Option<ResourceScope>,
    pub operation_kind: Option<OperationKind>,
    pub answer: Option<String>,
    pub failure: Option<String>,
    pub iteration_increment: u32,
}
