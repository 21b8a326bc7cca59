//! Mock implementations for testing
//!
//! These doubles let the stages and the turn runtime run without a network.

use super::traits::*;
use crate::fhir::{Bundle, FhirApi, FhirError, FhirResult, ResourceKind, SearchParams};
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, ToolDefinition, Usage};
use crate::tools::ToolOutput;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Response requesting the given tool calls, in order
pub fn tool_call_response(calls: &[(&str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .enumerate()
            .map(|(i, (name, input))| ContentBlock::tool_use(format!("call_{i}"), *name, input.clone()))
            .collect(),
        end_turn: false,
        usage: Usage::default(),
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// Mock tool executor with predefined outputs
pub struct MockToolExecutor {
    outputs: HashMap<String, ToolOutput>,
    definitions: Vec<ToolDefinition>,
    /// Record of tool executions, unknown names included
    pub executions: Mutex<Vec<(String, Value)>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            definitions: Vec::new(),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Add a tool with a predefined output
    pub fn with_tool(mut self, name: impl Into<String>, output: ToolOutput) -> Self {
        let name = name.into();
        self.definitions.push(ToolDefinition {
            name: name.clone(),
            description: format!("Mock {name}"),
            input_schema: json!({ "type": "object", "properties": {} }),
        });
        self.outputs.insert(name, output);
        self
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, name: &str, input: Value) -> Option<ToolOutput> {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), input));
        self.outputs.get(name).cloned()
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }
}

// ============================================================================
// Stub FHIR server
// ============================================================================

/// A call received by [`StubFhirApi`]
#[derive(Debug, Clone, PartialEq)]
pub enum FhirCall {
    Create(ResourceKind, Value),
    Read(ResourceKind, String),
    Update(ResourceKind, String, Value),
    Search(ResourceKind, SearchParams),
}

/// In-memory FHIR server with fixture records and failure injection.
///
/// Missing records read as 404. Searches return every fixture of the kind
/// regardless of criteria; unconfigured kinds return an empty bundle.
#[derive(Default)]
pub struct StubFhirApi {
    records: HashMap<(ResourceKind, String), Value>,
    searches: HashMap<ResourceKind, Vec<Value>>,
    failures: HashMap<ResourceKind, FhirError>,
    fail_all: Option<FhirError>,
    next_id: AtomicU64,
    calls: Mutex<Vec<FhirCall>>,
}

impl StubFhirApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, kind: ResourceKind, id: &str, record: Value) -> Self {
        self.records.insert((kind, id.to_string()), record);
        self
    }

    pub fn with_search(mut self, kind: ResourceKind, resources: Vec<Value>) -> Self {
        self.searches.insert(kind, resources);
        self
    }

    /// Every call for `kind` fails with `error`
    pub fn failing(mut self, kind: ResourceKind, error: FhirError) -> Self {
        self.failures.insert(kind, error);
        self
    }

    /// Every call fails with `error`
    pub fn failing_all(mut self, error: FhirError) -> Self {
        self.fail_all = Some(error);
        self
    }

    pub fn recorded_calls(&self) -> Vec<FhirCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: FhirCall, kind: ResourceKind) -> FhirResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.fail_all.as_ref().or_else(|| self.failures.get(&kind)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FhirApi for StubFhirApi {
    async fn create(&self, kind: ResourceKind, record: &Value) -> FhirResult<Value> {
        self.record(FhirCall::Create(kind, record.clone()), kind)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut created = record.clone();
        if let Some(object) = created.as_object_mut() {
            object.insert("id".to_string(), json!(format!("stub-{id}")));
        }
        Ok(created)
    }

    async fn read(&self, kind: ResourceKind, id: &str) -> FhirResult<Value> {
        self.record(FhirCall::Read(kind, id.to_string()), kind)?;
        self.records
            .get(&(kind, id.to_string()))
            .cloned()
            .ok_or_else(|| FhirError::Status {
                status: 404,
                body: format!("{kind}/{id} not found"),
            })
    }

    async fn update(&self, kind: ResourceKind, id: &str, record: &Value) -> FhirResult<Value> {
        self.record(FhirCall::Update(kind, id.to_string(), record.clone()), kind)?;
        let mut updated = record.clone();
        if let Some(object) = updated.as_object_mut() {
            object.insert("id".to_string(), json!(id));
        }
        Ok(updated)
    }

    async fn search(&self, kind: ResourceKind, criteria: &SearchParams) -> FhirResult<Bundle> {
        self.record(FhirCall::Search(kind, criteria.clone()), kind)?;
        Ok(Bundle::from_resources(
            self.searches.get(&kind).cloned().unwrap_or_default(),
        ))
    }
}

// ============================================================================
// Grounded echo LLM
// ============================================================================

/// Generation double for end-to-end turns.
///
/// Classification requests get the configured record. Tool-enabled requests
/// get the configured tool calls. Grounding requests are answered purely from
/// the `Result:` blocks in the prompt, so every fact in the answer is
/// traceable to a tool result.
pub struct GroundedEchoLlm {
    classification: Value,
    tool_calls: Vec<(String, Value)>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl GroundedEchoLlm {
    pub fn new(classification: Value) -> Self {
        Self {
            classification,
            tool_calls: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tool_call(mut self, name: impl Into<String>, input: Value) -> Self {
        self.tool_calls.push((name.into(), input));
        self
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, request: &LlmRequest) -> LlmResponse {
        if request.response_format.is_some() {
            return LlmResponse::from_text(self.classification.to_string());
        }
        if !request.tools.is_empty() {
            if self.tool_calls.is_empty() {
                return LlmResponse::from_text(
                    "Could you tell me which patient you mean? Please provide the patient ID.",
                );
            }
            let calls: Vec<(&str, Value)> = self
                .tool_calls
                .iter()
                .map(|(name, input)| (name.as_str(), input.clone()))
                .collect();
            return tool_call_response(&calls);
        }

        let prompt = request
            .messages
            .iter()
            .map(crate::llm::LlmMessage::text)
            .collect::<Vec<_>>()
            .join("\n");
        LlmResponse::from_text(grounded_answer(&prompt))
    }
}

#[async_trait]
impl LlmClient for GroundedEchoLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.respond(request))
    }

    fn model_id(&self) -> &str {
        "grounded-echo"
    }
}

/// Summarise each tool result found in a grounding prompt
fn grounded_answer(prompt: &str) -> String {
    let results = prompt
        .split("Tool: ")
        .skip(1)
        .filter_map(|block| block.split_once("\nResult: ").map(|(_, rest)| rest))
        .map(|rest| rest.split("\n\nUSER QUERY:").next().unwrap_or(rest).trim());

    let mut sentences = Vec::new();
    for result in results {
        match serde_json::from_str::<Value>(result) {
            Ok(record) if record.get("summary").is_some() => {
                sentences.extend(describe_complete_record(&record));
            }
            _ => sentences.push(format!("The server reported: {result}")),
        }
    }

    if sentences.is_empty() {
        "No data was returned.".to_string()
    } else {
        sentences.join(" ")
    }
}

fn describe_complete_record(record: &Value) -> Vec<String> {
    let mut sentences = Vec::new();
    for observation in record["observations"].as_array().into_iter().flatten() {
        let label = observation["code"]["text"].as_str().unwrap_or("Observation");
        let quantity = &observation["valueQuantity"];
        match (quantity["value"].as_f64(), quantity["unit"].as_str()) {
            (Some(_), Some(unit)) => {
                sentences.push(format!("Observation: {label} {} {unit}.", quantity["value"]));
            }
            _ => sentences.push(format!("Observation: {label}.")),
        }
    }
    for note in record["notes"].as_array().into_iter().flatten() {
        if let Some(note) = note.as_str() {
            sentences.push(format!("{note}."));
        }
    }
    sentences
}
