//! FHIR data-fetch tools offered to the reasoning stage
//!
//! Tools are stateless; the data API is injected per call through
//! [`ToolContext`]. Every tool converts its own failures into an error
//! [`ToolOutput`] so one failed fetch never aborts the others.

mod clinical;
mod complete_record;
mod observation;
mod patient;

pub use clinical::PatientRecordsTool;
pub use complete_record::CompletePatientDataTool;
pub use observation::{CreateObservationTool, SearchObservationsTool};
pub use patient::{CreatePatientTool, GetPatientTool, SearchPatientsTool, UpdatePatientTool};

use crate::fhir::{FhirApi, SearchParams};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Every capability the reasoning stage may be offered
pub const HEALTHCARE_CAPABILITIES: &[&str] = &[
    "get_patient",
    "get_patient_observations",
    "get_patient_conditions",
    "get_patient_encounters",
    "get_patient_medications",
    "get_complete_patient_data",
    "search_patients",
    "search_observations",
    "create_patient",
    "update_patient",
    "create_observation",
];

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }

    /// Pretty JSON payload, or an error if it cannot be rendered
    pub fn json(value: &Value) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::success(text),
            Err(e) => Self::error(format!("Failed to render result: {e}")),
        }
    }
}

/// All context needed for a tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// Clinical-data repository the tool reads from and writes to
    pub fhir: Arc<dyn FhirApi>,
}

impl ToolContext {
    pub fn new(fhir: Arc<dyn FhirApi>) -> Self {
        Self { fhir }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &'static str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool; failures come back as `ToolOutput::error`
    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool registered twice: {0}")]
    Duplicate(String),
    #[error("Tool is not a declared capability: {0}")]
    Undeclared(String),
    #[error("Declared capability has no handler: {0}")]
    MissingHandler(String),
}

/// Static name → handler mapping, validated once at startup
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
    /// Declaration order, used for the definitions offered to the model
    order: Vec<&'static str>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.order).finish()
    }
}

impl ToolRegistry {
    /// Registry of the FHIR tools
    pub fn healthcare() -> Result<Self, RegistryError> {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(GetPatientTool),
            Arc::new(PatientRecordsTool::observations()),
            Arc::new(PatientRecordsTool::conditions()),
            Arc::new(PatientRecordsTool::encounters()),
            Arc::new(PatientRecordsTool::medications()),
            Arc::new(CompletePatientDataTool),
            Arc::new(SearchPatientsTool),
            Arc::new(SearchObservationsTool),
            Arc::new(CreatePatientTool),
            Arc::new(UpdatePatientTool),
            Arc::new(CreateObservationTool),
        ];
        Self::new(tools, HEALTHCARE_CAPABILITIES)
    }

    /// Build a registry whose handlers exactly cover `declared`
    pub fn new(tools: Vec<Arc<dyn Tool>>, declared: &[&str]) -> Result<Self, RegistryError> {
        let declared_set: HashSet<&str> = declared.iter().copied().collect();
        let mut map = BTreeMap::new();
        let mut order = Vec::with_capacity(tools.len());

        for tool in tools {
            let name = tool.name();
            if !declared_set.contains(name) {
                return Err(RegistryError::Undeclared(name.to_string()));
            }
            if map.insert(name, tool).is_some() {
                return Err(RegistryError::Duplicate(name.to_string()));
            }
            order.push(name);
        }

        if let Some(missing) = declared.iter().find(|name| !map.contains_key(**name)) {
            return Err(RegistryError::MissingHandler((*missing).to_string()));
        }

        Ok(Self { tools: map, order })
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| crate::llm::ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name; `None` for an unknown name
    pub async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Option<ToolOutput> {
        let tool = self.tools.get(name)?;
        Some(tool.run(input, ctx).await)
    }
}

// ============================================================================
// Shared input handling
// ============================================================================

/// Input for tools keyed by a patient
#[derive(Debug, Deserialize)]
pub(crate) struct PatientIdInput {
    #[serde(deserialize_with = "string_or_number")]
    pub patient_id: String,
}

/// Parse a `{"patient_id": ...}` input, rejecting blank ids before any fetch
pub(crate) fn parse_patient_id(input: Value) -> Result<String, String> {
    let parsed: PatientIdInput =
        serde_json::from_value(input).map_err(|e| format!("Invalid input: {e}"))?;
    let id = parsed.patient_id.trim();
    if id.is_empty() {
        return Err("Invalid input: patient_id is required".to_string());
    }
    Ok(id.to_string())
}

/// Models send ids as either strings or bare numbers
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// A record argument given either as a JSON object or a string containing one
pub(crate) fn parse_record(value: &Value) -> Result<Value, String> {
    let record = match value {
        Value::String(text) => {
            serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {e}"))?
        }
        other => other.clone(),
    };
    if record.is_object() {
        Ok(record)
    } else {
        Err("Invalid input: expected a JSON object".to_string())
    }
}

/// Turn a record argument into flat query parameters
pub(crate) fn parse_search_params(value: &Value) -> Result<SearchParams, String> {
    let Value::Object(fields) = parse_record(value)? else {
        return Err("Invalid input: expected a JSON object".to_string());
    };
    Ok(fields
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

/// Fetch a required field from a tool input object
pub(crate) fn required_field<'a>(input: &'a Value, field: &str) -> Result<&'a Value, String> {
    input
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| format!("Invalid input: {field} is required"))
}
