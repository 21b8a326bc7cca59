//! Observation search and creation

use super::patient::with_resource_type;
use super::{parse_record, parse_search_params, required_field, Tool, ToolContext, ToolOutput};
use crate::fhir::ResourceKind;
use async_trait::async_trait;
use serde_json::{json, Value};

const SEARCH_LIMIT: usize = 10;

/// Search observations by arbitrary FHIR criteria
pub struct SearchObservationsTool;

#[async_trait]
impl Tool for SearchObservationsTool {
    fn name(&self) -> &'static str {
        "search_observations"
    }

    fn description(&self) -> String {
        "Search observations using criteria such as patient, code or date.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["search_params"],
            "properties": {
                "search_params": {
                    "type": "object",
                    "description": "FHIR search parameters, e.g. {\"patient\": \"123\", \"code\": \"8310-5\"}"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let params = match required_field(&input, "search_params").and_then(parse_search_params) {
            Ok(p) => p,
            Err(e) => return ToolOutput::error(e),
        };

        match ctx.fhir.search(ResourceKind::Observation, &params).await {
            Ok(bundle) if bundle.is_empty() => {
                ToolOutput::success("No observations found matching the search criteria")
            }
            Ok(bundle) => {
                ToolOutput::json(&Value::Array(bundle.resources(SEARCH_LIMIT).cloned().collect()))
            }
            Err(e) => ToolOutput::error(format!("Error searching observations: {e}")),
        }
    }
}

/// Record a new observation (vital sign, lab result, ...)
pub struct CreateObservationTool;

#[async_trait]
impl Tool for CreateObservationTool {
    fn name(&self) -> &'static str {
        "create_observation"
    }

    fn description(&self) -> String {
        "Create a new observation. Provide a FHIR R4 Observation resource including subject, code and value.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["observation_data"],
            "properties": {
                "observation_data": {
                    "type": "object",
                    "description": "FHIR R4 Observation resource"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let record = match required_field(&input, "observation_data").and_then(parse_record) {
            Ok(r) => with_resource_type(r, ResourceKind::Observation),
            Err(e) => return ToolOutput::error(e),
        };

        match ctx.fhir.create(ResourceKind::Observation, &record).await {
            Ok(created) => {
                let id = created.get("id").and_then(Value::as_str).unwrap_or("Unknown");
                ToolOutput::success(format!("Successfully created observation with ID: {id}"))
            }
            Err(e) => ToolOutput::error(format!("Error creating observation: {e}")),
        }
    }
}
