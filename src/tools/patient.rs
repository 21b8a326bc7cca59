//! Patient demographics tools

use super::{
    parse_patient_id, parse_record, parse_search_params, required_field, Tool, ToolContext,
    ToolOutput,
};
use crate::fhir::ResourceKind;
use async_trait::async_trait;
use serde_json::{json, Value};

const SEARCH_LIMIT: usize = 10;

fn patient_id_schema() -> Value {
    json!({
        "type": "object",
        "required": ["patient_id"],
        "properties": {
            "patient_id": {
                "type": "string",
                "description": "The FHIR patient ID"
            }
        }
    })
}

/// Read one patient by id
pub struct GetPatientTool;

#[async_trait]
impl Tool for GetPatientTool {
    fn name(&self) -> &'static str {
        "get_patient"
    }

    fn description(&self) -> String {
        "Retrieve patient demographics by FHIR patient ID.".to_string()
    }

    fn input_schema(&self) -> Value {
        patient_id_schema()
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let patient_id = match parse_patient_id(input) {
            Ok(id) => id,
            Err(e) => return ToolOutput::error(e),
        };

        match ctx.fhir.read(ResourceKind::Patient, &patient_id).await {
            Ok(patient) => ToolOutput::json(&patient),
            Err(e) if e.is_not_found() => {
                ToolOutput::error(format!("Patient {patient_id} was not found in the FHIR system"))
            }
            Err(e) => ToolOutput::error(format!("Error retrieving patient: {e}")),
        }
    }
}

/// Search patients by demographic criteria
pub struct SearchPatientsTool;

#[async_trait]
impl Tool for SearchPatientsTool {
    fn name(&self) -> &'static str {
        "search_patients"
    }

    fn description(&self) -> String {
        "Search for patients using criteria such as family, given, birthdate or gender.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["search_params"],
            "properties": {
                "search_params": {
                    "type": "object",
                    "description": "FHIR search parameters, e.g. {\"family\": \"Smith\"}"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let params = match required_field(&input, "search_params").and_then(parse_search_params) {
            Ok(p) => p,
            Err(e) => return ToolOutput::error(e),
        };

        let bundle = match ctx.fhir.search(ResourceKind::Patient, &params).await {
            Ok(b) => b,
            Err(e) => return ToolOutput::error(format!("Error searching patients: {e}")),
        };

        if bundle.is_empty() {
            return ToolOutput::success("No patients found matching the search criteria");
        }

        let patients: Vec<Value> = bundle
            .resources(SEARCH_LIMIT)
            .map(|resource| {
                json!({
                    "id": resource.get("id"),
                    "name": resource.get("name").and_then(|names| names.get(0)),
                    "gender": resource.get("gender"),
                    "birthDate": resource.get("birthDate"),
                })
            })
            .collect();

        ToolOutput::json(&Value::Array(patients))
    }
}

/// Create a patient resource
pub struct CreatePatientTool;

#[async_trait]
impl Tool for CreatePatientTool {
    fn name(&self) -> &'static str {
        "create_patient"
    }

    fn description(&self) -> String {
        "Create a new patient. Provide a FHIR R4 Patient resource with fields like name, gender, birthDate.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["patient_data"],
            "properties": {
                "patient_data": {
                    "type": "object",
                    "description": "FHIR R4 Patient resource"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let record = match required_field(&input, "patient_data").and_then(parse_record) {
            Ok(r) => with_resource_type(r, ResourceKind::Patient),
            Err(e) => return ToolOutput::error(e),
        };

        match ctx.fhir.create(ResourceKind::Patient, &record).await {
            Ok(created) => {
                let id = created.get("id").and_then(Value::as_str).unwrap_or("Unknown");
                ToolOutput::success(format!("Successfully created patient with ID: {id}"))
            }
            Err(e) => ToolOutput::error(format!("Error creating patient: {e}")),
        }
    }
}

/// Update a patient resource
pub struct UpdatePatientTool;

#[async_trait]
impl Tool for UpdatePatientTool {
    fn name(&self) -> &'static str {
        "update_patient"
    }

    fn description(&self) -> String {
        "Update an existing patient. Provide the patient ID and the full updated FHIR R4 Patient resource.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["patient_id", "patient_data"],
            "properties": {
                "patient_id": {
                    "type": "string",
                    "description": "The FHIR patient ID"
                },
                "patient_data": {
                    "type": "object",
                    "description": "Updated FHIR R4 Patient resource"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let record = match required_field(&input, "patient_data").and_then(parse_record) {
            Ok(r) => with_resource_type(r, ResourceKind::Patient),
            Err(e) => return ToolOutput::error(e),
        };
        let patient_id = match parse_patient_id(input) {
            Ok(id) => id,
            Err(e) => return ToolOutput::error(e),
        };

        match ctx.fhir.update(ResourceKind::Patient, &patient_id, &record).await {
            Ok(_) => ToolOutput::success(format!("Successfully updated patient {patient_id}")),
            Err(e) => ToolOutput::error(format!("Error updating patient: {e}")),
        }
    }
}

/// Fill in `resourceType` when the model leaves it out
pub(crate) fn with_resource_type(mut record: Value, kind: ResourceKind) -> Value {
    if let Value::Object(fields) = &mut record {
        fields
            .entry("resourceType")
            .or_insert_with(|| Value::String(kind.as_str().to_string()));
    }
    record
}
