//! Aggregate "complete record" fetch
//!
//! Reads the patient and runs the four clinical searches. Every sub-fetch is
//! attempted even when an earlier one fails; the tool only fails when all of
//! them did.

use super::{parse_patient_id, Tool, ToolContext, ToolOutput};
use crate::fhir::{patient_criteria, FhirApi, ResourceKind};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

const SECTION_LIMIT: usize = 10;

/// Sections of the aggregate record, in output order
const SECTIONS: [(&str, ResourceKind); 4] = [
    ("observations", ResourceKind::Observation),
    ("conditions", ResourceKind::Condition),
    ("encounters", ResourceKind::Encounter),
    ("medications", ResourceKind::MedicationRequest),
];

pub struct CompletePatientDataTool;

#[async_trait]
impl Tool for CompletePatientDataTool {
    fn name(&self) -> &'static str {
        "get_complete_patient_data"
    }

    fn description(&self) -> String {
        "Retrieve comprehensive patient data: demographics, observations, conditions, encounters and medication requests.".to_string()
    }

    fn input_schema(&self) -> Value {
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

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let patient_id = match parse_patient_id(input) {
            Ok(id) => id,
            Err(e) => return ToolOutput::error(e),
        };
        fetch_complete_record(ctx.fhir.as_ref(), &patient_id).await
    }
}

async fn fetch_complete_record(fhir: &dyn FhirApi, patient_id: &str) -> ToolOutput {
    let mut errors = Vec::new();

    let patient = match fhir.read(ResourceKind::Patient, patient_id).await {
        Ok(p) => json!({
            "id": p.get("id"),
            "name": p.get("name"),
            "gender": p.get("gender"),
            "birthDate": p.get("birthDate"),
            "address": p.get("address"),
            "telecom": p.get("telecom"),
        }),
        Err(e) => {
            let message = format!("Error retrieving patient: {e}");
            errors.push(message.clone());
            json!({ "error": message })
        }
    };

    let mut record = Map::new();
    record.insert("patient".to_string(), patient);

    let mut summary = Map::new();
    let mut notes = Vec::new();
    let criteria = patient_criteria(patient_id);

    for (section, kind) in SECTIONS {
        match fhir.search(kind, &criteria).await {
            Ok(bundle) => {
                if bundle.is_empty() {
                    notes.push(Value::String(format!(
                        "No {} found for patient {patient_id}",
                        kind.plural_label()
                    )));
                }
                summary.insert(format!("total_{section}"), json!(bundle.len()));
                record.insert(
                    section.to_string(),
                    Value::Array(bundle.resources(SECTION_LIMIT).cloned().collect()),
                );
            }
            Err(e) => {
                let message = format!("Error retrieving {}: {e}", kind.plural_label());
                errors.push(message.clone());
                record.insert(section.to_string(), json!({ "error": message }));
            }
        }
    }

    if errors.len() == SECTIONS.len() + 1 {
        return ToolOutput::error(format!(
            "Error retrieving complete data for patient {patient_id}: {}",
            errors.join("; ")
        ));
    }

    record.insert("summary".to_string(), Value::Object(summary));
    record.insert("notes".to_string(), Value::Array(notes));
    ToolOutput::json(&Value::Object(record))
}
