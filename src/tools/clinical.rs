//! Per-patient clinical record searches
//!
//! Observations, conditions, encounters and medication requests share one
//! shape: search the kind by `patient=<id>` and summarise up to 20 entries.

use super::{parse_patient_id, Tool, ToolContext, ToolOutput};
use crate::fhir::{patient_criteria, ResourceKind};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

const RECORD_LIMIT: usize = 20;

/// Search one clinical resource kind for a patient
pub struct PatientRecordsTool {
    name: &'static str,
    kind: ResourceKind,
    description: &'static str,
    /// Fields copied from each resource into the summary
    fields: &'static [&'static str],
}

impl PatientRecordsTool {
    pub fn observations() -> Self {
        Self {
            name: "get_patient_observations",
            kind: ResourceKind::Observation,
            description: "Retrieve observations (vital signs, lab results) for a specific patient.",
            fields: &["id", "status", "code", "effectiveDateTime"],
        }
    }

    pub fn conditions() -> Self {
        Self {
            name: "get_patient_conditions",
            kind: ResourceKind::Condition,
            description: "Retrieve recorded conditions/diagnoses for a specific patient.",
            fields: &[
                "id",
                "clinicalStatus",
                "verificationStatus",
                "code",
                "recordedDate",
                "onsetDateTime",
            ],
        }
    }

    pub fn encounters() -> Self {
        Self {
            name: "get_patient_encounters",
            kind: ResourceKind::Encounter,
            description: "Retrieve encounters (visits) for a specific patient.",
            fields: &["id", "status", "class", "type", "period", "serviceProvider"],
        }
    }

    pub fn medications() -> Self {
        Self {
            name: "get_patient_medications",
            kind: ResourceKind::MedicationRequest,
            description: "Retrieve medication requests for a specific patient.",
            fields: &[
                "id",
                "status",
                "intent",
                "medicationCodeableConcept",
                "medicationReference",
                "authoredOn",
                "dosageInstruction",
            ],
        }
    }

    fn summarise(&self, resource: &Value) -> Value {
        let mut summary = Map::new();
        for field in self.fields {
            summary.insert(
                (*field).to_string(),
                resource.get(*field).cloned().unwrap_or(Value::Null),
            );
        }
        if self.kind == ResourceKind::Observation {
            let value = resource
                .get("valueQuantity")
                .or_else(|| resource.get("valueString"))
                .cloned()
                .unwrap_or(Value::Null);
            summary.insert("value".to_string(), value);
        }
        Value::Object(summary)
    }

    fn empty_message(&self, patient_id: &str) -> String {
        let label = self.kind.plural_label();
        match self.kind {
            ResourceKind::Observation => format!("No {label} found for patient {patient_id}"),
            _ => format!(
                "No {label} found for patient {patient_id}. This patient may not have any recorded {label} in the system."
            ),
        }
    }
}

#[async_trait]
impl Tool for PatientRecordsTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> String {
        self.description.to_string()
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

        let bundle = match ctx.fhir.search(self.kind, &patient_criteria(&patient_id)).await {
            Ok(b) => b,
            Err(e) => {
                return ToolOutput::error(format!(
                    "Error retrieving {} for patient {patient_id}: {e}",
                    self.kind.plural_label()
                ))
            }
        };

        if bundle.is_empty() {
            return ToolOutput::success(self.empty_message(&patient_id));
        }

        let records: Vec<Value> = bundle
            .resources(RECORD_LIMIT)
            .map(|r| self.summarise(r))
            .collect();
        ToolOutput::json(&Value::Array(records))
    }
}
