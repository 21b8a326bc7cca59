//! Fixed instructions sent to the generation service

use crate::state_machine::{ConversationState, Intent};
use serde_json::{json, Value};

/// Name of the structured-output schema used by the classifier
pub const CLASSIFICATION_SCHEMA_NAME: &str = "intent_classification";

pub const CLASSIFIER_PROMPT: &str = r#"You are the intent classifier of a FHIR healthcare data retrieval system.

Read the user's query and decide:
1. intent: one of greeting, patient_data_query, search_query, general_question, clarification_needed
2. resource_type, when one applies: Patient, Observation, Condition, Encounter, MedicationRequest or All
3. operation, when one applies: read, search, create or update

Rules:
- A query that names a patient ID or asks for a patient's data is a patient_data_query.
- A request for "all data" or "everything" about a patient uses resource_type "All".
- A query that is unclear or lacks required information, such as the patient ID, is clarification_needed.

Reply with a single JSON object:
{"intent": "...", "resource_type": "...", "operation": "...", "requires_clarification": false}

Examples:
- "Get all data for patient 592598" -> {"intent": "patient_data_query", "resource_type": "All", "operation": "read"}
- "Show observations for patient 123" -> {"intent": "patient_data_query", "resource_type": "Observation", "operation": "read"}
- "What conditions does patient 456 have?" -> {"intent": "patient_data_query", "resource_type": "Condition", "operation": "read"}
- "Search for patients named Smith" -> {"intent": "search_query", "resource_type": "Patient", "operation": "search"}
- "Tell me about a patient" -> {"intent": "clarification_needed", "requires_clarification": true}"#;

pub const REASONER_PROMPT: &str = r#"You are a FHIR healthcare data assistant. Follow these rules without exception.

CRITICAL RULES:
1. Never invent or guess patient data.
2. Only state facts that were returned by the FHIR server through your tools.
3. When the server has no such data, say "This information is not available in the FHIR system".
4. Call a tool before answering any patient-specific question.
5. Never give a medical diagnosis or medical advice.
6. When a request is ambiguous, ask a clarifying question.

YOU CAN:
- Retrieve patient demographics from the FHIR server
- Fetch observations, conditions, encounters and medication requests
- Search for patients and observations
- Create or update patients and create observations
- Explain FHIR resources and healthcare data standards
- Describe what this system can do

YOU CANNOT:
- Diagnose medical conditions
- Recommend treatments or medications
- Infer patient data that was not retrieved from the FHIR server
- Give medical advice

DATA RETRIEVAL:
- Always fetch fresh data with the provided tools.
- When data is missing, say "No [resource type] data found for this patient".
- Present results in clear, human-readable form with the relevant FHIR context.

MEDICAL DISCLAIMER:
Remind users that you cannot give medical advice and that medical decisions belong with healthcare professionals.

Resources you create or update must follow FHIR R4."#;

/// Block used when tool calls were requested but none could be dispatched
pub const NO_TOOL_RESULTS: &str = "No tool results were produced.";

/// JSON schema of the classifier's structured reply
pub fn classification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "intent": {
                "type": "string",
                "enum": ["greeting", "patient_data_query", "search_query", "general_question", "clarification_needed"]
            },
            "resource_type": {
                "type": ["string", "null"],
                "enum": ["Patient", "Observation", "Condition", "Encounter", "MedicationRequest", "All", null]
            },
            "operation": {
                "type": ["string", "null"],
                "enum": ["read", "search", "create", "update", null]
            },
            "requires_clarification": { "type": "boolean" }
        },
        "required": ["intent"]
    })
}

/// Reasoner system prompt annotated with the classifier's output
pub fn reasoner_system_prompt(state: &ConversationState) -> String {
    let mut prompt = String::from(REASONER_PROMPT);
    prompt.push_str("\n\nRequest classification:\n");
    prompt.push_str(&format!(
        "- intent: {}\n",
        state.intent.map_or("unknown", Intent::as_str)
    ));
    if let Some(scope) = state.resource_kind {
        prompt.push_str(&format!("- resource_type: {}\n", scope.as_str()));
    }
    if let Some(operation) = state.operation_kind {
        prompt.push_str(&format!("- operation: {}\n", operation.as_str()));
    }
    if state.intent == Some(Intent::ClarificationNeeded) {
        prompt.push_str(
            "The request is missing identifying information. Ask the user for it instead of calling tools.\n",
        );
    }
    prompt
}

/// Grounding instruction wrapping the captured tool results
pub fn grounding_prompt(tool_results: &str, query: &str) -> String {
    format!(
        "Answer STRICTLY from the following tool execution results with a clear, accurate, human-readable response.

TOOL RESULTS:
{tool_results}

USER QUERY: {query}

INSTRUCTIONS:
- Use ONLY the data in the tool results above
- Do NOT invent or infer any information
- When data is missing or not found, say so explicitly
- Answer in a clear, conversational way
- Include a medical disclaimer where relevant
- If the results cannot answer the query, say so clearly"
    )
}
