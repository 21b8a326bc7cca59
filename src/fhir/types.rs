//! FHIR resource kinds and search bundles

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// FHIR resource types the agent can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Patient,
    Observation,
    Condition,
    Encounter,
    MedicationRequest,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Patient,
        ResourceKind::Observation,
        ResourceKind::Condition,
        ResourceKind::Encounter,
        ResourceKind::MedicationRequest,
    ];

    /// FHIR resource type name, used in URLs
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Observation => "Observation",
            ResourceKind::Condition => "Condition",
            ResourceKind::Encounter => "Encounter",
            ResourceKind::MedicationRequest => "MedicationRequest",
        }
    }

    /// Parse a FHIR type name; anything else is `None`
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name.trim())
    }

    /// Human-readable plural used in "No ... found" messages
    pub fn plural_label(self) -> &'static str {
        match self {
            ResourceKind::Patient => "patients",
            ResourceKind::Observation => "observations",
            ResourceKind::Condition => "conditions",
            ResourceKind::Encounter => "encounters",
            ResourceKind::MedicationRequest => "medication requests",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search criteria as query parameters, kept sorted for stable URLs
pub type SearchParams = BTreeMap<String, String>;

/// Build the `patient=<id>` criteria used by the per-patient searches
pub fn patient_criteria(patient_id: &str) -> SearchParams {
    SearchParams::from([("patient".to_string(), patient_id.to_string())])
}

/// Search result bundle (only the parts the agent reads)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Value,
}

impl Bundle {
    #[cfg(test)]
    pub fn from_resources(resources: impl IntoIterator<Item = Value>) -> Self {
        let entry: Vec<_> = resources
            .into_iter()
            .map(|resource| BundleEntry { resource })
            .collect();
        Self {
            total: Some(entry.len() as u64),
            entry,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    /// Resources of the first `limit` entries
    pub fn resources(&self, limit: usize) -> impl Iterator<Item = &Value> {
        self.entry.iter().take(limit).map(|e| &e.resource)
    }
}
