//! Data API error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FhirError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("FHIR server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode FHIR response: {0}")]
    Decode(String),
    #[error("Invalid resource: {0}")]
    InvalidResource(String),
}

impl FhirError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FhirError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for FhirError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FhirError::Decode(e.to_string())
        } else {
            FhirError::Http(e.to_string())
        }
    }
}

pub type FhirResult<T> = Result<T, FhirError>;
