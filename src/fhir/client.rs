//! REST client for a FHIR R4 server

use super::error::{FhirError, FhirResult};
use super::types::{Bundle, ResourceKind, SearchParams};
use super::FhirApi;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

const FHIR_JSON: &str = "application/fhir+json";

/// FHIR client over HTTP(S)
#[derive(Clone)]
pub struct FhirClient {
    client: Client,
    base_url: String,
}

impl FhirClient {
    pub fn new(base_url: &str, timeout: Duration) -> FhirResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FHIR_JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn type_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.base_url, kind.as_str())
    }

    fn instance_url(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, kind.as_str(), id)
    }

    async fn send(request: RequestBuilder) -> FhirResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FhirError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| FhirError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FhirApi for FhirClient {
    async fn create(&self, kind: ResourceKind, record: &Value) -> FhirResult<Value> {
        let result = Self::send(self.client.post(self.type_url(kind)).json(record)).await;
        match &result {
            Ok(_) => tracing::info!(resource = %kind, "Created FHIR resource"),
            Err(e) => tracing::error!(resource = %kind, error = %e, "Error creating FHIR resource"),
        }
        result
    }

    async fn read(&self, kind: ResourceKind, id: &str) -> FhirResult<Value> {
        let result = Self::send(self.client.get(self.instance_url(kind, id))).await;
        match &result {
            Ok(_) => tracing::info!(resource = %kind, id, "Retrieved FHIR resource"),
            Err(e) => tracing::error!(resource = %kind, id, error = %e, "Error reading FHIR resource"),
        }
        result
    }

    async fn update(&self, kind: ResourceKind, id: &str, record: &Value) -> FhirResult<Value> {
        let Value::Object(fields) = record else {
            return Err(FhirError::InvalidResource(format!(
                "{kind} update body must be a JSON object"
            )));
        };
        // The path id wins over whatever the body carries
        let mut fields = fields.clone();
        fields.insert("id".to_string(), Value::String(id.to_string()));
        let body = Value::Object(fields);

        let result = Self::send(self.client.put(self.instance_url(kind, id)).json(&body)).await;
        match &result {
            Ok(_) => tracing::info!(resource = %kind, id, "Updated FHIR resource"),
            Err(e) => tracing::error!(resource = %kind, id, error = %e, "Error updating FHIR resource"),
        }
        result
    }

    async fn search(&self, kind: ResourceKind, criteria: &SearchParams) -> FhirResult<Bundle> {
        let result = Self::send(self.client.get(self.type_url(kind)).query(criteria))
            .await
            .and_then(|body| {
                serde_json::from_value::<Bundle>(body).map_err(|e| FhirError::Decode(e.to_string()))
            });
        match &result {
            Ok(bundle) => tracing::info!(
                resource = %kind,
                criteria = ?criteria,
                entries = bundle.len(),
                "Searched FHIR resources"
            ),
            Err(e) => tracing::error!(resource = %kind, error = %e, "Error searching FHIR resources"),
        }
        result
    }
}
