//! Clinical-data repository capability
//!
//! [`FhirApi`] is the seam the tools call through; [`FhirClient`] is the
//! production implementation. Test doubles live in `runtime::testing`.

mod client;
mod error;
mod types;

pub use client::FhirClient;
#[cfg(test)]
pub use error::FhirError;
pub use error::FhirResult;
pub use types::{patient_criteria, Bundle, ResourceKind, SearchParams};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Create/read/update/search by resource kind
#[async_trait]
pub trait FhirApi: Send + Sync {
    async fn create(&self, kind: ResourceKind, record: &Value) -> FhirResult<Value>;

    async fn read(&self, kind: ResourceKind, id: &str) -> FhirResult<Value>;

    async fn update(&self, kind: ResourceKind, id: &str, record: &Value) -> FhirResult<Value>;

    async fn search(&self, kind: ResourceKind, criteria: &SearchParams) -> FhirResult<Bundle>;
}

#[async_trait]
impl<T: FhirApi + ?Sized> FhirApi for Arc<T> {
    async fn create(&self, kind: ResourceKind, record: &Value) -> FhirResult<Value> {
        (**self).create(kind, record).await
    }

    async fn read(&self, kind: ResourceKind, id: &str) -> FhirResult<Value> {
        (**self).read(kind, id).await
    }

    async fn update(&self, kind: ResourceKind, id: &str, record: &Value) -> FhirResult<Value> {
        (**self).update(kind, id, record).await
    }

    async fn search(&self, kind: ResourceKind, criteria: &SearchParams) -> FhirResult<Bundle> {
        (**self).search(kind, criteria).await
    }
}
