//! Trait abstractions for runtime I/O
//!
//! These traits let the turn runtime run against mock collaborators.

use crate::fhir::FhirApi;
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, ToolDefinition};
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name; `None` when no tool has that name
    async fn execute(&self, name: &str, input: Value) -> Option<ToolOutput>;

    /// Get tool definitions for LLM
    fn definitions(&self) -> Vec<ToolDefinition>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, name: &str, input: Value) -> Option<ToolOutput> {
        (**self).execute(name, input).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use an [`LlmService`] as the runtime's LLM client
#[derive(Clone)]
pub struct ServiceLlmClient {
    service: Arc<dyn LlmService>,
}

impl ServiceLlmClient {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.service.complete(request).await
    }

    fn model_id(&self) -> &str {
        self.service.model_id()
    }
}

/// Adapter binding the static tool registry to a FHIR server
#[derive(Clone)]
pub struct ToolRegistryExecutor {
    registry: Arc<ToolRegistry>,
    fhir: Arc<dyn FhirApi>,
}

impl ToolRegistryExecutor {
    pub fn new(registry: Arc<ToolRegistry>, fhir: Arc<dyn FhirApi>) -> Self {
        Self { registry, fhir }
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistryExecutor {
    async fn execute(&self, name: &str, input: Value) -> Option<ToolOutput> {
        let ctx = ToolContext::new(self.fhir.clone());
        self.registry.execute(name, input, ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }
}
