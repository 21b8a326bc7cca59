//! FHIR healthcare agent
//!
//! Answers questions about records on a FHIR R4 server by routing each query
//! through an intent classifier, a tool-using reasoner and a formatter.

mod agent;
mod config;
mod fhir;
mod llm;
mod runtime;
mod session;
mod state_machine;
mod tools;

use config::AppConfig;
use fhir::{FhirApi, FhirClient};
use llm::{LlmService, LoggingService, OpenAIService};
use runtime::{ProductionRuntime, ServiceLlmClient, ToolRegistryExecutor};
use session::Session;
use state_machine::{Intent, OperationKind, ResourceScope};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tools::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "q"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fhir_agent=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env()?;

    let openai = OpenAIService::new(
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        &config.llm.base_url,
        config.llm.timeout,
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(openai)));

    let fhir: Arc<dyn FhirApi> = Arc::new(FhirClient::new(&config.fhir_base_url, config.fhir_timeout)?);
    let registry = Arc::new(ToolRegistry::healthcare()?);
    tracing::info!(
        model = %config.llm.model,
        fhir_base_url = %config.fhir_base_url,
        tools = ?registry,
        "Healthcare agent initialized"
    );

    let runtime = ProductionRuntime::new(
        ServiceLlmClient::new(llm),
        ToolRegistryExecutor::new(registry, fhir),
        config.agent.clone(),
    );
    let mut session = Session::new(runtime, config.history_limit);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"FHIR healthcare agent. Type 'exit', 'quit' or 'q' to leave.\n")
        .await?;

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&query.to_lowercase().as_str()) {
            break;
        }

        match session.ask(query).await {
            Ok(outcome) => {
                let tools: Vec<_> = outcome.invocations.iter().map(|i| i.name.as_str()).collect();
                let failed_tools = outcome.invocations.iter().filter(|i| !i.success).count();
                tracing::info!(
                    turn_id = %outcome.turn_id,
                    intent = outcome.intent.map(Intent::as_str),
                    resource_type = outcome.resource_kind.map(ResourceScope::as_str),
                    operation = outcome.operation_kind.map(OperationKind::as_str),
                    iterations = outcome.iteration_count,
                    tools = ?tools,
                    failed_tools,
                    failure = outcome.failure.as_deref(),
                    "Turn answered"
                );
                stdout
                    .write_all(format!("\nAgent: {}\n", outcome.answer).as_bytes())
                    .await?;
            }
            Err(e) => tracing::warn!(error = %e, "Query rejected"),
        }
    }

    tracing::info!(history_len = session.history().len(), "Session ended");
    Ok(())
}
