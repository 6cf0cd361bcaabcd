use std::io::Write;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use emergence_agent::agent::engine::{ChatEngine, ChatOutcome};
use emergence_agent::agent::openai::OpenAiClient;
use emergence_agent::agent::tools::emergence_query::EmergenceQueryTool;
use emergence_agent::agent::tools::ToolRegistry;
use emergence_agent::config::AppConfig;
use emergence_agent::emergence::WorkflowClient;
use emergence_agent::error::{AppError, Result};

#[derive(Parser)]
#[command(
    name = "emergence-agent",
    about = "Answers queries through Emergence AI's web orchestrator"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Query to run; read interactively when omitted
    query: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    if config.emergence_api_key.is_none() {
        tracing::warn!(
            "No EMERGENCE_API_KEY configured; orchestrator queries will return an advisory message"
        );
    }
    let openai_api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| AppError::Config("OPENAI_API_KEY is not set".to_string()))?;

    let workflow_client = WorkflowClient::new(
        config.emergence_api_key.clone(),
        config.emergence_base_url.clone(),
    );

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(EmergenceQueryTool::new(workflow_client)));

    let openai = OpenAiClient::new(
        &openai_api_key,
        &config.openai_model,
        config.openai_temperature,
    );
    let engine = ChatEngine::new(openai, tools, config.max_tool_rounds);

    let query = match cli.query {
        Some(query) => query,
        None => prompt_for_query()?,
    };

    tracing::info!(model = %config.openai_model, "Starting conversation");
    println!("\nAsking the assistant to handle the prompt using Emergence's orchestrator...\n");

    match engine.run(&query).await {
        ChatOutcome::Answered { reply } => println!("{reply}"),
        ChatOutcome::RoundLimitReached { message } => println!("{message}"),
        ChatOutcome::Failed { error } => anyhow::bail!(error),
    }

    Ok(())
}

fn prompt_for_query() -> Result<String> {
    print!("Enter your prompt: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
