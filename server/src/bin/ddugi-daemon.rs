use anyhow::{Context, Result};
use clap::Parser;
use ddugi_core::{AnthropicClient, LanguageModel, LocalSearchClient, VenueLookup};
use ddugi_server::config::{get_default_config_file, AppConfig, Environment};
use ddugi_server::http_server::{self, AppState};
use ddugi_server::session::{InMemorySessionStore, SessionStore, SessionStoreRef};
use ddugi_server::synthesizer::{AnswerSynthesizer, VerificationStrategy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ddugi-daemon", about = "Busan travel concierge HTTP daemon", version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address for the HTTP server, e.g. 0.0.0.0:3001
    #[arg(long, env = "DDUGI_HTTP_ADDR")]
    http_addr: Option<SocketAddr>,

    /// Verification strategy (keyword_extraction or tool_augmented)
    #[arg(long, env = "DDUGI_STRATEGY", value_parser = parse_strategy)]
    strategy: Option<VerificationStrategy>,

    /// Runtime environment (development or production)
    #[arg(long, value_parser = parse_environment)]
    environment: Option<Environment>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DDUGI_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn parse_strategy(s: &str) -> Result<VerificationStrategy, String> {
    match s {
        "keyword_extraction" => Ok(VerificationStrategy::KeywordExtraction),
        "tool_augmented" => Ok(VerificationStrategy::ToolAugmented),
        other => Err(format!("unknown strategy: {}", other)),
    }
}

fn parse_environment(s: &str) -> Result<Environment, String> {
    s.parse()
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file()?,
    };
    info!("Loading configuration from {}", path.display());
    let mut config = AppConfig::load_from_file(&path)?;

    config.apply_env();
    if let Some(addr) = args.http_addr {
        config.http_addr = addr;
    }
    if let Some(strategy) = args.strategy {
        config.pipeline.strategy = strategy;
    }
    if let Some(environment) = args.environment {
        config.environment = environment;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("Starting ddugi daemon...");

    let config = load_config(&args).context("Failed to load configuration")?;
    info!(
        environment = ?config.environment,
        strategy = ?config.pipeline.strategy,
        region = config.local_search.region(),
        "Configuration loaded"
    );

    let search: Arc<dyn VenueLookup> = Arc::new(
        LocalSearchClient::new(&config.local_search)
            .context("Failed to create local search client")?,
    );

    let synthesizer = match AnthropicClient::new(&config.llm) {
        Ok(client) => {
            info!(model = %client.model_name(), "LLM client initialized");
            let llm: Arc<dyn LanguageModel> = Arc::new(client);
            Some(Arc::new(AnswerSynthesizer::new(
                llm,
                search.clone(),
                config.synthesizer_settings(),
            )))
        }
        Err(e) => {
            warn!(
                error = %e,
                "LLM client unavailable, chat will answer 503 until ANTHROPIC_API_KEY is set"
            );
            None
        }
    };

    let store = Arc::new(InMemorySessionStore::with_ttl(config.session.ttl()));
    let sessions: SessionStoreRef = store.clone();

    if config.session.ttl().is_some() {
        let interval_secs = config.session.cleanup_interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                if let Err(e) = store.cleanup_expired_sessions().await {
                    error!(error = %e, "Session cleanup failed");
                }
            }
        });
        info!(interval_secs, "Session cleanup task started");
    }

    let addr = config.http_addr;
    let state = AppState::new(config, synthesizer, search, sessions);

    if let Err(e) = http_server::run_server(state, addr).await {
        error!("ddugi daemon failed: {}", e);
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_parse() {
        let args = Args::try_parse_from([
            "ddugi-daemon",
            "--strategy",
            "tool_augmented",
            "--environment",
            "dev",
            "--http-addr",
            "127.0.0.1:4000",
        ])
        .unwrap();

        assert_eq!(args.strategy, Some(VerificationStrategy::ToolAugmented));
        assert_eq!(args.environment, Some(Environment::Development));
        assert_eq!(args.http_addr, "127.0.0.1:4000".parse().ok());
        assert!(Args::try_parse_from(["ddugi-daemon", "--strategy", "guess"]).is_err());
    }
}
