//! Core application

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::domain::traces::{RootFilter, TraceRequest, TraceRetriever};

pub struct CoreApp {
    pub config: AppConfig,
    pub retriever: TraceRetriever,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config)?;
        app.execute(command.unwrap_or_default()).await
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let retriever = TraceRetriever::new(&config.retriever_config())
            .context("Failed to initialize trace retriever")?;

        tracing::debug!(
            profile = retriever.profile().name(),
            service = retriever.service_name(),
            backend = retriever.backend_name(),
            "Retriever initialized"
        );

        Ok(Self { config, retriever })
    }

    async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Traces {
                timespan,
                story,
                include_demos,
                no_events,
                limit,
            } => {
                let request = TraceRequest {
                    timespan,
                    story,
                    include_demos: include_demos.then_some(true),
                    include_events: !no_events,
                    limit,
                };
                let traces = self.retriever.get_traces(&request).await?;
                print_json(&traces)
            }
            Commands::Operations {
                timespan,
                story,
                limit,
            } => {
                let root_filter = RootFilter::new(story, true);
                let summaries = self
                    .retriever
                    .list_recent(&timespan, &root_filter, limit)
                    .await?;
                print_json(&summaries)
            }
            Commands::Events { timespan, limit } => {
                let events = self.retriever.recent_events(&timespan, limit).await?;
                print_json(&events)
            }
        }
    }

    /// Logs go to stderr so stdout carries only the JSON result
    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}
