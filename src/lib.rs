pub mod agent;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::agent::FundAgent;
use crate::core::config::AppConfig;
use crate::providers::{MfapiProvider, OpenAiChatProvider};
use crate::store::MemoryCache;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Commands the application can execute, decoupled from the clap
/// surface in main.rs.
pub enum AppCommand {
    Search { query: String, limit: usize },
    Fund { scheme_code: String, history: bool },
    Ask { question: String, stream: bool },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Fundwise starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let cache = Arc::new(MemoryCache::<String, Vec<u8>>::new(config.cache.capacity));
    let funds = MfapiProvider::new(&config.mfapi, &config.cache, cache)?;

    match command {
        AppCommand::Search { query, limit } => cli::search::run(&funds, &query, limit).await,
        AppCommand::Fund {
            scheme_code,
            history,
        } => cli::fund::run(&funds, &scheme_code, history).await,
        AppCommand::Ask { question, stream } => {
            let generator = OpenAiChatProvider::new(&config.llm)?;
            let agent = FundAgent::new(
                Arc::new(funds),
                Arc::new(generator),
                config.llm.temperature,
            );
            cli::ask::run(&agent, &question, stream).await
        }
    }
}
