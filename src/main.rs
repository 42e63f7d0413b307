use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundwise::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fundwise::AppCommand {
    fn from(cmd: Commands) -> fundwise::AppCommand {
        match cmd {
            Commands::Search { query, limit } => fundwise::AppCommand::Search { query, limit },
            Commands::Fund {
                scheme_code,
                history,
            } => fundwise::AppCommand::Fund {
                scheme_code,
                history,
            },
            Commands::Ask { question, stream } => fundwise::AppCommand::Ask {
                question: question.join(" "),
                stream,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Search the mutual fund catalogue
    Search {
        /// Search text matched against scheme names
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Display details and trailing returns for one scheme
    Fund {
        /// MFAPI scheme code
        scheme_code: String,

        /// Include recent NAV history
        #[arg(long)]
        history: bool,
    },
    /// Ask a natural-language question about mutual funds
    Ask {
        /// The question, quoted or as trailing words
        #[arg(required = true)]
        question: Vec<String>,

        /// Print progress and answer chunks as they arrive
        #[arg(long)]
        stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => fundwise::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = fundwise::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
mfapi:
  base_url: "https://api.mfapi.in/mf"
  timeout_secs: 30

llm:
  base_url: "https://api.openai.com/v1"
  model: "gpt-4-turbo"
  api_key_env: "OPENAI_API_KEY"
  temperature: 0.1

cache:
  enabled: true
  ttl_secs: 3600
  capacity: 1024
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
