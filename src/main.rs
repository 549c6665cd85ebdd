//! aigate - OpenAI-compatible multi-provider AI gateway
//!
//! A proxy that forwards OpenAI-shaped requests to one of several configured
//! upstream providers, selected by the `provider/model` naming convention.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aigate::config::Settings;
use aigate::registry;

#[derive(Parser)]
#[command(name = "aigate")]
#[command(about = "OpenAI-compatible multi-provider AI gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Path to the settings file
        #[arg(short, long, default_value = "settings.json")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate settings and the provider/token tables
    Check {
        /// Path to the settings file
        #[arg(short, long, default_value = "settings.json")]
        config: String,
    },

    /// Show configured providers (keys redacted)
    Providers {
        /// Path to the settings file
        #[arg(short, long, default_value = "settings.json")]
        config: String,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("aigate={},tower_http=info", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut settings = Settings::from_file(&config)?;
            if let Some(addr) = listen {
                settings.listen = addr;
            }
            init_tracing(&settings.log_level);
            tracing::info!(config = %config, "Loaded settings");

            aigate::gateway::run_server(settings).await
        }

        Commands::Check { config } => {
            init_tracing("info");
            let settings = Settings::from_file(&config)?;
            let tables = registry::load_tables(&settings)?;
            println!(
                "OK: {} providers, {} tokens (listen {})",
                tables.provider_count(),
                tables.token_count(),
                settings.listen
            );
            Ok(())
        }

        Commands::Providers { config } => {
            init_tracing("info");
            let settings = Settings::from_file(&config)?;
            let tables = registry::load_tables(&settings)?;
            for provider in tables.providers() {
                println!(
                    "{}  {}  {}",
                    provider.name, provider.base_url, provider.api_key
                );
            }
            Ok(())
        }
    }
}
