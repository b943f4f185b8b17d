//! CLI entry point for the hotel concierge gateway

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::ApiClient;
use concierge_agent::{ChatGateway, ContextBuilder, HOTEL_NAME};
use concierge_core::config::{Config, ConfigLoader};
use concierge_core::logging::init_logging;
use concierge_core::session::{InMemorySessionStore, SessionStore, DEFAULT_SESSION_ID};
use concierge_manager::{run_server, AppState};
use concierge_providers::{provider_from_config, LLMProvider};
use console::style;
use dialoguer::Input;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Guest-support chat gateway for the Seattle Marriott Bellevue")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat with a running gateway
    Chat {
        /// Message to send; starts an interactive session when omitted
        #[arg(short, long)]
        message: Option<String>,
        /// Session id for conversation continuity
        #[arg(short, long)]
        session: Option<String>,
        /// Gateway base URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Forget a conversation on a running gateway
    Reset {
        /// Session id to reset
        #[arg(short, long)]
        session: Option<String>,
        /// Gateway base URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Check that a gateway is up
    Health {
        /// Gateway base URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_serve(&config_loader, host, port).await?;
        }
        Commands::Chat {
            message,
            session,
            url,
        } => {
            init_cli_tracing();
            let session = session.unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
            let client = ApiClient::new(url);
            match message {
                Some(msg) => run_chat_once(&client, &msg, &session).await?,
                None => run_chat_interactive(&client, &session).await?,
            }
        }
        Commands::Reset { session, url } => {
            init_cli_tracing();
            let session = session.unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
            run_reset(&ApiClient::new(url), &session).await?;
        }
        Commands::Health { url } => {
            init_cli_tracing();
            run_health(&ApiClient::new(url)).await?;
        }
        Commands::Status => {
            init_cli_tracing();
            run_status(&config_loader)?;
        }
    }

    Ok(())
}

/// Client commands only log warnings unless RUST_LOG says otherwise
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// Run the gateway until Ctrl+C
async fn run_serve(loader: &ConfigLoader, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = loader.load()?;
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let _log_guard = init_logging(&config.logging);

    let provider = provider_from_config(&config.provider);
    if let Some(provider) = &provider {
        info!(model = %provider.get_default_model(), "Provider configured");
    }

    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let gateway = ChatGateway::new(
        store,
        provider,
        ContextBuilder::new(),
        config.session.clone(),
    );

    let mut state = AppState::new(Arc::new(gateway));
    if let Some(ui_path) = &config.gateway.ui_path {
        state = state.with_ui_path(ui_path);
    }

    println!("{}", style(format!("{} concierge", HOTEL_NAME)).bold().cyan());
    println!(
        "Listening on http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("{}", style("Press Ctrl+C to stop.").green());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(());
    });

    run_server(state, &config.gateway.host, config.gateway.port, shutdown_rx).await?;

    println!("{}", style("Gateway stopped.").green());
    Ok(())
}

async fn run_chat_once(client: &ApiClient, message: &str, session: &str) -> Result<()> {
    let reply = client.chat(message, session).await?;
    println!("{}", reply.response);
    Ok(())
}

async fn run_chat_interactive(client: &ApiClient, session: &str) -> Result<()> {
    println!(
        "{} (session {})",
        style(format!("Chatting with the {} concierge", HOTEL_NAME)).bold().cyan(),
        session
    );
    println!(
        "Type {} to start over or {} to leave.\n",
        style("/reset").cyan(),
        style("/quit").cyan()
    );

    loop {
        let line: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                client.reset(session).await?;
                println!("{}\n", style("Conversation reset.").yellow());
            }
            _ => match client.chat(&line, session).await {
                Ok(reply) => println!("{} {}\n", style("Concierge:").bold(), reply.response),
                Err(e) => println!("{} {}\n", style("Error:").red().bold(), e),
            },
        }
    }

    Ok(())
}

async fn run_reset(client: &ApiClient, session: &str) -> Result<()> {
    let ack = client.reset(session).await?;
    println!("{} {} ({})", style("✓").green().bold(), ack.message, ack.session_id);
    Ok(())
}

async fn run_health(client: &ApiClient) -> Result<()> {
    let health = client.health().await?;
    println!(
        "{} {} - {}",
        style("✓").green().bold(),
        health.status,
        health.hotel
    );
    Ok(())
}

/// Show the effective configuration
fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("Concierge Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config file: {}", loader.config_path().display());
    println!();

    print_provider(&config);

    println!("{}", style("Gateway:").bold());
    println!("  Address: {}:{}", config.gateway.host, config.gateway.port);
    match &config.gateway.ui_path {
        Some(path) => println!("  Chat page: {}", path),
        None => println!("  Chat page: built-in"),
    }
    println!();

    println!("{}", style("Sessions:").bold());
    println!("  History limit: {} entries", config.session.max_history);
    println!(
        "  Roll back on provider failure: {}",
        config.session.rollback_on_failure
    );
    println!();

    println!("{}", style("Logging:").bold());
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);
    println!("  Directory: {}", config.logging.dir);

    Ok(())
}

fn print_provider(config: &Config) {
    let provider = &config.provider;
    println!("{}", style("Provider:").bold());
    let key_status = if provider.has_api_key() {
        style(mask_key(provider.api_key.trim())).green()
    } else {
        style("not configured".to_string()).red()
    };
    println!("  API key: {}", key_status);
    println!("  Model: {}", provider.model);
    if let Some(base) = &provider.api_base {
        println!("  API base: {}", base);
    }
    if let Some(temperature) = provider.temperature {
        println!("  Temperature: {}", temperature);
    }
    if let Some(max_tokens) = provider.max_output_tokens {
        println!("  Max output tokens: {}", max_tokens);
    }
    println!();
}

/// Keep the last four characters of a key
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}
