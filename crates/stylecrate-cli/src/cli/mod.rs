//! CLI entry and dispatch.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use stylecrate_core::config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "stylecrate")]
#[command(version = "0.1")]
#[command(about = "Terminal client for the Crate shop")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long, env = "STYLECRATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out (clear stored credentials and the auth cookie)
    Logout,

    /// Create an account
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long, env = "STYLECRATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the logged-in user
    Whoami,

    /// Show the style matching your style reference
    Style,

    /// List the genders a profile can pick from
    Genders,

    /// Take the style survey (lists the questions when no answers are given)
    Survey {
        /// Answer a question, e.g. --answer q1=2 (repeatable)
        #[arg(long = "answer", value_name = "q<ID>=<VALUE>")]
        answers: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the GraphQL endpoint in the config file
    SetApiUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load().context("load config")?;

    // Dropping the guard flushes the file writer, so it lives until exit.
    let _log_guard = init_logging(&config)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli, &config).await })
}

async fn dispatch(cli: Cli, config: &config::Config) -> Result<()> {
    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(config, &email, password).await
        }
        Commands::Logout => commands::auth::logout(config),
        Commands::Register {
            name,
            email,
            password,
        } => commands::auth::register(config, name, email, password).await,

        Commands::Whoami => commands::profile::whoami(config),
        Commands::Style => commands::profile::style(config).await,
        Commands::Genders => commands::profile::genders(config).await,

        Commands::Survey { answers } => commands::survey::run(config, &answers).await,

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetApiUrl { url } => commands::config::set_api_url(&url),
        },
    }
}

/// Installs the log subscriber: stderr always, plus `log_file` when configured.
///
/// `RUST_LOG` selects the filter; the default is `warn`.
fn init_logging(config: &config::Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match config.effective_log_file() {
        Some(log_file) => {
            let log_file = Path::new(log_file);
            let file_name = log_file
                .file_name()
                .with_context(|| format!("Invalid log file: {}", log_file.display()))?;
            let dir = log_file
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("install log subscriber")?;

    Ok(guard)
}
