//! pushgate: push metrics from a TOML description to a Prometheus push gateway.
//!
//! # Usage
//!
//! ```text
//! pushgate init --path pushgate.toml --host push.example.com --job demo
//! pushgate render --config pushgate.toml --format json
//! pushgate push --config pushgate.toml --once --set temperature=21.5
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod readings;

#[derive(Parser)]
#[command(
    name = "pushgate",
    about = "Push metrics to a Prometheus push gateway",
    version,
    propagate_version = true
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push the configured metrics, once or every `gateway.interval`.
    Push {
        /// Configuration file.
        #[arg(short, long, default_value = "pushgate.toml")]
        config: PathBuf,
        /// Push a single time and exit non-zero unless the gateway answers 200.
        #[arg(long)]
        once: bool,
        /// Instance grouping key, overriding `gateway.instance`.
        #[arg(long)]
        instance: Option<String>,
        /// Report VALUE for metric NAME instead of its configured value.
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = readings::parse_assignment)]
        overrides: Vec<(String, f32)>,
    },
    /// Print the exposition body a push would send.
    Render {
        #[arg(short, long, default_value = "pushgate.toml")]
        config: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = readings::parse_assignment)]
        overrides: Vec<(String, f32)>,
    },
    /// Write a starter configuration.
    Init {
        #[arg(short, long, default_value = "pushgate.toml")]
        path: PathBuf,
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value = "pushgate")]
        job: String,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pushgate=debug".into());
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    match cli.command {
        Commands::Push {
            config,
            once,
            instance,
            overrides,
        } => commands::push::run(&config, once, instance, overrides).await,
        Commands::Render {
            config,
            format,
            overrides,
        } => commands::render::render(&config, &format, &overrides),
        Commands::Init {
            path,
            host,
            job,
            force,
        } => commands::init::init(&path, &host, &job, force),
    }
}
