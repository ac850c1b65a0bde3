//! Mock API server.
//!
//! # Architecture Overview
//!
//! ```text
//!   mock.toml ──▶ config ──▶ routing::compile ──▶ RouteStore ◀── reload task ◀── watcher
//!                                                     │
//!   Client ──▶ http (request id, trace, cors, timeout, access log)
//!                  │
//!                  ▼
//!              lookup ──▶ inline JSON | data file | handler
//!                  │
//!                  └─ no match ──▶ static dir | 404
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mock_server::config::{resolve_config_path, validate_config, LoadError};
use mock_server::lifecycle::{signals, start, StartupOptions};
use mock_server::observability::init_logging;
use mock_server::{load_config, MockConfig, MockServer, Shutdown};

/// Looked up (with extension completion) when `--config` is not given.
const DEFAULT_CONFIG: &str = "mock";

#[derive(Parser)]
#[command(name = "mock-server", version)]
#[command(about = "Serve mock API responses from a rule file", long_about = None)]
struct Cli {
    /// Config file or directory (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Reload rules when the config file changes
    #[arg(short, long)]
    watch: bool,

    /// Log level or filter, overrides the config
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config and print the compiled rules
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, config_path) = load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.server.set_port(port);
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    config.watch |= cli.watch;
    validate_config(&config).map_err(LoadError::Validation)?;

    if let Some(Commands::Check) = cli.command {
        return check(&config);
    }

    init_logging(&config.observability.log_level);
    tracing::info!("mock-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        data_dir = %config.data_dir.display(),
        rules = config.api.len(),
        watch = config.watch,
        "Configuration loaded"
    );

    let options = StartupOptions {
        config_path,
        watch: config.watch,
    };
    let server = MockServer::new(config)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    start(server, options, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Explicit path: must load. Default path: fall back to defaults when absent.
fn load(path: Option<&Path>) -> Result<(MockConfig, Option<PathBuf>), LoadError> {
    let explicit = path.is_some();
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG));

    match resolve_config_path(path) {
        Ok(resolved) => Ok((load_config(&resolved)?, Some(resolved))),
        Err(LoadError::NotFound(_)) if !explicit => {
            eprintln!("no {} config found, serving with defaults", DEFAULT_CONFIG);
            Ok((MockConfig::default(), None))
        }
        Err(e) => Err(e),
    }
}

fn check(config: &MockConfig) -> Result<(), Box<dyn std::error::Error>> {
    let table = config.compile()?;
    for rule in table.rules() {
        let query = rule.query.map(|q| format!("?{}", q)).unwrap_or_default();
        println!(
            "{:<6} {}{}  -> {} {}",
            rule.method.as_str(),
            rule.path,
            query,
            rule.descriptor.kind(),
            rule.descriptor
        );
    }
    println!("{} rules OK", table.rule_count());
    Ok(())
}
