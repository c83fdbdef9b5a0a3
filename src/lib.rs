//! artpick: build a selection across pages of a remote art catalog.
//!
//! The library is organized leaf-first:
//! - `model`: records and pages.
//! - `catalog`: the `CatalogClient` trait plus HTTP and in-memory clients.
//! - `selection`: the cross-page selection set.
//! - `pagination`: the latest-request-wins page controller.
//! - `bulk`: "select the first N records" across page boundaries.
//! - `browser`: the facade a front end drives.
//! - `session`: the line-oriented `browse` front end.

pub mod browser;
pub mod bulk;
pub mod catalog;
pub mod config;
pub mod model;
pub mod pagination;
pub mod selection;
pub mod session;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::browser::Browser;
use crate::bulk::BulkSelectError;
use crate::catalog::http::ArticClient;
use crate::catalog::memory::FixtureCatalog;
use crate::catalog::{CatalogClient, CatalogErrorKind};
use crate::config::{Config, ConfigError};
use crate::pagination::PageOutcome;

#[derive(Parser, Debug)]
#[command(
    name = "artpick",
    version,
    about = "Browse a paginated art catalog and build a cross-page selection"
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true, alias = "robot")]
    pub json: bool,

    /// Raise log verbosity to debug (overrides ARTPICK_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Records per page
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    /// Catalog API base URL
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Use an in-memory catalog of COUNT synthetic records instead of the network
    #[arg(long, global = true, value_name = "COUNT")]
    pub fixture: Option<usize>,

    /// Config file (defaults to $XDG_CONFIG_HOME/artpick/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Fetch and print one page (1-based page number, as the paginator shows it)
    Page {
        #[arg(
            default_value_t = 1,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        number: usize,
    },
    /// Select the first COUNT records of the catalog and print their ids
    SelectFirst {
        /// Free-text count; invalid input selects nothing
        #[arg(allow_hyphen_values = true)]
        count: String,
    },
    /// Interactive line-oriented session over stdin (default)
    Browse,
}

#[derive(Debug)]
pub struct ParsedCli {
    pub cli: Cli,
}

/// Failure reported by the binary, with a process exit code.
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    pub code: i32,
    pub kind: &'static str,
    pub message: String,
    pub hint: Option<String>,
    pub retryable: bool,
}

impl CliError {
    fn usage(message: String) -> Self {
        Self {
            code: 2,
            kind: "usage",
            message,
            hint: Some("Run `artpick --help` for usage.".into()),
            retryable: false,
        }
    }

    fn config(err: ConfigError) -> Self {
        Self {
            code: 5,
            kind: "config",
            message: err.to_string(),
            hint: Some("Fix the config file or the ARTPICK_* environment variables.".into()),
            retryable: false,
        }
    }

    fn catalog(kind: CatalogErrorKind, message: String) -> Self {
        Self {
            code: 3,
            kind: "catalog",
            message,
            hint: Some(kind.hint().to_string()),
            retryable: kind.is_retryable(),
        }
    }

    fn bulk(err: &BulkSelectError) -> Self {
        Self {
            code: 4,
            kind: "bulk_select",
            message: err.to_string(),
            hint: Some("The partial selection was kept; running the command again is safe.".into()),
            retryable: true,
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            code: 1,
            kind: "internal",
            message: err.to_string(),
            hint: None,
            retryable: false,
        }
    }

    /// `--help` / `--version` output; exit 0 after printing `message`.
    pub fn is_informational(&self) -> bool {
        self.code == 0
    }
}

pub fn parse_cli(args: Vec<String>) -> Result<ParsedCli, CliError> {
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(ParsedCli { cli }),
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return Err(CliError {
                    code: 0,
                    kind: "info",
                    message: err.to_string(),
                    hint: None,
                    retryable: false,
                });
            }
            Err(CliError::usage(err.to_string()))
        }
    }
}

/// Install the stderr log subscriber. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("artpick=debug")
    } else {
        EnvFilter::try_from_env("ARTPICK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve configuration: file, then environment, then flags.
pub fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env()?;
            config
        }
        None => Config::load()?,
    };
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_client(cli: &Cli, config: &Config) -> Result<Arc<dyn CatalogClient>, CliError> {
    if let Some(count) = cli.fixture {
        debug!(count, "using fixture catalog");
        return Ok(Arc::new(FixtureCatalog::synthetic(count)));
    }
    let client = ArticClient::from_config(config)
        .map_err(|e| CliError::catalog(e.kind(), e.to_string()))?;
    debug!(base_url = client.base_url(), "using http catalog");
    Ok(Arc::new(client))
}

pub async fn run_with_parsed(parsed: ParsedCli) -> Result<(), CliError> {
    let cli = parsed.cli;
    init_tracing(cli.verbose);

    let config = resolve_config(&cli).map_err(CliError::config)?;
    let client = build_client(&cli, &config)?;
    let browser = Arc::new(Browser::new(client, config.page_size));

    match cli.command.clone().unwrap_or(Commands::Browse) {
        Commands::Page { number } => run_page(&browser, number, cli.json).await,
        Commands::SelectFirst { count } => run_select_first(&browser, &count, cli.json).await,
        Commands::Browse => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            session::run_browse(browser, stdin, &mut stdout, cli.json)
                .await
                .map_err(CliError::internal)
        }
    }
}

async fn run_page(browser: &Browser, number: usize, json: bool) -> Result<(), CliError> {
    // clap rejects 0, so this cannot underflow.
    let index = number - 1;
    if let PageOutcome::Failed(kind) = browser.request_page(index).await {
        return Err(CliError::catalog(
            kind,
            format!("Failed to load page {number} ({kind} error)"),
        ));
    }
    let view = browser.view();
    if json {
        print_json(&view)?;
    } else {
        print!("{}", session::render_view(&view));
    }
    Ok(())
}

#[derive(Serialize)]
struct SelectFirstOutput {
    report: bulk::BulkReport,
    selected_ids: Vec<model::RecordId>,
}

async fn run_select_first(browser: &Browser, count: &str, json: bool) -> Result<(), CliError> {
    let result = browser.select_first_n(count).await;
    let selected_ids = browser.selection().sorted_ids();

    let report = match &result {
        Ok(report) => *report,
        Err(err) => bulk::BulkReport {
            accumulated: err.applied(),
            ..bulk::BulkReport::default()
        },
    };
    if json {
        print_json(&SelectFirstOutput {
            report,
            selected_ids,
        })?;
    } else {
        for id in &selected_ids {
            println!("{id}");
        }
    }

    result.map(|_| ()).map_err(|e| CliError::bulk(&e))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let line = serde_json::to_string(value).map_err(CliError::internal)?;
    println!("{line}");
    Ok(())
}
