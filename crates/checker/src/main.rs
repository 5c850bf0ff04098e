//! Assortment relevance checker CLI.
//!
//! Usage:
//!     checker analyze "samsung hdr10+ tvs" --shop-id shop-1 --group "hdr10+, hdr 10+" --group "word:tv"
//!     checker analyze "oled tv" --config checks.toml --format json
//!     checker export "oled tv" --config checks.toml

mod config;

use anyhow::{bail, Context, Result};
use assortcheck_backend_search::{SearchApiBackend, SearchBackend};
use assortcheck_classify::analyze;
use assortcheck_explain::{build_report, render_text};
use assortcheck_model::{AnalysisRequest, AnalysisResult, Environment};
use clap::{Args, Parser, Subcommand};
use config::{resolve, ChecksFile, RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "checker")]
#[command(about = "Check whether search results contain every required concept")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search and classify the results
    Analyze {
        #[command(flatten)]
        run: RunArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Also write the LLM export to this file
        #[arg(long)]
        llm_out: Option<PathBuf>,
    },

    /// Search and print only the LLM-formatted titles and descriptions
    Export {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Keyword to search on the API
    keyword: String,

    /// Shop identifier
    #[arg(long)]
    shop_id: Option<String>,

    /// Search environment (prod, staging)
    #[arg(short, long = "env")]
    environment: Option<Environment>,

    /// Number of search results to analyze (1-1000)
    #[arg(short, long)]
    size: Option<u32>,

    /// Check group: comma-separated variations, optionally prefixed with
    /// `contains:` or `word:` (repeatable)
    #[arg(short, long = "group")]
    groups: Vec<String>,

    /// TOML checks file with shop, environment and groups
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the search API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            keyword: args.keyword,
            shop_id: args.shop_id,
            environment: args.environment,
            result_size: args.size,
            groups: args.groups,
            config: args.config,
            base_url: args.base_url,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in log_directives(cli.verbose) {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match cli.command {
        Commands::Analyze {
            run,
            format,
            llm_out,
        } => {
            run_analyze(run.into(), &format, llm_out).await?;
        }
        Commands::Export { run } => {
            run_export(run.into()).await?;
        }
    }

    Ok(())
}

/// Filter directives for the library crates and this binary.
fn log_directives(verbose: bool) -> Vec<String> {
    let level = if verbose { "debug" } else { "info" };
    vec![
        format!("assortcheck={}", level),
        format!("{}={}", env!("CARGO_CRATE_NAME"), level),
    ]
}

/// Resolve options, fetch products and classify them.
async fn fetch_and_analyze(options: RunOptions) -> Result<(AnalysisRequest, AnalysisResult)> {
    let file = match &options.config {
        Some(path) => ChecksFile::load(path)?,
        None => ChecksFile::default(),
    };
    let (request, api) = resolve(&options, file)?;

    let backend = SearchApiBackend::new(api)?;
    tracing::info!(
        backend = backend.name(),
        keyword = %request.keyword,
        size = request.result_size,
        groups = request.groups.len(),
        "Analyzing search results"
    );

    let products = backend.search(&request).await?;
    let result = analyze(&request, &products)?;

    Ok((request, result))
}

async fn run_analyze(options: RunOptions, format: &str, llm_out: Option<PathBuf>) -> Result<()> {
    if format != "text" && format != "json" {
        bail!("Unknown output format: {}. Use text or json.", format);
    }

    let (request, result) = fetch_and_analyze(options).await?;
    let report = build_report(&request, &result);

    if let Some(path) = llm_out {
        std::fs::write(&path, &result.llm_export)
            .with_context(|| format!("Failed to write LLM export: {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote LLM export");
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    Ok(())
}

async fn run_export(options: RunOptions) -> Result<()> {
    let (_, result) = fetch_and_analyze(options).await?;
    println!("{}", result.llm_export);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_subscriber::filter::Directive;

    #[test]
    fn test_log_directives_cover_binary() {
        assert_eq!(log_directives(false), vec!["assortcheck=info", "checker=info"]);
        assert_eq!(log_directives(true), vec!["assortcheck=debug", "checker=debug"]);
        for directive in log_directives(true) {
            assert!(directive.parse::<Directive>().is_ok());
        }
    }
}
