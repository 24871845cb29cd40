//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use sitescout_core::run_research_job_with;
use sitescout_shared::{
    ResearchConfig, ResearchInput, ResearchResult, ResearchStatus, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteScout — quick, bounded reconnaissance of a company website.
#[derive(Parser)]
#[command(
    name = "sitescout",
    version,
    about = "Fetch a few well-known pages from a domain and extract business signals.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long, global = true, env = "SITESCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a research job against a domain and print the result as JSON.
    Research {
        /// Domain to research, e.g. `acme.com`.
        domain: String,

        /// Company name to carry through to the result.
        #[arg(long)]
        company: Option<String>,

        /// Keep raw page HTML in the output.
        #[arg(long)]
        include_html: bool,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Print the candidate URLs that would be probed for a domain.
    Urls {
        /// Domain to build candidates for.
        domain: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries results.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitescout=info",
        1 => "sitescout=debug",
        _ => "sitescout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    match cli.command {
        Command::Research {
            domain,
            company,
            include_html,
            pretty,
        } => cmd_research(config, &domain, company, include_html, pretty).await,
        Command::Urls { domain } => cmd_urls(&config, &domain),
        Command::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn resolve_config(path: Option<&std::path::Path>) -> Result<ResearchConfig> {
    match path {
        Some(path) => Ok(load_config_from(path)?),
        None => Ok(ResearchConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_research(
    config: ResearchConfig,
    domain: &str,
    company: Option<String>,
    include_html: bool,
    pretty: bool,
) -> Result<()> {
    let mut input = ResearchInput::new(domain);
    if let Some(name) = company {
        input = input.with_company_name(name);
    }

    let mut result = run_research_job_with(config, &input).await;
    if !include_html {
        strip_html(&mut result);
    }

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");

    info!(
        job_id = %result.job_id,
        status = %result.status,
        pages = result.pages.len(),
        "research finished"
    );

    match result.status {
        ResearchStatus::Completed => Ok(()),
        status => Err(eyre!(
            "research job {status}: {}",
            result.error.as_deref().unwrap_or("no details")
        )),
    }
}

fn strip_html(result: &mut ResearchResult) {
    let pages = std::mem::take(&mut result.pages);
    result.pages = pages.into_iter().map(|p| p.without_html()).collect();
}

fn cmd_urls(config: &ResearchConfig, domain: &str) -> Result<()> {
    let domain = ResearchInput::new(domain).normalized_domain()?;
    for url in sitescout_crawler::build_urls_with_scheme(&config.scheme, &domain) {
        println!("{url}");
    }
    Ok(())
}

fn cmd_config_show(config: &ResearchConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
