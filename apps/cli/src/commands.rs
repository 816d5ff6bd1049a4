//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use icebreaker_core::{BatchProgress, LeadPipeline, OpenRouterClient, PipelineOptions, process_batch};
use icebreaker_crawler::HttpFetcher;
use icebreaker_shared::{AppConfig, FetchConfig, Lead, LeadOutcome, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Icebreaker: personalized cold-email openers from a lead's company website.
#[derive(Parser)]
#[command(
    name = "icebreaker",
    version,
    about = "Generate personalized cold-email icebreakers from lead websites.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Enrich every lead in a JSON file.
    Run {
        /// JSON array of leads (camelCase fields: firstName, lastName, email, website, ...).
        leads: PathBuf,

        /// Write the batch report here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Leads processed at once (defaults to config).
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Fetch and summarize each lead's sub-pages concurrently.
        #[arg(long)]
        parallel_subpages: bool,
    },

    /// Enrich a single lead given on the command line.
    Lead {
        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long)]
        email: String,

        /// Company website, with or without scheme.
        #[arg(long)]
        website: String,

        /// Job title or headline.
        #[arg(long)]
        title: Option<String>,

        /// Company name.
        #[arg(long)]
        company: Option<String>,

        /// Fetch and summarize sub-pages concurrently.
        #[arg(long)]
        parallel_subpages: bool,
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
    /// Initialize config file with defaults.
    Init,
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
        0 => "icebreaker=info",
        1 => "icebreaker=debug",
        _ => "icebreaker=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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
    match cli.command {
        Command::Run {
            leads,
            out,
            concurrency,
            parallel_subpages,
        } => cmd_run(&leads, out.as_deref(), concurrency, parallel_subpages).await,
        Command::Lead {
            first_name,
            last_name,
            email,
            website,
            title,
            company,
            parallel_subpages,
        } => {
            let lead = Lead {
                first_name,
                last_name,
                title,
                company_name: company,
                email,
                website,
            };
            cmd_lead(lead, parallel_subpages).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    leads_path: &Path,
    out: Option<&Path>,
    concurrency: Option<usize>,
    parallel_subpages: bool,
) -> Result<()> {
    let config = load_config()?;
    let leads = read_leads(leads_path)?;
    let pipeline = build_pipeline(&config, parallel_subpages)?;
    let concurrency = resolve_concurrency(concurrency, &config);

    info!(
        leads = leads.len(),
        concurrency,
        path = %leads_path.display(),
        "starting batch"
    );

    let cancel = cancel_on_ctrl_c();
    let progress = Arc::new(CliProgress::new(leads.len()));
    let report = process_batch(&pipeline, leads, concurrency, progress.clone(), &cancel).await;
    progress.finish();

    let json = serde_json::to_string_pretty(&report)?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .map_err(|e| eyre!("cannot write report to '{}': {e}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    eprintln!();
    eprintln!("  Run:       {}", report.run_id);
    eprintln!("  Leads:     {}", report.total());
    eprintln!("  Succeeded: {}", report.succeeded);
    eprintln!("  Failed:    {}", report.failed);
    eprintln!(
        "  Time:      {:.1}s",
        (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0
    );
    eprintln!();

    if cancel.is_cancelled() {
        return Err(eyre!("run interrupted; unfinished leads are marked cancelled"));
    }
    Ok(())
}

async fn cmd_lead(lead: Lead, parallel_subpages: bool) -> Result<()> {
    lead.validate()?;

    let config = load_config()?;
    let pipeline = build_pipeline(&config, parallel_subpages)?;
    let cancel = cancel_on_ctrl_c();

    let outcome = pipeline.process_lead_cancellable(&lead, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&outcome.to_record())?);

    match outcome.failure_reason() {
        Some(reason) => Err(eyre!("{reason}")),
        None => Ok(()),
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_pipeline(config: &AppConfig, parallel_subpages: bool) -> Result<LeadPipeline> {
    let fetcher = HttpFetcher::new(&FetchConfig::from(config))?;
    let model = OpenRouterClient::from_config(config)?;

    let mut options = PipelineOptions::from(config);
    options.parallel_subpages |= parallel_subpages;

    Ok(LeadPipeline::new(Arc::new(fetcher), Arc::new(model), options))
}

/// `--concurrency` when given, else the config default; never below one.
fn resolve_concurrency(flag: Option<usize>, config: &AppConfig) -> usize {
    flag.unwrap_or(config.defaults.concurrency).max(1)
}

fn read_leads(path: &Path) -> Result<Vec<Lead>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read leads file '{}': {e}", path.display()))?;

    serde_json::from_str(&content)
        .map_err(|e| eyre!("'{}' is not a JSON array of leads: {e}", path.display()))
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Batch progress bar on stderr.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchProgress for CliProgress {
    fn lead_started(&self, lead: &Lead) {
        self.bar.set_message(format!("{} ({})", lead.full_name(), lead.website));
    }

    fn lead_finished(&self, completed: usize, _total: usize, outcome: &LeadOutcome) {
        self.bar.set_position(completed as u64);
        if let Some(reason) = outcome.failure_reason() {
            self.bar
                .println(format!("  x {}: {reason}", outcome.lead().email));
        }
    }
}
