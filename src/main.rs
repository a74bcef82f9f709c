//! selfmatch - Self-Match Verification Harness
//!
//! CLI entry point: loads configuration, applies flag overrides, runs the
//! harness against the configured service and prints the summary.

use anyhow::{Context, Result};
use clap::Parser;
use selfmatch::config::{HarnessConfig, SettleMode};
use selfmatch::{report, Harness, HttpService};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "selfmatch")]
#[command(version)]
#[command(about = "Verify that a similarity service returns each identity as its own best match", long_about = None)]
struct Cli {
    /// Config file (default: search for selfmatch.toml upward from cwd)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service base address
    #[arg(long)]
    base_url: Option<String>,

    /// Number of identities to generate and ingest
    #[arg(short = 'n', long)]
    population: Option<usize>,

    /// Number of identities to verify
    #[arg(short, long)]
    sample: Option<usize>,

    /// Feature vector length
    #[arg(long)]
    features_length: Option<usize>,

    /// Ingestion worker pool size
    #[arg(short, long)]
    workers: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Fixed settle delay in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Poll until acknowledged identities self-match instead of sleeping
    #[arg(long)]
    poll: bool,

    /// Run service property probes after verification
    #[arg(long)]
    probes: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Exit with status 1 when anything failed
    #[arg(long)]
    strict: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(url) = &self.base_url {
            config.service.base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.service.timeout_secs = secs;
        }
        if let Some(n) = self.population {
            config.run.population = n;
        }
        if let Some(n) = self.sample {
            config.run.sample_size = n;
        }
        if let Some(n) = self.features_length {
            config.run.features_length = n;
        }
        if let Some(n) = self.workers {
            config.run.max_workers = n;
        }
        if self.seed.is_some() {
            config.run.seed = self.seed;
        }
        if let Some(ms) = self.settle_ms {
            config.settle.delay_ms = ms;
        }
        if self.poll {
            config.settle.mode = SettleMode::Poll;
        }
        if self.probes {
            config.verify.probes = true;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "selfmatch=debug" } else { "selfmatch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HarnessConfig::load_from_cwd().context("Failed to load selfmatch.toml")?,
    };
    cli.apply(&mut config);
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(ExitCode::SUCCESS);
    }

    let service = HttpService::from_config(&config.service);
    tracing::info!(base_url = %service.base_url(), "starting self-match run");

    let summary = Harness::new(config, service).run();
    println!("{}", report::render(&summary));

    if cli.strict && !summary.all_passed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
