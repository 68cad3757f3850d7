//! intersynth: generate and synthesize a batch of synthetic research
//! interviews, printing the artifacts as JSON on stdout.
//!
//! Environment variables (a `.env` file is honoured):
//!   LOG_FORMAT  - "json" or "text" (default: "text")
//!   LOG_FILE    - path to a log file (optional; logs go to stderr otherwise)
//!   RUST_LOG    - standard env filter
//!
//! Provider keys and pipeline tunables are documented on `AdapterConfig`
//! and `PipelineConfig`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intersynth_core::{PersonaSource, Provider, RunRequest, RunStatus, StakeholderCategory};
use intersynth_inference::{build_backend, AdapterConfig, ModelRegistry};
use intersynth_pipeline::{EnrichedCache, PersonaCatalog, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "intersynth")]
#[command(author, version, about = "Synthetic stakeholder interviews with hierarchical synthesis")]
struct Cli {
    /// Provider: openai, anthropic or google
    #[arg(short, long, env = "INTERSYNTH_PROVIDER", default_value = "openai")]
    provider: Provider,

    /// Model id (defaults to the provider's default model)
    #[arg(short, long, env = "INTERSYNTH_MODEL")]
    model: Option<String>,

    /// Comma-separated stakeholder categories, or "all"
    #[arg(short, long, default_value = "all")]
    categories: String,

    /// Interviews per category (1-10)
    #[arg(short = 'n', long, default_value_t = 2)]
    interviews: u8,

    /// Enrich stakeholders from a cached persona dataset (JSON)
    #[arg(long, env = "INTERSYNTH_PERSONA_CACHE")]
    persona_cache: Option<PathBuf>,

    /// Slots in flight at once (overrides INTERSYNTH_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Log format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Write logs to this file (rotated daily) instead of stderr
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// List known models and exit
    #[arg(long)]
    list_models: bool,
}

/// Install the global subscriber. Logs go to stderr, or to a daily-rotated
/// file when `log_file` is set. The returned guard must outlive the run.
fn init_tracing(
    log_format: &str,
    log_file: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "intersynth=info,intersynth_pipeline=info,intersynth_inference=info".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(path) = log_file {
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("intersynth.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
        }
        Some(guard)
    } else {
        // stdout carries the artifacts
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    }
}

fn parse_categories(value: &str) -> Result<Vec<StakeholderCategory>> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(StakeholderCategory::all().to_vec());
    }
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<StakeholderCategory>().map_err(anyhow::Error::from))
        .collect()
}

fn list_models(registry: &ModelRegistry) {
    for entry in registry.all() {
        println!(
            "{:<10} {:<32} {:>6}  {}",
            entry.provider.as_str(),
            entry.model,
            entry.capabilities.max_output_tokens,
            entry.description
        );
    }
}

async fn run(cli: Cli) -> Result<RunStatus> {
    let registry = ModelRegistry::new();
    if cli.list_models {
        list_models(&registry);
        return Ok(RunStatus::Completed { skipped: 0 });
    }

    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| ModelRegistry::default_model(cli.provider).to_string());
    let profile = registry.resolve(cli.provider, &model);
    let backend = build_backend(profile, AdapterConfig::from_env(cli.provider))
        .context("failed to build provider backend")?;

    let mut config = PipelineConfig::from_env();
    if let Some(concurrency) = cli.concurrency {
        config = config.with_concurrency(concurrency);
    }
    let pipeline = Pipeline::new(backend, config).context("invalid pipeline configuration")?;

    let mut request = RunRequest::new(parse_categories(&cli.categories)?, cli.interviews);
    let mut catalog = PersonaCatalog::builtin();
    if let Some(path) = &cli.persona_cache {
        let cache = EnrichedCache::load(path)
            .with_context(|| format!("failed to load persona cache {}", path.display()))?;
        catalog = catalog.with_enriched_cache(cache);
        request = request.with_persona_source(PersonaSource::Enriched);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let artifacts = pipeline.run(request, &catalog, cancel).await?;
    info!(
        run_id = %artifacts.run_id,
        interviews = artifacts.interviews.len(),
        skipped = artifacts.skips.len(),
        "Writing artifacts"
    );
    println!("{}", serde_json::to_string_pretty(&artifacts)?);
    Ok(artifacts.status)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_tracing(&cli.log_format, cli.log_file.as_deref());
    info!(
        log_format = %cli.log_format,
        log_file = ?cli.log_file,
        "Logging initialized"
    );

    match run(cli).await {
        Ok(RunStatus::Completed { .. }) => ExitCode::SUCCESS,
        Ok(RunStatus::PartialFailure { .. }) => ExitCode::from(2),
        Ok(RunStatus::Cancelled { .. }) => ExitCode::from(130),
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
