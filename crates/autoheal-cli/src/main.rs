//! autoheal - detect, fix and verify defects in a repository
//!
//! ## Commands
//!
//! - `run`: clone a repository, heal it on a fresh branch and push the fixes
//! - `detect`: scan a local tree and report failures without editing
//! - `fix`: one local detect + fix pass, no git
//! - `results`: print the latest persisted run result

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use autoheal_core::config::parse_extensions;
use autoheal_core::{
    read_results, Detector, Failure, Fix, FixEngine, GitCli, HealConfig, RetryCoordinator,
    RunPhase, RunRegistry, RunRequest, RunResult, StatusObserver, SuggestionService,
};
use autoheal_gemini::GeminiClient;

#[derive(Parser)]
#[command(name = "autoheal")]
#[command(version = autoheal_core::VERSION)]
#[command(about = "Detect, fix and verify defects in a repository", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a repository, heal it and push fixes to TEAM_LEADER_AI_Fix
    Run {
        /// Repository to clone
        #[arg(long, env = "AUTOHEAL_REPO_URL")]
        repo_url: String,

        /// Team name, used in the branch name
        #[arg(long, env = "TEAM_NAME")]
        team: String,

        /// Team leader name, used in the branch name
        #[arg(long, env = "LEADER_NAME")]
        leader: String,

        /// Maximum detect/fix iterations (default: MAX_RETRIES or 5)
        #[arg(long)]
        max_retries: Option<u32>,

        /// Where to write results.json (default: AUTOHEAL_RESULTS_PATH or output/results.json)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Keep the cloned working tree after the run
        #[arg(long)]
        keep_workdir: bool,

        /// Disable the suggestion service even when GEMINI_API_KEY is set
        #[arg(long)]
        no_suggest: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Report failures in a local tree without editing it
    Detect {
        /// Tree to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Comma separated extensions to scan (default: AUTOHEAL_EXTENSIONS or py)
        #[arg(long)]
        extensions: Option<String>,

        /// Ask the suggestion service for further failures
        #[arg(long)]
        suggest: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Apply one detect + fix pass to a local tree
    Fix {
        /// Tree to fix in place
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Comma separated extensions to scan (default: AUTOHEAL_EXTENSIONS or py)
        #[arg(long)]
        extensions: Option<String>,

        /// Use the suggestion service for detection and descriptions
        #[arg(long)]
        suggest: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the latest run result
    Results {
        /// Path of results.json (default: AUTOHEAL_RESULTS_PATH or output/results.json)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    autoheal_core::telemetry::init_tracing(cli.json, level);

    let config = HealConfig::from_env();

    match cli.command {
        Commands::Run {
            repo_url,
            team,
            leader,
            max_retries,
            results,
            keep_workdir,
            no_suggest,
            format,
        } => {
            let request = RunRequest::new(
                repo_url,
                team,
                leader,
                max_retries.unwrap_or(config.max_retries),
            );
            let results_path = results.unwrap_or_else(|| config.results_path.clone());
            cmd_run(
                &config,
                request,
                &results_path,
                keep_workdir,
                !no_suggest,
                format,
            )
            .await
        }
        Commands::Detect {
            path,
            extensions,
            suggest,
            format,
        } => {
            let extensions = resolve_extensions(&config, extensions.as_deref());
            cmd_detect(&path, extensions, suggest, format).await
        }
        Commands::Fix {
            path,
            extensions,
            suggest,
            format,
        } => {
            let extensions = resolve_extensions(&config, extensions.as_deref());
            cmd_fix(&path, extensions, suggest, format).await
        }
        Commands::Results { path } => {
            let path = path.unwrap_or_else(|| config.results_path.clone());
            cmd_results(&path)
        }
    }
}

fn resolve_extensions(config: &HealConfig, flag: Option<&str>) -> Vec<String> {
    flag.map(parse_extensions)
        .unwrap_or_else(|| config.extensions.clone())
}

/// The suggestion service, when enabled and requested.
fn suggestions(enabled: bool) -> Option<Arc<dyn SuggestionService>> {
    if !enabled {
        return None;
    }
    let client = GeminiClient::from_env();
    if client.is_none() {
        info!("GEMINI_API_KEY not set, running without suggestions");
    }
    client.map(|c| Arc::new(c) as Arc<dyn SuggestionService>)
}

/// Forwards updates to the registry and logs them.
struct CliObserver<'a> {
    inner: autoheal_core::registry::RegistryObserver<'a>,
}

impl StatusObserver for CliObserver<'_> {
    fn on_status(&self, phase: RunPhase, message: Option<&str>) {
        self.inner.on_status(phase, message);
        info!(status = %phase, message = message.unwrap_or(""), "run status");
    }
}

async fn cmd_run(
    config: &HealConfig,
    request: RunRequest,
    results_path: &Path,
    keep_workdir: bool,
    suggest: bool,
    format: OutputFormat,
) -> Result<()> {
    let service = suggestions(suggest);
    let detector = Detector::new(config.extensions.clone()).with_suggestions(service.clone());
    let fix_engine = FixEngine::new().with_suggestions(service);
    let vcs = Arc::new(GitCli::new(config.git.clone()));

    let coordinator = RetryCoordinator::new(vcs)
        .with_detector(detector)
        .with_fix_engine(fix_engine)
        .with_results_path(results_path)
        .with_cleanup(!keep_workdir);

    let registry = RunRegistry::new();
    let run_id = registry.begin().context("Failed to register run")?;
    let observer = CliObserver {
        inner: registry.observer(run_id.clone()),
    };
    let result = coordinator.run_with_id(run_id, request, &observer).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            print_result(&result);
            println!("Results: {}", results_path.display());
        }
    }

    if !result.passed() {
        anyhow::bail!(
            "run {} failed: {}",
            result.run_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn cmd_detect(
    path: &Path,
    extensions: Vec<String>,
    suggest: bool,
    format: OutputFormat,
) -> Result<()> {
    let detector = Detector::new(extensions).with_suggestions(suggestions(suggest));
    let failures = detector
        .detect(path)
        .await
        .with_context(|| format!("Failed to scan {}", path.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&failures)?),
        OutputFormat::Text => {
            if failures.is_empty() {
                println!("No failures found in {}", path.display());
            }
            for failure in &failures {
                println!("{}", format_failure(failure));
            }
        }
    }
    Ok(())
}

async fn cmd_fix(
    path: &Path,
    extensions: Vec<String>,
    suggest: bool,
    format: OutputFormat,
) -> Result<()> {
    let service = suggestions(suggest);
    let detector = Detector::new(extensions).with_suggestions(service.clone());
    let engine = FixEngine::new().with_suggestions(service);

    let failures = detector
        .detect(path)
        .await
        .with_context(|| format!("Failed to scan {}", path.display()))?;
    let fixes = engine
        .apply(path, &failures)
        .await
        .with_context(|| format!("Failed to apply fixes in {}", path.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&fixes)?),
        OutputFormat::Text => {
            println!(
                "Detected {} failure(s), applied {} fix(es)",
                failures.len(),
                fixes.len()
            );
            for fix in &fixes {
                println!("{}", format_fix(fix));
            }
        }
    }
    Ok(())
}

fn cmd_results(path: &Path) -> Result<()> {
    let result = read_results(path)
        .with_context(|| format!("Failed to read results from {}", path.display()))?;
    match result {
        Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        None => println!("No results yet"),
    }
    Ok(())
}

fn format_failure(failure: &Failure) -> String {
    format!(
        "{}:{} {} {}",
        failure.file, failure.line, failure.bug_type, failure.message
    )
}

fn format_fix(fix: &Fix) -> String {
    format!(
        "{}:{} {} {}",
        fix.file, fix.line, fix.bug_type, fix.fix_description
    )
}

fn print_result(result: &RunResult) {
    println!("Run:        {}", result.run_id);
    println!("Status:     {:?}", result.status);
    println!("Branch:     {}", result.branch);
    println!(
        "Iterations: {}/{}",
        result.iterations_used, result.max_retries
    );
    println!("Fixes:      {}", result.fixes.len());
    println!(
        "Score:      {} (base {} + speed {} - penalty {})",
        result.score.final_score,
        result.score.base_score,
        result.score.speed_bonus,
        result.score.efficiency_penalty
    );
    if let Some(error) = &result.error {
        println!("Error:      {}", error);
    }
    for fix in &result.fixes {
        println!("  {}", format_fix(fix));
    }
}
