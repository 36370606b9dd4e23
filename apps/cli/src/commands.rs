//! CLI command definitions, routing, and tracing setup.

use std::path::Path;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use shearwater_core::pipeline::{ProgressReporter, SpeakConfig, SpeakOutcome};
use shearwater_core::retry::AnswerPolicy;
use shearwater_inference::WorkerInferencer;
use shearwater_moderation::ModerationGate;
use shearwater_platform::PlatformClient;
use shearwater_shared::{AppConfig, init_config, load_config, resolve_api_token};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Shearwater — answer crowd-submitted asks from a knowledge corpus.
#[derive(Parser)]
#[command(
    name = "shearwater",
    version,
    about = "Answer crowd-submitted blog asks from a fixed knowledge corpus.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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
    /// Pick an eligible ask, answer it from the corpus, and publish the reply.
    Speak {
        /// Run the whole pipeline but skip the final publish.
        #[arg(long)]
        dry_run: bool,

        /// Corpus file path (overrides the config value).
        #[arg(long)]
        corpus: Option<String>,
    },

    /// Answer an ad-hoc question from the corpus, without the platform.
    Answer {
        /// The question to answer.
        question: String,

        /// Corpus file path (overrides the config value).
        #[arg(long)]
        corpus: Option<String>,
    },

    /// List the currently eligible asks and their derived questions.
    Asks,

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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "shearwater=info",
        1 => "shearwater=debug",
        _ => "shearwater=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Speak { dry_run, corpus } => cmd_speak(dry_run, corpus.as_deref()).await,
        Command::Answer { question, corpus } => cmd_answer(&question, corpus.as_deref()).await,
        Command::Asks => cmd_asks().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Apply CLI overrides onto the loaded config.
fn with_overrides(mut config: AppConfig, corpus: Option<&str>) -> AppConfig {
    if let Some(path) = corpus {
        config.pipeline.corpus_path = path.to_string();
    }
    config
}

fn build_inferencer(config: &AppConfig) -> WorkerInferencer {
    WorkerInferencer::new(
        config.worker.clone(),
        config.pipeline.model_id.clone(),
        config.pipeline.max_window_len,
    )
}

// ---------------------------------------------------------------------------
// speak
// ---------------------------------------------------------------------------

async fn cmd_speak(dry_run: bool, corpus: Option<&str>) -> Result<()> {
    let config = with_overrides(load_config()?, corpus);

    let gate = ModerationGate::from_config(&config.moderation)?;
    let token = resolve_api_token(&config)?;
    let client = PlatformClient::new(&config.platform, &token)?;
    let inferencer = build_inferencer(&config);

    let speak_config = SpeakConfig {
        pipeline: config.pipeline.clone(),
        dry_run,
    };

    info!(blog = %config.platform.blog, dry_run, "starting speak run");

    let reporter = CliProgress::new();
    let outcome =
        shearwater_core::pipeline::speak(&speak_config, &client, &inferencer, &gate, &reporter)
            .await?;

    match outcome {
        Some(outcome) => print_outcome(&outcome, dry_run),
        None => {
            println!();
            println!("  Nothing to say: no eligible ask, or the model came up empty.");
            println!();
        }
    }

    Ok(())
}

fn print_outcome(outcome: &SpeakOutcome, dry_run: bool) {
    println!();
    if dry_run {
        println!("  Dry run — nothing was published.");
    } else {
        println!("  Answer published!");
    }
    println!("  Ask:      {}", outcome.submission_id);
    println!("  Question: {}", outcome.question);
    println!("  Answer:   {}", outcome.answer);
    println!("  Attempts: {}", outcome.attempts);
    println!("  Time:     {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// answer (ad-hoc, no platform)
// ---------------------------------------------------------------------------

async fn cmd_answer(question: &str, corpus: Option<&str>) -> Result<()> {
    let config = with_overrides(load_config()?, corpus);

    let gate = ModerationGate::from_config(&config.moderation)?;
    let inferencer = build_inferencer(&config);
    let corpus_text = shearwater_core::load_corpus(Path::new(&config.pipeline.corpus_path))?;
    let policy = AnswerPolicy::from(&config.pipeline);

    info!(question, "answering ad-hoc question");

    let spinner = CliProgress::new();
    spinner.phase("Answering");
    let answer =
        shearwater_core::answer_question(&inferencer, &gate, question, &corpus_text, &policy)
            .await;
    spinner.done(None);

    match answer? {
        Some(answer) => {
            println!();
            println!("  Question: {question}");
            println!("  Answer:   {}", answer.text);
            println!("  Attempts: {}", answer.attempts);
            println!();
            Ok(())
        }
        None => Err(eyre!("the model returned an empty answer span")),
    }
}

// ---------------------------------------------------------------------------
// asks
// ---------------------------------------------------------------------------

async fn cmd_asks() -> Result<()> {
    let config = load_config()?;

    let gate = ModerationGate::from_config(&config.moderation)?;
    let token = resolve_api_token(&config)?;
    let client = PlatformClient::new(&config.platform, &token)?;

    let submissions = client.drafts().await?;
    let options = shearwater_core::FilterOptions::from(&config.pipeline);
    let eligible = shearwater_core::eligible(&submissions, &options, &gate).await?;

    if eligible.is_empty() {
        println!("No eligible asks ({} drafts fetched).", submissions.len());
        return Ok(());
    }

    println!();
    println!(
        "  {} eligible ask(s) of {} draft(s):",
        eligible.len(),
        submissions.len()
    );
    println!();
    for submission in &eligible {
        let when = submission
            .timestamp
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        let question = submission.question().unwrap_or_else(|| "(no text)".into());
        println!("  {:>12}  {when}  {question}", submission.id);
        for caption in submission.captions() {
            println!("  {:>12}  caption: {caption}", "");
        }
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

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
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: Option<&SpeakOutcome>) {
        self.spinner.finish_and_clear();
    }
}
