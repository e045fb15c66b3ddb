//! repograde - batch grader for student repositories
//!
//! ## Commands
//!
//! - `evaluate`: grade every `<owner>/<repo>` under a root and write one report each
//! - `corpus`: print the excerpt a repository would be graded on
//! - `recover`: turn a saved raw model response into a score record

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chat_endpoint::{ChatOptions, OllamaClient, OllamaConfig, DEFAULT_OLLAMA_HOST, DEFAULT_TIMEOUT_SECS};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};

use repograde_core::{
    evaluate_root, score_response, BatchSummary, CorpusBudget, CorpusBuilder, Evaluator,
    PromptTemplate, ScoreRecord, SourcePolicy, DEFAULT_MODEL,
};

#[derive(Parser)]
#[command(name = "repograde")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade student repositories with a local LLM", long_about = None)]
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
    /// Evaluate every <owner>/<repo> directory under the root
    Evaluate(EvaluateArgs),

    /// Print the excerpt built for one repository, without calling the model
    Corpus {
        /// Repository directory
        repo: PathBuf,

        /// Print selection statistics as JSON instead of the excerpt
        #[arg(long)]
        stats: bool,

        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Recover and normalize a saved raw model response ("-" reads stdin)
    Recover {
        /// File holding the raw response
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Directory laid out as <owner>/<repo>/
    #[arg(long, env = "REPOS_ROOT", default_value = "repos")]
    root: PathBuf,

    /// Report directory; reports land at <out>/<owner>/<repo>.json
    #[arg(short, long, env = "REPOGRADE_OUT", default_value = "outputs")]
    out: PathBuf,

    /// Model identifier
    #[arg(short, long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Ollama server base URL
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_HOST)]
    host: String,

    /// Upper bound for one chat call, in seconds
    #[arg(long, env = "OLLAMA_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Context window hint sent with each request
    #[arg(long, default_value_t = ChatOptions::default().num_ctx)]
    num_ctx: u32,

    /// Sampling temperature
    #[arg(long, default_value_t = ChatOptions::default().temperature)]
    temperature: f32,

    /// Prompt template file; must contain {project_info}
    #[arg(long, env = "REPOGRADE_PROMPT")]
    template: Option<PathBuf>,

    #[command(flatten)]
    budget: BudgetArgs,
}

#[derive(Args, Debug, Clone)]
struct BudgetArgs {
    /// Hard cap on the excerpt, in characters
    #[arg(long, default_value_t = CorpusBudget::default().max_total_chars)]
    max_total_chars: usize,

    /// Cap on each README or file body, in characters
    #[arg(long, default_value_t = CorpusBudget::default().max_file_chars)]
    max_file_chars: usize,

    /// Maximum number of files considered
    #[arg(long, default_value_t = CorpusBudget::default().max_files)]
    max_files: usize,

    /// Files at or above this size are ignored
    #[arg(long, default_value_t = CorpusBudget::default().max_file_bytes)]
    max_file_bytes: u64,
}

impl From<&BudgetArgs> for CorpusBudget {
    fn from(args: &BudgetArgs) -> Self {
        CorpusBudget {
            max_total_chars: args.max_total_chars,
            max_file_chars: args.max_file_chars,
            max_files: args.max_files,
            max_file_bytes: args.max_file_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    repograde_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Evaluate(args) => cmd_evaluate(&args).await,
        Commands::Corpus {
            repo,
            stats,
            budget,
        } => cmd_corpus(&repo, stats, &budget),
        Commands::Recover { file } => cmd_recover(&file),
    }
}

async fn cmd_evaluate(args: &EvaluateArgs) -> Result<()> {
    let template = match &args.template {
        Some(path) => PromptTemplate::from_file(path)
            .with_context(|| format!("Failed to load prompt template {}", path.display()))?,
        None => PromptTemplate::default(),
    };

    let config = OllamaConfig::new(&args.host).with_timeout_secs(args.timeout_secs);
    let client = OllamaClient::new(config).context("Failed to build chat client")?;

    let evaluator = Evaluator::new(client, args.model.as_str())
        .with_options(ChatOptions {
            num_ctx: args.num_ctx,
            temperature: args.temperature,
        })
        .with_budget(CorpusBudget::from(&args.budget))
        .with_template(template);

    info!(
        root = %args.root.display(),
        out = %args.out.display(),
        model = %args.model,
        host = %args.host,
        "Starting batch evaluation"
    );

    let summary = evaluate_root(&evaluator, &args.root, &args.out)
        .await
        .with_context(|| format!("Failed to evaluate repositories under {}", args.root.display()))?;

    print_summary(&summary, &args.out);
    Ok(())
}

fn print_summary(summary: &BatchSummary, out: &Path) {
    println!(
        "Evaluated {} repositories: {} succeeded, {} failed",
        summary.evaluated, summary.succeeded, summary.failed
    );
    println!("  Reports: {} written to {}", summary.reports.len(), out.display());
    if summary.write_failures > 0 {
        warn!(write_failures = summary.write_failures, "Some reports were not written");
        println!("  Write failures: {}", summary.write_failures);
    }
}

fn cmd_corpus(repo: &Path, stats: bool, budget: &BudgetArgs) -> Result<()> {
    if !repo.is_dir() {
        anyhow::bail!("Repository directory not found: {}", repo.display());
    }

    let policy = SourcePolicy::standard();
    let excerpt = CorpusBuilder::new(&policy, CorpusBudget::from(budget)).build(repo);

    if stats {
        println!("{}", serde_json::to_string_pretty(excerpt.stats())?);
    } else {
        println!("{}", excerpt.as_str());
    }
    Ok(())
}

fn read_raw(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read raw response from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read raw response {}", file.display()))
}

fn recover_file(file: &Path) -> Result<ScoreRecord> {
    let raw = read_raw(file)?;
    score_response(&raw)
        .with_context(|| format!("Failed to recover a score record from {}", file.display()))
}

fn cmd_recover(file: &Path) -> Result<()> {
    let score = recover_file(file)?;
    println!("{}", serde_json::to_string_pretty(&score)?);
    Ok(())
}
