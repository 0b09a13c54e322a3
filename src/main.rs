use anyhow::Context;
use atlas_research::{
    config::Config,
    tui,
    utils::{init_logger, LogTarget},
    ResearchPipeline, ResearchState,
};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

const LOG_DIR: &str = ".atlas/logs";
const LOG_FILE: &str = "atlas-research.log";

/// Break a question into sub-questions, search the web for each and write a report.
#[derive(Debug, Parser)]
#[command(name = "atlas-research", version)]
struct Cli {
    /// Research question; prompted for on stdin when omitted
    question: Vec<String>,

    /// Start the interactive terminal UI; the question is typed there
    #[arg(long, conflicts_with_all = ["json", "output", "question"])]
    tui: bool,

    /// Also write the report to this file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Print the full research state as JSON instead of the report
    #[arg(long)]
    json: bool,

    /// TOML configuration file (defaults to ./atlas.toml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(Some(path))?,
        None => Config::from_env()?,
    };

    // Held until exit so buffered log lines are flushed
    let _log_guard = if cli.tui {
        init_logger(LogTarget::File {
            dir: Path::new(LOG_DIR),
            file_name: LOG_FILE,
        })?
    } else {
        init_logger(LogTarget::Stderr)?
    };

    config.validate()?;
    info!(model = %config.llm.model_name, search_enabled = config.search.is_enabled(), "Configuration loaded");

    let pipeline = ResearchPipeline::from_config(&config)?;

    if cli.tui {
        tui::run(pipeline, &config.llm.model_name).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if !pipeline.search_enabled() {
        eprintln!(
            "INFO: Running in LLM-only mode (set GOOGLE_SEARCH_API_KEY and GOOGLE_CSE_ID to enable web search)."
        );
    }

    let question = match question_from_args(&cli.question) {
        Some(question) => question,
        None => prompt_question()?,
    };

    match pipeline.run(&question).await {
        Ok(state) => {
            print_result(&cli, &state).await?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("ERROR: {}", failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn question_from_args(args: &[String]) -> Option<String> {
    let question = args.join(" ").trim().to_string();
    (!question.is_empty()).then_some(question)
}

fn prompt_question() -> anyhow::Result<String> {
    print!("Enter your research question: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read question from stdin")?;
    Ok(line.trim().to_string())
}

async fn print_result(cli: &Cli, state: &ResearchState) -> anyhow::Result<()> {
    let report = state.report().unwrap_or_default();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else {
        println!("\n===== Final Report =====\n");
        println!("{}", report);
    }

    if let Some(path) = &cli.output {
        tokio::fs::write(path, report)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
        eprintln!("Report saved to {}", path.display());
    }

    Ok(())
}
