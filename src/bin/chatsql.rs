//! chatsql: ask your database questions from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session
//! chatsql
//!
//! # One question, then exit
//! chatsql "how many orders were placed this month?"
//!
//! # Answer and save a PDF report
//! chatsql "revenue by region" --export pdf --layout simple
//! ```

use anyhow::{Context, Result, anyhow, bail};
use chatsql::prelude::*;
use chatsql::{report, view};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatsql")]
#[command(version)]
#[command(about = "Ask your database in plain language (read-only)", long_about = None)]
#[command(after_help = "EXAMPLES:
    chatsql
    chatsql 'list the 10 most recent orders'
    chatsql 'sales per month in 2024' --export xlsx
    chatsql 'top customers' --format json")]
struct Cli {
    /// A question to answer once; starts the REPL when omitted
    question: Option<String>,

    /// Output format for answers
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Save a report of the answer
    #[arg(short, long, value_enum)]
    export: Option<ExportKind>,

    /// PDF layout used by --export pdf
    #[arg(short, long, value_enum, default_value = "corporate")]
    layout: PdfLayout,

    /// Directory reports are written to
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Config file (defaults to <config dir>/chatsql/config.toml)
    #[arg(short, long, env = "CHATSQL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Xlsx,
    Pdf,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Repl,
    /// Print the schema summary sent to the language model
    Schema,
    /// Show the resolved configuration with secrets masked
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    // Real environment variables win over .env entries.
    let _ = dotenvy::dotenv();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "chatsql=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let assistant = Assistant::new(loader);

    match &cli.command {
        Some(Commands::Schema) => show_schema(&assistant).await,
        Some(Commands::Config) => show_config(&assistant),
        Some(Commands::Repl) => run_repl(&assistant, &cli).await,
        None => match &cli.question {
            Some(question) => ask_once(&assistant, &cli, question).await,
            None => run_repl(&assistant, &cli).await,
        },
    }
}

async fn ask_once(assistant: &Assistant, cli: &Cli, question: &str) -> Result<()> {
    let mut conversation = Conversation::new();
    let answer = assistant.ask(&mut conversation, question).await;
    print_answer(&conversation, answer, cli.format);

    let failed = conversation
        .get(answer)
        .and_then(Exchange::bundle)
        .is_some_and(|b| b.error().is_some());
    if failed {
        std::process::exit(1);
    }

    if let Some(kind) = cli.export {
        let format = match kind {
            ExportKind::Xlsx => ReportFormat::Spreadsheet,
            ExportKind::Pdf => ReportFormat::Document(cli.layout),
        };
        let path = export(&conversation, answer, format, &out_dir(assistant, cli))?;
        println!("{} Saved {}", "✓".green(), path.display().to_string().cyan());
    }
    Ok(())
}

fn print_answer(conversation: &Conversation, index: usize, format: OutputFormat) {
    let Some(exchange) = conversation.get(index) else {
        return;
    };
    let number = conversation
        .answers()
        .iter()
        .position(|&i| i == index)
        .map_or(0, |p| p + 1);

    match (format, exchange.bundle().and_then(ResultBundle::table)) {
        (OutputFormat::Json, Some(table)) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&table.to_json()).unwrap_or_default()
            );
        }
        _ => println!("{}", view::render_exchange(exchange, number)),
    }
}

fn out_dir(assistant: &Assistant, cli: &Cli) -> PathBuf {
    cli.out_dir.clone().unwrap_or_else(|| {
        assistant
            .loader()
            .load()
            .map(|c| c.report.out_dir)
            .unwrap_or_else(|_| PathBuf::from("."))
    })
}

/// Build a fresh report for the answer at `index` and save it.
fn export(
    conversation: &Conversation,
    index: usize,
    format: ReportFormat,
    dir: &Path,
) -> Result<PathBuf> {
    let bundle = conversation
        .get(index)
        .and_then(Exchange::bundle)
        .ok_or_else(|| anyhow!("no answer at that position"))?;
    let table = bundle
        .table()
        .ok_or_else(|| anyhow!("that answer has no table to export"))?;
    if table.is_empty() {
        bail!("{}", view::NO_RESULTS);
    }
    let question = conversation.question_for(index).unwrap_or_default();
    let artifact = report::generate(table, question, format, Local::now().naive_local())?;
    let path = artifact
        .save_in(dir)
        .with_context(|| format!("writing report into {}", dir.display()))?;
    tracing::info!(mime = artifact.mime, path = %path.display(), "report saved");
    Ok(path)
}

async fn show_schema(assistant: &Assistant) -> Result<()> {
    let config = assistant.loader().load()?;
    let database = SqlDatabase::new(config.database.url(), config.database.sample_rows);
    let schema = database.schema().await?;
    println!(
        "{} {} table(s)",
        format!("{}", schema.dialect).cyan().bold(),
        schema.tables.len()
    );
    println!();
    println!("{}", schema.render());
    Ok(())
}

fn show_config(assistant: &Assistant) -> Result<()> {
    let config = assistant.loader().load()?;
    let rows = [
        ("Model", config.llm.model.clone()),
        ("Endpoint", config.llm.endpoint.clone()),
        ("API key", "***".to_string()),
        ("Row cap (top_k)", config.llm.top_k.to_string()),
        ("Database", config.database.redacted_url()),
        ("Dialect", config.database.dialect().to_string()),
        ("Sample rows", config.database.sample_rows.to_string()),
        ("Report dir", config.report.out_dir.display().to_string()),
    ];
    for (key, value) in rows {
        println!("{:18} {}", key.dimmed(), value.white());
    }
    Ok(())
}

async fn run_repl(assistant: &Assistant, cli: &Cli) -> Result<()> {
    use rustyline::DefaultEditor;
    use rustyline::error::ReadlineError;

    println!("{}", "chatsql: ask a question about your data".cyan().bold());
    println!("{}", "Type .help for commands, .exit to quit.".dimmed());
    println!();

    let mut rl = DefaultEditor::new().context("failed to initialize the line editor")?;
    let history_path = dirs::home_dir()
        .map(|p| p.join(".chatsql_history"))
        .unwrap_or_default();
    let _ = rl.load_history(&history_path);

    let mut conversation = Conversation::new();
    let dir = out_dir(assistant, cli);

    loop {
        let prompt = "chatsql> ".cyan().bold().to_string();
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if line.starts_with('.') {
                    match run_command(line, &mut conversation, &dir) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Exit) => break,
                        Err(e) => eprintln!("{} {:#}", "✗".red(), e),
                    }
                    continue;
                }

                println!("{}", "Thinking...".dimmed());
                let answer = assistant.ask(&mut conversation, line).await;
                print_answer(&conversation, answer, cli.format);
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    println!("{}", "Goodbye!".green());
    Ok(())
}

enum Flow {
    Continue,
    Exit,
}

fn run_command(line: &str, conversation: &mut Conversation, dir: &Path) -> Result<Flow> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match command {
        ".exit" | ".quit" => return Ok(Flow::Exit),
        ".help" => show_repl_help(),
        ".history" => println!("{}", view::render(conversation.snapshot())),
        ".xlsx" => {
            let index = answer_index(conversation, args.first().copied())?;
            let path = export(conversation, index, ReportFormat::Spreadsheet, dir)?;
            println!("{} Saved {}", "✓".green(), path.display().to_string().cyan());
        }
        ".pdf" => {
            let index = answer_index(conversation, args.first().copied())?;
            let layout = conversation.layout_for(index);
            let path = export(conversation, index, ReportFormat::Document(layout), dir)?;
            println!("{} Saved {}", "✓".green(), path.display().to_string().cyan());
        }
        ".layout" => {
            let (number, name) = match args.as_slice() {
                [name] => (None, *name),
                [number, name] => (Some(*number), *name),
                _ => bail!("usage: .layout [n] <corporate|simple>"),
            };
            let index = answer_index(conversation, number)?;
            let layout: PdfLayout = name.parse()?;
            conversation.select_layout(index, layout);
            println!(
                "{} Next PDF for this answer uses the {} layout",
                "✓".green(),
                layout.to_string().cyan()
            );
        }
        other => bail!("unknown command '{}', try .help", other),
    }
    Ok(Flow::Continue)
}

/// Map a 1-based answer number (latest when absent) to a log position.
fn answer_index(conversation: &Conversation, number: Option<&str>) -> Result<usize> {
    let answers = conversation.answers();
    match number {
        None => answers
            .last()
            .copied()
            .ok_or_else(|| anyhow!("nothing answered yet")),
        Some(raw) => {
            let n: usize = raw
                .parse()
                .with_context(|| format!("'{}' is not an answer number", raw))?;
            n.checked_sub(1)
                .and_then(|i| answers.get(i).copied())
                .ok_or_else(|| anyhow!("no answer [{}]", n))
        }
    }
}

fn show_repl_help() {
    println!("{}", "chatsql REPL Commands:".cyan().bold());
    println!("  {}                  - Ask a question", "<text>".yellow());
    println!("  {}              - Save answer n (default: latest) as a spreadsheet", ".xlsx [n]".yellow());
    println!("  {}               - Save answer n as a PDF using its layout", ".pdf [n]".yellow());
    println!("  {} - Choose the PDF layout for answer n", ".layout [n] <corporate|simple>".yellow());
    println!("  {}               - Redraw the conversation", ".history".yellow());
    println!("  {}                  - Show this help", ".help".yellow());
    println!("  {}                  - Exit", ".exit".yellow());
    println!();
}
