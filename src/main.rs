//! Query Eval CLI
//!
//! Side-by-side evaluation of two natural-language-to-query models.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use query_eval::{
    aggregate::{Summary, render_summary},
    compare::RowMatching,
    config::Config,
    format::{display_table, render_grid},
    log::{EvaluationLog, Rating, RecordDetails},
    query::QueryServiceClient,
    runner::{BatchReport, Progress},
    session::EvalSession,
    suite::{MAX_TEST_CASES, TestSuite},
    table::ActualResult,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Query Eval - compare two query-generation models side by side
#[derive(Parser)]
#[command(name = "query-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the Model A id
    #[arg(long, global = true)]
    model_a: Option<String>,

    /// Override the Model B id
    #[arg(long, global = true)]
    model_b: Option<String>,

    /// How duplicate rows are matched when comparing tables (multiset or set)
    #[arg(long, global = true)]
    row_matching: Option<RowMatching>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask both models one question and optionally rate the answers
    Ask {
        /// The question to ask
        prompt: String,

        /// Rating for Model A (+ or -)
        #[arg(long, allow_hyphen_values = true)]
        rate_a: Option<Rating>,

        /// Note for Model A
        #[arg(long, default_value = "")]
        note_a: String,

        /// Rating for Model B (+ or -)
        #[arg(long, allow_hyphen_values = true)]
        rate_b: Option<Rating>,

        /// Note for Model B
        #[arg(long, default_value = "")]
        note_b: String,
    },

    /// Run a CSV test suite (Question,Answer columns) against both models
    Batch {
        /// Path to the CSV file
        cases: PathBuf,

        /// Save the log, summary and report to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a CSV test suite and show how each answer was understood
    Check {
        /// Path to the CSV file
        cases: PathBuf,
    },

    /// Interactive session: ask questions, rate answers, manage and run test cases
    Repl,

    /// Test the query service connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { ref cases } => cmd_check(cases),
        Commands::Test => cmd_test(load_config(&cli)?).await,
        Commands::Ask {
            ref prompt,
            rate_a,
            ref note_a,
            rate_b,
            ref note_b,
        } => {
            let config = load_config(&cli)?;
            cmd_ask(config, prompt, [(rate_a, note_a), (rate_b, note_b)]).await
        }
        Commands::Batch {
            ref cases,
            ref output,
        } => cmd_batch(load_config(&cli)?, cases, output.as_deref()).await,
        Commands::Repl => cmd_repl(load_config(&cli)?).await,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model_a) = &cli.model_a {
        config.models.model_a = model_a.clone();
    }
    if let Some(model_b) = &cli.model_b {
        config.models.model_b = model_b.clone();
    }
    if let Some(row_matching) = cli.row_matching {
        config.comparison.row_matching = row_matching;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_ask(
    config: Config,
    prompt: &str,
    feedback: [(Option<Rating>, &String); 2],
) -> Result<()> {
    let mut session = EvalSession::from_config(&config).context("Failed to create session")?;

    println!("Asking both models: \"{}\"\n", prompt);
    if !session.submit_prompt(prompt).await {
        anyhow::bail!("Prompt is empty");
    }
    print_panels(&session);

    for (panel, (rating, note)) in feedback.into_iter().enumerate() {
        session.set_feedback(panel, rating, note.as_str());
    }
    let appended = session.submit_feedback();
    if appended > 0 {
        println!("Feedback submitted!\n");
        print_history(session.log());
        print_summaries(&session);
    }

    Ok(())
}

async fn cmd_batch(config: Config, cases: &Path, output: Option<&Path>) -> Result<()> {
    let mut session = EvalSession::from_config(&config).context("Failed to create session")?;
    let count = session
        .import_test_cases(cases)
        .with_context(|| format!("Failed to import test cases from {}", cases.display()))?;

    println!("Running {} test case(s) against both models...", count);
    let report = session.run_suite(print_progress).await;
    println!();

    print_report(&report);
    print_history(session.log());
    print_summaries(&session);

    if let Some(path) = output {
        session
            .export_json(path, Some(&report))
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        println!("Results saved to {}", path.display());
    }

    Ok(())
}

fn cmd_check(cases: &Path) -> Result<()> {
    let mut suite = TestSuite::new();
    suite
        .import_csv_file(cases)
        .with_context(|| format!("Failed to import test cases from {}", cases.display()))?;

    let rows: Vec<Vec<String>> = suite
        .cases()
        .iter()
        .enumerate()
        .map(|(i, case)| {
            let shape = match &case.expected {
                query_eval::ExpectedValue::Scalar(_) => "1 value".to_string(),
                query_eval::ExpectedValue::Table(t) => {
                    format!("{} x {}", t.row_count(), t.column_count())
                }
            };
            vec![
                (i + 1).to_string(),
                case.question.clone(),
                case.format.to_string(),
                shape,
            ]
        })
        .collect();

    println!(
        "{}",
        render_grid(&headers(&["#", "Question", "Format", "Shape"]), &rows)
    );
    println!("\n{} of {} test case slots used", suite.len(), MAX_TEST_CASES);
    Ok(())
}

async fn cmd_test(config: Config) -> Result<()> {
    println!("Testing query service connection...\n");
    println!("Configuration:");
    println!("  Base URL:  {}", config.api.base_url);
    println!("  Topic:     {}", config.api.topic);
    println!("  Model A:   {}", config.models.model_a);
    println!("  Model B:   {}", config.models.model_b);
    println!(
        "  API Key:   {}...",
        config
            .api
            .api_key
            .chars()
            .take(8)
            .collect::<String>()
    );
    println!();

    let client = QueryServiceClient::new(config.api.clone())?;
    println!("Sending test request...");
    match client.test_connection(&config.models.model_a).await {
        Ok(query) => {
            println!("Connection successful!");
            if let Some(summary) = query.summary_text() {
                println!("{}", summary);
            }
        }
        Err(e) => println!("Connection failed: {}", e),
    }

    Ok(())
}

const REPL_HELP: &str = "\
Type a question to ask both models, or a command:
  :rate <a|b> <+|-> [note]   set pending feedback for a model
  :submit                    log pending feedback
  :model <a|b> <id>          change a model id
  :add <question> | <answer> add a test case
  :load <path>               import test cases from CSV
  :remove <n>                remove test case n
  :cases                     list test cases
  :run                       run the test cases against both models
  :history                   show the evaluation history
  :summary                   show per-model summaries
  :export <path>             save the log and summaries as JSON
  :help                      show this help
  :quit                      exit";

async fn cmd_repl(config: Config) -> Result<()> {
    let mut session = EvalSession::from_config(&config).context("Failed to create session")?;
    println!("{}\n", REPL_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (command, rest) = match trimmed.strip_prefix(':') {
            Some(cmd) => cmd.split_once(' ').unwrap_or((cmd, "")),
            None => {
                if session.submit_prompt(&line).await {
                    print_panels(&session);
                    println!("Rate with :rate a + / :rate b - then :submit");
                }
                continue;
            }
        };
        let rest = rest.trim();

        match command {
            "quit" | "q" | "exit" => break,
            "help" => println!("{}", REPL_HELP),
            "rate" => repl_rate(&mut session, rest),
            "submit" => {
                if session.submit_feedback() > 0 {
                    println!("Feedback submitted!");
                } else {
                    println!("Nothing to submit: rate at least one model first.");
                }
            }
            "model" => match rest.split_once(' ') {
                Some((which, id)) => match panel_index(which) {
                    Some(idx) => session.set_model_id(idx, id.trim()),
                    None => println!("Unknown model '{}', use a or b", which),
                },
                None => println!("Usage: :model <a|b> <id>"),
            },
            "add" => match rest.split_once('|') {
                Some((question, answer)) => {
                    match session.add_test_case(question.trim(), answer.trim()) {
                        Ok(()) => println!("Added test case {}", session.suite().len()),
                        Err(e) => println!("{}", e),
                    }
                }
                None => println!("Usage: :add <question> | <answer>"),
            },
            "load" => match session.import_test_cases(Path::new(rest)) {
                Ok(n) => println!("Imported {} test case(s)", n),
                Err(e) => println!("{}", e),
            },
            "remove" => match rest.parse::<usize>() {
                Ok(n) if n >= 1 => match session.remove_test_case(n - 1) {
                    Ok(case) => println!("Removed \"{}\"", case.question),
                    Err(e) => println!("{}", e),
                },
                _ => println!("Usage: :remove <n>"),
            },
            "cases" => print_cases(&session),
            "run" => {
                if session.suite().is_empty() {
                    println!("No test cases. Use :add or :load first.");
                    continue;
                }
                let report = session.run_suite(print_progress).await;
                println!();
                print_report(&report);
                print_summaries(&session);
            }
            "history" => print_history(session.log()),
            "summary" => print_summaries(&session),
            "export" => match session.export_json(Path::new(rest), None) {
                Ok(()) => println!("Saved to {}", rest),
                Err(e) => println!("{:#}", e),
            },
            other => println!("Unknown command ':{}', try :help", other),
        }
    }

    Ok(())
}

fn repl_rate(session: &mut EvalSession, args: &str) {
    let mut parts = args.splitn(3, ' ');
    let which = parts.next().unwrap_or_default();
    let rating = parts.next().unwrap_or_default();
    let note = parts.next().unwrap_or_default().trim();

    let Some(idx) = panel_index(which) else {
        println!("Usage: :rate <a|b> <+|-> [note]");
        return;
    };
    match rating.parse::<Rating>() {
        Ok(rating) => {
            session.set_feedback(idx, Some(rating), note);
            println!("{} rated {}", session.panels()[idx].slot.label, rating);
        }
        Err(e) => println!("{}", e),
    }
}

fn panel_index(which: &str) -> Option<usize> {
    match which.to_lowercase().as_str() {
        "a" => Some(0),
        "b" => Some(1),
        _ => None,
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn print_progress(progress: Progress) {
    print!(
        "\r  [{}/{}] {:>3.0}%",
        progress.completed,
        progress.total,
        progress.fraction() * 100.0
    );
    std::io::stdout().flush().ok();
}

fn print_panels(session: &EvalSession) {
    for panel in session.panels() {
        println!("### {} Results ({})", panel.slot.label, panel.slot.id);
        println!("{}", "─".repeat(60));

        let Some(run) = &panel.last_run else {
            println!("(no result)\n");
            continue;
        };
        match &run.result {
            ActualResult::Rows(table) => println!("{}", display_table(table)),
            ActualResult::Empty => println!("No query result returned"),
            ActualResult::Failed(reason) => println!("Error: {}", reason),
        }

        if let Some(details) = run.query.as_ref().and_then(|q| q.summary_text()) {
            println!("\nQuery Details:\n{}", details);
        }
        println!();
    }
}

fn print_cases(session: &EvalSession) {
    let rows: Vec<Vec<String>> = session
        .suite()
        .cases()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            vec![
                (i + 1).to_string(),
                c.question.clone(),
                c.expected_raw.replace('\n', " / "),
            ]
        })
        .collect();
    println!("{}", render_grid(&headers(&["#", "Question", "Answer"]), &rows));
    println!(
        "{} of {} test case slots used",
        session.suite().len(),
        MAX_TEST_CASES
    );
}

fn print_report(report: &BatchReport) {
    println!("\n========== Test Results ==========");
    for outcome in &report.outcomes {
        let marker = if outcome.warning { "!" } else { " " };
        println!(
            "{} [{}] {:<8} {:<4} {}",
            marker,
            outcome.case + 1,
            outcome.model,
            outcome.outcome,
            outcome.detail
        );
    }
    let warnings = report.warnings().count();
    if warnings > 0 {
        println!("\n{} check(s) need attention (marked !)", warnings);
    }
    println!("Total time: {:.1}s", report.total_time_secs);
    println!("==================================\n");
}

fn print_history(log: &EvaluationLog) {
    if log.is_empty() {
        return;
    }

    let mut manual = Vec::new();
    let mut automated = Vec::new();
    for record in log.history() {
        match &record.details {
            RecordDetails::Manual { rating, note } => manual.push(vec![
                record.timestamp_label(),
                record.model.clone(),
                record.prompt.clone(),
                rating.to_string(),
                note.clone(),
            ]),
            RecordDetails::Automated {
                expected_response,
                outcome,
                ..
            } => automated.push(vec![
                record.timestamp_label(),
                record.model.clone(),
                record.prompt.clone(),
                expected_response.replace('\n', " / "),
                outcome.to_string(),
            ]),
        }
    }

    println!("### Evaluation History");
    if !manual.is_empty() {
        println!(
            "{}\n",
            render_grid(
                &headers(&["Timestamp", "Model", "Prompt", "Rating", "Feedback"]),
                &manual
            )
        );
    }
    if !automated.is_empty() {
        println!(
            "{}\n",
            render_grid(
                &headers(&["Timestamp", "Model", "Prompt", "Expected", "Outcome"]),
                &automated
            )
        );
    }
}

fn print_summaries(session: &EvalSession) {
    let summary = session.summary();
    if summary.manual.is_empty() && summary.automated.is_empty() {
        return;
    }

    println!("### Model Performance Summary");
    if !summary.manual.is_empty() {
        println!("{}\n", render_summary(&Summary::Manual(summary.manual)));
    }
    if !summary.automated.is_empty() {
        println!("{}\n", render_summary(&Summary::Automated(summary.automated)));
    }
}
