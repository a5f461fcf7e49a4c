
use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::ProgressBar;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::advisor::{Advisor, AskOutcome, FallbackStatus};
use crate::config::{Config, get_config_dir};
use crate::dataset::Dataset;
use crate::fallback::GeminiClient;
use crate::matcher::top_matches;
use crate::session::{Session, Speaker, TranscriptEntry};

pub const APP_TITLE: &str = "AiDvice-Medical";

pub const DISCLAIMER: &str = "This application provides general health information and is for \
educational purposes only. It should not be considered a substitute for professional medical \
advice, diagnosis, or treatment. Always seek the advice of your physician or other qualified \
health provider with any questions you may have regarding a medical condition.";

const EXIT_WORDS: &[&str] = &["q", "quit", "exit"];
const PREVIEW_CHARS: usize = 100;

/// Command-line overrides shared by the query commands
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub config_dir: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub threshold: Option<u8>,
    pub no_fallback: bool,
}

/// Interactive chat: read queries until the user quits
#[inline]
pub fn chat(options: &SessionOptions) -> Result<()> {
    let config = load_config(options)?;
    let advisor = build_advisor(&config, options.no_fallback)?;

    print_banner();

    let mut session = Session::new();
    loop {
        let Some(query) = read_query()? else {
            break;
        };

        if EXIT_WORDS.contains(&query.trim().to_lowercase().as_str()) {
            break;
        }

        answer(&advisor, &mut session, &query)?;
    }

    info!(
        "Session ended after {} transcript entries",
        session.transcript().len()
    );
    println!();
    println!("Goodbye! Take care!");

    Ok(())
}

/// Answer a single query and exit
#[inline]
pub fn ask(options: &SessionOptions, query: &str) -> Result<()> {
    let config = load_config(options)?;
    let advisor = build_advisor(&config, options.no_fallback)?;

    let mut session = Session::new();
    match answer(&advisor, &mut session, query)? {
        AskOutcome::Ignored => {
            eprintln!("Nothing to ask: the query is blank.");
            Ok(())
        }
        AskOutcome::Answered {
            fallback: FallbackStatus::Failed { reason },
            expert: None,
        } => Err(anyhow::anyhow!("No answer available: {}", reason)),
        AskOutcome::Answered { .. } => Ok(()),
    }
}

/// Show how a query scores against the dataset without contacting the model
#[inline]
pub fn match_query(options: &SessionOptions, query: &str, top: usize) -> Result<()> {
    let config = load_config(options)?;
    let dataset = load_dataset(&config)?;
    let threshold = config.dataset.threshold;

    let ranked = top_matches(query, dataset.records(), top)
        .with_context(|| format!("Failed to match query: {:?}", query))?;

    println!(
        "Top {} matches in {} ({} records, threshold {}):",
        ranked.len(),
        dataset.source(),
        dataset.len(),
        threshold
    );
    println!();

    for (rank, result) in ranked.iter().enumerate() {
        let Some(record) = dataset.get(result.index) else {
            continue;
        };

        let verdict = if result.score >= threshold {
            style("✓").green()
        } else {
            style("✗").red()
        };

        println!(
            "#{} {} score {:>3}  {}",
            rank + 1,
            verdict,
            result.score,
            style(&record.question).bold()
        );
        println!("   Record: {}", result.index);
        println!("   Answer: {}", preview(&record.answer));
        println!();
    }

    Ok(())
}

fn load_config(options: &SessionOptions) -> Result<Config> {
    let config_dir = get_config_dir(options.config_dir.as_deref())
        .context("Failed to determine configuration directory")?;
    let mut config = Config::load(&config_dir).context("Failed to load configuration")?;

    if let Some(path) = &options.dataset {
        config.dataset.set_path(path.clone())?;
    }
    if let Some(threshold) = options.threshold {
        config.dataset.set_threshold(threshold)?;
    }

    debug!("Using configuration: {:?}", config);
    Ok(config)
}

fn load_dataset(config: &Config) -> Result<Dataset> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!(
        "Loading dataset {}...",
        config.dataset.path.display()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let dataset = Dataset::load(&config.dataset.path);
    spinner.finish_and_clear();

    dataset.with_context(|| {
        format!(
            "Failed to load dataset from {}",
            config.dataset.path.display()
        )
    })
}

fn build_advisor(config: &Config, no_fallback: bool) -> Result<Advisor<GeminiClient>> {
    let dataset = load_dataset(config)?;

    let backend = if no_fallback {
        info!("Chat model disabled; answering from the dataset only");
        None
    } else {
        let api_key = config.gemini.api_key().with_context(|| {
            "Chat model needs an API key (or pass --no-fallback to use the dataset only)"
        })?;
        Some(GeminiClient::new(&config.gemini, api_key)?)
    };

    Ok(Advisor::new(dataset, backend).with_threshold(config.dataset.threshold))
}

fn answer(
    advisor: &Advisor<GeminiClient>,
    session: &mut Session,
    query: &str,
) -> Result<AskOutcome> {
    let mut printer = TranscriptPrinter::new(advisor.has_backend());
    let outcome = advisor.ask(session, query, |entry| printer.print(entry));
    printer.finish();

    outcome.context("Failed to answer query")
}

fn print_banner() {
    println!("{}", style(APP_TITLE).bold().cyan());
    println!();
    println!("{}", style("Disclaimer:").bold().yellow());
    println!("{}", style(DISCLAIMER).dim());
    println!();
    println!("Type a question and press Enter. Type 'q' to quit.");
    println!();
}

/// Read one line of input. `None` at end of input.
fn read_query() -> Result<Option<String>> {
    if console::user_attended() {
        let query = Input::<String>::new()
            .with_prompt("Input")
            .allow_empty(true)
            .interact_text();

        return match query {
            Ok(query) => Ok(Some(query)),
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e).context("Failed to read input"),
        };
    }

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;

    Ok((read > 0).then(|| strip_line_ending(&line).to_string()))
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

/// Renders transcript entries to the terminal as they arrive.
struct TranscriptPrinter {
    awaits_model: bool,
    last: Option<Speaker>,
    spinner: Option<ProgressBar>,
}

impl TranscriptPrinter {
    fn new(awaits_model: bool) -> Self {
        Self {
            awaits_model,
            last: None,
            spinner: None,
        }
    }

    fn print(&mut self, entry: &TranscriptEntry) {
        match entry.speaker {
            Speaker::User if self.awaits_model => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_message("Consulting the model...");
                spinner.enable_steady_tick(Duration::from_millis(100));
                self.spinner = Some(spinner);
            }
            Speaker::User => {}
            Speaker::ExpertDataset => {
                let print = || {
                    println!("{}", style("Expert Advice:").bold().green());
                    println!("{}", entry.text);
                    println!();
                };
                match &self.spinner {
                    Some(spinner) => spinner.suspend(print),
                    None => print(),
                }
            }
            Speaker::Model => {
                self.clear_spinner();
                if self.last != Some(Speaker::Model) {
                    println!("{}", style("The Response is").bold().cyan());
                }
                print!("{}", entry.text);
                if let Err(e) = io::stdout().flush() {
                    debug!("Failed to flush reply fragment: {}", e);
                }
            }
            Speaker::Notice => {
                self.clear_spinner();
                if self.last == Some(Speaker::Model) {
                    println!();
                }
                eprintln!("{}", style(format!("⚠ {}", entry.text)).yellow());
            }
        }
        self.last = Some(entry.speaker);
    }

    fn finish(&mut self) {
        self.clear_spinner();
        if self.last == Some(Speaker::Model) {
            println!();
            println!();
        }
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}
