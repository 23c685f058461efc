use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use futures::{future::BoxFuture, stream::FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use output::{OutputFormat, Renderer};
use progress::spinner;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};
use wiktionary_client::types::Candidate;
use wiktionary_core::{
    bootstrap,
    notify::{Notifier, Toast, ToastStyle},
    settings::Settings,
    state::SuggestionState,
    LookupService,
};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "wiktionary",
    version,
    about = "Look up words on Wiktionary from the shell."
)]
struct Cli {
    /// Preferred renderer for command output.
    #[arg(long, global = true, value_enum, default_value = "markdown")]
    format: OutputFormat,
    /// Language section to render (overrides the configured one).
    #[arg(long, global = true)]
    lang: Option<String>,
    /// Settings file to load instead of the per-user config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Disable ANSI colors in CLI output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Suppress notifications and other non-critical output.
    #[arg(long, global = true)]
    quiet: bool,
    /// Disable progress indicators for lookups.
    #[arg(long, global = true)]
    no_progress: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, Clone)]
enum Command {
    /// Resolve title suggestions for a partial query.
    Suggest { query: String },
    /// Render the definitions of a title.
    Define { title: String },
    /// Render the full Wiktionary page of a title.
    Page { title: String },
    /// Search as you type: one query per stdin line.
    Interactive,
    /// Print the canonical Wiktionary link for a title.
    Link { title: String },
    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    fn progress_enabled(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

/// Prints toasts on stderr so they never mix with rendered output.
#[derive(Debug, Clone, Copy)]
struct StderrNotifier {
    quiet: bool,
}

impl Notifier for StderrNotifier {
    fn notify(&self, toast: Toast) {
        if self.quiet {
            return;
        }
        let marker = match toast.style {
            ToastStyle::Success => "✓",
            ToastStyle::Failure => "✗",
        };
        match toast.message {
            Some(message) => eprintln!("{marker} {}: {message}", toast.title),
            None => eprintln!("{marker} {}", toast.title),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    if let Command::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(*shell, &mut command, "wiktionary", &mut std::io::stdout());
        return Ok(());
    }

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(lang) = &cli.lang {
        settings.language = lang.clone();
        settings = settings.normalized();
    }

    let notifier = Arc::new(StderrNotifier { quiet: cli.quiet });
    let service = bootstrap(settings, notifier.clone())?;
    let renderer = Renderer::new(cli.format);

    match &cli.command {
        Command::Suggest { query } => handle_suggest(query, &cli, &renderer, &service).await,
        Command::Define { title } => {
            handle_document(title, false, &cli, &renderer, &service).await
        }
        Command::Page { title } => handle_document(title, true, &cli, &renderer, &service).await,
        Command::Interactive => handle_interactive(&renderer, &service, notifier.as_ref()).await,
        Command::Link { title } => {
            if title.trim().is_empty() {
                bail!("a title is required");
            }
            renderer.link(&service.page_url(title))
        }
        Command::Completions { .. } => Ok(()),
    }
}

async fn handle_suggest(
    query: &str,
    cli: &Cli,
    renderer: &Renderer,
    service: &LookupService,
) -> Result<()> {
    let progress = spinner(cli.progress_enabled(), format!("Searching \"{}\"...", query.trim()));
    let state = match service.resolver().resolve(query).await {
        Ok(candidates) => SuggestionState::Ready {
            query: query.to_string(),
            candidates,
        },
        Err(error) => {
            debug!(target: "wiktionary_cli", error = %error, "suggestion lookup failed");
            SuggestionState::Failed {
                query: query.to_string(),
                error,
            }
        }
    };
    finish_spinner(progress, None);

    renderer.rows(&service.rows(&state))?;
    if matches!(state, SuggestionState::Failed { .. }) {
        bail!("failed to load suggestions for \"{}\"", query.trim());
    }
    Ok(())
}

async fn handle_document(
    title: &str,
    full_page: bool,
    cli: &Cli,
    renderer: &Renderer,
    service: &LookupService,
) -> Result<()> {
    if title.trim().is_empty() {
        bail!("a title is required");
    }

    let loading = service.loading_document(title);
    let progress = spinner(
        cli.progress_enabled(),
        loading.markdown.lines().next().unwrap_or_default().trim_start_matches("# "),
    );
    let document = if full_page {
        service.full_page(title).await
    } else {
        service.define(title).await
    };
    finish_spinner(progress, None);

    renderer.document(&document)?;
    if document.kind.is_failure() {
        bail!("lookup for \"{}\" failed ({:?})", document.title, document.kind);
    }
    Ok(())
}

type PendingUpdate = BoxFuture<'static, Option<SuggestionState>>;

async fn handle_interactive(
    renderer: &Renderer,
    service: &LookupService,
    notifier: &dyn Notifier,
) -> Result<()> {
    let session = Arc::new(service.session());
    let mut pending: FuturesUnordered<PendingUpdate> = FuturesUnordered::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    info!(target: "wiktionary_cli", "type a query, or :define N, :open N, :copy N, :quit");

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line.context("failed to read stdin")? else {
                    input_open = false;
                    continue;
                };
                match parse_interactive(&line) {
                    Interactive::Quit => break,
                    Interactive::Query(query) => {
                        let session = session.clone();
                        pending.push(Box::pin(async move { session.update(query).await }));
                    }
                    Interactive::Pick { verb, index } => {
                        let candidates = session.snapshot().candidates().to_vec();
                        let Some(candidate) = pick(&candidates, index) else {
                            notifier.notify(Toast::failure(
                                "No such suggestion",
                                format!("{index} is not in the current list"),
                            ));
                            continue;
                        };
                        run_pick(verb, candidate, renderer, service, notifier).await?;
                    }
                    Interactive::Invalid(reason) => {
                        notifier.notify(Toast::failure("Unrecognized command", reason));
                    }
                }
            }
            Some(applied) = pending.next(), if !pending.is_empty() => {
                // Idle and Loading have nothing to list.
                if let Some(
                    state @ (SuggestionState::Ready { .. } | SuggestionState::Failed { .. }),
                ) = applied
                {
                    renderer.rows(&service.rows(&state))?;
                }
            }
            else => break,
        }
    }

    Ok(())
}

async fn run_pick(
    verb: PickVerb,
    candidate: &Candidate,
    renderer: &Renderer,
    service: &LookupService,
    notifier: &dyn Notifier,
) -> Result<()> {
    match verb {
        PickVerb::Define => {
            let document = service.define(&candidate.title).await;
            renderer.document(&document)
        }
        PickVerb::Open => renderer.link(&service.page_url(&candidate.title)),
        PickVerb::Copy => {
            println!("{}", candidate.title);
            notifier.notify(Toast::success(format!("Copied \"{}\"", candidate.title)));
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickVerb {
    Define,
    Open,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Interactive {
    Query(String),
    Pick { verb: PickVerb, index: usize },
    Quit,
    Invalid(String),
}

fn parse_interactive(line: &str) -> Interactive {
    let Some(command) = line.trim().strip_prefix(':') else {
        return Interactive::Query(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let verb = match parts.next() {
        Some("quit" | "q") => return Interactive::Quit,
        Some("define" | "d") => PickVerb::Define,
        Some("open" | "o") => PickVerb::Open,
        Some("copy" | "c") => PickVerb::Copy,
        Some(other) => return Interactive::Invalid(format!(":{other}")),
        None => return Interactive::Invalid(":".to_string()),
    };
    match parts.next().map(str::parse::<usize>) {
        Some(Ok(index)) if index > 0 => Interactive::Pick { verb, index },
        _ => Interactive::Invalid(format!(":{command} expects a suggestion number")),
    }
}

/// Suggestions are numbered from 1 on screen.
fn pick(candidates: &[Candidate], index: usize) -> Option<&Candidate> {
    index.checked_sub(1).and_then(|idx| candidates.get(idx))
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let default_filter = if cli.quiet {
        "warn"
    } else {
        "warn,wiktionary_cli=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .without_time()
        .with_ansi(!cli.no_color)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize logging: {error}"))
}

fn finish_spinner(spinner: Option<ProgressBar>, message: Option<String>) {
    if let Some(progress) = spinner {
        if let Some(msg) = message {
            progress.finish_with_message(msg);
        } else {
            progress.finish_and_clear();
        }
    }
}

mod output {
    use anyhow::Result;
    use clap::ValueEnum;
    use serde_json::json;
    use wiktionary_core::{
        document::{Action, FormattedDocument},
        state::SuggestionRow,
    };

    #[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
    pub enum OutputFormat {
        Json,
        Markdown,
        Text,
    }

    #[derive(Copy, Clone, Debug)]
    pub struct Renderer {
        format: OutputFormat,
    }

    impl Renderer {
        pub fn new(format: OutputFormat) -> Self {
            Self { format }
        }

        pub fn rows(&self, rows: &[SuggestionRow]) -> Result<()> {
            match self.format {
                OutputFormat::Json => {
                    let payload = json!({ "suggestions": rows });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                OutputFormat::Markdown => {
                    if rows.is_empty() {
                        println!("_No suggestions._");
                    }
                    for (idx, row) in rows.iter().enumerate() {
                        println!("{}. **{}** {}", idx + 1, row.title, row.subtitle);
                    }
                }
                OutputFormat::Text => {
                    for (idx, row) in rows.iter().enumerate() {
                        println!("{:>2}  {:<24} {}", idx + 1, row.title, row.subtitle);
                        println!("    icon: {}", row.icon);
                    }
                }
            }
            Ok(())
        }

        pub fn document(&self, document: &FormattedDocument) -> Result<()> {
            match self.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(document)?);
                }
                OutputFormat::Markdown => {
                    println!("<!-- {} -->", document.navigation_title);
                    println!();
                    println!("{}", document.markdown);
                    if !document.actions.is_empty() {
                        println!();
                        println!("---");
                        for action in &document.actions {
                            println!("- {}", action_line(action));
                        }
                    }
                }
                OutputFormat::Text => {
                    println!("{}", document.navigation_title);
                    println!();
                    println!("{}", document.markdown);
                    for action in &document.actions {
                        println!();
                        println!("{}", action_line(action));
                    }
                }
            }
            Ok(())
        }

        pub fn link(&self, url: &str) -> Result<()> {
            match self.format {
                OutputFormat::Json => println!("{}", json!({ "url": url })),
                OutputFormat::Markdown | OutputFormat::Text => println!("{url}"),
            }
            Ok(())
        }
    }

    fn action_line(action: &Action) -> String {
        match action {
            Action::OpenInBrowser { url, .. } => format!("{}: {url}", action.label()),
            Action::ShowDefinitions { title } => format!("{}: {title}", action.label()),
            Action::CopyToClipboard { content, .. } => format!("{}: {content}", action.label()),
        }
    }
}

mod progress {
    use std::time::Duration;

    use indicatif::{ProgressBar, ProgressStyle};

    pub fn spinner(message_enabled: bool, message: impl Into<String>) -> Option<ProgressBar> {
        if !message_enabled {
            return None;
        }
        let progress = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        progress.set_style(style);
        progress.set_message(message.into());
        progress.enable_steady_tick(Duration::from_millis(80));
        Some(progress)
    }
}
