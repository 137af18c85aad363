//! CLI binary for doc-analyzer.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, resolves capabilities once, and prints results.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use doc_analyzer::{
    analyzable_files, analyze_with_observer, inspect, normalize, AnalysisError, AnalysisRequest,
    AssembledResponse, Capability, DocumentFormat, ExtractionResult, ExtractorRegistry, GenerationObserver,
    InferenceError, ModelListing, ServiceClient, ServiceConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI observer: spinner until the first fragment, then echo ───────────────

/// Shows a spinner while the model is thinking, then writes fragments to
/// stdout as they arrive.
struct CliObserver {
    spinner: Option<ProgressBar>,
    streaming: AtomicBool,
}

impl CliObserver {
    fn new(label: &str, show_spinner: bool) -> Self {
        let spinner = show_spinner.then(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(SPINNER_TICKS),
            );
            bar.set_prefix("Analyzing");
            bar.set_message(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Self {
            spinner,
            streaming: AtomicBool::new(false),
        }
    }

    fn clear_spinner(&self) {
        if let Some(ref bar) = self.spinner {
            bar.finish_and_clear();
        }
    }
}

impl GenerationObserver for CliObserver {
    fn on_fragment(&self, fragment: &str) {
        if !self.streaming.swap(true, Ordering::SeqCst) {
            self.clear_spinner();
        }
        let mut out = io::stdout().lock();
        let _ = out.write_all(fragment.as_bytes());
        let _ = out.flush();
    }

    fn on_generation_complete(&self, response: &AssembledResponse) {
        self.clear_spinner();
        if !response.text.ends_with('\n') {
            println!();
        }
    }

    fn on_generation_error(&self, _error: &InferenceError) {
        self.clear_spinner();
        if self.streaming.load(Ordering::SeqCst) {
            println!();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Which models are installed?
  doc-analyzer models

  # What can this build read?
  doc-analyzer capabilities

  # Plain text of every supported file in a folder
  doc-analyzer extract ./database

  # Summarise a report with the first installed model
  doc-analyzer analyze report.docx --task "summarise"

  # Pick a model and a different Ollama port
  doc-analyzer --port 11500 analyze sales.xlsx --task "find the top three regions in" --model llama3:8b

SUPPORTED FORMATS:
  Extension  Reader                         Needs
  ─────────  ─────────────────────────────  ──────────────────────────
  .txt       UTF-8 text                     -
  .xlsx      first sheet as TSV (calamine)  -
  .docx      paragraphs (docx-rs)           feature `docx`
  .pptx      shape text per slide           feature `pptx`
  .doc/.ppt  textract or LibreOffice        converter on PATH

ENVIRONMENT VARIABLES:
  OLLAMA_HOST                  Service address (default http://localhost:11434)
  DOC_ANALYZER_PORT            Override the port of OLLAMA_HOST
  DOC_ANALYZER_TIMEOUT         Generate budget in seconds (default 300)
  DOC_ANALYZER_LIST_TIMEOUT    Model listing budget in seconds (default 5)
  DOC_ANALYZER_MODEL           Default model for `analyze`
  RUST_LOG                     Log filter, overrides -v / -q
"#;

/// Extract text from office documents and analyze it with a local Ollama model.
#[derive(Parser, Debug)]
#[command(
    name = "doc-analyzer",
    version,
    about = "Extract text from office documents and analyze it with a local Ollama model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Inference service address, e.g. http://localhost:11434 or 10.0.0.5:11434.
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    host: Option<String>,

    /// Use this port instead of the one in --host.
    #[arg(long, global = true, env = "DOC_ANALYZER_PORT",
          value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Budget for one whole generate request, in seconds.
    #[arg(long, global = true, env = "DOC_ANALYZER_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Budget for listing models, in seconds.
    #[arg(long, global = true, env = "DOC_ANALYZER_LIST_TIMEOUT", default_value_t = 5)]
    list_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC_ANALYZER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "DOC_ANALYZER_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the models installed on the inference service.
    Models {
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show which optional readers are available.
    Capabilities {
        /// Print the table as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the plain text of each file.
    Extract {
        /// Files or directories (directories are scanned one level deep).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// One JSON record per file instead of raw text.
        #[arg(long)]
        json: bool,
    },

    /// Ask a model to perform a task on each file and stream the answer.
    Analyze {
        /// Files or directories (directories are scanned one level deep).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// What to do, e.g. "summarise" or "extract the key points of".
        #[arg(short, long)]
        task: String,

        /// Model name; defaults to the first installed model.
        #[arg(short, long, env = "DOC_ANALYZER_MODEL")]
        model: Option<String>,

        /// Path to a text file containing a custom system prompt.
        #[arg(long)]
        system_prompt: Option<PathBuf>,

        /// Disable the waiting spinner.
        #[arg(long)]
        no_progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match &cli.command {
        Command::Models { json } => run_models(&config, *json).await,
        Command::Capabilities { json } => run_capabilities(*json),
        Command::Extract { files, json } => run_extract(files, *json, cli.quiet).await,
        Command::Analyze {
            files,
            task,
            model,
            system_prompt,
            no_progress,
        } => {
            let show_progress = !cli.quiet && !*no_progress;
            run_analyze(
                &config,
                files,
                task,
                model.as_deref(),
                system_prompt.as_deref(),
                show_progress,
                cli.quiet,
            )
            .await
        }
    }
}

/// Map CLI args to `ServiceConfig`.
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .generate_timeout(Duration::from_secs(cli.timeout))
        .list_timeout(Duration::from_secs(cli.list_timeout));
    if let Some(ref host) = cli.host {
        builder = builder.base_url(host);
    }
    let config = builder.build().context("Invalid configuration")?;

    match cli.port {
        Some(port) => config
            .with_port(port)
            .with_context(|| format!("Cannot use port {port}")),
        None => Ok(config),
    }
}

// ── models ───────────────────────────────────────────────────────────────

async fn run_models(config: &ServiceConfig, json: bool) -> Result<()> {
    let client = ServiceClient::new(config.clone())?;
    let listing = client.list_models().await;

    if json {
        #[derive(Serialize)]
        struct Out<'a> {
            models: Vec<&'a str>,
            diagnostic: Option<&'static str>,
            detail: Option<String>,
        }
        let out = Out {
            models: listing.names().collect(),
            diagnostic: listing.diagnostic.as_ref().map(InferenceError::class),
            detail: listing.diagnostic.as_ref().map(ToString::to_string),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_listing(config, &listing);
    match listing.diagnostic {
        Some(e) => Err(e).context("Could not list models"),
        None => Ok(()),
    }
}

fn print_listing(config: &ServiceConfig, listing: &ModelListing) {
    if let Some(ref e) = listing.diagnostic {
        eprintln!("{} {}", red("✘"), bold(&format!("No model list from {}", config.base_url())));
        eprintln!("  {}", listing_hint(e));
        return;
    }
    if listing.is_reachable_but_empty() {
        eprintln!(
            "{} Ollama is running at {} but has no models installed.",
            cyan("⚠"),
            config.base_url()
        );
        eprintln!("  Install one with: ollama pull <model>   e.g. ollama pull qwen2.5:0.5b");
        return;
    }
    for (i, name) in listing.names().enumerate() {
        println!("{:>3}. {}", i + 1, name);
    }
}

fn listing_hint(e: &InferenceError) -> String {
    match e {
        InferenceError::ServiceUnreachable { .. } => {
            "Ollama does not appear to be running. Start it with `ollama serve`, \
or pass --host / --port if it listens elsewhere."
                .to_string()
        }
        InferenceError::Timeout { budget_ms, .. } => format!(
            "The service did not answer within {}s. Raise --list-timeout if it is busy loading a model.",
            budget_ms / 1000
        ),
        InferenceError::HttpError { status, .. } => format!(
            "The service answered HTTP {status}. Check that --host / --port point at Ollama."
        ),
        InferenceError::MalformedResponse { .. } => {
            "The service answered, but not with a model list. Check that --host / --port point at Ollama."
                .to_string()
        }
        other => other.to_string(),
    }
}

// ── capabilities ─────────────────────────────────────────────────────────

fn run_capabilities(json: bool) -> Result<()> {
    let registry = ExtractorRegistry::detect();
    let caps = registry.capabilities();

    if json {
        #[derive(Serialize)]
        struct Row {
            capability: Capability,
            available: bool,
        }
        let rows: Vec<Row> = Capability::ALL
            .into_iter()
            .map(|capability| Row {
                capability,
                available: caps.is_available(capability),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for capability in Capability::ALL {
        let mark = if caps.is_available(capability) {
            green("✓")
        } else {
            red("✗")
        };
        println!("  {mark} {capability}");
    }
    if let Some(tool) = caps.fallback() {
        println!("  {}", dim(&format!("legacy converter: {}", tool.program().display())));
    }
    for capability in caps.missing() {
        println!("  {} {}", cyan("→"), capability.install_hint());
    }
    Ok(())
}

// ── extract ──────────────────────────────────────────────────────────────

async fn run_extract(inputs: &[PathBuf], json: bool, quiet: bool) -> Result<()> {
    let registry = ExtractorRegistry::detect();
    let files = expand_inputs(inputs).await?;
    let mut failed = 0usize;

    for path in &files {
        let result = normalize(path, &registry).await;
        if result.unavailable().is_some() {
            failed += 1;
        }

        if json {
            #[derive(Serialize)]
            struct Record<'a> {
                path: &'a Path,
                format: Option<DocumentFormat>,
                size_bytes: Option<u64>,
                result: &'a ExtractionResult,
            }
            let document = inspect(path).await.ok();
            let record = Record {
                path,
                format: document.as_ref().map(|d| d.format),
                size_bytes: document.as_ref().map(|d| d.size_bytes),
                result: &result,
            };
            println!("{}", serde_json::to_string(&record)?);
            continue;
        }

        match result {
            ExtractionResult::Text(text) => {
                if !quiet {
                    eprintln!("{} {}", green("✓"), bold(&path.display().to_string()));
                }
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    out.write_all(b"\n").ok();
                }
            }
            ExtractionResult::Unavailable(reason) => {
                eprintln!(
                    "{} {}  {}",
                    red("✗"),
                    bold(&path.display().to_string()),
                    dim(&reason.reason().to_string())
                );
                eprintln!("  {}", reason.to_string().replace('\n', "\n  "));
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} file(s) could not be read", files.len());
    }
    Ok(())
}

// ── analyze ──────────────────────────────────────────────────────────────

async fn run_analyze(
    config: &ServiceConfig,
    inputs: &[PathBuf],
    task: &str,
    model: Option<&str>,
    system_prompt: Option<&Path>,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    let client = ServiceClient::new(config.clone())?;
    let registry = ExtractorRegistry::detect();
    let files = expand_inputs(inputs).await?;

    let model = match model {
        Some(m) => m.to_string(),
        None => first_model(config, &client).await?,
    };

    let mut request = AnalysisRequest::new(task, &model);
    if let Some(path) = system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        request = request.system_prompt(prompt);
    }

    let mut failed = 0usize;
    for path in &files {
        let label = path.display().to_string();
        if !quiet {
            eprintln!("{} {}  {}", cyan("◆"), bold(&label), dim(&format!("model {model}")));
        }

        let observer = CliObserver::new(&label, show_progress);
        match analyze_with_observer(path, &registry, &client, &request, &observer).await {
            Ok(analysis) => {
                if !quiet {
                    if analysis.truncated {
                        eprintln!(
                            "  {} file is larger than 1 MiB; only the first 20000 characters were sent",
                            cyan("⚠")
                        );
                    }
                    let stats = &analysis.response.stats;
                    eprintln!(
                        "  {} {}",
                        green("✔"),
                        dim(&format!(
                            "{} frames  {} tokens in  /  {} tokens out  {}",
                            analysis.response.frames,
                            stats.prompt_tokens.map_or_else(|| "?".to_string(), |n| n.to_string()),
                            stats.completion_tokens.map_or_else(|| "?".to_string(), |n| n.to_string()),
                            stats
                                .total_duration_ms
                                .map_or_else(String::new, |ms| format!("{ms}ms")),
                        ))
                    );
                }
            }
            Err(e) => {
                observer.clear_spinner();
                failed += 1;
                let class = match &e {
                    AnalysisError::Extraction(u) => u.reason().to_string(),
                    AnalysisError::Inference(i) => i.class().to_string(),
                };
                eprintln!("  {} {}  {}", red("✘"), red(&label), dim(&class));
                eprintln!("  {}", e.to_string().replace('\n', "\n  "));
                // A dead service fails every remaining file the same way.
                if matches!(
                    e,
                    AnalysisError::Inference(InferenceError::ServiceUnreachable { .. })
                ) {
                    bail!("Inference service unreachable; stopping");
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} file(s) failed", files.len());
    }
    Ok(())
}

async fn first_model(config: &ServiceConfig, client: &ServiceClient) -> Result<String> {
    let listing = client.list_models().await;
    if let Some(name) = listing.names().next() {
        return Ok(name.to_string());
    }
    print_listing(config, &listing);
    match listing.diagnostic {
        Some(e) => Err(e).context("Could not pick a model"),
        None => bail!("No models installed; pass --model or run `ollama pull <model>`"),
    }
}

/// Files as given; directories replaced by their analyzable files.
async fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = analyzable_files(input)
                .await
                .with_context(|| format!("Failed to list {}", input.display()))?;
            if found.is_empty() {
                eprintln!("{} no supported files in {}", cyan("⚠"), input.display());
            }
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}
