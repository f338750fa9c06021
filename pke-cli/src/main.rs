use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pke::{
    config::{EncodingMode, SearchConfig, DEFAULT_SNIPPET_WIDTH},
    search::{MATCH_CLOSE, MATCH_OPEN},
    stream, CancellationToken, SearchEvent, SearchHit, SearchOutcome, SearchSummary,
};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliSearchConfig {
    /// Literal text to search for (case-sensitive)
    #[arg(short = 'k', long)]
    key: Option<String>,

    /// File or directory to search (can be specified multiple times, default: .)
    #[arg(short = 'p', long = "path")]
    paths: Vec<PathBuf>,

    /// File extensions to include (e.g. .md,.txt)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// File or directory to skip (can be specified multiple times)
    #[arg(short = 'x', long = "exclude")]
    excludes: Vec<PathBuf>,

    /// Number of tokens in each snippet
    #[arg(short = 'w', long, default_value_t = DEFAULT_SNIPPET_WIDTH)]
    width: usize,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long, default_value = "failfast")]
    encoding: String,

    /// Configuration file to load on top of the default locations
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Show only statistics, not hits
    #[arg(short, long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search files for a key
    Search(Box<CliSearchConfig>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => search(*args),
    }
}

fn search(args: CliSearchConfig) -> Result<()> {
    let file_config =
        SearchConfig::load_from(args.config.as_deref()).context("Failed to load configuration")?;

    let parsed_encoding = parse_encoding(&args.encoding);
    let encoding_mode = parsed_encoding.unwrap_or_default();

    let cli_config = SearchConfig {
        key: args.key.unwrap_or_default(),
        include_paths: args.paths,
        include_exts: args.extensions.as_deref().map(split_extensions),
        exclude_paths: args.excludes,
        snippet_width: args.width,
        encoding_mode,
        log_level: args
            .log_level
            .unwrap_or_else(|| SearchConfig::default().log_level),
    };

    let mut config = file_config.merge_with_cli(cli_config);
    if config.include_paths.is_empty() {
        config.include_paths.push(PathBuf::from("."));
    }

    init_logging(&config.log_level);
    if parsed_encoding.is_none() {
        warn!(
            "Unknown encoding '{}', expected failfast or lossy; using failfast",
            args.encoding
        );
    }

    let request = config.to_request()?;
    let token = CancellationToken::new();
    install_interrupt_handler(&token)?;

    let handle = stream(&request, &token)?;
    let mut summary = None;
    for event in handle {
        match event {
            SearchEvent::Hits(file) if !args.stats => print_file_hits(&file.path, &file.hits),
            SearchEvent::Hits(_) => {}
            SearchEvent::Complete(s) => summary = Some(s),
        }
    }

    match summary {
        Some(summary) => {
            print_summary(&summary);
            Ok(())
        }
        None => anyhow::bail!("Search ended without a summary"),
    }
}

fn parse_encoding(value: &str) -> Option<EncodingMode> {
    match value.to_lowercase().as_str() {
        "failfast" => Some(EncodingMode::FailFast),
        "lossy" => Some(EncodingMode::Lossy),
        _ => None,
    }
}

fn split_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Diagnostics go to stderr so they never interleave with results on stdout.
/// `RUST_LOG` overrides the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pke={level},pke_cli={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(unix)]
fn install_interrupt_handler(token: &CancellationToken) -> Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::debug;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handler")?;
    let token = token.clone();
    std::thread::Builder::new()
        .name("pke-signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                debug!("Received signal {}, cancelling search", sig);
                token.cancel();
            }
        })
        .context("Failed to start signal thread")?;
    Ok(())
}

#[cfg(not(unix))]
fn install_interrupt_handler(_token: &CancellationToken) -> Result<()> {
    Ok(())
}

fn print_file_hits(path: &Path, hits: &[SearchHit]) {
    println!("\n{}", path.display().to_string().blue());
    for hit in hits {
        println!(
            "{}: {}",
            hit.line_number.to_string().green(),
            highlight(&hit.snippet)
        );
    }
}

/// Colours each marked span, keeping the markers so the output stays readable uncoloured
fn highlight(snippet: &str) -> String {
    let mut out = String::with_capacity(snippet.len());
    let mut rest = snippet;
    while let Some(start) = rest.find(MATCH_OPEN) {
        let after_open = &rest[start + MATCH_OPEN.len()..];
        let Some(len) = after_open.find(MATCH_CLOSE) else {
            break;
        };
        let end = start + MATCH_OPEN.len() + len + MATCH_CLOSE.len();
        out.push_str(&rest[..start]);
        out.push_str(&rest[start..end].red().bold().to_string());
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

fn print_summary(summary: &SearchSummary) {
    let stats = &summary.stats;
    let line = format!(
        "Found {} hits in {} files ({} files searched)",
        stats.total_hits, stats.files_with_hits, stats.files_visited
    );
    match summary.outcome {
        SearchOutcome::Completed => println!("\n{}", line),
        SearchOutcome::Cancelled => println!("\n{} {}", line, "[cancelled]".yellow()),
        SearchOutcome::Faulted => println!("\n{} {}", line, "[aborted]".red()),
    }
}
