//! CLI binary for md2epub.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `ServiceConfig`, then either serves HTTP or converts one
//! local file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use md2epub::{
    convert_to_file, server, ConversionRequest, MetadataDefaults, ServiceConfig, WhitespacePolicy,
};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Serve on 0.0.0.0:5000 (default)
  md2epub

  # Serve with a shared secret on another port
  AUTH_TOKEN=s3cret md2epub --port 8088 serve

  # Convert a local file
  md2epub convert notes.md -o notes.epub --title "Notes" --author "Jane Doe"

  # Convert stdin, print stats as JSON
  cat notes.md | md2epub convert - -o notes.epub --json

  # Call the running service
  curl -X POST localhost:5000/convert -H 'X-API-Key: s3cret' \
       -H 'Content-Type: application/json' \
       -d '{"markdown":"# Hello\nWorld"}' -o book.epub

ENVIRONMENT VARIABLES:
  HOST, PORT                Listen address (0.0.0.0:5000)
  DEBUG                     Debug-level logging
  AUTH_TOKEN                Shared secret for POST /convert (unset = no auth)
  EPUB_DATE                 Publication date written into every book
  EPUB_LANGUAGE             Language tag (en-US)
  EPUB_RIGHTS               Copyright statement
  EPUB_PUBLISHER            Publisher name
  PANDOC_PATH               pandoc executable (pandoc)
  CONVERTER_TIMEOUT_SECS    Per-run converter timeout (120)
  TOC_DEPTH                 Table of contents depth, 1-6 (3)
  STATIC_DIR                Directory with index.html and openapi.yaml (static)
  MAX_BODY_BYTES            Request body limit (10485760)
  VERIFY_METADATA           Look for title/author in the result (true)
  RUST_LOG                  Log filter, overrides DEBUG
"##;

/// Convert Markdown to EPUB with pandoc, over HTTP or from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "md2epub",
    version,
    about = "Convert Markdown to EPUB with pandoc, over HTTP or from the command line",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DEBUG",
          value_parser = clap::builder::BoolishValueParser::new())]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve,
    /// Convert one Markdown file and exit.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Listen address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Shared secret required by POST /convert.
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Publication date written into every book.
    #[arg(long, env = "EPUB_DATE", default_value = "")]
    date: String,

    /// BCP 47 language tag.
    #[arg(long, env = "EPUB_LANGUAGE", default_value = "en-US")]
    language: String,

    /// Copyright statement.
    #[arg(long, env = "EPUB_RIGHTS", default_value = "")]
    rights: String,

    /// Publisher name.
    #[arg(long, env = "EPUB_PUBLISHER", default_value = "")]
    publisher: String,

    /// How line breaks in title/author are written: flatten or preserve.
    #[arg(long, env = "EPUB_METADATA_WHITESPACE", value_enum, default_value = "flatten")]
    metadata_whitespace: WhitespaceArg,

    /// pandoc executable.
    #[arg(long, env = "PANDOC_PATH", default_value = "pandoc")]
    pandoc: PathBuf,

    /// Per-run converter timeout in seconds.
    #[arg(long, env = "CONVERTER_TIMEOUT_SECS", default_value_t = md2epub::config::DEFAULT_CONVERTER_TIMEOUT_SECS)]
    timeout: u64,

    /// Table of contents depth (1–6).
    #[arg(long, env = "TOC_DEPTH", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(1..=6))]
    toc_depth: u8,

    /// Directory holding index.html and openapi.yaml.
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Request body limit in bytes.
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = md2epub::config::DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Re-read each book and look for title and author.
    #[arg(long, env = "VERIFY_METADATA", default_value_t = true, action = clap::ArgAction::Set,
          value_parser = clap::builder::BoolishValueParser::new())]
    verify_metadata: bool,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Markdown file to convert, or `-` for stdin.
    input: PathBuf,

    /// Where to write the EPUB.
    #[arg(short, long)]
    output: PathBuf,

    /// Book title.
    #[arg(long)]
    title: Option<String>,

    /// Book author.
    #[arg(long)]
    author: Option<String>,

    /// Print conversion stats as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Suppress the summary line.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum WhitespaceArg {
    Flatten,
    Preserve,
}

impl From<WhitespaceArg> for WhitespacePolicy {
    fn from(v: WhitespaceArg) -> Self {
        match v {
            WhitespaceArg::Flatten => WhitespacePolicy::Flatten,
            WhitespaceArg::Preserve => WhitespacePolicy::Preserve,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli).context("Invalid configuration")?;

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        None | Some(Command::Serve) => {
            tracing::debug!("Starting with {:?}", config);
            server::serve(config).await.context("Server failed")?;
        }
        Some(Command::Convert(ref args)) => run_convert(args, &config).await?,
    }

    Ok(())
}

/// Map CLI args to `ServiceConfig`.
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let s = &cli.service;
    let mut builder = ServiceConfig::builder()
        .host(s.host.clone())
        .port(s.port)
        .debug(cli.verbose)
        .metadata(MetadataDefaults {
            date: s.date.clone(),
            language: s.language.clone(),
            rights: s.rights.clone(),
            publisher: s.publisher.clone(),
        })
        .whitespace(s.metadata_whitespace.into())
        .pandoc_path(s.pandoc.clone())
        .converter_timeout_secs(s.timeout)
        .toc_depth(s.toc_depth)
        .static_dir(s.static_dir.clone())
        .max_body_bytes(s.max_body_bytes)
        .verify_metadata(s.verify_metadata);

    if let Some(ref token) = s.auth_token {
        builder = builder.auth_token(token.clone());
    }

    Ok(builder.build()?)
}

async fn run_convert(args: &ConvertArgs, config: &ServiceConfig) -> Result<()> {
    let markdown = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read Markdown from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(&args.input)
            .await
            .with_context(|| format!("Failed to read {}", args.input.display()))?
    };

    let mut request = ConversionRequest::new(markdown);
    if let Some(ref title) = args.title {
        request = request.with_title(title.clone());
    }
    if let Some(ref author) = args.author {
        request = request.with_author(author.clone());
    }

    let stats = convert_to_file(&request, &args.output, config)
        .await
        .context("Conversion failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !args.quiet {
        let check = if !stats.metadata_check.performed {
            dim("metadata not checked")
        } else if stats.metadata_check.is_complete() {
            green("metadata ok")
        } else {
            yellow("metadata not found in book")
        };
        eprintln!(
            "{}  {} bytes  {}ms  {}  →  {}",
            green("✔"),
            stats.output_bytes,
            stats.total_duration_ms,
            check,
            bold(&args.output.display().to_string()),
        );
    }

    Ok(())
}
