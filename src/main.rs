//! # hitokoto CLI
//!
//! Prints one quote per invocation, from the local bundle when one exists
//! and from the online API otherwise, and manages the local bundle.
//!
//! ## Usage
//!
//! ```bash
//! hitokoto [OPTIONS]              # print one quote
//! hitokoto <command> [OPTIONS]
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hitokoto bundle get [of\|gh\|jsd]` | Download the sentence bundle |
//! | `hitokoto bundle check` | Verify the bundle against its metadata |
//! | `hitokoto bundle delete` | Remove the bundle directory |
//! | `hitokoto bundle reindex` | Rebuild `index.jsonl` from the category files |
//! | `hitokoto bundle info` | Show package metadata |
//! | `hitokoto export [COUNT]` | Write random quotes to a file |
//! | `hitokoto types` | List quote categories |
//! | `hitokoto sources` | List bundle mirrors and API endpoints |
//! | `hitokoto completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Random quote with attribution, 10 to 30 characters
//! hitokoto -f --min 10 --max 30
//!
//! # Force the China API endpoint
//! hitokoto --api cn
//!
//! # Exact lookup by uuid, as JSON
//! hitokoto -i 9818ecda-9cbf-4f2a-9af8-8136ef39cfcd --encode json
//!
//! # Export 50 anime and game quotes
//! hitokoto export 50 -t ac -p quotes/
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use hitokoto::api::{self, ApiRegion};
use hitokoto::bundle::Bundle;
use hitokoto::config::{self, Config};
use hitokoto::download;
use hitokoto::export::{self, ExportRequest};
use hitokoto::format::{self, OutputFormat};
use hitokoto::http::ReqwestClient;
use hitokoto::index;
use hitokoto::integrity;
use hitokoto::models::{Category, Quote};
use hitokoto::progress::ProgressMode;
use hitokoto::query::{self, LengthRange};
use hitokoto::sources::{self, Mirror};
use hitokoto::stats;

/// hitokoto: quotes from the online API or a local sentence bundle.
///
/// Without a subcommand, prints a single quote. The local bundle is used
/// when it exists unless `--api` is given.
#[derive(Parser)]
#[command(
    name = "hitokoto",
    version,
    about = "Print hitokoto quotes from the online API or a local sentence bundle"
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when absent.
    #[arg(long, global = true, default_value = "./hitokoto.toml")]
    config: PathBuf,

    /// Bundle directory, overriding `[bundle].dir`.
    #[arg(long, global = true)]
    bundle_dir: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(long, global = true)]
    debug: bool,

    /// Progress output on stderr: off, human, or json.
    ///
    /// Defaults to human when stderr is a terminal, off otherwise.
    #[arg(long, global = true, value_name = "MODE")]
    progress: Option<ProgressMode>,

    #[command(flatten)]
    quote: QuoteArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for printing a single quote.
#[derive(Args, Debug)]
struct QuoteArgs {
    /// Use the online API; optionally pick the `in` or `cn` endpoint.
    #[arg(short = 'a', long = "api", value_name = "API")]
    api: Option<Option<ApiRegion>>,

    /// Force the local bundle; fails when it is missing.
    #[arg(short = 'b', long = "bundle", conflicts_with = "api")]
    bundle: bool,

    /// Quote category, a letter from a to l (see `hitokoto types`).
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    category: Option<Category>,

    /// Minimum length in characters.
    #[arg(long)]
    min: Option<u64>,

    /// Maximum length in characters.
    #[arg(long)]
    max: Option<u64>,

    /// Append the quote's source and author.
    #[arg(short = 'f', long = "from")]
    include_source: bool,

    /// Exact lookup by numeric id or uuid (local bundle only).
    #[arg(short = 'i', long = "id", value_name = "ID|UUID", conflicts_with = "api")]
    id: Option<String>,

    /// Output encoding: text or json.
    #[arg(long, default_value = "text", value_name = "ENCODING")]
    encode: OutputFormat,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Manage the local sentence bundle.
    Bundle {
        #[command(subcommand)]
        action: BundleAction,
    },

    /// Export random quotes from the bundle to a text file.
    ///
    /// Existing files are never overwritten; a numbered name such as
    /// `hitokoto(1).txt` is used instead.
    Export {
        /// Number of quotes. Defaults to `[export].default_count`.
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,

        /// Output file (`.txt`/`.json`) or directory. Defaults to the
        /// current directory.
        #[arg(short = 'p', long = "path")]
        path: Option<PathBuf>,

        /// Categories, repeatable or combined (`-t a -t c`, `-t ac`, `-t a,c`).
        #[arg(short = 't', long = "type", value_name = "TYPES")]
        types: Vec<String>,

        /// Minimum length in characters.
        #[arg(long)]
        min: Option<u64>,

        /// Maximum length in characters.
        #[arg(long)]
        max: Option<u64>,

        /// Append each quote's source and author.
        #[arg(short = 'f', long = "from")]
        include_source: bool,
    },

    /// List quote categories.
    Types,

    /// List bundle mirrors and API endpoints.
    Sources,

    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Bundle management subcommands.
#[derive(Subcommand)]
enum BundleAction {
    /// Download the bundle, preferring the given mirror.
    ///
    /// Each category fails over to the other mirrors independently.
    Get {
        /// Mirror key: of, gh, or jsd. Defaults to `[bundle].default_source`.
        source: Option<Mirror>,
    },
    /// Check the bundle against its package metadata.
    Check,
    /// Delete the bundle directory.
    Delete,
    /// Rebuild the index from the category files.
    Reindex,
    /// Show package metadata.
    Info,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("HITOKOTO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // Commands that don't require config
    match &cli.command {
        Some(Commands::Types) => return list_types(),
        Some(Commands::Sources) => return sources::list_sources(),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "hitokoto",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;
    let bundle = Bundle::new(cli.bundle_dir.clone().unwrap_or_else(|| cfg.bundle_dir()));
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();
    tracing::debug!("bundle directory: {}", bundle.root().display());

    match cli.command {
        None => print_quote(&cfg, &bundle, &cli.quote)?,
        Some(Commands::Bundle { action }) => match action {
            BundleAction::Get { source } => {
                let source = match source {
                    Some(source) => source,
                    None => cfg.default_mirror()?,
                };
                download::run_bundle_get(
                    &bundle,
                    source,
                    Duration::from_secs(cfg.bundle.timeout_secs),
                    progress.as_ref(),
                )?;
            }
            BundleAction::Check => integrity::run_check(&bundle)?,
            BundleAction::Delete => {
                if bundle.delete()? {
                    println!("Deleted bundle at {}", bundle.root().display());
                } else {
                    println!("No bundle at {}", bundle.root().display());
                }
            }
            BundleAction::Reindex => index::run_reindex(&bundle)?,
            BundleAction::Info => stats::print_package_info(&bundle)?,
        },
        Some(Commands::Export {
            count,
            path,
            types,
            min,
            max,
            include_source,
        }) => {
            let categories = Category::parse_many(types.as_slice()).map_err(anyhow::Error::msg)?;
            let request = ExportRequest {
                count: count
                    .map(|c| c as usize)
                    .unwrap_or(cfg.export.default_count),
                output: path.unwrap_or_else(|| PathBuf::from(".")),
                categories,
                range: LengthRange::new(min, max),
                include_source,
                default_filename: cfg.export.default_filename.clone(),
            };
            export::run_export(&bundle, &request, progress.as_ref())?;
        }
        Some(Commands::Types | Commands::Sources | Commands::Completions { .. }) => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

/// Print one quote from the bundle or the API, following the source
/// selection flags.
fn print_quote(cfg: &Config, bundle: &Bundle, args: &QuoteArgs) -> Result<()> {
    let range = LengthRange::new(args.min, args.max);
    if let (Some(min), Some(max)) = (args.min, args.max) {
        if min > max {
            bail!("--min ({}) must not exceed --max ({})", min, max);
        }
    }

    let use_bundle = if args.api.is_some() {
        false
    } else if args.bundle || args.id.is_some() {
        if !bundle.exists() {
            bail!(
                "no bundle found in {}, run `hitokoto bundle get` first",
                bundle.root().display()
            );
        }
        true
    } else {
        bundle.exists()
    };

    let quote: Quote = if use_bundle {
        tracing::debug!("reading from local bundle");
        match &args.id {
            Some(key) => lookup(bundle, key)?,
            None => query::random_quote(bundle, args.category, range, &mut rand::thread_rng())?
                .context("no quote in the bundle matches the given filters")?,
        }
    } else {
        tracing::debug!("calling the online API");
        let client = ReqwestClient::with_timeout(Duration::from_secs(cfg.api.timeout_secs))?;
        api::fetch_quote(&client, args.api.flatten(), args.category, range)?
    };

    println!(
        "{}",
        format::render(&quote, args.encode, args.include_source)?
    );
    Ok(())
}

/// Integers are ids; anything else is a uuid.
fn lookup(bundle: &Bundle, key: &str) -> Result<Quote> {
    let found = match key.trim().parse::<i64>() {
        Ok(id) => query::find_by_id(bundle, id)?,
        Err(_) => query::find_by_uuid(bundle, key.trim())?,
    };
    found.with_context(|| format!("no quote with id or uuid '{}' in the bundle", key))
}

fn list_types() -> Result<()> {
    println!("{:<6} NAME", "TYPE");
    for category in Category::ALL {
        println!("{:<6} {}", category.letter(), category.label());
    }
    Ok(())
}
