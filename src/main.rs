//! llms-harvest main entry point
//!
//! Command-line interface: load an options file, run one generation and
//! write the document to disk.

use anyhow::Context;
use clap::Parser;
use llms_harvest::config::{load_options_with_hash, GenerateOptions, OutputFormat};
use llms_harvest::generate;
use llms_harvest::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// llms-harvest: turn a website into one document for language models
///
/// Discovers pages through the sitemap, link following and local source
/// trees, extracts their text and writes a single size-bounded file with a
/// table of contents.
#[derive(Parser, Debug)]
#[command(name = "llms-harvest")]
#[command(version)]
#[command(about = "Build an llms-full.txt style document from a website", long_about = None)]
struct Cli {
    /// Path to TOML options file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Where to write the document
    #[arg(short, long, default_value = "llms-full.txt")]
    output: PathBuf,

    /// Override the output size preset (full, small, minimal)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Override the site URL from the options file
    #[arg(long)]
    site_url: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate options and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading options from: {}", cli.config.display());
    let (mut options, hash) = load_options_with_hash(&cli.config)
        .with_context(|| format!("Failed to load options from {}", cli.config.display()))?;
    tracing::info!("Options loaded successfully (hash: {})", hash);

    if let Some(site_url) = cli.site_url {
        options.site_url = site_url;
    }
    if let Some(format) = cli.format {
        options.format = format;
    }

    if cli.dry_run {
        llms_harvest::config::validate(&options).context("Invalid options")?;
        handle_dry_run(&options);
        return Ok(());
    }

    let (document, stats) = match generate(options).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Generation failed: {}", e);
            return Err(e.into());
        }
    };

    tokio::fs::write(&cli.output, &document)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    tracing::info!("Wrote {} bytes to {}", document.len(), cli.output.display());

    if !cli.quiet {
        print_statistics(&stats);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("llms_harvest=info,warn"),
            1 => EnvFilter::new("llms_harvest=debug,info"),
            2 => EnvFilter::new("llms_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode
fn handle_dry_run(options: &GenerateOptions) {
    let limits = options.effective_limits();

    println!("=== llms-harvest Dry Run ===\n");

    println!("Site: {}", options.site_root());

    println!("\nDiscovery:");
    if options.use_sitemap {
        println!("  Sitemap: {}", options.resolved_sitemap_url());
    } else {
        println!("  Sitemap: disabled");
    }
    println!("  Seed URLs: {}", options.seed_urls.len());
    for seed in &options.seed_urls {
        println!("    * {}", seed);
    }
    if options.recursive {
        println!(
            "  Link following: depth {}, {} links per page, {}ms delay",
            options.max_depth, options.max_links_per_page, options.request_delay_ms
        );
    } else {
        println!("  Link following: disabled");
    }
    if options.filesystem.enabled {
        println!(
            "  Local files: {} (depth {})",
            options.filesystem.base_path.display(),
            options.filesystem.max_depth
        );
    } else {
        println!("  Local files: disabled");
    }

    println!("\nFetching:");
    println!("  Concurrency: {}", options.concurrency);
    println!("  Timeout: {}ms", options.timeout_ms);
    println!(
        "  Retries: {} ({}ms linear backoff)",
        options.retries, options.retry_delay_ms
    );
    println!("  User agent: {}", options.user_agent);

    println!("\nLimits ({:?}):", options.format);
    println!("  Max pages: {}", limits.max_pages);
    println!("  Max chars per page: {}", limits.max_chars_per_page);
    println!("  Max total chars: {}", limits.max_total_chars);

    println!(
        "\nContent filter: {}",
        if options.content_filter.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    println!("\n✓ Options are valid");
}
