//! Thumbfan CLI - Concurrent Batch Thumbnail Generator
//!
//! Writes an 80x80 JPEG thumbnail next to every image it is given, one
//! worker per file.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use thumbfan::config::default_config_path;
use thumbfan::processing::discover_items;
use thumbfan::{init_with_config, BatchOrchestrator, BatchReport, Config};

/// Thumbfan - Concurrent Batch Thumbnail Generator
#[derive(Parser)]
#[command(
    name = "thumbfan",
    version,
    about = "Generate JPEG thumbnails for a batch of images, one worker per file",
    long_about = "Thumbfan writes `<source>.thumb.jpg` next to every image it is given. \
                  Directories are expanded to the regular files they contain. Every file is \
                  processed by its own worker and failures are reported per file without \
                  stopping the batch."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source directories or image files
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Configuration file path (default: ./thumbfan.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of images processed at once (default: no limit)
    #[arg(short = 'j', long, value_name = "COUNT")]
    max_concurrency: Option<usize>,

    /// Give up on a single image after this many seconds
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Thumbnail dimensions (width x height)
    #[arg(short, long, value_name = "WxH", value_parser = parse_dimensions)]
    size: Option<(u32, u32)>,

    /// JPEG quality (1-100)
    #[arg(short, long, value_name = "QUALITY")]
    quality: Option<u8>,

    /// Print the batch summary as JSON
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when any image failed
    #[arg(long)]
    fail_on_error: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    CheckConfig {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "thumbfan.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
}

/// Parse dimension string (e.g., "80x80")
fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err("Dimensions must be in format 'WIDTHxHEIGHT' (e.g., '80x80')".to_string());
    }

    let width = parts[0]
        .parse::<u32>()
        .map_err(|_| "Invalid width value".to_string())?;
    let height = parts[1]
        .parse::<u32>()
        .map_err(|_| "Invalid height value".to_string())?;

    if width == 0 || height == 0 {
        return Err("Width and height must be greater than 0".to_string());
    }

    Ok((width, height))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Some(ref command) => handle_subcommand(command).map(|()| 0),
        None => run_batch(&cli).await,
    };

    match code {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    }
}

/// Handle subcommands
fn handle_subcommand(command: &Commands) -> Result<()> {
    match command {
        Commands::CheckConfig { file } => validate_config_file(file),
        Commands::ExampleConfig { output, yaml } => generate_example_config(output, *yaml),
    }
}

/// Run one batch and return the process exit code
async fn run_batch(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    init_with_config(&config).context("Failed to initialize logging")?;

    if cli.paths.is_empty() {
        bail!("No input paths given. Run with --help for usage information");
    }

    let items = collect_items(&cli.paths)?;
    debug!("Collected {} items", items.len());

    let orchestrator = BatchOrchestrator::from_config(&config)?;

    let progress = if !cli.json && !cli.quiet && !items.is_empty() {
        let pb = ProgressBar::new(items.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let report = orchestrator
        .run_with_observer(items, |completion| {
            if let Some(pb) = &progress {
                pb.set_message(completion.item.to_string());
                pb.inc(1);
            }
        })
        .await?;

    if let Some(pb) = &progress {
        pb.finish_with_message("done");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else if !cli.quiet {
        print_summary(&report);
    }

    if cli.fail_on_error && report.failed() > 0 {
        return Ok(2);
    }
    Ok(0)
}

/// Build the effective configuration: file, then command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None if default_config_path().is_file() => Config::from_file(default_config_path())?,
        None => Config::default(),
    };

    if let Some(limit) = cli.max_concurrency {
        config.processing.max_concurrency = Some(limit);
    }
    if let Some(secs) = cli.timeout {
        config.processing.item_timeout_secs = Some(secs);
    }
    if let Some((width, height)) = cli.size {
        config.thumbnail.width = width;
        config.thumbnail.height = height;
    }
    if let Some(quality) = cli.quality {
        config.thumbnail.quality = quality;
    }

    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Expand directories into their files; plain files are taken as given
fn collect_items(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut items = Vec::new();
    for path in paths {
        if path.is_dir() {
            items.extend(discover_items(path)?);
        } else {
            items.push(path.clone());
        }
    }
    Ok(items)
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> Result<()> {
    let config = Config::from_file(file_path)?;
    config.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!(
        "Thumbnail: {}x{} ({:?}, quality {})",
        config.thumbnail.width,
        config.thumbnail.height,
        config.thumbnail.filter,
        config.thumbnail.quality
    );
    match config.processing.max_concurrency {
        Some(limit) => println!("Concurrency: at most {}", limit),
        None => println!("Concurrency: one worker per image"),
    }

    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> Result<()> {
    let output_path = if use_yaml {
        output_path.with_extension("yaml")
    } else {
        output_path.to_path_buf()
    };

    Config::default().to_file(&output_path)?;

    let format = if use_yaml { "YAML" } else { "TOML" };
    println!(
        "{}: Generated example {} configuration: {}",
        style("Success").green().bold(),
        format,
        output_path.display()
    );

    Ok(())
}

/// Print processing summary
fn print_summary(report: &BatchReport) {
    println!();
    println!("{}", style("Thumbnail Summary:").bold());
    println!("  {}: {}", style("Created").green(), report.succeeded());
    if report.failed() > 0 {
        println!("  {}: {}", style("Failed").red(), report.failed());
    }
    println!(
        "  {}: {:.2}s",
        style("Duration").blue(),
        report.duration.as_secs_f64()
    );

    if !report.failures.is_empty() {
        println!();
        println!("{}", style("Errors:").bold());
        for (i, failure) in report.failures.iter().enumerate() {
            println!("  {}: {}", i + 1, failure.user_message());
        }
    }
}
