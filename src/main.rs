//! chaos-collector command line tool

use chaos_collector::config::RunOptions;
use chaos_collector::logging::{self, LogOptions};
use chaos_collector::{CollectionStats, Config, ConfigOverrides, Pipeline, RunOutcome};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// Collect, validate and deduplicate the published Chaos reconnaissance datasets
#[derive(Parser, Debug)]
#[command(name = "chaos-collector", version, about, long_about = None)]
struct Cli {
    /// Output directory for reports, logs and the resume ledger
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Main aggregated domain file name
    #[arg(short = 'f', long)]
    output_file: Option<String>,

    /// Dataset index URL
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Number of parallel downloads
    #[arg(short = 'p', long)]
    parallel: Option<usize>,

    /// Retries per download after the first attempt
    #[arg(short = 'r', long)]
    retries: Option<u32>,

    /// Request timeout in seconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Skip datasets already recorded as downloaded
    #[arg(long)]
    resume: bool,

    /// Keep only lines that look like valid domains
    #[arg(long, overrides_with = "no_validate")]
    validate: bool,
    /// Keep every non-empty line
    #[arg(long)]
    no_validate: bool,

    /// Deduplicate domains
    #[arg(long, overrides_with = "no_deduplicate")]
    deduplicate: bool,
    /// Disable deduplication flag (the domain set always deduplicates)
    #[arg(long)]
    no_deduplicate: bool,

    /// Bundle the output directory into a .tar.gz
    #[arg(long, overrides_with = "no_compress")]
    compress: bool,
    /// Leave the output uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Remove the working directory when done
    #[arg(long, overrides_with = "no_cleanup")]
    cleanup: bool,
    /// Keep the working directory for inspection
    #[arg(long)]
    no_cleanup: bool,

    /// Resolve collected domains and write the live ones
    #[arg(long)]
    resolve_dns: bool,

    /// Show what would be done without downloading anything
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only on the console
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Config file to use instead of ~/.chaos_collector.json
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Collapse a `--x/--no-x` pair into an override
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            index_url: self.url.clone(),
            output_dir: self.output_dir.clone(),
            output_file: self.output_file.clone(),
            parallel_downloads: self.parallel,
            max_retries: self.retries,
            timeout_secs: self.timeout,
            validate_domains: toggle(self.validate, self.no_validate),
            remove_duplicates: toggle(self.deduplicate, self.no_deduplicate),
            enable_compression: toggle(self.compress, self.no_compress),
            cleanup: toggle(self.cleanup, self.no_cleanup),
            resolve_dns: self.resolve_dns.then_some(true),
            run: RunOptions {
                resume: self.resume,
                dry_run: self.dry_run,
                verbose: self.verbose,
                quiet: self.quiet,
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let overrides = cli.overrides();

    let file_layer = cli.config.clone().or_else(Config::home_config_path);
    let (config, config_warning) = match Config::resolve(file_layer.as_deref(), &overrides) {
        Ok(config) => (config, None),
        Err(file_err) => match Config::resolve(None, &overrides) {
            Ok(config) => (config, Some(file_err)),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(e.exit_code());
            }
        },
    };

    // A dry run must not create the output directory just to hold a log
    let log_options = LogOptions {
        verbose: config.run.verbose,
        quiet: config.run.quiet,
        log_dir: (!config.run.dry_run).then(|| config.output.output_dir.clone()),
    };
    match logging::init(&log_options) {
        Ok(Some(path)) => tracing::debug!(?path, "logging to file"),
        Ok(None) => {}
        Err(e) => eprintln!("warning: {e}"),
    }

    if let Some(e) = config_warning {
        tracing::warn!(path = ?file_layer, error = %e, "ignoring unusable config file");
    }

    let quiet = config.run.quiet;
    let output_dir = config.output.output_dir.clone();
    let main_output = config.main_output_path();

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "failed to start");
            return ExitCode::from(e.exit_code());
        }
    };

    let cancel = CancellationToken::new();
    chaos_collector::cancel_on_signal(cancel.clone());

    let result = pipeline.run(&cancel).await;
    cancel.cancel();

    match result {
        Ok(RunOutcome::Completed(stats)) | Ok(RunOutcome::NothingToDo(stats)) => {
            if !quiet {
                print_statistics(&stats, &output_dir, &main_output);
            }
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::DryRun) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}

fn print_statistics(stats: &CollectionStats, output_dir: &Path, main_output: &Path) {
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!("COLLECTION STATISTICS");
    println!("{rule}");
    println!("Total URLs in index:       {:>10}", stats.total_urls);
    println!("Successfully downloaded:   {:>10}", stats.downloaded);
    println!("Failed downloads:          {:>10}", stats.failed);
    println!("Archives extracted:        {:>10}", stats.extracted);
    println!("Total domains collected:   {:>10}", stats.total_domains);
    println!("Duplicates removed:        {:>10}", stats.duplicates_removed);
    if let Some(resolved) = stats.resolved_domains {
        println!("Resolved domains:          {resolved:>10}");
    }
    println!(
        "Collection duration:       {:>10.2}s",
        stats.duration().as_secs_f64()
    );
    println!("Output directory:          {}", output_dir.display());
    println!("Output file:               {}", main_output.display());
    println!("{rule}");

    if let Ok(meta) = std::fs::metadata(main_output) {
        println!(
            "Output file size:          {:>9.2} MB",
            meta.len() as f64 / 1024.0 / 1024.0
        );
    }

    let Ok(entries) = std::fs::read_dir(output_dir) else {
        return;
    };
    let mut files: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();

    println!("\nGenerated files:");
    for name in files {
        println!("  - {name}");
    }
}
