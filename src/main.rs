mod cli;
mod config;
mod core;
mod error;
mod google;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::core::{ArchiveSettings, Archiver, RunReport, StopReason, normalize_vtt};
use crate::error::Result;
use crate::google::{DriveStore, SheetsLedger, YouTubeCaptions, api, load_session};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, fmt};

const STORAGE_SESSION: &str = "storage";
const CAPTIONS_SESSION: &str = "captions";

type GoogleArchiver = Archiver<YouTubeCaptions, DriveStore, SheetsLedger>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(log_level(&cli));

    if let Err(err) = run(cli).await {
        error!("{err}");
        process::exit(1);
    }
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        return LevelFilter::ERROR;
    }
    match cli.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Normalize { file, output }) => run_normalize(file, output).await,
        Some(Commands::Status { limit }) => run_status(&cli.config, limit).await,
        Some(Commands::Run { limit }) => run_archive(&cli.config, limit).await,
        None => run_archive(&cli.config, None).await,
    }
}

/// Config, both sessions and the three adapters. Any failure here ends the
/// run before the ledger is read.
async fn build_archiver(config_path: &Path, limit: Option<usize>) -> Result<GoogleArchiver> {
    let cfg = AppConfig::load(config_path)?.with_run_limit(limit)?;
    let client = api::http_client()?;

    let storage = load_session(&client, &cfg.storage_token, STORAGE_SESSION).await?;
    let captions = load_session(&client, &cfg.captions_token, CAPTIONS_SESSION).await?;

    let ledger = SheetsLedger::new(
        client.clone(),
        storage.clone(),
        cfg.api.sheets.clone(),
        cfg.spreadsheet_id.clone(),
    );
    let files = DriveStore::new(client.clone(), storage, cfg.api.drive.clone());
    let captions = YouTubeCaptions::new(client, captions, cfg.api.youtube.clone());

    let settings = ArchiveSettings {
        layout: cfg.layout,
        folder_id: cfg.folder_id,
        language: cfg.language,
        run_limit: cfg.run_limit,
    };
    Ok(Archiver::new(captions, files, ledger, settings))
}

async fn run_archive(config_path: &Path, limit: Option<usize>) -> Result<()> {
    info!("Starting caption archive run");
    let archiver = build_archiver(config_path, limit).await?;
    let report = archiver.run().await?;
    log_report(&report);
    Ok(())
}

fn log_report(report: &RunReport) {
    let stop = match report.stop {
        StopReason::Exhausted => "all rows checked",
        StopReason::LimitReached => "run limit reached",
        StopReason::QuotaExceeded => "API quota exhausted",
    };
    info!(
        processed = report.processed,
        archived = report.archived,
        no_captions = report.no_captions,
        failed = report.failed,
        skipped_done = report.skipped_done,
        skipped_no_url = report.skipped_no_url,
        skipped_bad_url = report.skipped_bad_url,
        "Run finished: {stop}"
    );
}

async fn run_status(config_path: &Path, limit: Option<usize>) -> Result<()> {
    let archiver = build_archiver(config_path, limit).await?;
    let summary = archiver.plan().await?;

    println!("{:<14} {}", "Pending", summary.pending);
    println!("{:<14} {}", "Archived", summary.archived);
    println!("{:<14} {}", "No captions", summary.no_captions);
    println!("{:<14} {}", "No URL", summary.no_url);
    println!("{:<14} {}", "Bad URL", summary.bad_url);

    if summary.next_run.is_empty() {
        println!();
        println!("Nothing to do on the next run.");
        return Ok(());
    }

    println!();
    println!("Next run will process:");
    for row in &summary.next_run {
        println!(
            "  row {:<6} {:<12} {}",
            archiver.sheet_row(row),
            row.date,
            row.title
        );
    }

    Ok(())
}

async fn run_normalize(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let raw = tokio::fs::read_to_string(&file).await?;
    let transcript = normalize_vtt(&raw);

    match output {
        Some(path) => {
            tokio::fs::write(&path, &transcript).await?;
            info!("Transcript written to {}", path.display());
        }
        None => println!("{transcript}"),
    }

    Ok(())
}
