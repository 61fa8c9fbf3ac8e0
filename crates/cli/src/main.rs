use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediasort_core::{
    create_audit_system, export_run_log, load_audit_log, load_config, load_config_from_env,
    undo_operations, validate_config, AuditHandle, AuditStore, Config, ExternalConverter, Layout,
    MemoryAuditStore, Organizer, ProcessOptions, RunProgress, RunStatus, UnrestrictedAccess,
};

/// Buffer size for run log event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

/// Buffer size for progress updates
const PROGRESS_BUFFER_SIZE: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "mediasort", version, about = "Sort, deduplicate and convert media folders")]
struct Cli {
    /// TOML configuration file. Without it, defaults plus MEDIASORT_* variables are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write the run log to the configured log folder when done.
    #[arg(long, global = true)]
    export_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the media a folder holds without touching anything.
    Scan { source: PathBuf },

    /// Copy, move or convert media from SOURCE into DESTINATION.
    Process {
        source: PathBuf,
        destination: PathBuf,

        /// Move files instead of copying them.
        #[arg(long = "move")]
        move_files: bool,

        /// Convert formats that are not natively supported.
        #[arg(long)]
        convert: bool,

        /// Keep files whose content was already placed in this run.
        #[arg(long)]
        no_dedup: bool,

        /// Log what would happen without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Files processed at once.
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,
    },

    /// Remove the files a previous run created, using its saved operation log.
    Undo { audit_log: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Flat,
    ByKind,
    ByDate,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Flat => Layout::Flat,
            LayoutArg::ByKind => Layout::ByKind,
            LayoutArg::ByDate => Layout::ByDate,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_config_from_env().context("Failed to load configuration")?,
    };
    if let Command::Process {
        layout: Some(layout),
        ..
    } = &cli.command
    {
        config.layout = (*layout).into();
    }
    validate_config(&config).context("Configuration validation failed")?;

    let store = Arc::new(MemoryAuditStore::new());
    let (audit, writer) = create_audit_system(
        Arc::clone(&store) as Arc<dyn AuditStore>,
        AUDIT_BUFFER_SIZE,
    );
    let writer_task = tokio::spawn(writer.run());

    let log_dir = config.output.log_dir.clone();
    let result = match cli.command {
        Command::Scan { source } => scan(config, audit, &source).await,
        Command::Process {
            source,
            destination,
            move_files,
            convert,
            no_dedup,
            dry_run,
            jobs,
            layout: _,
        } => {
            let mut options = config
                .options
                .clone()
                .with_conversion(convert || config.options.convert_enabled)
                .with_dedup(!no_dedup && config.options.skip_duplicates)
                .with_dry_run(dry_run || config.options.dry_run);
            if move_files {
                options = options.with_move();
            }
            if let Some(jobs) = jobs {
                options = options.with_max_concurrency(jobs);
            }
            process(config, audit, &source, &destination, options).await
        }
        Command::Undo { audit_log } => undo(audit, &audit_log).await,
    };

    // Every handle is gone once the command returns, so the writer drains and stops.
    match writer_task.await {
        Ok(summary) if summary.failed > 0 => {
            warn!("{} run log events could not be stored", summary.failed)
        }
        Ok(_) => {}
        Err(e) => warn!("Run log writer stopped abnormally: {}", e),
    }

    if cli.export_log {
        let path = export_run_log(&store.records(), &log_dir).context("Failed to export run log")?;
        info!("Run log written to {}", path.display());
    }

    result
}

fn organizer(config: Config, audit: AuditHandle) -> Arc<Organizer<ExternalConverter>> {
    let converter = Arc::new(ExternalConverter::new(config.converter.clone()));
    Arc::new(Organizer::new(config, converter).with_audit(audit))
}

/// Cancels the organizer on Ctrl-C. Abort the returned task when done.
fn cancel_on_ctrl_c(
    organizer: &Arc<Organizer<ExternalConverter>>,
) -> tokio::task::JoinHandle<()> {
    let organizer = Arc::clone(organizer);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing files in flight");
            organizer.cancel();
        }
    })
}

async fn stop(task: tokio::task::JoinHandle<()>) {
    task.abort();
    let _ = task.await;
}

async fn scan(config: Config, audit: AuditHandle, source: &Path) -> Result<()> {
    let organizer = organizer(config, audit);
    let signal_task = cancel_on_ctrl_c(&organizer);
    let report = organizer.scan(source, &UnrestrictedAccess).await;
    stop(signal_task).await;
    let report = report.context("Scan failed")?;

    println!(
        "{} entries scanned, {} media files ({} images, {} videos, {} need conversion), {} bytes{}",
        report.scanned,
        report.media_found,
        report.images(),
        report.videos(),
        report.needing_conversion(),
        report.total_bytes(),
        if report.unreadable > 0 {
            format!(", {} unreadable entries skipped", report.unreadable)
        } else {
            String::new()
        }
    );
    Ok(())
}

async fn process(
    config: Config,
    audit: AuditHandle,
    source: &Path,
    destination: &Path,
    options: ProcessOptions,
) -> Result<()> {
    let organizer = organizer(config, audit);
    let signal_task = cancel_on_ctrl_c(&organizer);

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);
    let progress_task = tokio::spawn(report_progress(progress_rx));

    let report = organizer
        .process(
            source,
            destination,
            &UnrestrictedAccess,
            options,
            Some(progress_tx),
        )
        .await;
    stop(signal_task).await;
    let _ = progress_task.await;
    let report = report.context("Processing failed")?;

    let counts = report.counts;
    println!(
        "{}{}: {} processed ({} converted), {} duplicates, {} skipped, {} errors in {:.1}s",
        if report.dry_run { "Dry run " } else { "" },
        report.status,
        counts.processed,
        counts.converted,
        counts.duplicates,
        counts.skipped,
        counts.errors,
        report.elapsed.as_secs_f64()
    );
    if let Some(path) = &report.audit_log_path {
        println!("Operation log: {}", path.display());
    }
    if report.status == RunStatus::Cancelled {
        warn!("Run was cancelled; files already placed were kept");
    }
    Ok(())
}

/// Logs progress at every tenth of the run.
async fn report_progress(mut rx: mpsc::Receiver<RunProgress>) {
    let mut next_decile = 1;
    while let Some(progress) = rx.recv().await {
        let decile = (progress.fraction() * 10.0).floor() as u32;
        if decile >= next_decile {
            next_decile = decile + 1;
            info!(
                completed = progress.completed,
                total = progress.total,
                files_per_sec = progress.files_per_sec,
                eta_secs = ?progress.eta_secs.map(|s| s.round() as u64),
                "Progress {}%",
                decile * 10
            );
        }
    }
}

async fn undo(audit: AuditHandle, audit_log: &Path) -> Result<()> {
    let log = load_audit_log(audit_log)
        .with_context(|| format!("Failed to read operation log {:?}", audit_log))?;
    info!(
        run_id = %log.run_id,
        entries = log.operations.len(),
        "Undoing run"
    );

    let report = undo_operations(&log.operations, &log.destination, Some(&audit)).await;
    drop(audit);

    println!(
        "{} files removed, {} already gone, {} failed",
        report.removed,
        report.missing,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  could not remove {}: {}", failure.path.display(), failure.error);
    }
    for source in &report.unrecoverable_moves {
        println!("  original was moved and cannot be restored: {}", source.display());
    }
    Ok(())
}
