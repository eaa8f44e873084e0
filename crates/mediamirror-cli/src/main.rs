mod commands;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, RootArg};
use dotenv::dotenv;
use mediamirror_core::provider::ytdlp::YtDlp;
use mediamirror_core::{
    human_readable_size, AddOutcome, AppConfig, MetadataCache, MirrorEngine, OptionOverlay,
    RemoteKind, RemoveOutcome, ShowEntry, SyncOutcome, SyncReport, UpdateOutcome,
};
use progress::{CliReporter, TerminalConfirm};
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    if let Err(err) = run() {
        error!("error: {:#}", err);
        process::exit(1);
    }
}

/// Collaborators shared by every command.
struct Wiring {
    config: AppConfig,
    ytdlp: YtDlp,
    confirm: TerminalConfirm,
    reporter: CliReporter,
}

impl Wiring {
    fn root(&self, arg: RootArg) -> PathBuf {
        arg.root.unwrap_or_else(|| PathBuf::from(&self.config.root))
    }

    fn engine(&self, root: PathBuf) -> MirrorEngine<'_> {
        MirrorEngine::new(root, &self.ytdlp, &self.ytdlp, &self.confirm)
            .with_reporter(&self.reporter)
    }
}

fn run() -> anyhow::Result<()> {
    let config =
        mediamirror_core::config::load_configuration().context("could not load settings")?;
    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    let wiring = Wiring {
        ytdlp: YtDlp::new(&config.downloader),
        config,
        confirm: TerminalConfirm,
        reporter: CliReporter::new(),
    };
    let mut cache = MetadataCache::new();

    match command {
        Commands::Init { path, root } => {
            let root = path.map_or_else(|| wiring.root(root), |p| p);
            let report = mediamirror_core::init(&root)?;
            if report.created_root || report.created_config || report.created_store {
                info!("Initialized mirror at {}", root.display().to_string().green());
            } else {
                info!("{} is already a mirror", root.display());
            }
        }
        Commands::Add(add) => {
            let overlay = add.overlay();
            let engine = wiring.engine(wiring.root(add.root));
            match engine.add(&add.url, &overlay, &mut cache)? {
                AddOutcome::AlreadyTracked { kind, id } => {
                    info!("{} {} is already tracked", kind, id.cyan());
                }
                AddOutcome::Cancelled => info!("Cancelled, nothing was added"),
                AddOutcome::Added(report) => {
                    info!(
                        "Added {} '{}' at {}: {} items, {} files (~{})",
                        report.kind,
                        report.name.bold(),
                        report.path,
                        report.items,
                        report.files,
                        human_readable_size(report.estimated_bytes),
                    );
                    if let Some(sync) = report.sync {
                        print_sync(&sync);
                    }
                }
            }
        }
        Commands::Remove {
            url,
            no_rm,
            force,
            root,
        } => {
            let overlay = OptionOverlay {
                no_rm: no_rm.then_some(true),
                force: force.then_some(true),
                ..OptionOverlay::default()
            };
            match wiring.engine(wiring.root(root)).remove(&url, &overlay)? {
                RemoveOutcome::NotTracked { kind, id } => {
                    info!("{} {} is not tracked", kind, id.cyan());
                }
                RemoveOutcome::Cancelled => info!("Cancelled, nothing was removed"),
                RemoveOutcome::Removed(report) => {
                    let freed = report
                        .freed_bytes
                        .map(human_readable_size)
                        .unwrap_or_else(|| "media kept".to_string());
                    info!(
                        "Removed {} '{}': {} items, {} files ({})",
                        report.kind,
                        report.name.bold(),
                        report.items,
                        report.files,
                        freed.red(),
                    );
                }
            }
        }
        Commands::Update { url, sync, root } => {
            let overlay = OptionOverlay {
                sync: sync.then_some(true),
                ..OptionOverlay::default()
            };
            let engine = wiring.engine(wiring.root(root));
            match engine.update(url.as_deref(), &overlay, &mut cache)? {
                UpdateOutcome::NotTracked { kind, id } => {
                    info!("{} {} is not tracked", kind, id.cyan());
                }
                UpdateOutcome::NotAGroup { id } => {
                    info!("{} is a single item, nothing to update", id.cyan());
                }
                UpdateOutcome::Updated(report) => {
                    for group in &report.groups {
                        info!(
                            "{} '{}': {} new items",
                            group.kind,
                            group.name.bold(),
                            group.added.len().to_string().green(),
                        );
                    }
                    for (id, reason) in &report.failed {
                        warn!("{} could not be updated: {}", id.red(), reason);
                    }
                    if let Some(sync) = report.sync {
                        print_sync(&sync);
                    }
                }
            }
        }
        Commands::Sync { url, dry_run, root } => {
            let overlay = OptionOverlay {
                dry_run: dry_run.then_some(true),
                ..OptionOverlay::default()
            };
            match wiring.engine(wiring.root(root)).sync(url.as_deref(), &overlay)? {
                SyncOutcome::NotTracked { kind, id } => {
                    info!("{} {} is not tracked", kind, id.cyan());
                }
                SyncOutcome::Synced(report) => print_sync(&report),
            }
        }
        Commands::Show { root } => {
            print_show(&mediamirror_core::show(&wiring.root(root))?);
        }
        Commands::Verify { root } => {
            let report = wiring.engine(wiring.root(root)).verify()?;
            if report.is_clean() {
                info!(
                    "{} ({} downloaded files checked)",
                    "Mirror is consistent".green(),
                    report.checked_files
                );
            } else {
                for (kind, id) in &report.missing_records {
                    warn!("{} {} is in the config but has no record", kind, id.yellow());
                }
                for (kind, id) in &report.unlisted_records {
                    warn!("{} {} has a record but is not in the config", kind, id.yellow());
                }
                for path in &report.missing_files {
                    warn!("missing on disk: {}", path.yellow());
                }
            }
        }
    }

    Ok(())
}

fn print_sync(report: &SyncReport) {
    if report.dry_run {
        info!("{} files would be downloaded", report.pending.to_string().cyan());
        return;
    }
    info!(
        "{} downloaded ({}), {} failed, {} unavailable",
        report.downloaded.to_string().green(),
        human_readable_size(report.bytes),
        report.failed.to_string().red(),
        report.skipped_unavailable,
    );
}

fn print_show(entries: &[ShowEntry]) {
    if entries.is_empty() {
        println!("Nothing tracked yet");
        return;
    }
    for kind in RemoteKind::ALL {
        let of_kind: Vec<&ShowEntry> = entries.iter().filter(|e| e.kind == kind).collect();
        if of_kind.is_empty() {
            continue;
        }
        println!("{}", kind.plural().to_uppercase().bold());
        for entry in of_kind {
            println!("  {}  {}  {}", entry.id.cyan(), entry.name, entry.url.dimmed());
        }
    }
}
