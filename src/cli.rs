//! Command-line interface module for revtidy.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and validation
//! - Organize orchestration and dry-run reporting
//! - Restore operation handling
//! - Operator-facing output for per-item outcomes

use crate::config::{CompiledFilters, FilterConfig};
use crate::index::{BackupIndex, OrganizeError, OrganizeResult};
use crate::organizer::Organizer;
use crate::output::OutputFormatter;
use crate::paths;
use crate::restore::{RestoreManager, RestoreReport};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Quarantine Revit backup files into a mirrored "to delete" tree and
/// restore them from the JSON index.
#[derive(Debug, Parser)]
#[command(name = "revtidy", version)]
pub struct Cli {
    /// Root of the project folder to operate on.
    pub root: PathBuf,

    /// Optional filter configuration file (TOML).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// The action to perform against the project root.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Move backup files into the "to delete" tree and write the index.
    Organize {
        /// Analyze and report without moving any files.
        #[arg(long)]
        dry_run: bool,
    },
    /// Restore a single file by its original path (absolute or relative
    /// to the root), or by basename when the argument is a bare filename.
    Restore {
        /// Original path of the quarantined file, or its basename.
        original_path: PathBuf,
    },
    /// Restore every file recorded under a folder of the original tree.
    RestoreFolder {
        /// The original folder, absolute or relative to the root.
        folder: PathBuf,
    },
    /// Restore every quarantined file.
    RestoreAll,
}

/// Runs the CLI application with the given command and root path.
///
/// This is the main entry point for CLI operations. Per-item conditions
/// (lookup misses, vanished sources, missing quarantined copies) are
/// reported and never abort the run; only genuine failures surface as an
/// error.
pub fn run_cli(command: &Command, root: &Path, config_path: Option<&Path>) -> Result<(), String> {
    if !root.is_dir() {
        return Err(format!(
            "The provided path is not a valid folder: {}",
            root.display()
        ));
    }

    match command {
        Command::Organize { dry_run: false } => organize(root, config_path),
        Command::Organize { dry_run: true } => organize_dry_run(root, config_path),
        Command::Restore { original_path } => {
            finish_restore(restore_one(root, original_path))
        }
        Command::RestoreFolder { folder } => {
            finish_restore(RestoreManager::restore_folder(root, folder))
        }
        Command::RestoreAll => restore_all(root),
    }
}

fn load_filters(config_path: Option<&Path>) -> Result<CompiledFilters, String> {
    let config = FilterConfig::load(config_path)
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    config
        .compile()
        .map_err(|e| format!("Error compiling filters: {}", e))
}

/// Scans the root, quarantines every backup file, and writes the index.
fn organize(root: &Path, config_path: Option<&Path>) -> Result<(), String> {
    OutputFormatter::info(&format!("Organizing backups under: {}", root.display()));

    let filters = load_filters(config_path)?;
    let report = Organizer::organize(root, &filters).map_err(|e| e.to_string())?;

    for (original, quarantined) in &report.moved {
        OutputFormatter::success(&format!(
            "Moved: {} -> {}",
            original.display(),
            quarantined.display()
        ));
    }
    for (path, reason) in &report.skipped {
        OutputFormatter::warning(&format!("Skipped {}: {}", path.display(), reason));
    }

    OutputFormatter::header("Organization complete!");
    OutputFormatter::plain(&format!("Quarantined files: {}", report.moved_files()));
    OutputFormatter::info(&format!(
        "Use 'revtidy {} restore-all' to revert.",
        root.display()
    ));
    Ok(())
}

/// Reports what an organize run would quarantine, without moving anything.
fn organize_dry_run(root: &Path, config_path: Option<&Path>) -> Result<(), String> {
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", root.display()));

    let filters = load_filters(config_path)?;

    let primaries = Organizer::find_primary_files(root);
    OutputFormatter::header("Primary Revit files (left in place):");
    for primary in &primaries {
        OutputFormatter::plain(&format!(" - {}", primary.display()));
    }

    let backups: Vec<_> = Organizer::find_matching_backups(root, &primaries)
        .into_iter()
        .filter(|path| !paths::under_quarantine(root, path))
        .filter(|path| filters.should_include(path))
        .collect();

    OutputFormatter::header("Backup files that would be quarantined:");
    for backup in &backups {
        match paths::quarantine_path(root, backup) {
            Some(target) => OutputFormatter::plain(&format!(
                " - {} -> {}",
                backup.display(),
                target.display()
            )),
            None => OutputFormatter::plain(&format!(" - {}", backup.display())),
        }
    }

    OutputFormatter::header("DRY RUN SUMMARY:");
    OutputFormatter::plain(&format!("Primary files: {}", primaries.len()));
    OutputFormatter::plain(&format!("Backup files: {}", backups.len()));
    OutputFormatter::dry_run_notice("No files were moved.");
    Ok(())
}

/// Restores a single file: by basename lookup when the argument is a
/// bare filename, otherwise by original path (absolute, or resolved
/// against the root).
fn restore_one(root: &Path, original_path: &Path) -> OrganizeResult<RestoreReport> {
    let bare_name = !original_path.is_absolute() && original_path.components().nth(1).is_none();
    if bare_name {
        RestoreManager::restore_file(root, &original_path.to_string_lossy())
    } else {
        RestoreManager::restore_file_by_path(root, original_path)
    }
}

/// Restores everything in the index behind a progress bar.
fn restore_all(root: &Path) -> Result<(), String> {
    let total = match BackupIndex::load(root) {
        Ok(Some(index)) => index.file_entries().len(),
        Ok(None) => {
            OutputFormatter::warning("No index file found to restore from.");
            return Ok(());
        }
        Err(e) => return Err(e.to_string()),
    };

    let pb = OutputFormatter::create_progress_bar(total as u64);
    let result = RestoreManager::restore_all_with(root, |_| pb.inc(1));
    pb.finish_and_clear();

    finish_restore(result)
}

/// Reports a restore outcome. A missing index is a warning and a no-op,
/// matching the behavior of all restore variants.
fn finish_restore(result: OrganizeResult<RestoreReport>) -> Result<(), String> {
    match result {
        Ok(report) => {
            print_restore_report(&report);
            Ok(())
        }
        Err(OrganizeError::MissingIndex { .. }) => {
            OutputFormatter::warning("No index file found to restore from.");
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

fn print_restore_report(report: &RestoreReport) {
    OutputFormatter::success(&format!("Restored: {}", report.restored_files));

    if !report.skipped_files.is_empty() {
        OutputFormatter::warning(&format!("Skipped: {}", report.skipped_files.len()));
        for (path, reason) in &report.skipped_files {
            OutputFormatter::warning(&format!("  - {}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::error(&format!("Failed: {}", report.failed_restores.len()));
        for (path, reason) in &report.failed_restores {
            OutputFormatter::error(&format!("  - {}: {}", path.display(), reason));
        }
    }
}
