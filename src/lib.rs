//! revtidy - a Revit backup quarantine and restore utility
//!
//! This library provides utilities for classifying Revit files as primary
//! or backup, relocating backups into a mirrored "to delete" tree, tracking
//! every move in a JSON index, and restoring one, many, or all files back
//! to their original paths.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod index;
pub mod organizer;
pub mod output;
pub mod paths;
pub mod restore;

pub use config::{CompiledFilters, ConfigError, FilterConfig};
pub use index::{BackupIndex, Node, OrganizeError, OrganizeResult};
pub use organizer::{MoveOutcome, OrganizeReport, Organizer};
pub use restore::{RestoreManager, RestoreReport};

pub use cli::{Cli, Command, run_cli};
