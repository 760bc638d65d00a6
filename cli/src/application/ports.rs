//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::assembly::Assembly;
use crate::domain::config::ForgeConfig;

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts where the configuration file lives and how it is parsed.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when no file exists.
    fn load(&self) -> Result<ForgeConfig>;
    /// Persist the configuration.
    fn save(&self, config: &ForgeConfig) -> Result<()>;
    /// Path the store reads from and writes to.
    fn path(&self) -> Result<PathBuf>;
}

// ── Assembly Output Port ──────────────────────────────────────────────────────

/// What a write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenAssembly {
    pub directory: PathBuf,
    /// Template files, in deployment order.
    pub templates: Vec<PathBuf>,
    pub manifest: PathBuf,
}

/// Abstracts writing a synthesized assembly to its output directory.
pub trait AssemblyWriter {
    /// Entries in `dir` that a write would replace or remove.
    fn existing_entries(&self, dir: &Path) -> Result<Vec<PathBuf>>;
    /// Write every template plus the manifest into `dir`.
    fn write(&self, assembly: &Assembly, dir: &Path) -> Result<WrittenAssembly>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
