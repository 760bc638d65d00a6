//! Shared in-memory port implementations for unit tests.

#![allow(clippy::expect_used)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ecsforge_cli::application::ports::{
    AssemblyWriter, ConfigStore, ProgressReporter, WrittenAssembly,
};
use ecsforge_cli::domain::assembly::{Assembly, template_file_name};
use ecsforge_cli::domain::config::ForgeConfig;

// ── Config store ──────────────────────────────────────────────────────────────

/// Serves a fixed configuration, or fails every load when `broken`.
pub struct StaticConfig {
    config: RefCell<ForgeConfig>,
    broken: bool,
}

impl StaticConfig {
    pub fn new(config: ForgeConfig) -> Self {
        Self {
            config: RefCell::new(config),
            broken: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            config: RefCell::new(ForgeConfig::default()),
            broken: true,
        }
    }
}

impl ConfigStore for StaticConfig {
    fn load(&self) -> Result<ForgeConfig> {
        if self.broken {
            anyhow::bail!("cannot parse ecsforge.yaml");
        }
        Ok(self.config.borrow().clone())
    }

    fn save(&self, config: &ForgeConfig) -> Result<()> {
        *self.config.borrow_mut() = config.clone();
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("ecsforge.yaml"))
    }
}

// ── Assembly writer ───────────────────────────────────────────────────────────

/// Records the stacks of every write instead of touching the filesystem.
#[derive(Default)]
pub struct RecordingWriter {
    pub writes: RefCell<Vec<Vec<String>>>,
}

impl AssemblyWriter for RecordingWriter {
    fn existing_entries(&self, _: &Path) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn write(&self, assembly: &Assembly, dir: &Path) -> Result<WrittenAssembly> {
        let names: Vec<String> = assembly.stacks().iter().map(|s| s.name.clone()).collect();
        let templates = names
            .iter()
            .map(|n| dir.join(template_file_name(n)))
            .collect();
        self.writes.borrow_mut().push(names);
        Ok(WrittenAssembly {
            directory: dir.to_path_buf(),
            templates,
            manifest: dir.join("manifest.json"),
        })
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

/// Collects reported messages by kind.
#[derive(Default)]
pub struct RecordingReporter {
    pub steps: RefCell<Vec<String>>,
    pub successes: RefCell<Vec<String>>,
    pub warnings: RefCell<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.steps.borrow_mut().push(message.to_string());
    }

    fn success(&self, message: &str) {
        self.successes.borrow_mut().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}
