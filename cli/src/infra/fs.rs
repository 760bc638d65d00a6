//! Filesystem infrastructure: implements `AssemblyWriter`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{AssemblyWriter, WrittenAssembly};
use crate::domain::assembly::{Assembly, template_file_name};

/// Manifest file name inside the assembly directory.
pub const MANIFEST_FILE: &str = "manifest.json";

const TEMPLATE_SUFFIX: &str = ".template.json";

/// Writes `<Stack>.template.json` files and `manifest.json` into a directory.
///
/// Templates left over from stacks that no longer exist are removed so the
/// directory always describes exactly one assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyDir;

fn is_assembly_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == MANIFEST_FILE || n.ends_with(TEMPLATE_SUFFIX))
}

impl AssemblyWriter for AssemblyDir {
    fn existing_entries(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?
        {
            entries.push(entry.with_context(|| format!("reading {}", dir.display()))?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn write(&self, assembly: &Assembly, dir: &Path) -> Result<WrittenAssembly> {
        // Render everything up front; a failure must leave the directory untouched.
        let mut bodies = Vec::with_capacity(assembly.stacks().len() + 1);
        for stack in assembly.stacks() {
            let body = stack
                .template
                .to_json_pretty()
                .with_context(|| format!("rendering template of {}", stack.name))?;
            bodies.push((dir.join(template_file_name(&stack.name)), body));
        }
        let manifest = dir.join(MANIFEST_FILE);
        let mut manifest_body = serde_json::to_string_pretty(&assembly.manifest()?)
            .context("serializing manifest")?;
        manifest_body.push('\n');

        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
        for stale in self.existing_entries(dir)?.into_iter().filter(|p| is_assembly_file(p)) {
            std::fs::remove_file(&stale)
                .with_context(|| format!("removing file {}", stale.display()))?;
            tracing::debug!(path = %stale.display(), "removed stale assembly file");
        }

        let mut templates = Vec::with_capacity(bodies.len());
        for (path, body) in bodies {
            std::fs::write(&path, body)
                .with_context(|| format!("writing file {}", path.display()))?;
            tracing::debug!(path = %path.display(), "template written");
            templates.push(path);
        }
        std::fs::write(&manifest, manifest_body)
            .with_context(|| format!("writing file {}", manifest.display()))?;

        Ok(WrittenAssembly {
            directory: dir.to_path_buf(),
            templates,
            manifest,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use ecsforge_common::{Environment, Reference, Resource, Template};

    use super::*;
    use crate::domain::assembly::SynthesizedStack;
    use crate::domain::compose;
    use crate::domain::config::ForgeConfig;

    #[test]
    fn test_write_creates_templates_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let assembly = compose(&ForgeConfig::default()).unwrap();

        let written = AssemblyDir.write(&assembly, &out).unwrap();

        assert_eq!(written.templates.len(), 2);
        assert!(out.join("InfraStack.template.json").is_file());
        assert!(out.join("EcsSvcStack.template.json").is_file());
        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written.manifest).unwrap()).unwrap();
        assert_eq!(manifest["deployOrder"][0], "InfraStack");
    }

    #[test]
    fn test_write_removes_stale_templates_but_keeps_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("OldStack.template.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        let assembly = compose(&ForgeConfig::default()).unwrap();

        AssemblyDir.write(&assembly, dir.path()).unwrap();

        assert!(!dir.path().join("OldStack.template.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_render_failure_leaves_previous_assembly_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join("InfraStack.template.json");
        std::fs::write(&previous, "{\"previous\": true}").unwrap();

        let mut template = Template::default();
        template.resources.insert(
            "Broken".into(),
            Resource::new("AWS::SNS::Topic")
                .property("TopicName", Reference::new("ElsewhereStack", "Name")),
        );
        let assembly = Assembly::from_stacks(vec![SynthesizedStack {
            name: "InfraStack".into(),
            environment: Environment::default(),
            template,
            dependencies: Vec::new(),
        }]);

        assert!(AssemblyDir.write(&assembly, dir.path()).is_err());
        assert_eq!(
            std::fs::read_to_string(&previous).unwrap(),
            "{\"previous\": true}"
        );
        assert!(!dir.path().join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_existing_entries_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = AssemblyDir.existing_entries(&dir.path().join("nope")).unwrap();
        assert!(entries.is_empty());
    }
}
