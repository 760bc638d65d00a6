//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! domain is pure, application talks to the outside only through ports, and
//! infra never reaches up into presentation.

use std::path::{Path, PathBuf};

fn src_dir(layer: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(layer)
}

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Lines under `layer` that contain any of `patterns`, outside test blocks.
fn forbidden_lines(layer: &str, patterns: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir(layer)) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        let mut tracker = CfgTestTracker::new();
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            if tracker.process_line(line) {
                continue;
            }
            if let Some(p) = patterns.iter().find(|p| line.contains(**p)) {
                violations.push(format!("{rel}:{}: `{p}`: {}", i + 1, line.trim()));
            }
        }
    }
    violations
}

#[test]
fn domain_is_pure() {
    let violations = forbidden_lines(
        "domain",
        &[
            "crate::infra",
            "crate::commands",
            "crate::application",
            "crate::output",
            "std::fs",
            "std::process",
            "println!",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must not perform I/O or import outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_infra_or_output_imports() {
    let violations = forbidden_lines("application", &["crate::infra::", "crate::output::"]);
    assert!(
        violations.is_empty(),
        "application/ must not import from infra/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = forbidden_lines("infra", &["crate::commands", "crate::output"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = forbidden_lines("infra", &["println!", "eprintln!", "print!("]);
    assert!(
        violations.is_empty(),
        "infra/ must report through return values, not stdout:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_inline_json_branching_in_commands() {
    let mut violations = forbidden_lines("commands", &["json: bool"]);
    for file in collect_rs_files(&src_dir("commands")) {
        for line in read_non_comment_lines(&file) {
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                violations.push(format!("{}: {trimmed}", file.display()));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "Found inline JSON branching in commands/; use app.renderer() instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn commands_use_standardized_confirmation() {
    let violations = forbidden_lines("commands", &["dialoguer::"]);
    assert!(
        violations.is_empty(),
        "commands/ must confirm through app.confirm():\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_accept_app_context() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir("commands")) {
        if file.file_name().and_then(|n| n.to_str()) == Some("mod.rs") {
            continue;
        }
        let lines = read_non_comment_lines(&file);
        let handler = lines.iter().find(|l| l.trim_start().starts_with("pub fn run("));
        match handler {
            Some(sig) if sig.contains("app: &AppContext") => {}
            Some(sig) => violations.push(format!("{}: {}", file.display(), sig.trim())),
            None => violations.push(format!("{}: no `pub fn run(`", file.display())),
        }
    }
    assert!(
        violations.is_empty(),
        "command handlers must take `app: &AppContext`:\n{}",
        violations.join("\n")
    );
}
