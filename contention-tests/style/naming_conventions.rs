//! Naming Convention Checker
//!
//! Focuses on the violations that matter most: banned function prefixes,
//! role-only type suffixes and catch-all module names.

use std::fs;
use std::path::Path;

use super::{is_test_source, workspace_sources};

/// A naming violation found in the code
#[derive(Debug)]
struct NamingViolation {
    file_path: String,
    line_number: usize,
    message: String,
}

const BANNED_FUNCTION_PREFIXES: [(&str, &str); 3] = [
    ("get_", "Use the noun directly: device.window() not device.get_window()"),
    ("set_", "Use descriptive verbs: observe_window() not set_window()"),
    ("handle_", "Be specific: execute() or arbitrate() not handle()"),
];

const BANNED_TYPE_SUFFIXES: [(&str, &str); 3] = [
    ("Manager", "Name what it IS, not its role"),
    ("Factory", "Use a plain new() or build() function"),
    ("Service", "Usually adds no semantic value"),
];

const BANNED_MODULE_NAMES: [&str; 4] = ["utils", "common", "helpers", "misc"];

fn check_function_prefixes(content: &str) -> Vec<(usize, String)> {
    let mut found = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            continue;
        }
        for (prefix, correction) in BANNED_FUNCTION_PREFIXES {
            if trimmed.contains(&format!("fn {prefix}")) {
                found.push((
                    index + 1,
                    format!("Function uses banned prefix '{prefix}'. {correction}"),
                ));
            }
        }
    }
    found
}

fn declared_type_name(line: &str) -> Option<&str> {
    let trimmed = line.trim().strip_prefix("pub ").unwrap_or(line.trim());
    let rest = ["struct ", "enum ", "trait "]
        .iter()
        .find_map(|keyword| trimmed.strip_prefix(keyword))?;

    rest.split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .filter(|name| !name.is_empty())
}

fn check_type_suffixes(content: &str) -> Vec<(usize, String)> {
    let mut found = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let Some(name) = declared_type_name(line) else {
            continue;
        };
        for (suffix, message) in BANNED_TYPE_SUFFIXES {
            if name.ends_with(suffix) {
                found.push((
                    index + 1,
                    format!("Type '{name}' uses banned '{suffix}' suffix. {message}"),
                ));
            }
        }
    }
    found
}

fn check_module_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    BANNED_MODULE_NAMES
        .contains(&stem.as_ref())
        .then(|| format!("Module name '{stem}' is too generic"))
}

fn check_workspace() -> Result<Vec<NamingViolation>, Box<dyn std::error::Error>> {
    let mut violations = Vec::new();

    for path in workspace_sources()? {
        if is_test_source(&path) {
            continue;
        }

        let file_path = path.display().to_string();
        if let Some(message) = check_module_name(&path) {
            violations.push(NamingViolation {
                file_path: file_path.clone(),
                line_number: 1,
                message,
            });
        }

        let content = fs::read_to_string(&path)?;
        let found = check_function_prefixes(&content)
            .into_iter()
            .chain(check_type_suffixes(&content));
        for (line_number, message) in found {
            violations.push(NamingViolation {
                file_path: file_path.clone(),
                line_number,
                message,
            });
        }
    }

    Ok(violations)
}

#[test]
fn test_function_prefix_detection() {
    let content = "pub fn get_window(&self) -> u64 {\n// fn set_window in a comment\nfn window(&self) {}\n";

    let found = check_function_prefixes(content);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, 1);
}

#[test]
fn test_type_suffix_detection() {
    assert_eq!(declared_type_name("pub struct DeviceManager {"), Some("DeviceManager"));
    assert_eq!(declared_type_name("enum Arbitration {"), Some("Arbitration"));
    assert_eq!(declared_type_name("pub trait Invariant: Send + Sync {"), Some("Invariant"));
    assert_eq!(declared_type_name("let x = 1;"), None);

    let found = check_type_suffixes("pub struct ArrivalFactory;\npub struct Resource {\n");
    assert_eq!(found.len(), 1);
}

#[test]
fn test_module_name_detection() {
    assert!(check_module_name(Path::new("src/utils.rs")).is_some());
    assert!(check_module_name(Path::new("src/arrival.rs")).is_none());
}

#[test]
fn naming_conventions() {
    let violations = check_workspace().expect("Failed to check workspace");

    for violation in &violations {
        println!(
            "{}:{} {}",
            violation.file_path, violation.line_number, violation.message
        );
    }
    assert!(
        violations.is_empty(),
        "Found {} naming violation(s) - see output above",
        violations.len()
    );
}
