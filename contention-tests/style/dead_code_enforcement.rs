//! Dead Code Enforcement
//!
//! Production code must not silence the dead code lint. Test sources are
//! exempt.

use std::fs;

use super::{is_test_source, workspace_sources};

/// A dead code allowance found in production code
#[derive(Debug)]
struct DeadCodeViolation {
    file_path: String,
    line_number: usize,
    context: String,
}

/// Returns the 1-based line numbers that allow dead code.
fn dead_code_allowances(content: &str) -> Vec<usize> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow(")
        })
        .filter(|(_, line)| line.contains("dead_code"))
        .map(|(index, _)| index + 1)
        .collect()
}

fn check_workspace() -> Result<(Vec<DeadCodeViolation>, usize), Box<dyn std::error::Error>> {
    let mut violations = Vec::new();
    let mut files_checked = 0;

    for path in workspace_sources()? {
        if is_test_source(&path) {
            continue;
        }

        let content = fs::read_to_string(&path)?;
        files_checked += 1;

        let lines: Vec<&str> = content.lines().collect();
        for line_number in dead_code_allowances(&content) {
            violations.push(DeadCodeViolation {
                file_path: path.display().to_string(),
                line_number,
                context: lines[line_number - 1].trim().to_string(),
            });
        }
    }

    Ok((violations, files_checked))
}

fn report_violations(violations: &[DeadCodeViolation], files_checked: usize) -> bool {
    if violations.is_empty() {
        println!("Dead code enforcement: {files_checked} files checked, no violations found");
        return true;
    }

    println!("Dead code enforcement violations found:");
    for violation in violations {
        println!("{}:{}", violation.file_path, violation.line_number);
        println!("  {}", violation.context);
    }
    println!();
    println!(
        "Found {} violation(s) in {} file(s) checked",
        violations.len(),
        files_checked
    );
    println!("Remove the unused code or move it into a test module.");

    false
}

#[test]
fn test_dead_code_detection() {
    let content = r#"
use std::collections::HashMap;

#[allow(dead_code)]
struct UnusedStruct {
    field: u32,
}

#[allow(clippy::missing_docs, dead_code)]
fn unused_function() {}

// #[allow(dead_code)] in a comment is fine
"#;

    assert_eq!(dead_code_allowances(content), vec![4, 9]);
}

#[test]
fn dead_code_enforcement() {
    let (violations, files_checked) = check_workspace().expect("Failed to check workspace");

    assert!(files_checked > 0, "No production sources found");
    assert!(
        report_violations(&violations, files_checked),
        "Dead code allowance violations found in production code - see output above"
    );
}
