//! Style Enforcement Tests
//!
//! These tests scan the workspace sources and fail if violations are found.
//!
//! - `naming_conventions` - Bans accessor prefixes such as `get_` and `set_`
//! - `dead_code_enforcement` - Prevents #[allow(dead_code)] in production code

#[path = "style/naming_conventions.rs"]
mod naming_conventions;

#[path = "style/dead_code_enforcement.rs"]
mod dead_code_enforcement;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directories that never hold workspace sources.
const SKIPPED_DIRS: [&str; 2] = ["target", "examples"];

/// Collects every Rust file of the workspace, relative to this crate.
fn workspace_sources() -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_rust_files(Path::new(".."), &mut files, 0)?;
    Ok(files)
}

fn collect_rust_files(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> io::Result<()> {
    // Prevent runaway recursion through symlinks
    if depth > 8 {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if let Some(name) = path.file_name()
            && (name.to_string_lossy().starts_with('.')
                || SKIPPED_DIRS.iter().any(|skipped| name == *skipped))
        {
            continue;
        }

        if path.is_dir() {
            collect_rust_files(&path, files, depth + 1)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    Ok(())
}

/// Test sources are exempt from production style rules.
fn is_test_source(path: &Path) -> bool {
    let path_str = path.to_string_lossy().replace('\\', "/");

    path_str.contains("contention-tests/")
        || path_str.contains("/benches/")
        || path_str.ends_with("/tests.rs")
}

#[test]
fn test_workspace_scan_skips_reference_dirs() {
    let files = workspace_sources().expect("Failed to scan workspace");

    assert!(
        files
            .iter()
            .any(|f| f.ends_with("contention-sim/src/lib.rs"))
    );
    assert!(files.iter().all(|f| {
        !f.components()
            .any(|c| SKIPPED_DIRS.iter().any(|skipped| c.as_os_str() == *skipped))
    }));
}

#[test]
fn test_is_test_source() {
    assert!(is_test_source(Path::new(
        "../contention-sim/src/deterministic/tests.rs"
    )));
    assert!(is_test_source(Path::new(
        "../contention-tests/integration/scenarios.rs"
    )));
    assert!(is_test_source(Path::new(
        "../contention-sim/benches/simulation.rs"
    )));

    assert!(!is_test_source(Path::new("../contention-sim/src/device.rs")));
    assert!(!is_test_source(Path::new("../contention-cli/src/main.rs")));
}
