//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use sixx_core::{codec::BlockCompiler, Model, SixxError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Parse one source text to completion.
#[allow(dead_code)]
pub fn compile(source: &str) -> Result<Model, SixxError> {
    init_logging();
    let mut compiler = BlockCompiler::default();
    compiler.parse_source(source, "contacts.sixx")?;
    compiler.finish_parsing()?;
    Ok(compiler.into_model())
}

/// Write `files` (name, contents) into a fresh contacts directory.
///
/// Returns the path to the directory (e.g. `<temp_dir>/contacts/`).
#[allow(dead_code)]
pub fn create_contacts_dir(temp_dir: &TempDir, files: &[(&str, &str)]) -> PathBuf {
    let dir = temp_dir.path().join("contacts");
    std::fs::create_dir(&dir).unwrap();
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).unwrap();
    }
    dir
}

/// Parse every input file under `paths`.
#[allow(dead_code)]
pub fn compile_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Model, SixxError> {
    init_logging();
    let mut compiler = BlockCompiler::default();
    compiler.parse_files(paths)?;
    compiler.finish_parsing()?;
    Ok(compiler.into_model())
}
