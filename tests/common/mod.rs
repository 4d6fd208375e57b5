/*!
 * Common test utilities for the subclean test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use anyhow::Result;
use tempfile::TempDir;

use subclean::Provider;

/// Route `log` output through the test harness (first caller wins)
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Wraps each line of dialogue in its own numbered, timed cue
pub fn srt_from_lines(lines: &[&str]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "{}\n00:00:{:02},000 --> 00:00:{:02},500\n{}\n",
                i + 1,
                i * 2,
                i * 2 + 1,
                line
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = srt_from_lines(&[
        "This is a test subtitle.",
        "It contains multiple entries.",
        "For testing purposes.",
    ]);
    create_test_file(dir, filename, &content)
}

/// Text of `count` sentences, each exactly `sentence_len` characters with no spaces between them
pub fn sentences(count: usize, sentence_len: usize) -> String {
    let body = "x".repeat(sentence_len - 1);
    (0..count).map(|_| format!("{}.", body)).collect()
}

/// Box a list of providers for the dispatcher
pub fn boxed<P: Provider + 'static>(providers: Vec<P>) -> Vec<Box<dyn Provider>> {
    providers
        .into_iter()
        .map(|p| Box::new(p) as Box<dyn Provider>)
        .collect()
}
