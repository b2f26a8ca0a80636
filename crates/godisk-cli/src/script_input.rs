use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Script text with CRLF line endings and trailing blank lines normalized.
pub(crate) fn normalize_script(text: &str) -> String {
    text.replace("\r\n", "\n").trim_end().to_string()
}

/// Joins several script sources, in order, into one script.
pub(crate) fn merge_scripts(texts: &[String]) -> String {
    texts
        .iter()
        .map(|text| normalize_script(text))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn read_script_files(paths: &[PathBuf]) -> Result<String> {
    let texts = paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script file {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_scripts(&texts))
}

pub(crate) fn read_stdin_script() -> Result<String> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read script from stdin")?;
    Ok(normalize_script(&raw))
}
