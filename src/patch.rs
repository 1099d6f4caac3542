use std::path::Path;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::error::{AppError, Result};

static BASE_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bbase\s*:\s*(?:'[^'\n]*'|"[^"\n]*"|`[^`]*`)[ \t]*,?"#).expect("valid base regex")
});

static SERVER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bserver\s*:\s*\{").expect("valid server regex"));

static DEFINE_CONFIG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"defineConfig\(\s*\{").expect("valid defineConfig regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// No configuration file; nothing to do.
    Missing,
    /// The file already carried the wanted value.
    Unchanged,
    /// An existing `base` assignment was rewritten.
    Replaced,
    /// A new `base` assignment was added.
    Inserted,
    /// Neither a `base` assignment nor a place to insert one was found.
    NoAnchor,
}

fn assignment(repo_name: &str) -> String {
    format!("base: '/{repo_name}',")
}

/// Set `base` in `content` so the built site is served from `/<repo_name>`.
/// Returns the new text and what happened.
///
/// This is a text edit, not a TypeScript parse: a malformed configuration
/// stays malformed. Inserted lines reuse the file's line ending.
pub fn patch_base_path(content: &str, repo_name: &str) -> (String, PatchOutcome) {
    let wanted = assignment(repo_name);
    let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };

    if BASE_ASSIGNMENT.is_match(content) {
        let patched = BASE_ASSIGNMENT
            .replace_all(content, NoExpand(&wanted))
            .into_owned();
        let outcome = if patched == content {
            PatchOutcome::Unchanged
        } else {
            PatchOutcome::Replaced
        };
        return (patched, outcome);
    }

    if let Some(marker) = SERVER_BLOCK.find(content) {
        let line_start = content[..marker.start()]
            .rfind('\n')
            .map_or(0, |i| i + 1);
        let indent = &content[line_start..marker.start()];

        let mut patched = String::with_capacity(content.len() + wanted.len() + indent.len() + 2);
        if indent.trim().is_empty() {
            // Marker starts its own line: add a line above with the same indentation
            patched.push_str(&content[..line_start]);
            patched.push_str(indent);
            patched.push_str(&wanted);
            patched.push_str(eol);
            patched.push_str(&content[line_start..]);
        } else {
            patched.push_str(&content[..marker.start()]);
            patched.push_str(&wanted);
            patched.push(' ');
            patched.push_str(&content[marker.start()..]);
        }
        return (patched, PatchOutcome::Inserted);
    }

    if let Some(open) = DEFINE_CONFIG.find(content) {
        let mut patched = String::with_capacity(content.len() + wanted.len() + 4);
        patched.push_str(&content[..open.end()]);
        patched.push_str(eol);
        patched.push_str("  ");
        patched.push_str(&wanted);
        patched.push_str(&content[open.end()..]);
        return (patched, PatchOutcome::Inserted);
    }

    (content.to_string(), PatchOutcome::NoAnchor)
}

/// Point the `base` option of the configuration file at `/<repo_name>`.
///
/// A missing file is not an error. The file is only written when it changes.
pub async fn set_base_path(file_path: &Path, repo_name: &str) -> Result<PatchOutcome> {
    if !tokio::fs::try_exists(file_path).await? {
        return Ok(PatchOutcome::Missing);
    }

    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|e| AppError::Patch(format!("Failed to read {}: {e}", file_path.display())))?;
    let (patched, outcome) = patch_base_path(&content, repo_name);

    if matches!(outcome, PatchOutcome::Replaced | PatchOutcome::Inserted) {
        tokio::fs::write(file_path, patched)
            .await
            .map_err(|e| AppError::Patch(format!("Failed to write {}: {e}", file_path.display())))?;
        tracing::debug!(file = %file_path.display(), ?outcome, "Build config patched");
    }

    Ok(outcome)
}
