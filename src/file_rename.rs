use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameResult {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// False when the file already had the target name
    pub changed: bool,
}

/// Strip characters that are not allowed in filenames
pub fn sanitize_component(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `Title - Artist.ext`, or `None` if either part sanitizes to nothing
pub fn generate_filename(title: &str, artist: &str, extension: &str) -> Option<String> {
    let title = sanitize_component(title);
    let artist = sanitize_component(artist);
    if title.is_empty() || artist.is_empty() {
        return None;
    }

    if extension.is_empty() {
        Some(format!("{} - {}", title, artist))
    } else {
        Some(format!("{} - {}.{}", title, artist, extension))
    }
}

/// Work out where `file_path` would move to without touching it. Fails when
/// the name cannot be built or another file already holds it.
pub fn plan_rename(file_path: &Path, title: &str, artist: &str) -> Result<RenameResult> {
    if !file_path.is_file() {
        anyhow::bail!("File does not exist: {}", file_path.display());
    }

    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let new_filename = generate_filename(title, artist, extension).ok_or_else(|| {
        anyhow::anyhow!("'{}' by '{}' does not make a usable filename", title, artist)
    })?;
    let new_path = file_path.with_file_name(&new_filename);

    if new_path == file_path {
        return Ok(RenameResult {
            old_path: file_path.to_path_buf(),
            new_path,
            changed: false,
        });
    }

    if new_path.exists() {
        anyhow::bail!("Target file already exists: {}", new_path.display());
    }

    Ok(RenameResult {
        old_path: file_path.to_path_buf(),
        new_path,
        changed: true,
    })
}

/// Carry out a planned rename
pub fn apply_rename(plan: &RenameResult) -> Result<()> {
    if !plan.changed {
        return Ok(());
    }
    // The target may have appeared since the plan was made
    if plan.new_path.exists() {
        anyhow::bail!("Target file already exists: {}", plan.new_path.display());
    }
    fs::rename(&plan.old_path, &plan.new_path).context("Failed to rename file")
}
