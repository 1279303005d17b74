use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub name: String,
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Supported audio files directly inside `dir`, in natural name order
pub fn list_files(dir: &Path) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.with_context(|| format!("cannot list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        // macOS resource forks
        if name.starts_with("._") {
            continue;
        }
        if !is_audio_file(entry.path()) {
            continue;
        }

        entries.push(CatalogEntry {
            path: entry.path().to_path_buf(),
            name,
        });
    }

    entries.sort_by(|a, b| match natord::compare(&a.name, &b.name) {
        Ordering::Equal => a.name.cmp(&b.name),
        other => other,
    });

    log::info!("found {} audio files in {}", entries.len(), dir.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("a.mp3")));
        assert!(is_audio_file(Path::new("a.FLAC")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("README")));
    }

    #[test]
    fn test_list_files_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "track10.mp3",
            "track2.mp3",
            "track1.flac",
            "cover.jpg",
            "._track3.mp3",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.mp3"), b"x").unwrap();

        let names: Vec<String> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["track1.flac", "track2.mp3", "track10.mp3"]);
    }

    #[test]
    fn test_list_files_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_files_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(&dir.path().join("missing")).is_err());
    }
}
