//! Text normalization for filenames and service tags
//!
//! Files are expected to follow the `Title - Artist.ext` convention. Tags
//! coming from the metadata service are folded to lowercase so that
//! `Rock`, `rock` and ` ROCK ` collapse into one entry.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    // Greedy title: "A - B - C" splits into ("A - B", "C").
    static ref TITLE_ARTIST: Regex = Regex::new(r"^(?P<title>.+) - (?P<artist>.+)$").unwrap();
}

/// Derive a `(title, artist)` guess from a filename like `Dust in the Wind - Kansas.mp3`
///
/// Returns `None` when the stem does not follow the convention or either
/// side is blank.
pub fn guess_from_filename(file_name: &str) -> Option<(String, String)> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;

    let caps = TITLE_ARTIST.captures(stem)?;
    let title = caps.name("title")?.as_str().trim();
    let artist = caps.name("artist")?.as_str().trim();

    if title.is_empty() || artist.is_empty() {
        return None;
    }

    Some((title.to_string(), artist.to_string()))
}

/// Normalize a single tag name: trimmed, lowercase, `None` when blank
pub fn normalize_tag(tag: &str) -> Option<String> {
    let normalized = tag.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Split a comma-separated tag list such as `"pop, Rock ,,alternative"`
pub fn parse_tag_list(list: &str) -> Vec<String> {
    list.split(',').filter_map(normalize_tag).collect()
}

/// Trimmed copy of user input, `None` when nothing is left
pub fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
