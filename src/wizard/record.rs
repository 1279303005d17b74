use crate::cover_art::CoverImage;
use crate::lastfm::TrackInfo;
use crate::tags::TrackFields;
use indexmap::IndexSet;
use std::path::{Path, PathBuf};

/// Where the play count shown at confirmation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayCount {
    #[default]
    Unknown,
    /// Reported by the metadata service
    Plays(u64),
    /// Title/artist came from existing tags or typed input, not the service
    Manual,
}

/// Everything resolved so far for one file
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    file_path: PathBuf,
    pub title_guess: String,
    pub artist_guess: String,
    pub resolved_title: Option<String>,
    pub resolved_artist: Option<String>,
    pub play_count: PlayCount,
    pub tag_candidates: IndexSet<String>,
    pub selected_tags: IndexSet<String>,
    pub album_resolved: bool,
    pub album_title: Option<String>,
    pub album_artist: Option<String>,
    pub cover: Option<CoverImage>,
}

impl TrackRecord {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            title_guess: String::new(),
            artist_guess: String::new(),
            resolved_title: None,
            resolved_artist: None,
            play_count: PlayCount::Unknown,
            tag_candidates: IndexSet::new(),
            selected_tags: IndexSet::new(),
            album_resolved: false,
            album_title: None,
            album_artist: None,
            cover: None,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    pub fn set_guess(&mut self, title: String, artist: String) {
        self.title_guess = title;
        self.artist_guess = artist;
    }

    /// Title shown in prompts: the candidate if any, else the guess
    pub fn display_title(&self) -> &str {
        self.resolved_title.as_deref().unwrap_or(&self.title_guess)
    }

    pub fn display_artist(&self) -> &str {
        self.resolved_artist.as_deref().unwrap_or(&self.artist_guess)
    }

    /// Adopt a service match; album data only when the service knows one
    pub fn accept_track_match(&mut self, info: TrackInfo) {
        self.resolved_title = Some(info.name);
        self.resolved_artist = Some(info.artist);
        self.play_count = PlayCount::Plays(info.play_count);
        self.tag_candidates = info.tags;
        self.selected_tags.clear();
        self.cover = None;

        match info.album {
            Some(album) => {
                self.album_resolved = true;
                self.album_title = Some(album.title);
                self.album_artist = Some(album.artist);
            }
            None => self.clear_album(),
        }
    }

    /// Title/artist that did not come from the service
    pub fn accept_manual(&mut self, title: String, artist: String) {
        self.resolved_title = Some(title);
        self.resolved_artist = Some(artist);
        self.play_count = PlayCount::Manual;
        self.tag_candidates.clear();
        self.selected_tags.clear();
        self.clear_album();
    }

    /// Drop the current candidate and use it as the next search guess
    pub fn reject_candidate(&mut self) {
        if let Some(title) = self.resolved_title.take() {
            self.title_guess = title;
        }
        if let Some(artist) = self.resolved_artist.take() {
            self.artist_guess = artist;
        }
        self.play_count = PlayCount::Unknown;
        self.tag_candidates.clear();
        self.selected_tags.clear();
        self.clear_album();
    }

    pub fn clear_album(&mut self) {
        self.album_resolved = false;
        self.album_title = None;
        self.album_artist = None;
        self.cover = None;
    }

    /// Fields to write, or `None` while title/artist are unresolved
    pub fn to_fields(&self) -> Option<TrackFields> {
        let title = self.resolved_title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let artist = self.resolved_artist.as_deref().map(str::trim).filter(|a| !a.is_empty())?;

        Some(TrackFields {
            title: title.to_string(),
            artist: artist.to_string(),
            album: self.album_title.clone(),
            album_artist: self.album_artist.clone(),
            genres: self.selected_tags.iter().cloned().collect(),
            cover: self.cover.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lastfm::AlbumInfo;

    fn kansas() -> TrackInfo {
        TrackInfo {
            name: "Dust in the Wind".into(),
            artist: "Kansas".into(),
            play_count: 42,
            tags: ["classic rock".to_string()].into_iter().collect(),
            album: Some(AlbumInfo {
                title: "Point of Know Return".into(),
                artist: "Kansas".into(),
                cover_url: String::new(),
            }),
        }
    }

    #[test]
    fn test_accept_then_reject_seeds_guess() {
        let mut record = TrackRecord::new(PathBuf::from("/music/dust.mp3"));
        record.accept_track_match(kansas());
        assert!(record.album_resolved);
        assert_eq!(record.play_count, PlayCount::Plays(42));

        record.reject_candidate();
        assert_eq!(record.title_guess, "Dust in the Wind");
        assert_eq!(record.artist_guess, "Kansas");
        assert!(record.resolved_title.is_none());
        assert!(!record.album_resolved);
        assert!(record.tag_candidates.is_empty());
    }

    #[test]
    fn test_to_fields_requires_title_and_artist() {
        let mut record = TrackRecord::new(PathBuf::from("/music/x.mp3"));
        assert!(record.to_fields().is_none());

        record.accept_manual("  ".into(), "Kansas".into());
        assert!(record.to_fields().is_none());

        record.accept_manual("Dust in the Wind".into(), "Kansas".into());
        let fields = record.to_fields().unwrap();
        assert_eq!(fields.title, "Dust in the Wind");
        assert!(fields.album.is_none());
        assert!(fields.cover.is_none());
    }

    #[test]
    fn test_file_path_is_kept() {
        let record = TrackRecord::new(PathBuf::from("/music/Dust in the Wind - Kansas.mp3"));
        assert_eq!(record.file_path(), Path::new("/music/Dust in the Wind - Kansas.mp3"));
        assert_eq!(record.file_name(), "Dust in the Wind - Kansas.mp3");
    }
}
