use crate::cover_art::CoverImage;
use crate::lastfm::{AlbumCandidate, TrackInfo};
use std::path::PathBuf;

/// Most album candidates ever offered for selection
pub const MAX_ALBUM_CHOICES: usize = 5;

/// Why the track search prompt is being shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchReason {
    /// The filename is not `Title - Artist.ext`
    UnparsableFilename,
    /// The service has no such track
    NotFound,
    /// The user turned down the offered track
    Rejected,
    /// The automatic lookup could not reach the service
    LookupFailed,
}

/// Indicator rendered under a search prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// A required field was empty
    Invalid,
    /// The search ran and matched nothing
    NotFound,
    /// The service could not be reached; the user may retry
    Unreachable(String),
}

/// Indicator rendered under the manual album form
///
/// A single enum keeps the two messages mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualEntryError {
    Invalid,
    InvalidPath,
}

/// Who asked for a track lookup, so a miss goes back to the right prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOrigin {
    Filename,
    Prompt(SearchReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Start,
    LookingUpTrack { origin: LookupOrigin },
    FetchingTrackCover { url: String },
    TrackConfirm,
    TrackSearchPrompt {
        reason: SearchReason,
        error: Option<PromptError>,
    },
    TagCuration,
    AlbumConfirm,
    AlbumSearchPrompt { error: Option<PromptError> },
    SearchingAlbum { query: String },
    AlbumSelectList {
        candidates: Vec<AlbumCandidate>,
        selected: usize,
    },
    FetchingAlbumCover { url: String },
    AlbumManualEntry { error: Option<ManualEntryError> },
    LoadingCoverFile { album_artist: String, path: PathBuf },
    Committed,
    Skipped,
    Quit,
}

impl WizardState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardState::Committed | WizardState::Skipped | WizardState::Quit)
    }

    /// States that wait for the user rather than for a collaborator
    pub fn awaits_user(&self) -> bool {
        matches!(
            self,
            WizardState::TrackConfirm
                | WizardState::TrackSearchPrompt { .. }
                | WizardState::TagCuration
                | WizardState::AlbumConfirm
                | WizardState::AlbumSearchPrompt { .. }
                | WizardState::AlbumSelectList { .. }
                | WizardState::AlbumManualEntry { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            WizardState::Start => "start",
            WizardState::LookingUpTrack { .. } => "looking-up-track",
            WizardState::FetchingTrackCover { .. } => "fetching-track-cover",
            WizardState::TrackConfirm => "track-confirm",
            WizardState::TrackSearchPrompt { .. } => "track-search",
            WizardState::TagCuration => "tag-curation",
            WizardState::AlbumConfirm => "album-confirm",
            WizardState::AlbumSearchPrompt { .. } => "album-search",
            WizardState::SearchingAlbum { .. } => "searching-album",
            WizardState::AlbumSelectList { .. } => "album-select",
            WizardState::FetchingAlbumCover { .. } => "fetching-album-cover",
            WizardState::AlbumManualEntry { .. } => "album-manual-entry",
            WizardState::LoadingCoverFile { .. } => "loading-cover-file",
            WizardState::Committed => "committed",
            WizardState::Skipped => "skipped",
            WizardState::Quit => "quit",
        }
    }
}

/// Input to the wizard: collaborator results and user decisions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ExistingTags { title: String, artist: String },
    TrackFound(TrackInfo),
    TrackNotFound,
    AlbumsFound(Vec<AlbumCandidate>),
    CoverFetched(Option<CoverImage>),
    CoverFileLoaded(Option<CoverImage>),
    ServiceFailed(String),

    Yes,
    No,
    SearchTrack { title: String, artist: String },
    UpdateTrack { title: String, artist: String },
    ChooseTags(Vec<String>),
    SearchAlbum { query: String },
    UpdateAlbum { title: String },
    SelectAlbum(usize),
    ManualAlbum { album_artist: String, cover_path: PathBuf },
    Back,
    Skip,
    Quit,
}

/// What the driver must do before the next event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ReadExistingTags,
    LookupTrack { title: String, artist: String },
    FetchCover { url: String },
    SearchAlbum { query: String },
    LoadCoverFile { path: PathBuf },
    /// Show the current state and wait for a user event
    Prompt,
    Commit,
    Skip,
    Quit,
}
