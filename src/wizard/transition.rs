use super::record::TrackRecord;
use super::state::{
    Effect, Event, LookupOrigin, ManualEntryError, PromptError, SearchReason, WizardState,
    MAX_ALBUM_CHOICES,
};
use crate::normalize::{guess_from_filename, non_empty};
use crate::lastfm::AlbumCandidate;
use crate::tag_policy::TagPolicy;
use std::path::PathBuf;

/// Result of feeding one event to the wizard
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: WizardState,
    pub record: TrackRecord,
    pub policy: TagPolicy,
    pub effect: Effect,
}

impl Transition {
    fn new(state: WizardState, record: TrackRecord, policy: TagPolicy, effect: Effect) -> Self {
        Self { state, record, policy, effect }
    }

    fn prompt(state: WizardState, record: TrackRecord, policy: TagPolicy) -> Self {
        Self::new(state, record, policy, Effect::Prompt)
    }
}

/// Advance the wizard by one event
///
/// Pure: every side effect is described by the returned [`Effect`] and
/// performed by the caller, whose result comes back as the next event.
/// Events that make no sense in the current state leave it unchanged.
pub fn transition(state: WizardState, record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    if state.is_terminal() {
        log::warn!("event {:?} after terminal state {}", event, state.name());
        let effect = resume_effect(&state, &record);
        return Transition::new(state, record, policy, effect);
    }

    match event {
        Event::Skip => return Transition::new(WizardState::Skipped, record, policy, Effect::Skip),
        Event::Quit => return Transition::new(WizardState::Quit, record, policy, Effect::Quit),
        _ => {}
    }

    match state {
        WizardState::Start => on_start(record, policy, event),
        WizardState::LookingUpTrack { origin } => on_track_lookup(origin, record, policy, event),
        WizardState::FetchingTrackCover { url } => match event {
            Event::CoverFetched(cover) => {
                let mut record = record;
                record.cover = cover;
                Transition::prompt(WizardState::TrackConfirm, record, policy)
            }
            other => unchanged(WizardState::FetchingTrackCover { url }, record, policy, other),
        },
        WizardState::TrackConfirm => on_track_confirm(record, policy, event),
        WizardState::TrackSearchPrompt { reason, error } => {
            on_track_search(reason, error, record, policy, event)
        }
        WizardState::TagCuration => on_tag_curation(record, policy, event),
        WizardState::AlbumConfirm => on_album_confirm(record, policy, event),
        WizardState::AlbumSearchPrompt { error } => on_album_search(error, record, policy, event),
        WizardState::SearchingAlbum { query } => on_album_results(query, record, policy, event),
        WizardState::AlbumSelectList { candidates, selected } => {
            on_album_select(candidates, selected, record, policy, event)
        }
        WizardState::FetchingAlbumCover { url } => match event {
            Event::CoverFetched(cover) => {
                let mut record = record;
                record.cover = cover;
                commit(record, policy)
            }
            other => unchanged(WizardState::FetchingAlbumCover { url }, record, policy, other),
        },
        WizardState::AlbumManualEntry { error } => on_manual_entry(error, record, policy, event),
        WizardState::LoadingCoverFile { album_artist, path } => {
            on_cover_file(album_artist, path, record, policy, event)
        }
        WizardState::Committed | WizardState::Skipped | WizardState::Quit => {
            unreachable!("terminal states handled above")
        }
    }
}

fn unchanged(state: WizardState, record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    log::warn!("ignoring {:?} in state {}", event, state.name());
    let effect = resume_effect(&state, &record);
    Transition::new(state, record, policy, effect)
}

/// Effect that resumes a state after an ignored event
fn resume_effect(state: &WizardState, record: &TrackRecord) -> Effect {
    match state {
        WizardState::Start => Effect::ReadExistingTags,
        WizardState::LookingUpTrack { .. } => Effect::LookupTrack {
            title: record.title_guess.clone(),
            artist: record.artist_guess.clone(),
        },
        WizardState::FetchingTrackCover { url } | WizardState::FetchingAlbumCover { url } => {
            Effect::FetchCover { url: url.clone() }
        }
        WizardState::SearchingAlbum { query } => Effect::SearchAlbum { query: query.clone() },
        WizardState::LoadingCoverFile { path, .. } => Effect::LoadCoverFile { path: path.clone() },
        WizardState::Committed => Effect::Commit,
        WizardState::Skipped => Effect::Skip,
        WizardState::Quit => Effect::Quit,
        _ => Effect::Prompt,
    }
}

fn commit(record: TrackRecord, policy: TagPolicy) -> Transition {
    Transition::new(WizardState::Committed, record, policy, Effect::Commit)
}

fn lookup(origin: LookupOrigin, record: TrackRecord, policy: TagPolicy) -> Transition {
    let effect = Effect::LookupTrack {
        title: record.title_guess.clone(),
        artist: record.artist_guess.clone(),
    };
    Transition::new(WizardState::LookingUpTrack { origin }, record, policy, effect)
}

fn track_search(reason: SearchReason, error: Option<PromptError>, record: TrackRecord, policy: TagPolicy) -> Transition {
    Transition::prompt(WizardState::TrackSearchPrompt { reason, error }, record, policy)
}

fn album_search(error: Option<PromptError>, record: TrackRecord, policy: TagPolicy) -> Transition {
    Transition::prompt(WizardState::AlbumSearchPrompt { error }, record, policy)
}

fn after_tags(record: TrackRecord, policy: TagPolicy) -> Transition {
    if record.album_resolved {
        Transition::prompt(WizardState::AlbumConfirm, record, policy)
    } else {
        album_search(None, record, policy)
    }
}

fn on_start(mut record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    let (title, artist) = match event {
        Event::ExistingTags { title, artist } => (title, artist),
        other => return unchanged(WizardState::Start, record, policy, other),
    };

    // Existing tags win over the filename and skip the service entirely
    if let (Some(title), Some(artist)) = (non_empty(&title), non_empty(&artist)) {
        log::info!("{}: using existing tags '{}' by '{}'", record.file_name(), title, artist);
        record.set_guess(title.clone(), artist.clone());
        record.accept_manual(title, artist);
        return Transition::prompt(WizardState::TrackConfirm, record, policy);
    }

    match guess_from_filename(&record.file_name()) {
        Some((title, artist)) => {
            record.set_guess(title, artist);
            lookup(LookupOrigin::Filename, record, policy)
        }
        None => {
            log::info!("{}: filename is not 'Title - Artist'", record.file_name());
            track_search(SearchReason::UnparsableFilename, None, record, policy)
        }
    }
}

fn on_track_lookup(origin: LookupOrigin, mut record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    match event {
        Event::TrackFound(info) => {
            let cover_url = info
                .album
                .as_ref()
                .map(|album| album.cover_url.trim().to_string())
                .unwrap_or_default();
            record.accept_track_match(info);

            if cover_url.is_empty() {
                Transition::prompt(WizardState::TrackConfirm, record, policy)
            } else {
                Transition::new(
                    WizardState::FetchingTrackCover { url: cover_url.clone() },
                    record,
                    policy,
                    Effect::FetchCover { url: cover_url },
                )
            }
        }
        Event::TrackNotFound => match origin {
            LookupOrigin::Filename => track_search(SearchReason::NotFound, None, record, policy),
            LookupOrigin::Prompt(_) => {
                track_search(SearchReason::NotFound, Some(PromptError::NotFound), record, policy)
            }
        },
        Event::ServiceFailed(message) => {
            let reason = match origin {
                LookupOrigin::Filename => SearchReason::LookupFailed,
                LookupOrigin::Prompt(reason) => reason,
            };
            track_search(reason, Some(PromptError::Unreachable(message)), record, policy)
        }
        other => unchanged(WizardState::LookingUpTrack { origin }, record, policy, other),
    }
}

fn on_track_confirm(mut record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    match event {
        Event::Yes => Transition::prompt(WizardState::TagCuration, record, policy),
        Event::No => {
            record.reject_candidate();
            track_search(SearchReason::Rejected, None, record, policy)
        }
        other => unchanged(WizardState::TrackConfirm, record, policy, other),
    }
}

fn on_track_search(
    reason: SearchReason,
    error: Option<PromptError>,
    mut record: TrackRecord,
    policy: TagPolicy,
    event: Event,
) -> Transition {
    match event {
        Event::SearchTrack { title, artist } => match (non_empty(&title), non_empty(&artist)) {
            (Some(title), Some(artist)) => {
                record.set_guess(title, artist);
                lookup(LookupOrigin::Prompt(reason), record, policy)
            }
            _ => track_search(reason, Some(PromptError::Invalid), record, policy),
        },
        Event::UpdateTrack { title, artist } => match (non_empty(&title), non_empty(&artist)) {
            (Some(title), Some(artist)) => {
                record.set_guess(title.clone(), artist.clone());
                record.accept_manual(title, artist);
                Transition::prompt(WizardState::TagCuration, record, policy)
            }
            _ => track_search(reason, Some(PromptError::Invalid), record, policy),
        },
        other => unchanged(WizardState::TrackSearchPrompt { reason, error }, record, policy, other),
    }
}

fn on_tag_curation(mut record: TrackRecord, mut policy: TagPolicy, event: Event) -> Transition {
    match event {
        Event::ChooseTags(chosen) => {
            record.selected_tags = policy.filter_selection(&record.tag_candidates, &chosen);
            policy.learn(&record.selected_tags);
            after_tags(record, policy)
        }
        other => unchanged(WizardState::TagCuration, record, policy, other),
    }
}

fn on_album_confirm(mut record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    match event {
        Event::Yes => commit(record, policy),
        Event::No => {
            record.clear_album();
            album_search(None, record, policy)
        }
        other => unchanged(WizardState::AlbumConfirm, record, policy, other),
    }
}

fn on_album_search(error: Option<PromptError>, mut record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    match event {
        Event::SearchAlbum { query } => match non_empty(&query) {
            Some(query) => Transition::new(
                WizardState::SearchingAlbum { query: query.clone() },
                record,
                policy,
                Effect::SearchAlbum { query },
            ),
            None => album_search(Some(PromptError::Invalid), record, policy),
        },
        Event::UpdateAlbum { title } => match non_empty(&title) {
            Some(title) => {
                record.clear_album();
                record.album_title = Some(title);
                Transition::prompt(WizardState::AlbumManualEntry { error: None }, record, policy)
            }
            None => album_search(Some(PromptError::Invalid), record, policy),
        },
        other => unchanged(WizardState::AlbumSearchPrompt { error }, record, policy, other),
    }
}

fn on_album_results(query: String, record: TrackRecord, policy: TagPolicy, event: Event) -> Transition {
    match event {
        Event::AlbumsFound(mut candidates) => {
            if candidates.is_empty() {
                return album_search(Some(PromptError::NotFound), record, policy);
            }
            candidates.truncate(MAX_ALBUM_CHOICES);
            Transition::prompt(
                WizardState::AlbumSelectList { candidates, selected: 0 },
                record,
                policy,
            )
        }
        Event::ServiceFailed(message) => {
            album_search(Some(PromptError::Unreachable(message)), record, policy)
        }
        other => unchanged(WizardState::SearchingAlbum { query }, record, policy, other),
    }
}

fn on_album_select(
    candidates: Vec<AlbumCandidate>,
    selected: usize,
    mut record: TrackRecord,
    policy: TagPolicy,
    event: Event,
) -> Transition {
    match event {
        Event::SelectAlbum(index) if index < candidates.len() => {
            let choice = candidates[index].clone();
            record.clear_album();
            record.album_resolved = true;
            record.album_title = Some(choice.name);
            record.album_artist = Some(choice.artist);

            let url = choice.cover_url.trim().to_string();
            if url.is_empty() {
                commit(record, policy)
            } else {
                Transition::new(
                    WizardState::FetchingAlbumCover { url: url.clone() },
                    record,
                    policy,
                    Effect::FetchCover { url },
                )
            }
        }
        Event::Back => album_search(None, record, policy),
        other => unchanged(WizardState::AlbumSelectList { candidates, selected }, record, policy, other),
    }
}

fn on_manual_entry(
    error: Option<ManualEntryError>,
    mut record: TrackRecord,
    policy: TagPolicy,
    event: Event,
) -> Transition {
    match event {
        Event::ManualAlbum { album_artist, cover_path } => {
            let cover_path = non_empty(&cover_path.to_string_lossy()).map(PathBuf::from);
            match (non_empty(&album_artist), cover_path) {
                (Some(album_artist), Some(path)) => Transition::new(
                    WizardState::LoadingCoverFile { album_artist, path: path.clone() },
                    record,
                    policy,
                    Effect::LoadCoverFile { path },
                ),
                _ => Transition::prompt(
                    WizardState::AlbumManualEntry { error: Some(ManualEntryError::Invalid) },
                    record,
                    policy,
                ),
            }
        }
        Event::Back => {
            record.clear_album();
            album_search(None, record, policy)
        }
        other => unchanged(WizardState::AlbumManualEntry { error }, record, policy, other),
    }
}

fn on_cover_file(
    album_artist: String,
    path: PathBuf,
    mut record: TrackRecord,
    policy: TagPolicy,
    event: Event,
) -> Transition {
    match event {
        Event::CoverFileLoaded(Some(cover)) => {
            record.album_artist = Some(album_artist);
            record.cover = Some(cover);
            commit(record, policy)
        }
        Event::CoverFileLoaded(None) => Transition::prompt(
            WizardState::AlbumManualEntry { error: Some(ManualEntryError::InvalidPath) },
            record,
            policy,
        ),
        other => unchanged(WizardState::LoadingCoverFile { album_artist, path }, record, policy, other),
    }
}
