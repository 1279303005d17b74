//! Per-file disambiguation wizard
//!
//! [`transition`] is a pure function over `(state, record, policy, event)`.
//! Anything that touches the network or the disk is returned as an
//! [`Effect`] and its outcome fed back in as the next [`Event`].

mod record;
mod state;
mod transition;

pub use record::{PlayCount, TrackRecord};
pub use state::{Effect, Event, ManualEntryError, PromptError, SearchReason, WizardState};
pub use transition::transition;

#[cfg(test)]
mod tests {
    use super::state::{LookupOrigin, MAX_ALBUM_CHOICES};
    use super::*;
    use crate::cover_art::CoverImage;
    use crate::lastfm::{AlbumCandidate, AlbumInfo, TrackInfo};
    use crate::tag_policy::TagPolicy;
    use std::path::PathBuf;

    struct Run {
        state: WizardState,
        record: TrackRecord,
        policy: TagPolicy,
        effect: Effect,
    }

    impl Run {
        fn new(file: &str, policy: TagPolicy) -> Self {
            Self {
                state: WizardState::Start,
                record: TrackRecord::new(PathBuf::from("/music").join(file)),
                policy,
                effect: Effect::ReadExistingTags,
            }
        }

        fn send(&mut self, event: Event) -> &mut Self {
            let next = transition(
                self.state.clone(),
                self.record.clone(),
                self.policy.clone(),
                event,
            );
            self.state = next.state;
            self.record = next.record;
            self.policy = next.policy;
            self.effect = next.effect;
            self
        }

        fn no_tags(&mut self) -> &mut Self {
            self.send(Event::ExistingTags {
                title: String::new(),
                artist: String::new(),
            })
        }
    }

    fn kansas(cover_url: &str) -> TrackInfo {
        TrackInfo {
            name: "Dust in the Wind".into(),
            artist: "Kansas".into(),
            play_count: 1_204_331,
            tags: ["classic rock", "70s", "seen live"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            album: Some(AlbumInfo {
                title: "Point of Know Return".into(),
                artist: "Kansas".into(),
                cover_url: cover_url.into(),
            }),
        }
    }

    fn candidate(name: &str, cover_url: &str) -> AlbumCandidate {
        AlbumCandidate {
            name: name.into(),
            artist: "Kansas".into(),
            cover_url: cover_url.into(),
        }
    }

    fn jpeg() -> CoverImage {
        CoverImage::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).unwrap()
    }

    /// Drive a run up to the album search prompt with a track that has no album
    fn at_album_search() -> Run {
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", TagPolicy::default());
        let mut info = kansas("");
        info.album = None;
        run.no_tags()
            .send(Event::TrackFound(info))
            .send(Event::Yes)
            .send(Event::ChooseTags(vec![]));
        assert_eq!(run.state, WizardState::AlbumSearchPrompt { error: None });
        run
    }

    #[test]
    fn test_existing_tags_skip_lookup() {
        let mut run = Run::new("track01.mp3", TagPolicy::default());
        run.send(Event::ExistingTags {
            title: "Carry On Wayward Son".into(),
            artist: "Kansas".into(),
        });

        assert_eq!(run.state, WizardState::TrackConfirm);
        assert_eq!(run.effect, Effect::Prompt);
        assert_eq!(run.record.play_count, PlayCount::Manual);
        assert_eq!(run.record.display_title(), "Carry On Wayward Son");

        // A manual candidate has nothing to curate and no album
        run.send(Event::Yes);
        assert_eq!(run.state, WizardState::TagCuration);
        assert!(run.record.tag_candidates.is_empty());
        assert!(!run.record.album_resolved);
    }

    #[test]
    fn test_half_filled_tags_fall_back_to_filename() {
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", TagPolicy::default());
        run.send(Event::ExistingTags {
            title: "Dust in the Wind".into(),
            artist: "  ".into(),
        });

        assert_eq!(
            run.effect,
            Effect::LookupTrack {
                title: "Dust in the Wind".into(),
                artist: "Kansas".into()
            }
        );
    }

    #[test]
    fn test_filename_guess_to_confirm() {
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", TagPolicy::default());
        run.no_tags();
        assert_eq!(
            run.state,
            WizardState::LookingUpTrack {
                origin: LookupOrigin::Filename
            }
        );

        run.send(Event::TrackFound(kansas("https://img.example/300.png")));
        assert_eq!(
            run.effect,
            Effect::FetchCover {
                url: "https://img.example/300.png".into()
            }
        );

        run.send(Event::CoverFetched(Some(jpeg())));
        assert_eq!(run.state, WizardState::TrackConfirm);
        assert_eq!(run.record.play_count, PlayCount::Plays(1_204_331));
        assert_eq!(run.record.display_artist(), "Kansas");
        assert!(run.record.album_resolved);
        assert!(run.record.cover.is_some());
    }

    #[test]
    fn test_missing_cover_is_not_fatal() {
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", TagPolicy::default());
        run.no_tags()
            .send(Event::TrackFound(kansas("https://img.example/broken")))
            .send(Event::CoverFetched(None))
            .send(Event::Yes)
            .send(Event::ChooseTags(vec![]))
            .send(Event::Yes);

        assert_eq!(run.state, WizardState::Committed);
        assert_eq!(run.effect, Effect::Commit);
        let fields = run.record.to_fields().unwrap();
        assert_eq!(fields.album.as_deref(), Some("Point of Know Return"));
        assert!(fields.cover.is_none());
    }

    #[test]
    fn test_unparsable_filename_prompts() {
        let mut run = Run::new("track01.mp3", TagPolicy::default());
        run.no_tags();

        assert_eq!(
            run.state,
            WizardState::TrackSearchPrompt {
                reason: SearchReason::UnparsableFilename,
                error: None
            }
        );
        assert!(run.record.title_guess.is_empty());
    }

    #[test]
    fn test_not_found_from_filename_then_from_search() {
        let mut run = Run::new("Dust in the Wind - Kansaz.mp3", TagPolicy::default());
        run.no_tags().send(Event::TrackNotFound);
        assert_eq!(
            run.state,
            WizardState::TrackSearchPrompt {
                reason: SearchReason::NotFound,
                error: None
            }
        );

        run.send(Event::SearchTrack {
            title: "Dust in the Wind".into(),
            artist: "Kansaz".into(),
        })
        .send(Event::TrackNotFound);
        assert_eq!(
            run.state,
            WizardState::TrackSearchPrompt {
                reason: SearchReason::NotFound,
                error: Some(PromptError::NotFound)
            }
        );
    }

    #[test]
    fn test_empty_search_fields_are_invalid() {
        let mut run = Run::new("track01.mp3", TagPolicy::default());
        run.no_tags().send(Event::SearchTrack {
            title: "Dust in the Wind".into(),
            artist: " ".into(),
        });
        assert_eq!(
            run.state,
            WizardState::TrackSearchPrompt {
                reason: SearchReason::UnparsableFilename,
                error: Some(PromptError::Invalid)
            }
        );
        assert_eq!(run.effect, Effect::Prompt);

        run.send(Event::UpdateTrack {
            title: String::new(),
            artist: "Kansas".into(),
        });
        assert_eq!(
            run.state,
            WizardState::TrackSearchPrompt {
                reason: SearchReason::UnparsableFilename,
                error: Some(PromptError::Invalid)
            }
        );
    }

    #[test]
    fn test_update_track_skips_confirmation() {
        let mut run = Run::new("track01.mp3", TagPolicy::default());
        run.no_tags().send(Event::UpdateTrack {
            title: " Song for America ".into(),
            artist: "Kansas".into(),
        });

        assert_eq!(run.state, WizardState::TagCuration);
        assert_eq!(run.record.resolved_title.as_deref(), Some("Song for America"));
        assert_eq!(run.record.play_count, PlayCount::Manual);
        assert!(!run.record.album_resolved);
    }

    #[test]
    fn test_rejection_seeds_next_search() {
        let mut run = Run::new("dust - kansas.mp3", TagPolicy::default());
        run.no_tags().send(Event::TrackFound(kansas(""))).send(Event::No);

        assert_eq!(
            run.state,
            WizardState::TrackSearchPrompt {
                reason: SearchReason::Rejected,
                error: None
            }
        );
        assert_eq!(run.record.title_guess, "Dust in the Wind");
        assert_eq!(run.record.artist_guess, "Kansas");
        assert!(!run.record.album_resolved);
    }

    #[test]
    fn test_unreachable_service_returns_to_prompt() {
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", TagPolicy::default());
        run.no_tags()
            .send(Event::ServiceFailed("connection refused".into()));
        assert_eq!(
            run.state,
            WizardState::TrackSearchPrompt {
                reason: SearchReason::LookupFailed,
                error: Some(PromptError::Unreachable("connection refused".into()))
            }
        );
        // The guess survives so the user can simply retry
        assert_eq!(run.record.title_guess, "Dust in the Wind");

        run.send(Event::SearchTrack {
            title: "Dust in the Wind".into(),
            artist: "Kansas".into(),
        })
        .send(Event::TrackFound(kansas("")));
        assert_eq!(run.state, WizardState::TrackConfirm);
    }

    #[test]
    fn test_tag_curation_respects_deny_and_learns() {
        let policy = TagPolicy::new(["70s"], ["seen live"]);
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", policy);
        run.no_tags().send(Event::TrackFound(kansas(""))).send(Event::Yes);

        let choices = run.policy.choices(&run.record.tag_candidates);
        let seen_live = choices.iter().find(|c| c.name == "seen live").unwrap();
        assert!(seen_live.locked);
        assert!(!seen_live.selected);
        assert!(choices.iter().find(|c| c.name == "70s").unwrap().selected);

        run.send(Event::ChooseTags(vec![
            "Classic Rock".into(),
            "seen live".into(),
            "not offered".into(),
        ]));

        let selected: Vec<&str> = run.record.selected_tags.iter().map(String::as_str).collect();
        assert_eq!(selected, ["classic rock"]);
        assert!(run.policy.auto_accept().contains("classic rock"));
        assert!(run.policy.auto_accept().contains("70s"));
        assert!(!run.policy.auto_accept().contains("seen live"));
        assert_eq!(run.state, WizardState::AlbumConfirm);
    }

    #[test]
    fn test_album_rejection_clears_album() {
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", TagPolicy::default());
        run.no_tags()
            .send(Event::TrackFound(kansas("")))
            .send(Event::Yes)
            .send(Event::ChooseTags(vec![]))
            .send(Event::No);

        assert_eq!(run.state, WizardState::AlbumSearchPrompt { error: None });
        assert!(run.record.album_title.is_none());
        assert!(!run.record.album_resolved);
    }

    #[test]
    fn test_empty_album_results_reprompt_not_found() {
        let mut run = at_album_search();
        run.send(Event::SearchAlbum {
            query: "xyzzznotreal".into(),
        });
        assert_eq!(
            run.effect,
            Effect::SearchAlbum {
                query: "xyzzznotreal".into()
            }
        );

        run.send(Event::AlbumsFound(vec![]));
        assert_eq!(
            run.state,
            WizardState::AlbumSearchPrompt {
                error: Some(PromptError::NotFound)
            }
        );
        assert_eq!(run.effect, Effect::Prompt);
    }

    #[test]
    fn test_empty_album_query_is_invalid() {
        let mut run = at_album_search();
        run.send(Event::SearchAlbum { query: "   ".into() });
        assert_eq!(
            run.state,
            WizardState::AlbumSearchPrompt {
                error: Some(PromptError::Invalid)
            }
        );
    }

    #[test]
    fn test_album_list_is_capped_and_selectable() {
        let mut run = at_album_search();
        let hits: Vec<AlbumCandidate> = (0..8)
            .map(|i| candidate(&format!("Album {}", i), ""))
            .collect();
        run.send(Event::SearchAlbum { query: "kansas".into() })
            .send(Event::AlbumsFound(hits));

        match &run.state {
            WizardState::AlbumSelectList { candidates, selected } => {
                assert_eq!(candidates.len(), MAX_ALBUM_CHOICES);
                assert_eq!(*selected, 0);
            }
            other => panic!("unexpected state {:?}", other),
        }

        // Out of range leaves the list in place
        let before = run.state.clone();
        run.send(Event::SelectAlbum(7));
        assert_eq!(run.state, before);

        run.send(Event::SelectAlbum(2));
        assert_eq!(run.state, WizardState::Committed);
        assert_eq!(run.record.album_title.as_deref(), Some("Album 2"));
        assert!(run.record.cover.is_none());
    }

    #[test]
    fn test_album_selection_fetches_cover_then_commits() {
        let mut run = at_album_search();
        run.send(Event::SearchAlbum { query: "point of know".into() })
            .send(Event::AlbumsFound(vec![candidate(
                "Point of Know Return",
                "https://img.example/pokr.jpg",
            )]))
            .send(Event::SelectAlbum(0));
        assert_eq!(
            run.effect,
            Effect::FetchCover {
                url: "https://img.example/pokr.jpg".into()
            }
        );

        run.send(Event::CoverFetched(Some(jpeg())));
        assert_eq!(run.state, WizardState::Committed);
        assert!(run.record.cover.is_some());
    }

    #[test]
    fn test_album_select_back() {
        let mut run = at_album_search();
        run.send(Event::SearchAlbum { query: "kansas".into() })
            .send(Event::AlbumsFound(vec![candidate("Leftoverture", "")]))
            .send(Event::Back);
        assert_eq!(run.state, WizardState::AlbumSearchPrompt { error: None });
    }

    #[test]
    fn test_album_search_unreachable() {
        let mut run = at_album_search();
        run.send(Event::SearchAlbum { query: "kansas".into() })
            .send(Event::ServiceFailed("timed out".into()));
        assert_eq!(
            run.state,
            WizardState::AlbumSearchPrompt {
                error: Some(PromptError::Unreachable("timed out".into()))
            }
        );
    }

    #[test]
    fn test_manual_entry_errors_are_exclusive() {
        let mut run = at_album_search();
        run.send(Event::UpdateAlbum {
            title: "Bootleg Live".into(),
        });
        assert_eq!(run.state, WizardState::AlbumManualEntry { error: None });
        assert_eq!(run.record.album_title.as_deref(), Some("Bootleg Live"));

        run.send(Event::ManualAlbum {
            album_artist: String::new(),
            cover_path: PathBuf::from("/covers/front.jpg"),
        });
        assert_eq!(
            run.state,
            WizardState::AlbumManualEntry {
                error: Some(ManualEntryError::Invalid)
            }
        );

        run.send(Event::ManualAlbum {
            album_artist: "Kansas".into(),
            cover_path: PathBuf::from("/covers/missing.jpg"),
        });
        assert_eq!(
            run.effect,
            Effect::LoadCoverFile {
                path: PathBuf::from("/covers/missing.jpg")
            }
        );

        run.send(Event::CoverFileLoaded(None));
        assert_eq!(
            run.state,
            WizardState::AlbumManualEntry {
                error: Some(ManualEntryError::InvalidPath)
            }
        );

        run.send(Event::ManualAlbum {
            album_artist: "Kansas".into(),
            cover_path: PathBuf::from("/covers/front.jpg"),
        })
        .send(Event::CoverFileLoaded(Some(jpeg())));
        assert_eq!(run.state, WizardState::Committed);

        let fields = run.record.to_fields().unwrap();
        assert_eq!(fields.album.as_deref(), Some("Bootleg Live"));
        assert_eq!(fields.album_artist.as_deref(), Some("Kansas"));
        assert!(fields.cover.is_some());
    }

    #[test]
    fn test_manual_entry_back() {
        let mut run = at_album_search();
        run.send(Event::UpdateAlbum { title: "Bootleg".into() })
            .send(Event::Back);
        assert_eq!(run.state, WizardState::AlbumSearchPrompt { error: None });
        assert!(run.record.album_title.is_none());
    }

    #[test]
    fn test_skip_and_quit_from_any_state() {
        let mut run = Run::new("Dust in the Wind - Kansas.mp3", TagPolicy::default());
        run.no_tags().send(Event::TrackFound(kansas(""))).send(Event::Skip);
        assert_eq!(run.state, WizardState::Skipped);
        assert_eq!(run.effect, Effect::Skip);

        let mut run = at_album_search();
        run.send(Event::Quit);
        assert_eq!(run.state, WizardState::Quit);

        // Terminal states ignore further input
        run.send(Event::Yes);
        assert_eq!(run.state, WizardState::Quit);
        assert_eq!(run.effect, Effect::Quit);
    }

    #[test]
    fn test_unexpected_event_resumes_pending_call() {
        let mut run = at_album_search();
        run.send(Event::SearchAlbum { query: "kansas".into() })
            .send(Event::Yes);
        assert_eq!(
            run.state,
            WizardState::SearchingAlbum {
                query: "kansas".into()
            }
        );
        assert_eq!(
            run.effect,
            Effect::SearchAlbum {
                query: "kansas".into()
            }
        );
    }
}
