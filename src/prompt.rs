//! Terminal front end for the wizard
//!
//! The prompter only renders a state and turns the answer into an
//! [`Event`]; every decision about what happens next stays in the wizard.
//! Widgets come from `dialoguer`. The text shown around them and the
//! mapping from answers to events are plain functions.

use crate::batch::BatchSummary;
use crate::lastfm::AlbumCandidate;
use crate::tag_policy::{TagChoice, TagPolicy};
use crate::wizard::{
    Event, ManualEntryError, PlayCount, PromptError, SearchReason, TrackRecord, WizardState,
};
use anyhow::Result;
use dialoguer::console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use std::path::PathBuf;

/// What the user is looking at when asked for a decision
pub struct PromptContext<'a> {
    /// 1-based position of the file in the batch
    pub position: usize,
    pub total: usize,
    pub state: &'a WizardState,
    pub record: &'a TrackRecord,
    pub policy: &'a TagPolicy,
}

pub trait Prompter {
    /// Ask for the next user decision in `ctx.state`
    fn prompt(&mut self, ctx: &PromptContext<'_>) -> Result<Event>;

    /// Called once when the batch ends
    fn finished(&mut self, summary: &BatchSummary) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Search,
    Update,
    Continue,
    Back,
    Skip,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Search => "Search Last.fm",
            Action::Update => "Use as entered",
            Action::Continue => "Continue",
            Action::Back => "Back to album search",
            Action::Skip => "Skip this file",
            Action::Quit => "Quit",
        }
    }

    /// Skip and quit mean the same thing on every screen
    fn leave_event(self) -> Option<Event> {
        match self {
            Action::Skip => Some(Event::Skip),
            Action::Quit => Some(Event::Quit),
            _ => None,
        }
    }
}

const SEARCH_ACTIONS: [Action; 4] = [Action::Search, Action::Update, Action::Skip, Action::Quit];
const MANUAL_ACTIONS: [Action; 4] = [Action::Continue, Action::Back, Action::Skip, Action::Quit];
const LEAVE_ACTIONS: [Action; 2] = [Action::Skip, Action::Quit];

fn search_event(action: Action, first: String, second: String) -> Option<Event> {
    match action {
        Action::Search => Some(Event::SearchTrack {
            title: first,
            artist: second,
        }),
        Action::Update => Some(Event::UpdateTrack {
            title: first,
            artist: second,
        }),
        other => other.leave_event(),
    }
}

fn album_search_event(action: Action, text: String) -> Option<Event> {
    match action {
        Action::Search => Some(Event::SearchAlbum { query: text }),
        Action::Update => Some(Event::UpdateAlbum { title: text }),
        other => other.leave_event(),
    }
}

fn manual_event(action: Action, album_artist: String, cover_path: &str) -> Option<Event> {
    match action {
        Action::Continue => Some(Event::ManualAlbum {
            album_artist,
            cover_path: PathBuf::from(cover_path.trim()),
        }),
        Action::Back => Some(Event::Back),
        other => other.leave_event(),
    }
}

fn track_summary(record: &TrackRecord) -> Vec<String> {
    let source = match record.play_count {
        PlayCount::Plays(plays) => format!("with {} plays", plays),
        PlayCount::Manual => "existing title and artist".to_string(),
        PlayCount::Unknown => "play count unknown".to_string(),
    };
    let mut lines = vec![format!(
        "Found '{}' by '{}' ({})",
        record.display_title(),
        record.display_artist(),
        source
    )];
    if let (Some(album), Some(album_artist)) = (&record.album_title, &record.album_artist) {
        lines.push(format!("  on '{}' by '{}'", album, album_artist));
    }
    if record.cover.is_some() {
        lines.push("  cover art found".to_string());
    }
    lines
}

fn search_intro(reason: &SearchReason) -> &'static str {
    match reason {
        SearchReason::UnparsableFilename => {
            "Could not read 'Title - Artist' from the filename. Enter the title and artist."
        }
        SearchReason::NotFound => "Track not found on Last.fm. Correct the title and artist.",
        SearchReason::Rejected => "Enter the correct title and artist.",
        SearchReason::LookupFailed => "Automatic lookup failed. Check the title and artist.",
    }
}

fn prompt_error_line(error: &Option<PromptError>, invalid: &str) -> Option<String> {
    match error {
        Some(PromptError::Invalid) => Some(format!("! Invalid: {}", invalid)),
        Some(PromptError::NotFound) => Some("! Not found, try again.".to_string()),
        Some(PromptError::Unreachable(message)) => Some(format!(
            "! Last.fm could not be reached ({}). Try again.",
            message
        )),
        None => None,
    }
}

fn manual_error_line(error: &Option<ManualEntryError>) -> Option<&'static str> {
    match error {
        Some(ManualEntryError::Invalid) => {
            Some("! Invalid: album artist and cover path are both required.")
        }
        Some(ManualEntryError::InvalidPath) => Some("! Invalid path: no cover image file there."),
        None => None,
    }
}

/// Checklist rows for tag curation. Denied tags are never selectable and
/// are only listed.
#[derive(Debug, PartialEq, Eq)]
struct TagMenu {
    names: Vec<String>,
    checked: Vec<bool>,
    denied: Vec<String>,
}

impl TagMenu {
    fn new(choices: Vec<TagChoice>) -> Self {
        let mut menu = TagMenu {
            names: Vec::new(),
            checked: Vec::new(),
            denied: Vec::new(),
        };
        for choice in choices {
            if choice.locked {
                menu.denied.push(choice.name);
            } else {
                menu.checked.push(choice.selected);
                menu.names.push(choice.name);
            }
        }
        menu
    }

    fn chosen(&self, picked: &[usize]) -> Vec<String> {
        picked
            .iter()
            .filter_map(|&i| self.names.get(i).cloned())
            .collect()
    }
}

/// Album rows followed by the back, skip and quit entries
fn album_items(candidates: &[AlbumCandidate]) -> Vec<String> {
    candidates
        .iter()
        .map(|album| format!("{} by {}", album.name, album.artist))
        .chain([Action::Back, Action::Skip, Action::Quit].map(|a| a.label().to_string()))
        .collect()
}

fn album_select_event(index: usize, candidate_count: usize) -> Event {
    match index.checked_sub(candidate_count) {
        None => Event::SelectAlbum(index),
        Some(0) => Event::Back,
        Some(1) => Event::Skip,
        Some(_) => Event::Quit,
    }
}

fn summary_lines(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Done: {} written, {} skipped, {} failed",
        summary.committed.len(),
        summary.skipped.len(),
        summary.failed.len()
    )];
    for (path, reason) in &summary.failed {
        lines.push(format!("  failed {}: {}", path.display(), reason));
    }
    if summary.stopped_early {
        lines.push("Stopped before the end of the directory.".to_string());
    }
    lines
}

/// Interactive prompter on the controlling terminal
pub struct TerminalPrompter {
    term: Term,
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Result<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            anyhow::bail!("track-tagger needs an interactive terminal");
        }
        Ok(Self {
            term,
            theme: ColorfulTheme::default(),
        })
    }

    fn say(&self, line: &str) -> Result<()> {
        self.term.write_line(line)?;
        Ok(())
    }

    /// Editable text field starting from `initial`
    fn field(&self, label: &str, initial: &str) -> Result<String> {
        let value: String = Input::with_theme(&self.theme)
            .with_prompt(label)
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text_on(&self.term)?;
        Ok(value.trim().to_string())
    }

    /// `None` when the menu is dismissed with Esc
    fn action(&self, actions: &[Action]) -> Result<Option<Action>> {
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let picked = Select::with_theme(&self.theme)
            .with_prompt("Next")
            .items(&labels)
            .default(0)
            .interact_on_opt(&self.term)?;
        Ok(picked.map(|i| actions[i]))
    }

    fn leave(&self) -> Result<Option<Event>> {
        Ok(self.action(&LEAVE_ACTIONS)?.and_then(Action::leave_event))
    }

    /// Yes or no; Esc offers skip and quit
    fn confirm(&self, question: &str) -> Result<Option<Event>> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(true)
            .interact_on_opt(&self.term)?;
        match answer {
            Some(true) => Ok(Some(Event::Yes)),
            Some(false) => Ok(Some(Event::No)),
            None => self.leave(),
        }
    }

    fn track_confirm(&self, record: &TrackRecord) -> Result<Option<Event>> {
        for line in track_summary(record) {
            self.say(&line)?;
        }
        self.confirm("Is this the right track?")
    }

    fn track_search(
        &self,
        reason: &SearchReason,
        error: &Option<PromptError>,
        record: &TrackRecord,
    ) -> Result<Option<Event>> {
        self.say(search_intro(reason))?;
        if let Some(line) = prompt_error_line(error, "title and artist are both required.") {
            self.say(&line)?;
        }

        let title = self.field("Title", &record.title_guess)?;
        let artist = self.field("Artist", &record.artist_guess)?;
        Ok(self
            .action(&SEARCH_ACTIONS)?
            .and_then(|action| search_event(action, title, artist)))
    }

    fn tag_curation(&self, record: &TrackRecord, policy: &TagPolicy) -> Result<Option<Event>> {
        let menu = TagMenu::new(policy.choices(&record.tag_candidates));
        if !menu.denied.is_empty() {
            self.say(&format!("Denied tags, never written: {}", menu.denied.join(", ")))?;
        }
        if menu.names.is_empty() {
            return Ok(Some(Event::ChooseTags(Vec::new())));
        }

        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt("Tags to write (space toggles, enter confirms)")
            .items(&menu.names)
            .defaults(&menu.checked)
            .interact_on_opt(&self.term)?;
        match picked {
            Some(picked) => Ok(Some(Event::ChooseTags(menu.chosen(&picked)))),
            None => self.leave(),
        }
    }

    fn album_confirm(&self, record: &TrackRecord) -> Result<Option<Event>> {
        self.say(&format!(
            "Album '{}' by '{}'",
            record.album_title.as_deref().unwrap_or_default(),
            record.album_artist.as_deref().unwrap_or_default()
        ))?;
        self.confirm("Use this album?")
    }

    fn album_search(&self, error: &Option<PromptError>, record: &TrackRecord) -> Result<Option<Event>> {
        self.say(&format!("Which album is '{}' on?", record.display_title()))?;
        if let Some(line) = prompt_error_line(error, "enter an album title.") {
            self.say(&line)?;
        }

        let text = self.field("Album", "")?;
        Ok(self
            .action(&SEARCH_ACTIONS)?
            .and_then(|action| album_search_event(action, text)))
    }

    fn album_select(&self, candidates: &[AlbumCandidate], selected: usize) -> Result<Option<Event>> {
        let picked = Select::with_theme(&self.theme)
            .with_prompt("Albums found")
            .items(&album_items(candidates))
            .default(selected)
            .interact_on_opt(&self.term)?;
        match picked {
            Some(index) => Ok(Some(album_select_event(index, candidates.len()))),
            None => self.leave(),
        }
    }

    fn album_manual(&self, error: &Option<ManualEntryError>, record: &TrackRecord) -> Result<Option<Event>> {
        self.say(&format!(
            "Album '{}': enter the album artist and a cover image file.",
            record.album_title.as_deref().unwrap_or_default()
        ))?;
        if let Some(line) = manual_error_line(error) {
            self.say(line)?;
        }

        let default_artist = record
            .album_artist
            .clone()
            .unwrap_or_else(|| record.display_artist().to_string());
        let album_artist = self.field("Album artist", &default_artist)?;
        let cover_path = self.field("Cover image path", "")?;
        Ok(self
            .action(&MANUAL_ACTIONS)?
            .and_then(|action| manual_event(action, album_artist, &cover_path)))
    }

    fn ask(&self, ctx: &PromptContext<'_>) -> Result<Option<Event>> {
        match ctx.state {
            WizardState::TrackConfirm => self.track_confirm(ctx.record),
            WizardState::TrackSearchPrompt { reason, error } => {
                self.track_search(reason, error, ctx.record)
            }
            WizardState::TagCuration => self.tag_curation(ctx.record, ctx.policy),
            WizardState::AlbumConfirm => self.album_confirm(ctx.record),
            WizardState::AlbumSearchPrompt { error } => self.album_search(error, ctx.record),
            WizardState::AlbumSelectList { candidates, selected } => {
                self.album_select(candidates, *selected)
            }
            WizardState::AlbumManualEntry { error } => self.album_manual(error, ctx.record),
            other => anyhow::bail!("nothing to ask in state {}", other.name()),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn prompt(&mut self, ctx: &PromptContext<'_>) -> Result<Event> {
        self.say("")?;
        self.say(&format!(
            "[{}/{}] {}",
            ctx.position,
            ctx.total,
            ctx.record.file_name()
        ))?;

        // A dismissed menu shows the same screen again
        loop {
            if let Some(event) = self.ask(ctx)? {
                return Ok(event);
            }
        }
    }

    fn finished(&mut self, summary: &BatchSummary) -> Result<()> {
        self.say("")?;
        for line in summary_lines(summary) {
            self.say(&line)?;
        }
        self.term.flush()?;
        Ok(())
    }
}
