use crate::catalog::CatalogEntry;
use crate::cover_art::load_cover_file;
use crate::file_rename::{apply_rename, plan_rename};
use crate::lastfm::MetadataLookup;
use crate::prompt::{PromptContext, Prompter};
use crate::tag_policy::TagPolicy;
use crate::tags::TagStore;
use crate::wizard::{transition, Effect, Event, TrackRecord, WizardState};
use anyhow::Result;
use std::path::PathBuf;

/// Files of one run with a cursor that only moves forward
#[derive(Debug, Clone)]
pub struct FileQueue {
    entries: Vec<CatalogEntry>,
    cursor: usize,
}

impl FileQueue {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&CatalogEntry> {
        self.entries.get(self.cursor)
    }

    pub fn advance(&mut self) {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Tags written and file renamed to this path
    Committed(PathBuf),
    Skipped,
    Failed(String),
    Quit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub committed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    /// The user quit before the queue was exhausted
    pub stopped_early: bool,
    /// Tags added to the accept set during the run
    pub learned_tags: Vec<String>,
}

/// Runs the wizard over every queued file, one at a time
pub struct BatchDriver<L, S, P> {
    lookup: L,
    store: S,
    prompter: P,
}

impl<L: MetadataLookup, S: TagStore, P: Prompter> BatchDriver<L, S, P> {
    pub fn new(lookup: L, store: S, prompter: P) -> Self {
        Self {
            lookup,
            store,
            prompter,
        }
    }

    pub async fn run(&mut self, mut queue: FileQueue, mut policy: TagPolicy) -> Result<BatchSummary> {
        let initial_accept = policy.auto_accept().clone();
        let total = queue.len();
        let mut summary = BatchSummary::default();

        while let Some(entry) = queue.current().cloned() {
            let position = queue.cursor() + 1;
            log::info!("[{}/{}] {}", position, total, entry.name);

            let (outcome, next_policy) = self.process_file(&entry, position, total, policy).await?;
            policy = next_policy;

            match outcome {
                FileOutcome::Committed(new_path) => summary.committed.push(new_path),
                FileOutcome::Skipped => {
                    log::info!("skipped {}", entry.name);
                    summary.skipped.push(entry.path);
                }
                FileOutcome::Failed(reason) => {
                    log::error!("{}: {}", entry.name, reason);
                    summary.failed.push((entry.path, reason));
                }
                FileOutcome::Quit => {
                    log::info!("quit at {}", entry.name);
                    summary.stopped_early = true;
                    break;
                }
            }
            queue.advance();
        }

        summary.learned_tags = policy
            .auto_accept()
            .difference(&initial_accept)
            .cloned()
            .collect();

        self.prompter.finished(&summary)?;
        Ok(summary)
    }

    /// Drive one file's wizard to a terminal state, performing each effect
    async fn process_file(
        &mut self,
        entry: &CatalogEntry,
        position: usize,
        total: usize,
        policy: TagPolicy,
    ) -> Result<(FileOutcome, TagPolicy)> {
        let mut state = WizardState::Start;
        let mut record = TrackRecord::new(entry.path.clone());
        let mut policy = policy;
        let mut effect = Effect::ReadExistingTags;

        loop {
            let event = match effect {
                Effect::ReadExistingTags => {
                    let (title, artist) = match self.store.read_title_artist(&entry.path) {
                        Ok(pair) => pair,
                        Err(e) => {
                            log::warn!("could not read tags of {}: {}", entry.name, e);
                            (String::new(), String::new())
                        }
                    };
                    Event::ExistingTags { title, artist }
                }
                Effect::LookupTrack { title, artist } => {
                    match self.lookup.lookup_track(&title, &artist).await {
                        Ok(Some(info)) => Event::TrackFound(info),
                        Ok(None) => Event::TrackNotFound,
                        Err(e) => {
                            log::warn!("track lookup failed: {}", e);
                            Event::ServiceFailed(e.to_string())
                        }
                    }
                }
                Effect::FetchCover { url } => Event::CoverFetched(self.lookup.fetch_image(&url).await),
                Effect::SearchAlbum { query } => match self.lookup.search_album(&query).await {
                    Ok(candidates) => Event::AlbumsFound(candidates),
                    Err(e) => {
                        log::warn!("album search failed: {}", e);
                        Event::ServiceFailed(e.to_string())
                    }
                },
                Effect::LoadCoverFile { path } => Event::CoverFileLoaded(load_cover_file(&path)),
                Effect::Prompt => {
                    if !state.awaits_user() {
                        anyhow::bail!("wizard asked for input in state {}", state.name());
                    }
                    let ctx = PromptContext {
                        position,
                        total,
                        state: &state,
                        record: &record,
                        policy: &policy,
                    };
                    self.prompter.prompt(&ctx)?
                }
                Effect::Commit => return Ok((self.commit(&record), policy)),
                Effect::Skip => return Ok((FileOutcome::Skipped, policy)),
                Effect::Quit => return Ok((FileOutcome::Quit, policy)),
            };

            let next = transition(state, record, policy, event);
            log::debug!("{} -> {}", entry.name, next.state.name());
            state = next.state;
            record = next.record;
            policy = next.policy;
            effect = next.effect;
        }
    }

    /// Check the new name, write tags, then rename. A file whose new name
    /// is unusable is left untouched.
    fn commit(&self, record: &TrackRecord) -> FileOutcome {
        let Some(fields) = record.to_fields() else {
            return FileOutcome::Failed("title or artist missing".to_string());
        };

        let plan = match plan_rename(record.file_path(), &fields.title, &fields.artist) {
            Ok(plan) => plan,
            Err(e) => return FileOutcome::Failed(format!("rename failed: {:#}", e)),
        };

        if let Err(e) = self.store.write_fields(record.file_path(), &fields) {
            return FileOutcome::Failed(format!("tag write failed: {:#}", e));
        }

        match apply_rename(&plan) {
            Ok(()) => {
                if plan.changed {
                    log::info!("committed {} as {}", plan.old_path.display(), plan.new_path.display());
                } else {
                    log::info!("committed {}", plan.new_path.display());
                }
                FileOutcome::Committed(plan.new_path)
            }
            Err(e) => FileOutcome::Failed(format!("tags written but rename failed: {:#}", e)),
        }
    }
}
