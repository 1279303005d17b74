use crate::normalize::normalize_tag;
use indexmap::IndexSet;
use std::collections::BTreeSet;

/// Process-wide tag rules for one batch run
///
/// `deny` always wins over `accept`. The accept set only ever grows: tags
/// the user keeps on one file are pre-selected for every later file of the
/// same run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPolicy {
    auto_accept: BTreeSet<String>,
    auto_deny: BTreeSet<String>,
}

/// One row of the tag curation screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChoice {
    pub name: String,
    pub selected: bool,
    /// Denied tags are shown but cannot be toggled
    pub locked: bool,
}

impl TagPolicy {
    pub fn new<A, D>(accept: A, deny: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            auto_accept: accept.into_iter().filter_map(|t| normalize_tag(t.as_ref())).collect(),
            auto_deny: deny.into_iter().filter_map(|t| normalize_tag(t.as_ref())).collect(),
        }
    }

    pub fn is_denied(&self, tag: &str) -> bool {
        self.auto_deny.contains(tag)
    }

    pub fn is_preselected(&self, tag: &str) -> bool {
        self.auto_accept.contains(tag) && !self.is_denied(tag)
    }

    pub fn choices(&self, candidates: &IndexSet<String>) -> Vec<TagChoice> {
        candidates
            .iter()
            .map(|name| TagChoice {
                name: name.clone(),
                selected: self.is_preselected(name),
                locked: self.is_denied(name),
            })
            .collect()
    }

    /// Keep only candidates the user may select, in candidate order
    pub fn filter_selection<'a, I>(&self, candidates: &IndexSet<String>, chosen: I) -> IndexSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let chosen: BTreeSet<String> = chosen.into_iter().filter_map(|t| normalize_tag(t)).collect();
        candidates
            .iter()
            .filter(|c| chosen.contains(*c) && !self.is_denied(c))
            .cloned()
            .collect()
    }

    /// Fold curated tags into the accept set for the rest of the run
    pub fn learn<'a, I>(&mut self, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            if !self.is_denied(tag) && self.auto_accept.insert(tag.clone()) {
                log::debug!("learned tag '{}'", tag);
            }
        }
    }

    pub fn auto_accept(&self) -> &BTreeSet<String> {
        &self.auto_accept
    }

    pub fn auto_deny(&self) -> &BTreeSet<String> {
        &self.auto_deny
    }
}
