use formats::sites::SiteRecord;
use foundation::ids::SiteId;

use crate::repository::SiteRepository;

/// Result of running a query.
///
/// `Inactive` means there is no query to show results for; `Matches` with an
/// empty set means the query ran and nothing matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Inactive,
    Matches(ResultSet),
}

/// Ordered matches for one query, in repository load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    ids: Vec<SiteId>,
}

impl ResultSet {
    pub fn from_ids(ids: Vec<SiteId>) -> Self {
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<SiteId> {
        self.ids.get(index).copied()
    }

    pub fn ids(&self) -> &[SiteId] {
        &self.ids
    }

    /// Resolves the ids against `repo`, skipping any it does not know.
    pub fn records<'a>(
        &'a self,
        repo: &'a SiteRepository,
    ) -> impl Iterator<Item = (SiteId, &'a SiteRecord)> + 'a {
        self.ids
            .iter()
            .filter_map(move |id| repo.get(*id).map(|r| (*id, r)))
    }
}

/// Trims and lower-cases a query; `None` for blank input.
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Case-insensitive substring search over name, barangay and municipality.
///
/// Pure: the same query against the same repository always yields the same
/// ordered result.
pub fn search(repo: &SiteRepository, query: &str) -> SearchOutcome {
    let Some(needle) = normalize_query(query) else {
        return SearchOutcome::Inactive;
    };

    let ids = repo
        .search_keys()
        .filter(|(_, key)| key.matches(&needle))
        .map(|(id, _)| id)
        .collect();

    SearchOutcome::Matches(ResultSet { ids })
}
