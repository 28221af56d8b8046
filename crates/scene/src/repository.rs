use std::collections::HashSet;

use formats::sites::{RejectedRecord, SiteRecord};
use foundation::arena::Arena;
use foundation::handles::MarkerHandle;
use foundation::ids::SiteId;

use crate::map::MapView;
use crate::popup::popup_content;

/// Association between a loaded site and the marker rendered for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MarkerBinding {
    pub site: SiteId,
    pub marker: MarkerHandle,
}

/// Lower-cased copies of the searchable fields, built once at load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchKey {
    pub name: String,
    pub barangay: Option<String>,
    pub municipality: Option<String>,
}

impl SearchKey {
    fn for_record(record: &SiteRecord) -> Self {
        Self {
            name: record.name.to_lowercase(),
            barangay: record.barangay.as_deref().map(str::to_lowercase),
            municipality: record.municipality.as_deref().map(str::to_lowercase),
        }
    }

    pub fn matches(&self, needle: &str) -> bool {
        self.name.contains(needle)
            || self.barangay.as_deref().is_some_and(|b| b.contains(needle))
            || self
                .municipality
                .as_deref()
                .is_some_and(|m| m.contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    pub rejected: Vec<RejectedRecord>,
    /// Names carried by more than one record, in first-seen order.
    pub duplicate_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("site data has already been loaded for this session")]
    AlreadyLoaded,
    #[error("{0} sites exceed the SiteId range")]
    TooManySites(usize),
}

/// `SiteId`s are `u32` load indices, which bounds one load.
fn id_bound(count: usize) -> Result<u32, SessionError> {
    u32::try_from(count).map_err(|_| SessionError::TooManySites(count))
}

/// In-memory owner of every site record and its marker binding.
///
/// Loaded once per session. Records and bindings are never removed, so a
/// `SiteId` handed out here stays valid for the whole session.
#[derive(Debug, Default)]
pub struct SiteRepository {
    sites: Arena<SiteRecord>,
    bindings: Vec<MarkerBinding>,
    keys: Vec<SearchKey>,
    loaded: bool,
}

impl SiteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one marker per record, in input order, and binds its popup.
    pub fn load<M: MapView>(
        &mut self,
        records: Vec<SiteRecord>,
        map: &mut M,
    ) -> Result<LoadReport, SessionError> {
        if self.loaded {
            return Err(SessionError::AlreadyLoaded);
        }
        let count = id_bound(records.len())?;
        self.loaded = true;

        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();

        self.sites = Arena::with_capacity(records.len());
        for (raw, record) in (0..count).zip(records) {
            if !seen.insert(record.name.clone()) && !duplicates.contains(&record.name) {
                tracing::warn!(
                    name = %record.name,
                    "duplicate site name; name lookups return the first"
                );
                duplicates.push(record.name.clone());
            }

            let marker = map.add_marker(record.position);
            let site = SiteId::new(raw);
            map.bind_popup(marker, &popup_content(site, &record));

            self.keys.push(SearchKey::for_record(&record));
            self.bindings.push(MarkerBinding { site, marker });
            self.sites.alloc(record);
        }

        tracing::info!(
            sites = self.sites.len(),
            duplicates = duplicates.len(),
            "site repository loaded"
        );

        Ok(LoadReport {
            loaded: self.sites.len(),
            rejected: Vec::new(),
            duplicate_names: duplicates,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Every loaded record in load order. Empty before load.
    pub fn all(&self) -> &[SiteRecord] {
        self.sites.as_slice()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn get(&self, site: SiteId) -> Option<&SiteRecord> {
        self.sites.get(site.index())
    }

    pub fn binding(&self, site: SiteId) -> Option<&MarkerBinding> {
        self.bindings.get(site.index())
    }

    /// Exact, case-sensitive lookup. The first record with the name wins.
    pub fn find_marker_by_name(&self, name: &str) -> Option<&MarkerBinding> {
        self.sites
            .iter()
            .find(|(_, record)| record.name == name)
            .and_then(|(idx, _)| self.bindings.get(idx))
    }

    pub fn ids(&self) -> impl Iterator<Item = SiteId> + '_ {
        self.bindings.iter().map(|b| b.site)
    }

    pub(crate) fn search_keys(&self) -> impl Iterator<Item = (SiteId, &SearchKey)> + '_ {
        self.bindings.iter().map(|b| b.site).zip(self.keys.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionError, SiteRepository, id_bound};
    use crate::map::{HeadlessMap, MapCall};
    use formats::sites::SiteRecord;
    use foundation::geo::LatLon;
    use foundation::ids::SiteId;

    fn site(name: &str, lat: f64, lon: f64) -> SiteRecord {
        SiteRecord::new(name, LatLon::new(lat, lon))
    }

    #[test]
    fn empty_before_load() {
        let repo = SiteRepository::new();
        assert!(repo.all().is_empty());
        assert!(!repo.is_loaded());
        assert!(repo.find_marker_by_name("anything").is_none());
    }

    #[test]
    fn load_creates_markers_in_input_order_with_popups() {
        let mut map = HeadlessMap::new();
        let mut repo = SiteRepository::new();
        let report = repo
            .load(vec![site("A", 1.0, 1.0), site("B", 2.0, 2.0)], &mut map)
            .unwrap();

        assert_eq!(report.loaded, 2);
        assert!(report.duplicate_names.is_empty());
        assert_eq!(map.marker_count(), 2);

        let positions: Vec<_> = map
            .calls()
            .iter()
            .filter_map(|c| match c {
                MapCall::AddMarker { position, .. } => Some(*position),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![LatLon::new(1.0, 1.0), LatLon::new(2.0, 2.0)]);

        let titles: Vec<_> = map
            .calls()
            .iter()
            .filter_map(|c| match c {
                MapCall::BindPopup { title, .. } => Some(title.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(titles, vec!["A", "B"]);

        let b = repo.binding(SiteId::new(1)).unwrap();
        assert_eq!(repo.get(b.site).unwrap().name, "B");
    }

    #[test]
    fn second_load_is_rejected_and_changes_nothing() {
        let mut map = HeadlessMap::new();
        let mut repo = SiteRepository::new();
        repo.load(vec![site("A", 1.0, 1.0)], &mut map).unwrap();

        let err = repo.load(vec![site("B", 2.0, 2.0)], &mut map).unwrap_err();
        assert_eq!(err, SessionError::AlreadyLoaded);
        assert_eq!(repo.len(), 1);
        assert_eq!(map.marker_count(), 1);
    }

    #[test]
    fn name_lookup_is_exact_and_first_match_wins() {
        let mut map = HeadlessMap::new();
        let mut repo = SiteRepository::new();
        let report = repo
            .load(
                vec![
                    site("Dup", 1.0, 1.0),
                    site("Other", 2.0, 2.0),
                    site("Dup", 3.0, 3.0),
                    site("Dup", 4.0, 4.0),
                ],
                &mut map,
            )
            .unwrap();

        assert_eq!(report.duplicate_names, vec!["Dup".to_string()]);
        let hit = repo.find_marker_by_name("Dup").unwrap();
        assert_eq!(hit.site, SiteId::new(0));
        assert!(repo.find_marker_by_name("dup").is_none());

        // Direct id lookups still reach the shadowed records.
        assert_eq!(repo.get(SiteId::new(2)).unwrap().position, LatLon::new(3.0, 3.0));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn loads_beyond_the_id_range_are_refused() {
        assert_eq!(id_bound(3), Ok(3));
        assert_eq!(id_bound(u32::MAX as usize), Ok(u32::MAX));
        let too_many = u32::MAX as usize + 1;
        assert_eq!(id_bound(too_many), Err(SessionError::TooManySites(too_many)));
    }

    #[test]
    fn ids_follow_load_order() {
        let mut map = HeadlessMap::new();
        let mut repo = SiteRepository::new();
        repo.load(vec![site("A", 1.0, 1.0), site("B", 2.0, 2.0)], &mut map)
            .unwrap();
        let ids: Vec<_> = repo.ids().collect();
        assert_eq!(ids, vec![SiteId::new(0), SiteId::new(1)]);
        let keyed: Vec<_> = repo
            .search_keys()
            .map(|(id, k)| (id, k.name.clone()))
            .collect();
        assert_eq!(
            keyed,
            vec![(SiteId::new(0), "a".to_string()), (SiteId::new(1), "b".to_string())]
        );
    }

    #[test]
    fn unknown_ids_resolve_to_none() {
        let repo = SiteRepository::new();
        assert!(repo.get(SiteId::new(0)).is_none());
        assert!(repo.binding(SiteId::new(7)).is_none());
    }
}
