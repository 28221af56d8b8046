use formats::kml::{KmlDocument, export_site};
use formats::sites::{SiteRecord, SitesDocument};
use foundation::ids::SiteId;
use foundation::time::TimestampMs;
use runtime::event_bus::EventBus;
use runtime::scheduler::Scheduler;

use crate::config::MapConfig;
use crate::lightbox::{Direction, Lightbox, LightboxKey, LightboxView};
use crate::map::MapView;
use crate::repository::{LoadReport, SessionError, SiteRepository};
use crate::search::{ResultSet, SearchOutcome, search};
use crate::selection::{Deferred, SelectionController, SelectionOutcome, fire_due};

/// One clickable row of the results panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// Position in the current result set; pass back to `select_result`.
    pub index: usize,
    pub site: SiteId,
    pub name: String,
    /// Present barangay and municipality joined with ", ". May be empty.
    pub location: String,
}

impl ResultRow {
    pub fn new(index: usize, site: SiteId, record: &SiteRecord) -> Self {
        let location = [record.barangay.as_deref(), record.municipality.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            index,
            site,
            name: record.name.clone(),
            location,
        }
    }
}

/// DOM changes for the host to apply, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    ShowResults(Vec<ResultRow>),
    ShowNoResults,
    HideResults,
    ClearQuery,
    ShowPhoto { url: String, indicator: String },
    HideLightbox,
}

impl UiEffect {
    fn show_photo(view: LightboxView<'_>) -> Self {
        UiEffect::ShowPhoto {
            url: view.photo.to_string(),
            indicator: view.indicator(),
        }
    }
}

/// Everything one page session holds: the loaded sites, the map, the current
/// search, pending popups and the lightbox.
///
/// Single-threaded; every operation runs to completion on one UI event.
pub struct MapSession<M: MapView> {
    config: MapConfig,
    map: M,
    repo: SiteRepository,
    selection: SelectionController,
    results: Option<ResultSet>,
    lightbox: Lightbox,
    deferred: Scheduler<Deferred>,
    /// Deadlines the host has a live timer for.
    armed: Vec<TimestampMs>,
    /// Deadlines the host still has to arm a timer for.
    timer_requests: Vec<TimestampMs>,
    effects: EventBus<UiEffect>,
}

impl<M: MapView> MapSession<M> {
    /// Creates the session and puts the map at its initial view.
    pub fn new(config: MapConfig, mut map: M) -> Self {
        map.set_view(config.initial_center, config.initial_zoom);
        let selection = SelectionController::new(config.select_zoom, config.popup_delay_ms);
        Self {
            config,
            map,
            repo: SiteRepository::new(),
            selection,
            results: None,
            lightbox: Lightbox::new(),
            deferred: Scheduler::new(),
            armed: Vec::new(),
            timer_requests: Vec::new(),
            effects: EventBus::new(),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn repository(&self) -> &SiteRepository {
        &self.repo
    }

    pub fn results(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    /// Populates the repository from a fetched document. Allowed once.
    pub fn load(&mut self, doc: SitesDocument) -> Result<LoadReport, SessionError> {
        let SitesDocument { sites, rejected } = doc;
        let mut report = self.repo.load(sites, &mut self.map)?;
        report.rejected = rejected;
        Ok(report)
    }

    /// Records a failed fetch. The map stays usable and empty.
    pub fn load_failed(&mut self, error: &dyn std::error::Error) {
        tracing::error!(%error, "failed to load site data");
    }

    /// Re-runs the search for the current query text.
    pub fn update_query(&mut self, query: &str) -> SearchOutcome {
        let outcome = search(&self.repo, query);
        match &outcome {
            SearchOutcome::Inactive => {
                self.results = None;
                self.effects.emit(UiEffect::HideResults);
            }
            SearchOutcome::Matches(set) => {
                self.results = Some(set.clone());
                if set.is_empty() {
                    self.effects.emit(UiEffect::ShowNoResults);
                } else {
                    let rows = set
                        .records(&self.repo)
                        .enumerate()
                        .map(|(index, (site, record))| ResultRow::new(index, site, record))
                        .collect();
                    self.effects.emit(UiEffect::ShowResults(rows));
                }
            }
        }
        outcome
    }

    /// Clear button: empties the query and hides the panel.
    pub fn clear_query(&mut self) {
        self.results = None;
        self.effects.emit(UiEffect::ClearQuery);
        self.effects.emit(UiEffect::HideResults);
    }

    /// Selects row `index` of the current results.
    ///
    /// On success the query is cleared and the panel hidden. Without an
    /// active result set this is a no-op.
    pub fn select_result(&mut self, index: usize, now: TimestampMs) -> SelectionOutcome {
        let results = self.results.clone().unwrap_or_default();
        let outcome = self.selection.select_result(
            index,
            &results,
            &self.repo,
            &mut self.map,
            &mut self.deferred,
            now,
        );
        if outcome.is_selected() {
            if self.selection.popup_delay_ms > 0 {
                self.request_timer(now.after(self.selection.popup_delay_ms));
            }
            self.clear_query();
        }
        outcome
    }

    /// Runs deferred popup opens that are due. Returns how many ran.
    pub fn fire_due(&mut self, now: TimestampMs) -> usize {
        fire_due(&mut self.deferred, &mut self.map, now)
    }

    pub fn next_due(&self) -> Option<TimestampMs> {
        self.deferred.next_due()
    }

    /// Deadlines the host must arm a one-shot timer for, each reported once.
    ///
    /// Every timer must call `timer_fired` with the deadline it was armed for.
    pub fn take_timer_requests(&mut self) -> Vec<TimestampMs> {
        std::mem::take(&mut self.timer_requests)
    }

    /// A host timer armed for `armed_for` went off at `now`.
    ///
    /// Runs what is due and requests a new timer when a pending deadline has
    /// none, which covers timers that fire early.
    pub fn timer_fired(&mut self, armed_for: TimestampMs, now: TimestampMs) -> usize {
        self.armed.retain(|due| *due != armed_for);
        let ran = self.fire_due(now);
        if let Some(next) = self.deferred.next_due() {
            self.request_timer(next);
        }
        ran
    }

    fn request_timer(&mut self, due: TimestampMs) {
        if !self.armed.contains(&due) {
            self.armed.push(due);
            self.timer_requests.push(due);
        }
    }

    /// Opens the lightbox on photo `start` of `site`.
    pub fn open_gallery(&mut self, site: SiteId, start: usize) -> bool {
        let Some(record) = self.repo.get(site) else {
            tracing::debug!(%site, "ignoring gallery open for unknown site");
            return false;
        };
        let photos = std::sync::Arc::clone(&record.photos);
        match self.lightbox.open(photos, start) {
            Some(view) => {
                let effect = UiEffect::show_photo(view);
                self.effects.emit(effect);
                true
            }
            None => false,
        }
    }

    pub fn advance_lightbox(&mut self, direction: Direction) -> bool {
        match self.lightbox.advance(direction) {
            Some(view) => {
                let effect = UiEffect::show_photo(view);
                self.effects.emit(effect);
                true
            }
            None => false,
        }
    }

    pub fn close_lightbox(&mut self) -> bool {
        let was_open = self.lightbox.close();
        if was_open {
            self.effects.emit(UiEffect::HideLightbox);
        }
        was_open
    }

    /// Keyboard binding for the lightbox. Returns whether the key was used.
    pub fn handle_key(&mut self, key: &str) -> bool {
        if !self.lightbox.is_open() {
            return false;
        }
        match LightboxKey::from_dom_key(key) {
            Some(LightboxKey::Escape) => self.close_lightbox(),
            Some(LightboxKey::ArrowLeft) => self.advance_lightbox(Direction::Previous),
            Some(LightboxKey::ArrowRight) => self.advance_lightbox(Direction::Next),
            None => false,
        }
    }

    /// A click inside the overlay. Only clicks on the backdrop itself close it.
    pub fn backdrop_click(&mut self, on_backdrop: bool) -> bool {
        on_backdrop && self.close_lightbox()
    }

    pub fn export_kml(&self, site: SiteId) -> Option<KmlDocument> {
        self.repo.get(site).map(export_site)
    }

    pub fn drain_effects(&mut self) -> Vec<UiEffect> {
        self.effects.drain_payloads()
    }
}

#[cfg(test)]
mod tests {
    use super::{MapSession, ResultRow, UiEffect};
    use crate::config::MapConfig;
    use crate::map::HeadlessMap;
    use crate::search::SearchOutcome;
    use crate::selection::SelectionOutcome;
    use formats::sites::SitesDocument;
    use foundation::geo::LatLon;
    use foundation::handles::MarkerHandle;
    use foundation::ids::SiteId;
    use foundation::time::TimestampMs;
    use pretty_assertions::assert_eq;

    const DATA: &str = r#"{"sites": [
        {"name": "Site A", "barangay": "North", "lat": 1, "lon": 1,
         "photos": ["p1.jpg", "p2.jpg", "p3.jpg"]},
        {"name": "Site B", "municipality": "North", "lat": 2, "lon": 2},
        {"name": "Broken", "lat": "x", "lon": 2}
    ]}"#;

    fn session() -> MapSession<HeadlessMap> {
        let mut s = MapSession::new(MapConfig::default(), HeadlessMap::new());
        let report = s.load(SitesDocument::from_json_str(DATA).unwrap()).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.rejected.len(), 1);
        s.drain_effects();
        s
    }

    #[test]
    fn starts_at_the_configured_view() {
        let s = MapSession::new(MapConfig::default(), HeadlessMap::new());
        assert_eq!(s.map().view(), Some((LatLon::new(12.8797, 121.7740), 6)));
        assert!(s.repository().all().is_empty());
    }

    #[test]
    fn query_updates_drive_the_results_panel() {
        let mut s = session();

        assert!(matches!(s.update_query("north"), SearchOutcome::Matches(ref r) if r.len() == 2));
        assert_eq!(
            s.drain_effects(),
            vec![UiEffect::ShowResults(vec![
                ResultRow {
                    index: 0,
                    site: SiteId::new(0),
                    name: "Site A".into(),
                    location: "North".into(),
                },
                ResultRow {
                    index: 1,
                    site: SiteId::new(1),
                    name: "Site B".into(),
                    location: "North".into(),
                },
            ])]
        );

        s.update_query("xyz");
        assert_eq!(s.drain_effects(), vec![UiEffect::ShowNoResults]);

        s.update_query("   ");
        assert_eq!(s.drain_effects(), vec![UiEffect::HideResults]);
        assert!(s.results().is_none());
    }

    #[test]
    fn selecting_a_result_moves_map_clears_query_and_opens_popup_later() {
        let mut s = session();
        s.update_query("site b");
        s.drain_effects();

        let out = s.select_result(0, TimestampMs(1_000));
        assert_eq!(
            out,
            SelectionOutcome::Selected {
                site: SiteId::new(1),
                marker: MarkerHandle::new(1)
            }
        );
        assert_eq!(s.map().view(), Some((LatLon::new(2.0, 2.0), 15)));
        assert_eq!(
            s.drain_effects(),
            vec![UiEffect::ClearQuery, UiEffect::HideResults]
        );
        assert!(s.results().is_none());

        assert_eq!(s.next_due(), Some(TimestampMs(1_500)));
        assert_eq!(s.fire_due(TimestampMs(1_500)), 1);
        assert_eq!(s.map().open_popup_marker(), Some(MarkerHandle::new(1)));
    }

    /// Replays the browser: one timer per requested deadline, each firing
    /// exactly at its deadline.
    fn run_timers(s: &mut MapSession<HeadlessMap>, armed: &mut Vec<TimestampMs>) {
        armed.extend(s.take_timer_requests());
        while !armed.is_empty() {
            armed.sort();
            let due = armed.remove(0);
            s.timer_fired(due, due);
            armed.extend(s.take_timer_requests());
        }
    }

    #[test]
    fn overlapping_selections_each_get_a_timer_and_last_popup_wins() {
        let mut s = session();
        let mut armed = Vec::new();

        s.update_query("north");
        s.select_result(0, TimestampMs(0));
        armed.extend(s.take_timer_requests());
        s.update_query("north");
        s.select_result(1, TimestampMs(100));
        armed.extend(s.take_timer_requests());
        assert_eq!(armed, vec![TimestampMs(500), TimestampMs(600)]);

        run_timers(&mut s, &mut armed);
        assert_eq!(
            s.map().opened_popups(),
            vec![MarkerHandle::new(0), MarkerHandle::new(1)]
        );
        assert_eq!(s.map().open_popup_marker(), Some(MarkerHandle::new(1)));
        assert_eq!(s.next_due(), None);
    }

    #[test]
    fn early_timer_is_rearmed_for_the_pending_deadline() {
        let mut s = session();
        s.update_query("site a");
        s.select_result(0, TimestampMs(0));
        assert_eq!(s.take_timer_requests(), vec![TimestampMs(500)]);

        assert_eq!(s.timer_fired(TimestampMs(500), TimestampMs(499)), 0);
        assert_eq!(s.map().open_popup_marker(), None);
        assert_eq!(s.take_timer_requests(), vec![TimestampMs(500)]);

        assert_eq!(s.timer_fired(TimestampMs(500), TimestampMs(500)), 1);
        assert_eq!(s.map().open_popup_marker(), Some(MarkerHandle::new(0)));
        assert!(s.take_timer_requests().is_empty());
    }

    #[test]
    fn selections_with_the_same_deadline_share_one_timer() {
        let mut s = session();
        s.update_query("north");
        s.select_result(0, TimestampMs(0));
        s.update_query("north");
        s.select_result(1, TimestampMs(0));

        let mut armed = s.take_timer_requests();
        assert_eq!(armed, vec![TimestampMs(500)]);
        run_timers(&mut s, &mut armed);
        assert_eq!(s.map().open_popup_marker(), Some(MarkerHandle::new(1)));
    }

    #[test]
    fn zero_delay_requests_no_timer() {
        let config = MapConfig {
            popup_delay_ms: 0,
            ..MapConfig::default()
        };
        let mut s = MapSession::new(config, HeadlessMap::new());
        s.load(SitesDocument::from_json_str(DATA).unwrap()).unwrap();
        s.update_query("site b");
        s.select_result(0, TimestampMs(0));
        assert!(s.take_timer_requests().is_empty());
        assert_eq!(s.map().open_popup_marker(), Some(MarkerHandle::new(1)));
    }

    #[test]
    fn invalid_selection_leaves_query_and_viewport_alone() {
        let mut s = session();
        s.update_query("north");
        s.drain_effects();
        let views_before = s.map().view_changes();

        assert_eq!(
            s.select_result(5, TimestampMs(0)),
            SelectionOutcome::OutOfBounds { index: 5, len: 2 }
        );
        assert_eq!(s.map().view_changes(), views_before);
        assert!(s.drain_effects().is_empty());
        assert!(s.results().is_some());
    }

    #[test]
    fn selection_without_active_search_is_ignored() {
        let mut s = session();
        let out = s.select_result(0, TimestampMs(0));
        assert_eq!(out, SelectionOutcome::OutOfBounds { index: 0, len: 0 });
    }

    #[test]
    fn gallery_and_keyboard_navigation() {
        let mut s = session();
        assert!(s.open_gallery(SiteId::new(0), 0));
        assert!(s.handle_key("ArrowLeft"));
        assert!(!s.handle_key("Enter"));
        assert!(s.handle_key("ArrowRight"));
        assert!(s.handle_key("Escape"));
        assert!(!s.handle_key("ArrowRight"));

        assert_eq!(
            s.drain_effects(),
            vec![
                UiEffect::ShowPhoto {
                    url: "p1.jpg".into(),
                    indicator: "1 / 3".into()
                },
                UiEffect::ShowPhoto {
                    url: "p3.jpg".into(),
                    indicator: "3 / 3".into()
                },
                UiEffect::ShowPhoto {
                    url: "p1.jpg".into(),
                    indicator: "1 / 3".into()
                },
                UiEffect::HideLightbox,
            ]
        );
    }

    #[test]
    fn sites_without_photos_never_open_the_lightbox() {
        let mut s = session();
        assert!(!s.open_gallery(SiteId::new(1), 0));
        assert!(!s.open_gallery(SiteId::new(42), 0));
        assert!(!s.lightbox().is_open());
        assert!(s.drain_effects().is_empty());
    }

    #[test]
    fn only_backdrop_clicks_close_the_lightbox() {
        let mut s = session();
        s.open_gallery(SiteId::new(0), 1);
        assert!(!s.backdrop_click(false));
        assert!(s.lightbox().is_open());
        assert!(s.backdrop_click(true));
        assert!(!s.backdrop_click(true));
        assert!(!s.close_lightbox());
    }

    #[test]
    fn kml_export_resolves_by_id() {
        let s = session();
        let doc = s.export_kml(SiteId::new(1)).unwrap();
        assert_eq!(doc.file_name, "site_b.kml");
        assert!(doc.contents.contains("<coordinates>2,2,0</coordinates>"));
        assert!(s.export_kml(SiteId::new(9)).is_none());
    }

    #[test]
    fn failed_load_leaves_an_empty_searchable_session() {
        let mut s = MapSession::new(MapConfig::default(), HeadlessMap::new());
        let err = SitesDocument::from_json_str("not json").unwrap_err();
        s.load_failed(&err);
        assert!(s.repository().all().is_empty());
        assert!(matches!(s.update_query("a"), SearchOutcome::Matches(ref r) if r.is_empty()));
    }
}
