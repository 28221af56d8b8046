use foundation::handles::MarkerHandle;
use foundation::ids::SiteId;
use foundation::time::TimestampMs;
use runtime::scheduler::Scheduler;

use crate::map::MapView;
use crate::repository::SiteRepository;
use crate::search::ResultSet;

/// Work queued behind the map's recenter animation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Deferred {
    OpenPopup { site: SiteId, marker: MarkerHandle },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Viewport moved; the popup is open or scheduled.
    Selected { site: SiteId, marker: MarkerHandle },
    OutOfBounds { index: usize, len: usize },
    MissingBinding(SiteId),
}

impl SelectionOutcome {
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionOutcome::Selected { .. })
    }
}

/// Resolves a chosen search result to its marker and drives the map to it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SelectionController {
    pub select_zoom: u8,
    pub popup_delay_ms: u64,
}

impl SelectionController {
    pub fn new(select_zoom: u8, popup_delay_ms: u64) -> Self {
        Self {
            select_zoom,
            popup_delay_ms,
        }
    }

    /// Closes any open popup, recenters on `results[index]` and opens (or
    /// schedules) its popup.
    ///
    /// Out-of-range indices and unknown sites are no-ops: the map is not
    /// touched and nothing is scheduled.
    pub fn select_result<M: MapView>(
        &self,
        index: usize,
        results: &ResultSet,
        repo: &SiteRepository,
        map: &mut M,
        scheduler: &mut Scheduler<Deferred>,
        now: TimestampMs,
    ) -> SelectionOutcome {
        let Some(site) = results.get(index) else {
            tracing::debug!(index, len = results.len(), "ignoring out-of-range selection");
            return SelectionOutcome::OutOfBounds {
                index,
                len: results.len(),
            };
        };

        let (Some(record), Some(binding)) = (repo.get(site), repo.binding(site)) else {
            tracing::debug!(%site, "ignoring selection of unknown site");
            return SelectionOutcome::MissingBinding(site);
        };

        map.close_popup();
        map.set_view(record.position, self.select_zoom);

        let task = Deferred::OpenPopup {
            site,
            marker: binding.marker,
        };
        if self.popup_delay_ms == 0 {
            run_deferred(map, task);
        } else {
            scheduler.schedule(now.after(self.popup_delay_ms), task);
        }

        SelectionOutcome::Selected {
            site,
            marker: binding.marker,
        }
    }
}

/// Runs every deferred task due at `now`. Returns how many ran.
pub fn fire_due<M: MapView>(
    scheduler: &mut Scheduler<Deferred>,
    map: &mut M,
    now: TimestampMs,
) -> usize {
    let due = scheduler.take_due(now);
    let count = due.len();
    for task in due {
        run_deferred(map, task);
    }
    count
}

fn run_deferred<M: MapView>(map: &mut M, task: Deferred) {
    match task {
        Deferred::OpenPopup { site, marker } => {
            tracing::debug!(%site, marker = marker.raw(), "opening popup");
            map.open_popup(marker);
        }
    }
}
