use foundation::geo::LatLon;
use foundation::handles::MarkerHandle;

use crate::popup::PopupContent;

/// The map-rendering collaborator.
///
/// The core drives markers, popups and the viewport through this trait only;
/// tiles, icons and animation belong to the implementation.
pub trait MapView {
    fn add_marker(&mut self, position: LatLon) -> MarkerHandle;
    fn bind_popup(&mut self, marker: MarkerHandle, content: &PopupContent);
    fn set_view(&mut self, center: LatLon, zoom: u8);
    fn open_popup(&mut self, marker: MarkerHandle);
    fn close_popup(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    AddMarker {
        marker: MarkerHandle,
        position: LatLon,
    },
    BindPopup {
        marker: MarkerHandle,
        title: String,
    },
    SetView {
        center: LatLon,
        zoom: u8,
    },
    OpenPopup(MarkerHandle),
    ClosePopup,
}

/// In-process map that renders nothing and records every call.
///
/// Used by the CLI and by tests that assert on viewport and popup behavior.
#[derive(Debug, Default)]
pub struct HeadlessMap {
    next_marker: u32,
    calls: Vec<MapCall>,
    view: Option<(LatLon, u8)>,
    open_popup: Option<MarkerHandle>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[MapCall] {
        &self.calls
    }

    pub fn view(&self) -> Option<(LatLon, u8)> {
        self.view
    }

    /// Marker whose popup is currently open. Opening another replaces it.
    pub fn open_popup_marker(&self) -> Option<MarkerHandle> {
        self.open_popup
    }

    pub fn marker_count(&self) -> usize {
        self.next_marker as usize
    }

    pub fn view_changes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MapCall::SetView { .. }))
            .count()
    }

    pub fn opened_popups(&self) -> Vec<MarkerHandle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MapCall::OpenPopup(m) => Some(*m),
                _ => None,
            })
            .collect()
    }
}

impl MapView for HeadlessMap {
    fn add_marker(&mut self, position: LatLon) -> MarkerHandle {
        let marker = MarkerHandle::new(self.next_marker);
        self.next_marker += 1;
        self.calls.push(MapCall::AddMarker { marker, position });
        marker
    }

    fn bind_popup(&mut self, marker: MarkerHandle, content: &PopupContent) {
        self.calls.push(MapCall::BindPopup {
            marker,
            title: content.title.clone(),
        });
    }

    fn set_view(&mut self, center: LatLon, zoom: u8) {
        self.view = Some((center, zoom));
        self.calls.push(MapCall::SetView { center, zoom });
    }

    fn open_popup(&mut self, marker: MarkerHandle) {
        self.open_popup = Some(marker);
        self.calls.push(MapCall::OpenPopup(marker));
    }

    fn close_popup(&mut self) {
        self.open_popup = None;
        self.calls.push(MapCall::ClosePopup);
    }
}
