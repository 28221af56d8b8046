use formats::kml::{KML_MIME_TYPE, KmlDocument};
use foundation::geo::LatLon;
use foundation::handles::MarkerHandle;
use scene::config::MapConfig;
use scene::map::MapView;
use scene::popup::PopupContent;
use wasm_bindgen::prelude::*;

use crate::popup_html::render_popup;

// Leaflet (`L`) is loaded by the page. Markers live in a JS array and are
// addressed by their index, which is what `MarkerHandle` carries.
#[wasm_bindgen(inline_js = "
let __reclaim_map = null;
const __reclaim_markers = [];

const __reclaim_icon_svg =
    '<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 24 24\" width=\"32\" height=\"32\">' +
    '<path fill=\"#1e40af\" d=\"M12 2C8.13 2 5 5.13 5 9c0 5.25 7 13 7 13s7-7.75 7-13c0-3.87-3.13-7-7-7z\"/>' +
    '<circle cx=\"12\" cy=\"9\" r=\"2.5\" fill=\"white\"/></svg>';

export function reclaim_map_init(containerId, tileUrl, attribution, maxZoom) {
    if (__reclaim_map) return;
    __reclaim_map = L.map(containerId);
    L.tileLayer(tileUrl, { attribution, maxZoom }).addTo(__reclaim_map);
}

export function reclaim_add_marker(lat, lon) {
    const icon = L.icon({
        iconUrl: 'data:image/svg+xml;base64,' + btoa(__reclaim_icon_svg),
        iconSize: [32, 32],
        iconAnchor: [16, 32],
        popupAnchor: [0, -32],
    });
    const marker = L.marker([lat, lon], { icon }).addTo(__reclaim_map);
    __reclaim_markers.push(marker);
    return __reclaim_markers.length - 1;
}

export function reclaim_bind_popup(id, html) {
    const marker = __reclaim_markers[id];
    if (marker) marker.bindPopup(html);
}

export function reclaim_set_view(lat, lon, zoom) {
    if (__reclaim_map) __reclaim_map.setView([lat, lon], zoom);
}

export function reclaim_open_popup(id) {
    const marker = __reclaim_markers[id];
    if (marker) marker.openPopup();
}

export function reclaim_close_popup() {
    if (__reclaim_map) __reclaim_map.closePopup();
}

export function reclaim_download(fileName, mime, contents) {
    const blob = new Blob([contents], { type: mime });
    const url = URL.createObjectURL(blob);
    const a = document.createElement('a');
    a.href = url;
    a.download = fileName;
    document.body.appendChild(a);
    a.click();
    document.body.removeChild(a);
    URL.revokeObjectURL(url);
}
")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn reclaim_map_init(
        container_id: &str,
        tile_url: &str,
        attribution: &str,
        max_zoom: u8,
    ) -> Result<(), JsValue>;

    fn reclaim_add_marker(lat: f64, lon: f64) -> u32;

    fn reclaim_bind_popup(id: u32, html: &str);

    fn reclaim_set_view(lat: f64, lon: f64, zoom: u8);

    fn reclaim_open_popup(id: u32);

    fn reclaim_close_popup();

    #[wasm_bindgen(catch)]
    fn reclaim_download(file_name: &str, mime: &str, contents: &str) -> Result<(), JsValue>;
}

/// `MapView` backed by a Leaflet map in the page.
#[derive(Debug)]
pub struct LeafletMap {
    _private: (),
}

impl LeafletMap {
    pub fn new(container_id: &str, config: &MapConfig) -> Result<Self, JsValue> {
        reclaim_map_init(
            container_id,
            &config.tile_url,
            &config.attribution,
            config.max_zoom,
        )?;
        Ok(Self { _private: () })
    }
}

impl MapView for LeafletMap {
    fn add_marker(&mut self, position: LatLon) -> MarkerHandle {
        MarkerHandle::new(reclaim_add_marker(position.lat, position.lon))
    }

    fn bind_popup(&mut self, marker: MarkerHandle, content: &PopupContent) {
        reclaim_bind_popup(marker.raw(), &render_popup(content));
    }

    fn set_view(&mut self, center: LatLon, zoom: u8) {
        reclaim_set_view(center.lat, center.lon, zoom);
    }

    fn open_popup(&mut self, marker: MarkerHandle) {
        reclaim_open_popup(marker.raw());
    }

    fn close_popup(&mut self) {
        reclaim_close_popup();
    }
}

/// Triggers a client-side download of a KML document.
pub fn download_kml(doc: &KmlDocument) -> Result<(), JsValue> {
    reclaim_download(&doc.file_name, KML_MIME_TYPE, &doc.contents)
}
