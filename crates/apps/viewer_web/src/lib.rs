use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use formats::sites::{SitesDocument, SitesError};
use foundation::ids::SiteId;
use foundation::time::TimestampMs;
use scene::config::MapConfig;
use scene::lightbox::Direction;
use scene::session::MapSession;

mod dom;
mod leaflet;
mod popup_html;

use leaflet::LeafletMap;

pub const MAP_CONTAINER_ID: &str = "map";

thread_local! {
    static SESSION: RefCell<Option<MapSession<LeafletMap>>> = const { RefCell::new(None) };
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] gloo_net::Error),
    #[error("server answered {0}")]
    Status(u16),
    #[error(transparent)]
    Data(#[from] SitesError),
}

/// Runs `f` against the live session. `None` before `init_viewer` or on teardown.
fn with_session<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut MapSession<LeafletMap>) -> R,
{
    SESSION
        .try_with(|cell| cell.borrow_mut().as_mut().map(f))
        .ok()
        .flatten()
}

fn now() -> TimestampMs {
    TimestampMs::from_f64_ms(js_sys::Date::now())
}

fn log_error(msg: &str) {
    web_sys::console::error_1(&JsValue::from_str(msg));
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Creates the map and starts the one-shot data fetch.
///
/// `config_json` is an optional partial `MapConfig` document.
#[wasm_bindgen]
pub fn init_viewer(config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json {
        Some(raw) => {
            MapConfig::from_json_str(&raw).map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        None => MapConfig::default(),
    };

    let map = LeafletMap::new(MAP_CONTAINER_ID, &config)?;
    let data_url = config.data_url.clone();
    SESSION.with(|cell| {
        *cell.borrow_mut() = Some(MapSession::new(config, map));
    });

    spawn_local(async move {
        load_sites(&data_url).await;
    });
    Ok(())
}

async fn load_sites(url: &str) {
    match fetch_sites(url).await {
        Ok(doc) => {
            let report = with_session(|s| s.load(doc));
            match report {
                Some(Ok(report)) => {
                    if !report.rejected.is_empty() || !report.duplicate_names.is_empty() {
                        web_sys::console::warn_1(&JsValue::from_str(&format!(
                            "loaded {} sites ({} rejected, duplicate names: {:?})",
                            report.loaded,
                            report.rejected.len(),
                            report.duplicate_names
                        )));
                    }
                    if let Err(err) = dom::wire_handlers() {
                        log_error(&format!("failed to wire UI handlers: {err:?}"));
                    }
                }
                Some(Err(err)) => log_error(&format!("site data not loaded: {err}")),
                None => log_error("site data arrived before the viewer was initialized"),
            }
        }
        Err(err) => {
            log_error(&format!("Error loading data: {err}"));
            with_session(|s| s.load_failed(&err));
        }
    }
}

async fn fetch_sites(url: &str) -> Result<SitesDocument, FetchError> {
    let resp = Request::get(url).send().await?;
    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }
    let text = resp.text().await?;
    Ok(SitesDocument::from_json_str(&text)?)
}

/// Applies pending UI effects and arms one timer per requested popup deadline.
fn flush() {
    let (effects, timers) =
        with_session(|s| (s.drain_effects(), s.take_timer_requests())).unwrap_or_default();
    if let Err(err) = dom::apply_effects(&effects) {
        log_error(&format!("failed to update UI: {err:?}"));
    }
    for due in timers {
        let delay_ms = due.0.saturating_sub(now().0);
        if let Err(err) = dom::set_timeout(delay_ms, move || on_timer(due)) {
            log_error(&format!("failed to schedule popup: {err:?}"));
        }
    }
}

fn on_timer(armed_for: TimestampMs) {
    with_session(|s| s.timer_fired(armed_for, now()));
    flush();
}

#[wasm_bindgen]
pub fn on_query_input(query: &str) {
    with_session(|s| s.update_query(query));
    flush();
}

#[wasm_bindgen]
pub fn on_clear() {
    with_session(|s| s.clear_query());
    flush();
}

#[wasm_bindgen]
pub fn on_result_click(index: usize) {
    with_session(|s| s.select_result(index, now()));
    flush();
}

#[wasm_bindgen]
pub fn on_photo_click(site: u32, index: usize) {
    with_session(|s| s.open_gallery(SiteId::new(site), index));
    flush();
}

#[wasm_bindgen]
pub fn on_download_click(site: u32) -> Result<(), JsValue> {
    let Some(doc) = with_session(|s| s.export_kml(SiteId::new(site))).flatten() else {
        return Ok(());
    };
    leaflet::download_kml(&doc)
}

/// Returns whether the key was consumed.
#[wasm_bindgen]
pub fn on_key(key: &str) -> bool {
    let used = with_session(|s| s.handle_key(key)).unwrap_or(false);
    flush();
    used
}

#[wasm_bindgen]
pub fn on_lightbox_click(on_backdrop: bool) {
    with_session(|s| s.backdrop_click(on_backdrop));
    flush();
}

#[wasm_bindgen]
pub fn lightbox_prev() {
    with_session(|s| s.advance_lightbox(Direction::Previous));
    flush();
}

#[wasm_bindgen]
pub fn lightbox_next() {
    with_session(|s| s.advance_lightbox(Direction::Next));
    flush();
}

#[wasm_bindgen]
pub fn lightbox_close() {
    with_session(|s| s.close_lightbox());
    flush();
}
