use scene::session::UiEffect;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, EventTarget, HtmlImageElement, HtmlInputElement};

use crate::popup_html::{NO_RESULTS_HTML, render_result_rows};

const SEARCH_INPUT_ID: &str = "search-input";
const SEARCH_BUTTON_ID: &str = "search-button";
const CLEAR_BUTTON_ID: &str = "clear-button";
const RESULTS_ID: &str = "search-results";
const LIGHTBOX_ID: &str = "lightbox";
const LIGHTBOX_IMAGE_ID: &str = "lightbox-img";
const LIGHTBOX_COUNTER_ID: &str = "lightbox-counter";
const LIGHTBOX_PREV_ID: &str = "lightbox-prev";
const LIGHTBOX_NEXT_ID: &str = "lightbox-next";
const LIGHTBOX_CLOSE_ID: &str = "lightbox-close";

const ACTIVE_CLASS: &str = "active";

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .ok_or_else(|| JsValue::from_str("no window"))?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn element(doc: &Document, id: &str) -> Result<Element, JsValue> {
    doc.get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))
}

fn listen<F>(target: &EventTarget, event: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let cb = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref())?;
    // Handlers live for the whole page session.
    cb.forget();
    Ok(())
}

/// Closest ancestor-or-self of the event target matching `selector`.
fn closest_target(event: &Event, selector: &str) -> Option<Element> {
    event
        .target()?
        .dyn_into::<Element>()
        .ok()?
        .closest(selector)
        .ok()
        .flatten()
}

fn data_attr<T: std::str::FromStr>(el: &Element, name: &str) -> Option<T> {
    el.get_attribute(name)?.trim().parse().ok()
}

fn query_value(doc: &Document) -> Option<String> {
    doc.get_element_by_id(SEARCH_INPUT_ID)?
        .dyn_into::<HtmlInputElement>()
        .ok()
        .map(|input| input.value())
}

/// Wires every input handler. Called once, after the site data has loaded.
pub fn wire_handlers() -> Result<(), JsValue> {
    let doc = document()?;

    let input = element(&doc, SEARCH_INPUT_ID)?;
    listen(&input, "input", |event| {
        let value = event
            .target()
            .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            .map(|i| i.value())
            .unwrap_or_default();
        crate::on_query_input(&value);
    })?;

    let search_doc = doc.clone();
    listen(element(&doc, SEARCH_BUTTON_ID)?.as_ref(), "click", move |_| {
        let value = query_value(&search_doc).unwrap_or_default();
        crate::on_query_input(&value);
    })?;

    listen(element(&doc, CLEAR_BUTTON_ID)?.as_ref(), "click", |_| crate::on_clear())?;

    // One delegated handler per container; rows and popup controls carry data attributes.
    listen(element(&doc, RESULTS_ID)?.as_ref(), "click", |event| {
        if let Some(index) = closest_target(&event, "[data-result]")
            .and_then(|row| data_attr::<usize>(&row, "data-result"))
        {
            crate::on_result_click(index);
        }
    })?;

    listen(element(&doc, crate::MAP_CONTAINER_ID)?.as_ref(), "click", |event| {
        let Some(el) = closest_target(&event, "[data-action]") else {
            return;
        };
        let Some(site) = data_attr::<u32>(&el, "data-site") else {
            return;
        };
        match el.get_attribute("data-action").as_deref() {
            Some("kml") => {
                if let Err(err) = crate::on_download_click(site) {
                    crate::log_error(&format!("KML download failed: {err:?}"));
                }
            }
            Some("photo") => {
                let index = data_attr::<usize>(&el, "data-index").unwrap_or(0);
                crate::on_photo_click(site, index);
            }
            _ => {}
        }
    })?;

    listen(&doc, "keydown", |event| {
        let Some(key) = event
            .dyn_ref::<web_sys::KeyboardEvent>()
            .map(|k| k.key())
        else {
            return;
        };
        if crate::on_key(&key) {
            event.prevent_default();
        }
    })?;

    listen(element(&doc, LIGHTBOX_ID)?.as_ref(), "click", |event| {
        let on_backdrop = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .is_some_and(|el| el.id() == LIGHTBOX_ID);
        crate::on_lightbox_click(on_backdrop);
    })?;

    listen(element(&doc, LIGHTBOX_PREV_ID)?.as_ref(), "click", |_| crate::lightbox_prev())?;
    listen(element(&doc, LIGHTBOX_NEXT_ID)?.as_ref(), "click", |_| crate::lightbox_next())?;
    listen(element(&doc, LIGHTBOX_CLOSE_ID)?.as_ref(), "click", |_| crate::lightbox_close())?;

    Ok(())
}

pub fn apply_effects(effects: &[UiEffect]) -> Result<(), JsValue> {
    if effects.is_empty() {
        return Ok(());
    }
    let doc = document()?;

    for effect in effects {
        match effect {
            UiEffect::ShowResults(rows) => {
                let panel = element(&doc, RESULTS_ID)?;
                panel.set_inner_html(&render_result_rows(rows));
                panel.class_list().add_1(ACTIVE_CLASS)?;
            }
            UiEffect::ShowNoResults => {
                let panel = element(&doc, RESULTS_ID)?;
                panel.set_inner_html(NO_RESULTS_HTML);
                panel.class_list().add_1(ACTIVE_CLASS)?;
            }
            UiEffect::HideResults => {
                let panel = element(&doc, RESULTS_ID)?;
                panel.class_list().remove_1(ACTIVE_CLASS)?;
                panel.set_inner_html("");
            }
            UiEffect::ClearQuery => {
                element(&doc, SEARCH_INPUT_ID)?
                    .dyn_into::<HtmlInputElement>()?
                    .set_value("");
            }
            UiEffect::ShowPhoto { url, indicator } => {
                element(&doc, LIGHTBOX_IMAGE_ID)?
                    .dyn_into::<HtmlImageElement>()?
                    .set_src(url);
                element(&doc, LIGHTBOX_COUNTER_ID)?.set_text_content(Some(indicator));
                element(&doc, LIGHTBOX_ID)?.class_list().add_1(ACTIVE_CLASS)?;
            }
            UiEffect::HideLightbox => {
                element(&doc, LIGHTBOX_ID)?
                    .class_list()
                    .remove_1(ACTIVE_CLASS)?;
            }
        }
    }
    Ok(())
}

/// Fire-and-forget browser timer.
pub fn set_timeout<F>(delay_ms: u64, f: F) -> Result<(), JsValue>
where
    F: FnOnce() + 'static,
{
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let cb = Closure::once_into_js(f);
    let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
    window.set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), delay)?;
    Ok(())
}
