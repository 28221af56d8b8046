use std::sync::Arc;

use formats::sites::{Attribute, SiteRecord};
use foundation::ids::SiteId;
use serde::Serialize;

/// Structured popup body for one site, independent of any markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupContent {
    pub site: SiteId,
    pub title: String,
    pub rows: Vec<InfoRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Gallery>,
    pub actions: Vec<PopupAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoRow {
    pub attribute: Attribute,
    pub label: &'static str,
    pub value: String,
}

/// Thumbnails for the site's photos. Clicking photo `i` opens the lightbox at `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gallery {
    pub photos: Arc<[String]>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "site", rename_all = "snake_case")]
pub enum PopupAction {
    DownloadKml(SiteId),
}

pub fn popup_content(site: SiteId, record: &SiteRecord) -> PopupContent {
    let rows = record
        .present_attributes()
        .map(|(attribute, value)| InfoRow {
            attribute,
            label: attribute.label(),
            value: match attribute {
                Attribute::Area => format!("{value} hectares"),
                _ => value.to_string(),
            },
        })
        .collect();

    let gallery = (!record.photos.is_empty()).then(|| Gallery {
        photos: Arc::clone(&record.photos),
    });

    PopupContent {
        site,
        title: record.name.clone(),
        rows,
        gallery,
        actions: vec![PopupAction::DownloadKml(site)],
    }
}
