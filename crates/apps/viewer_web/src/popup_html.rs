use scene::popup::{PopupAction, PopupContent};
use scene::session::ResultRow;

/// Popup markup for Leaflet.
///
/// Interactive elements carry `data-action` and `data-site` attributes; one
/// delegated click handler on the map container dispatches them.
pub fn render_popup(content: &PopupContent) -> String {
    let mut html = String::from("<div class=\"popup-content\">");
    html.push_str(&format!("<h3>{}</h3>", escape_html(&content.title)));

    for row in &content.rows {
        html.push_str(&format!(
            "<div class=\"info-row\"><span class=\"label\">{}:</span><span class=\"value\">{}</span></div>",
            escape_html(row.label),
            escape_html(&row.value)
        ));
    }

    if let Some(gallery) = &content.gallery {
        html.push_str("<div class=\"popup-gallery\">");
        for (index, photo) in gallery.photos.iter().enumerate() {
            html.push_str(&format!(
                "<img class=\"popup-thumb\" src=\"{}\" alt=\"{} photo {}\" data-action=\"photo\" data-site=\"{}\" data-index=\"{}\">",
                escape_html(photo),
                escape_html(&content.title),
                index + 1,
                content.site,
                index
            ));
        }
        html.push_str("</div>");
    }

    for action in &content.actions {
        match action {
            PopupAction::DownloadKml(site) => html.push_str(&format!(
                "<button class=\"download-btn\" type=\"button\" data-action=\"kml\" data-site=\"{site}\">Download KML</button>"
            )),
        }
    }

    html.push_str("</div>");
    html
}

pub fn render_result_rows(rows: &[ResultRow]) -> String {
    let mut html = String::new();
    for row in rows {
        html.push_str(&format!(
            "<div class=\"result-item\" data-result=\"{}\"><div class=\"result-name\">{}</div>",
            row.index,
            escape_html(&row.name)
        ));
        if !row.location.is_empty() {
            html.push_str(&format!(
                "<div class=\"result-location\">{}</div>",
                escape_html(&row.location)
            ));
        }
        html.push_str("</div>");
    }
    html
}

pub const NO_RESULTS_HTML: &str = "<div class=\"no-results\">No sites found</div>";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
