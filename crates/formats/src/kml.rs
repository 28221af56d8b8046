use std::fmt::Write as _;

use crate::sites::SiteRecord;

pub const KML_MIME_TYPE: &str = "application/vnd.google-earth.kml+xml";

/// A synthesized KML file ready for client-side download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmlDocument {
    pub file_name: String,
    pub contents: String,
}

/// Renders one site as a KML 2.2 document with a single placemark.
pub fn export_site(site: &SiteRecord) -> KmlDocument {
    let mut out = String::with_capacity(1024);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
    out.push_str("  <Document>\n");
    let _ = writeln!(out, "    <name>{}</name>", escape_xml(&site.name));
    out.push_str("    <Placemark>\n");
    let _ = writeln!(out, "      <name>{}</name>", escape_xml(&site.name));

    let description = site
        .present_attributes()
        .map(|(attr, value)| format!("{}: {}", attr.label(), value))
        .collect::<Vec<_>>()
        .join("\n");
    if !description.is_empty() {
        let _ = writeln!(
            out,
            "      <description>{}</description>",
            escape_xml(&description)
        );
    }

    let mut attrs = site.present_attributes().peekable();
    if attrs.peek().is_some() {
        out.push_str("      <ExtendedData>\n");
        for (attr, value) in attrs {
            let _ = writeln!(
                out,
                "        <Data name=\"{}\"><value>{}</value></Data>",
                escape_xml(attr.key()),
                escape_xml(value)
            );
        }
        out.push_str("      </ExtendedData>\n");
    }

    out.push_str("      <Point>\n");
    let _ = writeln!(
        out,
        "        <coordinates>{},{},0</coordinates>",
        site.position.lon, site.position.lat
    );
    out.push_str("      </Point>\n");
    out.push_str("    </Placemark>\n");
    out.push_str("  </Document>\n");
    out.push_str("</kml>\n");

    KmlDocument {
        file_name: file_name_for(&site.name),
        contents: out,
    }
}

/// Download file name derived from a site name.
///
/// Only used to name the download; never used as a lookup key.
pub fn file_name_for(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !stem.is_empty() {
                stem.push('_');
            }
            pending_sep = false;
            stem.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if stem.is_empty() {
        stem.push_str("site");
    }
    stem.push_str(".kml");
    stem
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{export_site, file_name_for};
    use crate::sites::{Attribute, SiteRecord};
    use foundation::geo::LatLon;

    #[test]
    fn placemark_uses_lon_lat_order_and_escapes_text() {
        let site = SiteRecord::new("Bay <North> & Co", LatLon::new(14.5, 120.9))
            .with_attribute(Attribute::Status, "Approved \"phase 1\"");
        let doc = export_site(&site);

        assert!(doc.contents.contains("<coordinates>120.9,14.5,0</coordinates>"));
        assert!(doc.contents.contains("<name>Bay &lt;North&gt; &amp; Co</name>"));
        assert!(doc.contents.contains(
            "<Data name=\"status\"><value>Approved &quot;phase 1&quot;</value></Data>"
        ));
        assert!(doc.contents.contains("<description>Status: Approved"));
        assert_eq!(doc.file_name, "bay_north_co.kml");
    }

    #[test]
    fn sites_without_attributes_skip_description_and_extended_data() {
        let doc = export_site(&SiteRecord::new("Bare", LatLon::new(1.0, 2.0)));
        assert!(!doc.contents.contains("<description>"));
        assert!(!doc.contents.contains("<ExtendedData>"));
        assert!(doc.contents.ends_with("</kml>\n"));
    }

    #[test]
    fn file_names_collapse_separators() {
        assert_eq!(
            file_name_for("  New Manila Bay -- City of Pearl "),
            "new_manila_bay_city_of_pearl.kml"
        );
        assert_eq!(file_name_for("Parañaque 1"), "para_aque_1.kml");
        assert_eq!(file_name_for("***"), "site.kml");
    }
}
