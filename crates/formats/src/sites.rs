use std::sync::Arc;

use foundation::geo::{CoordinateError, LatLon};
use serde::Serialize;
use serde_json::{Map, Value};

/// Optional descriptive attributes of a site, in popup display order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Area,
    Status,
    YearStarted,
    YearCompleted,
    Developer,
    Address,
    Barangay,
    Municipality,
    Province,
    Region,
    Notes,
    Author,
}

impl Attribute {
    pub const ALL: [Attribute; 12] = [
        Attribute::Area,
        Attribute::Status,
        Attribute::YearStarted,
        Attribute::YearCompleted,
        Attribute::Developer,
        Attribute::Address,
        Attribute::Barangay,
        Attribute::Municipality,
        Attribute::Province,
        Attribute::Region,
        Attribute::Notes,
        Attribute::Author,
    ];

    /// Key used in the data file.
    pub fn key(&self) -> &'static str {
        match self {
            Attribute::Area => "area",
            Attribute::Status => "status",
            Attribute::YearStarted => "year started",
            Attribute::YearCompleted => "year completed",
            Attribute::Developer => "developer",
            Attribute::Address => "address",
            Attribute::Barangay => "barangay",
            Attribute::Municipality => "municipality",
            Attribute::Province => "province",
            Attribute::Region => "region",
            Attribute::Notes => "notes",
            Attribute::Author => "author",
        }
    }

    fn alias(&self) -> Option<&'static str> {
        match self {
            Attribute::YearStarted => Some("year_started"),
            Attribute::YearCompleted => Some("year_completed"),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Attribute::Area => "Area",
            Attribute::Status => "Status",
            Attribute::YearStarted => "Year Started",
            Attribute::YearCompleted => "Year Completed",
            Attribute::Developer => "Developer",
            Attribute::Address => "Location",
            Attribute::Barangay => "Barangay",
            Attribute::Municipality => "Municipality",
            Attribute::Province => "Province",
            Attribute::Region => "Region",
            Attribute::Notes => "Notes",
            Attribute::Author => "Source",
        }
    }
}

/// One reclamation project as loaded from the data file.
///
/// Immutable after load. Photos are shared so the lightbox can hold the
/// sequence without copying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRecord {
    pub name: String,
    pub position: LatLon,
    pub area: Option<String>,
    pub status: Option<String>,
    pub year_started: Option<String>,
    pub year_completed: Option<String>,
    pub developer: Option<String>,
    pub address: Option<String>,
    pub barangay: Option<String>,
    pub municipality: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
    pub notes: Option<String>,
    pub author: Option<String>,
    pub photos: Arc<[String]>,
}

impl SiteRecord {
    /// Minimal record with no optional attributes.
    pub fn new(name: impl Into<String>, position: LatLon) -> Self {
        Self {
            name: name.into(),
            position,
            area: None,
            status: None,
            year_started: None,
            year_completed: None,
            developer: None,
            address: None,
            barangay: None,
            municipality: None,
            province: None,
            region: None,
            notes: None,
            author: None,
            photos: Arc::from(Vec::new()),
        }
    }

    pub fn attribute(&self, attr: Attribute) -> Option<&str> {
        let v = match attr {
            Attribute::Area => &self.area,
            Attribute::Status => &self.status,
            Attribute::YearStarted => &self.year_started,
            Attribute::YearCompleted => &self.year_completed,
            Attribute::Developer => &self.developer,
            Attribute::Address => &self.address,
            Attribute::Barangay => &self.barangay,
            Attribute::Municipality => &self.municipality,
            Attribute::Province => &self.province,
            Attribute::Region => &self.region,
            Attribute::Notes => &self.notes,
            Attribute::Author => &self.author,
        };
        v.as_deref()
    }

    fn attribute_mut(&mut self, attr: Attribute) -> &mut Option<String> {
        match attr {
            Attribute::Area => &mut self.area,
            Attribute::Status => &mut self.status,
            Attribute::YearStarted => &mut self.year_started,
            Attribute::YearCompleted => &mut self.year_completed,
            Attribute::Developer => &mut self.developer,
            Attribute::Address => &mut self.address,
            Attribute::Barangay => &mut self.barangay,
            Attribute::Municipality => &mut self.municipality,
            Attribute::Province => &mut self.province,
            Attribute::Region => &mut self.region,
            Attribute::Notes => &mut self.notes,
            Attribute::Author => &mut self.author,
        }
    }

    /// Present attributes in display order.
    pub fn present_attributes(&self) -> impl Iterator<Item = (Attribute, &str)> + '_ {
        Attribute::ALL
            .into_iter()
            .filter_map(|a| self.attribute(a).map(|v| (a, v)))
    }

    pub fn with_attribute(mut self, attr: Attribute, value: impl Into<String>) -> Self {
        *self.attribute_mut(attr) = Some(value.into());
        self
    }

    pub fn with_photos<I, S>(mut self, photos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.photos = photos.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SitesError {
    #[error("data file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("data file must be a JSON object with a `sites` array")]
    MissingSites,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("site record must be an object")]
    NotAnObject,
    #[error("site record has no name")]
    MissingName,
    #[error("site record has a blank name")]
    BlankName,
    #[error("site record has no numeric `{0}`")]
    MissingCoordinate(&'static str),
    #[error("site record has invalid coordinates: {0}")]
    InvalidCoordinate(#[from] CoordinateError),
}

/// A record that failed validation, with its position in the `sites` array.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub index: usize,
    pub name: Option<String>,
    pub reason: RecordError,
}

/// Parsed data file: valid records in file order plus what was rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitesDocument {
    pub sites: Vec<SiteRecord>,
    pub rejected: Vec<RejectedRecord>,
}

impl SitesDocument {
    pub fn from_json_str(payload: &str) -> Result<Self, SitesError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, SitesError> {
        let sites_val = value
            .as_object()
            .and_then(|obj| obj.get("sites"))
            .and_then(|v| v.as_array())
            .ok_or(SitesError::MissingSites)?;

        let mut doc = SitesDocument {
            sites: Vec::with_capacity(sites_val.len()),
            rejected: Vec::new(),
        };

        for (index, site_val) in sites_val.iter().enumerate() {
            match parse_site(site_val) {
                Ok(site) => doc.sites.push(site),
                Err(reason) => {
                    let name = site_val
                        .get("name")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    tracing::warn!(index, ?name, %reason, "rejecting site record");
                    doc.rejected.push(RejectedRecord {
                        index,
                        name,
                        reason,
                    });
                }
            }
        }

        Ok(doc)
    }
}

pub fn parse_site(value: &Value) -> Result<SiteRecord, RecordError> {
    let obj = value.as_object().ok_or(RecordError::NotAnObject)?;

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or(RecordError::MissingName)?;
    if name.trim().is_empty() {
        return Err(RecordError::BlankName);
    }

    let lat = number_field(obj, "lat")?;
    let lon = number_field(obj, "lon")?;
    let position = LatLon::checked(lat, lon)?;

    let mut site = SiteRecord::new(name, position);
    for attr in Attribute::ALL {
        let raw = obj
            .get(attr.key())
            .or_else(|| attr.alias().and_then(|a| obj.get(a)));
        *site.attribute_mut(attr) = raw.and_then(lenient_text);
    }

    site.photos = match obj.get("photos") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Arc::from(Vec::new()),
    };

    Ok(site)
}

fn number_field(obj: &Map<String, Value>, key: &'static str) -> Result<f64, RecordError> {
    obj.get(key)
        .and_then(|v| v.as_f64())
        .ok_or(RecordError::MissingCoordinate(key))
}

/// Strings and numbers become text; everything else counts as absent.
fn lenient_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_required_and_optional_fields() {
        let doc = SitesDocument::from_json_str(
            r#"{"sites": [{
                "name": "Manila Bay Reclamation",
                "lat": 14.55, "lon": 120.97,
                "status": "Ongoing",
                "area": 419,
                "year started": "2019",
                "barangay": "Baclaran",
                "municipality": "Parañaque",
                "photos": ["a.jpg", "", 7, "b.jpg"]
            }]}"#,
        )
        .unwrap();

        assert!(doc.rejected.is_empty());
        let site = &doc.sites[0];
        assert_eq!(site.name, "Manila Bay Reclamation");
        assert_eq!(site.position, LatLon::new(14.55, 120.97));
        assert_eq!(site.area.as_deref(), Some("419"));
        assert_eq!(site.year_started.as_deref(), Some("2019"));
        assert_eq!(site.developer, None);
        assert_eq!(&site.photos[..], &["a.jpg".to_string(), "b.jpg".to_string()]);
    }

    #[test]
    fn snake_case_year_aliases_are_accepted() {
        let doc = SitesDocument::from_json_str(
            r#"{"sites": [{"name": "X", "lat": 1, "lon": 2, "year_completed": 2024}]}"#,
        )
        .unwrap();
        assert_eq!(doc.sites[0].year_completed.as_deref(), Some("2024"));
    }

    #[test]
    fn malformed_optional_fields_are_absent() {
        let doc = SitesDocument::from_json_str(
            r#"{"sites": [{
                "name": "X", "lat": 1, "lon": 2,
                "status": "   ", "developer": null, "notes": {"a": 1},
                "author": true, "photos": "not-a-list"
            }]}"#,
        )
        .unwrap();
        let site = &doc.sites[0];
        assert_eq!(site.present_attributes().count(), 0);
        assert!(site.photos.is_empty());
    }

    #[test]
    fn invalid_records_are_rejected_and_order_is_kept() {
        let doc = SitesDocument::from_json_str(
            r#"{"sites": [
                {"name": "A", "lat": 1, "lon": 1},
                "junk",
                {"lat": 1, "lon": 1},
                {"name": " ", "lat": 1, "lon": 1},
                {"name": "NoLat", "lon": 1},
                {"name": "StringLat", "lat": "14.5", "lon": 1},
                {"name": "Far", "lat": 95, "lon": 1},
                {"name": "B", "lat": 2, "lon": 2}
            ]}"#,
        )
        .unwrap();

        let names: Vec<_> = doc.sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let reasons: Vec<_> = doc
            .rejected
            .iter()
            .map(|r| (r.index, r.reason.clone()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (1, RecordError::NotAnObject),
                (2, RecordError::MissingName),
                (3, RecordError::BlankName),
                (4, RecordError::MissingCoordinate("lat")),
                (5, RecordError::MissingCoordinate("lat")),
                (
                    6,
                    RecordError::InvalidCoordinate(CoordinateError::LatitudeOutOfRange)
                ),
            ]
        );
        assert_eq!(doc.rejected[4].name.as_deref(), Some("StringLat"));
    }

    #[test]
    fn document_without_sites_array_is_an_error() {
        assert!(matches!(
            SitesDocument::from_json_str(r#"{"features": []}"#),
            Err(SitesError::MissingSites)
        ));
        assert!(matches!(
            SitesDocument::from_json_str("[1, 2"),
            Err(SitesError::Json(_))
        ));
    }

    #[test]
    fn present_attributes_follow_display_order() {
        let site = SiteRecord::new("X", LatLon::new(0.0, 0.0))
            .with_attribute(Attribute::Developer, "Dev Corp")
            .with_attribute(Attribute::Area, "12");
        let order: Vec<_> = site.present_attributes().map(|(a, _)| a).collect();
        assert_eq!(order, vec![Attribute::Area, Attribute::Developer]);
    }
}
