use foundation::geo::LatLon;
use serde::Deserialize;

/// Viewer configuration. Every field has a default so partial JSON works.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub initial_center: LatLon,
    pub initial_zoom: u8,
    /// Zoom used when a search result is selected.
    pub select_zoom: u8,
    /// Delay between recentering and opening the popup. Zero opens at once.
    pub popup_delay_ms: u64,
    pub max_zoom: u8,
    pub tile_url: String,
    pub attribution: String,
    pub data_url: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            // Geographic center of the Philippines.
            initial_center: LatLon::new(12.8797, 121.7740),
            initial_zoom: 6,
            select_zoom: 15,
            popup_delay_ms: 500,
            max_zoom: 19,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            data_url: "data.json".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} {zoom} exceeds max_zoom {max}")]
    ZoomOutOfRange {
        field: &'static str,
        zoom: u8,
        max: u8,
    },
}

impl MapConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = serde_json::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, zoom) in [
            ("initial_zoom", self.initial_zoom),
            ("select_zoom", self.select_zoom),
        ] {
            if zoom > self.max_zoom {
                return Err(ConfigError::ZoomOutOfRange {
                    field,
                    zoom,
                    max: self.max_zoom,
                });
            }
        }
        Ok(())
    }
}
