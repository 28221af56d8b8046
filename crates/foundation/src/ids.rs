use serde::{Deserialize, Serialize};

/// Stable identifier of a loaded site: its position in load order.
///
/// Ids are handed out once by the site repository and never reused within a
/// session, so they are safe to embed in popup markup and result rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(u32);

impl SiteId {
    pub fn new(index: u32) -> Self {
        SiteId(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SiteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(SiteId)
    }
}

#[cfg(test)]
mod tests {
    use super::SiteId;

    #[test]
    fn parses_from_markup_attribute() {
        let id: SiteId = " 12 ".parse().unwrap();
        assert_eq!(id, SiteId::new(12));
        assert_eq!(id.to_string(), "12");
        assert!("twelve".parse::<SiteId>().is_err());
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&SiteId::new(3)).unwrap();
        assert_eq!(json, "3");
    }
}
