//! Per-region records handed to the presentation layer.
//!
//! Serialises to the document served by the status feed:
//!
//! ```json
//! { "1": { "temp": 41.3, "center": [120, 80], "radius": 14 } }
//! ```

use std::collections::BTreeMap;

use serde_derive::*;

use crate::region::{Point, Region};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegionStatus {
    /// Rounded to one decimal.
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub center: Point,
    pub radius: u32,
}

impl From<&Region> for RegionStatus {
    fn from(region: &Region) -> Self {
        RegionStatus {
            temperature: round_to_tenth(region.temperature),
            center: region.center,
            radius: region.radius,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct StatusReport(pub BTreeMap<String, RegionStatus>);

impl StatusReport {
    pub fn from_regions(regions: &BTreeMap<String, Region>) -> Self {
        StatusReport(
            regions
                .iter()
                .map(|(slot, region)| (slot.clone(), region.into()))
                .collect(),
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.).round() / 10.
}
