use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::category::Category;

/// An archived ad as returned by `ads_archive`.
///
/// Creative text comes back as lists because one ad can carry several
/// creative variants. Fields the browser does not model are kept in `extra`
/// so they survive the round trip to the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    pub id: String,

    #[serde(default)]
    pub page_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ad_creative_bodies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ad_creative_link_captions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ad_creative_link_titles: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ad_creative_link_descriptions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_creation_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_delivery_start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_delivery_stop_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_snapshot_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publisher_platforms: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bylines: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_ages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_gender: Option<TargetGender>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_locations: Vec<TargetLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_audience_size: Option<BoundedRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impressions: Option<BoundedRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend: Option<BoundedRange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delivery_by_region: Vec<RegionDelivery>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub demographic_distribution: Vec<DemographicShare>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ad {
    /// Ad with only an id, handy for fixtures.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetGender {
    All,
    Women,
    Men,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetLocation {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub excluded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_obfuscated: Option<u32>,
}

/// Lower/upper bound pair. The Graph API sends these as numeric strings;
/// the top bucket has no upper bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedRange {
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub lower_bound: Option<u64>,

    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub upper_bound: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionDelivery {
    pub region: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicShare {
    #[serde(default)]
    pub age: String,

    #[serde(default)]
    pub gender: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl NumberLike {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(n) => Some(*n),
            Self::Float(f) if *f >= 0.0 => Some(f.round() as u64),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberLike>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberLike>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).unwrap_or_default())
}
