use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Case-insensitive lookup of an upstream enum value among `variants`.
fn parse_upstream<T: Copy>(
    kind: &str,
    raw: &str,
    variants: &[T],
    as_str: fn(T) -> &'static str,
) -> Result<T, String> {
    let wanted = raw.trim().to_ascii_uppercase();
    variants
        .iter()
        .copied()
        .find(|v| as_str(*v) == wanted)
        .ok_or_else(|| {
            let expected: Vec<&str> = variants.iter().map(|v| as_str(*v)).collect();
            format!(
                "Invalid {}: '{}'. Expected one of: {}",
                kind,
                raw,
                expected.join(", ")
            )
        })
}

/// Phrase match vs. unordered keywords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchType {
    #[default]
    KeywordUnordered,
    KeywordExactPhrase,
}

impl SearchType {
    pub const VARIANTS: [Self; 2] = [Self::KeywordUnordered, Self::KeywordExactPhrase];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeywordUnordered => "KEYWORD_UNORDERED",
            Self::KeywordExactPhrase => "KEYWORD_EXACT_PHRASE",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_upstream("search_type", s, &Self::VARIANTS, Self::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdType {
    #[default]
    All,
    PoliticalAndIssueAds,
}

impl AdType {
    pub const VARIANTS: [Self; 2] = [Self::All, Self::PoliticalAndIssueAds];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::PoliticalAndIssueAds => "POLITICAL_AND_ISSUE_ADS",
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_upstream("ad_type", s, &Self::VARIANTS, Self::as_str)
    }
}

/// Whether ads still delivering, finished, or both are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActiveStatus {
    #[default]
    Active,
    All,
    Inactive,
}

impl ActiveStatus {
    pub const VARIANTS: [Self; 3] = [Self::Active, Self::All, Self::Inactive];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::All => "ALL",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for ActiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActiveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_upstream("ad_active_status", s, &Self::VARIANTS, Self::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    #[default]
    All,
    Image,
    Meme,
    Video,
    None,
}

impl MediaType {
    pub const VARIANTS: [Self; 5] = [
        Self::All,
        Self::Image,
        Self::Meme,
        Self::Video,
        Self::None,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Image => "IMAGE",
            Self::Meme => "MEME",
            Self::Video => "VIDEO",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_upstream("media_type", s, &Self::VARIANTS, Self::as_str)
    }
}

/// Filters for one Ad Library search. Built once from validated input and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub search_terms: String,

    #[serde(default)]
    pub search_type: SearchType,

    #[serde(default)]
    pub ad_type: AdType,

    /// ISO 3166 alpha-2 codes the ads reached.
    pub country: Vec<String>,

    #[serde(default)]
    pub ad_active_status: ActiveStatus,

    #[serde(default)]
    pub media_type: MediaType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_delivery_date_min: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_delivery_date_max: Option<NaiveDate>,
}

impl SearchParams {
    /// Keyword search over the given countries with every other filter at
    /// its default.
    pub fn keyword<I, S>(search_terms: impl Into<String>, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_terms: search_terms.into(),
            search_type: SearchType::default(),
            ad_type: AdType::default(),
            country: countries.into_iter().map(Into::into).collect(),
            ad_active_status: ActiveStatus::default(),
            media_type: MediaType::default(),
            ad_delivery_date_min: None,
            ad_delivery_date_max: None,
        }
    }

    /// Checks the invariants the upstream API relies on and reports every
    /// violation at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.country.is_empty() {
            problems.push("At least one country code is required".to_string());
        }

        for code in &self.country {
            if !is_country_code(code) {
                problems.push(format!(
                    "Invalid country code '{code}': expected two ASCII letters"
                ));
            }
        }

        if let (Some(min), Some(max)) = (self.ad_delivery_date_min, self.ad_delivery_date_max)
            && min > max
        {
            problems.push(format!(
                "ad_delivery_date_min ({min}) must not be after ad_delivery_date_max ({max})"
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

#[must_use]
pub fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}
