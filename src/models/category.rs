use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of labels the categorization pass may attach to an ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "E-Commerce & Online Shopping")]
    ECommerce,
    #[serde(rename = "Health & Wellness")]
    HealthWellness,
    #[serde(rename = "Beauty & Personal Care")]
    BeautyPersonalCare,
    #[serde(rename = "Fashion & Accessories")]
    FashionAccessories,
    #[serde(rename = "Home & Living")]
    HomeLiving,
    #[serde(rename = "Parenting & Baby Products")]
    ParentingBaby,
    #[serde(rename = "Pets & Animal Care")]
    PetsAnimalCare,
    #[serde(rename = "Technology & Gadgets")]
    TechnologyGadgets,
    #[serde(rename = "Finance & Investing")]
    FinanceInvesting,
    #[serde(rename = "Education & Online Learning")]
    Education,
    #[serde(rename = "Business & Entrepreneurship")]
    Business,
    #[serde(rename = "Relationships & Dating")]
    RelationshipsDating,
    #[serde(rename = "Self-Improvement & Motivation")]
    SelfImprovement,
    #[serde(rename = "Travel & Tourism")]
    TravelTourism,
    #[serde(rename = "Food & Cooking")]
    FoodCooking,
    #[serde(rename = "Automotive & Transportation")]
    Automotive,
    #[serde(rename = "Outdoor & Adventure")]
    OutdoorAdventure,
    #[serde(rename = "Entertainment & Pop Culture")]
    Entertainment,
    #[serde(rename = "Legal & Consulting Services")]
    LegalConsulting,
    #[serde(rename = "Events & Experiences")]
    EventsExperiences,
    #[serde(rename = "Others")]
    Others,
}

impl Category {
    pub const ALL: [Self; 21] = [
        Self::ECommerce,
        Self::HealthWellness,
        Self::BeautyPersonalCare,
        Self::FashionAccessories,
        Self::HomeLiving,
        Self::ParentingBaby,
        Self::PetsAnimalCare,
        Self::TechnologyGadgets,
        Self::FinanceInvesting,
        Self::Education,
        Self::Business,
        Self::RelationshipsDating,
        Self::SelfImprovement,
        Self::TravelTourism,
        Self::FoodCooking,
        Self::Automotive,
        Self::OutdoorAdventure,
        Self::Entertainment,
        Self::LegalConsulting,
        Self::EventsExperiences,
        Self::Others,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ECommerce => "E-Commerce & Online Shopping",
            Self::HealthWellness => "Health & Wellness",
            Self::BeautyPersonalCare => "Beauty & Personal Care",
            Self::FashionAccessories => "Fashion & Accessories",
            Self::HomeLiving => "Home & Living",
            Self::ParentingBaby => "Parenting & Baby Products",
            Self::PetsAnimalCare => "Pets & Animal Care",
            Self::TechnologyGadgets => "Technology & Gadgets",
            Self::FinanceInvesting => "Finance & Investing",
            Self::Education => "Education & Online Learning",
            Self::Business => "Business & Entrepreneurship",
            Self::RelationshipsDating => "Relationships & Dating",
            Self::SelfImprovement => "Self-Improvement & Motivation",
            Self::TravelTourism => "Travel & Tourism",
            Self::FoodCooking => "Food & Cooking",
            Self::Automotive => "Automotive & Transportation",
            Self::OutdoorAdventure => "Outdoor & Adventure",
            Self::Entertainment => "Entertainment & Pop Culture",
            Self::LegalConsulting => "Legal & Consulting Services",
            Self::EventsExperiences => "Events & Experiences",
            Self::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown category: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_name() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn parse_is_exact() {
        assert!("health & wellness".parse::<Category>().is_err());
        assert!("All".parse::<Category>().is_err());
    }
}
