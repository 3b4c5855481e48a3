//! Batch categorization of ads through a generative text backend.
//!
//! All ads of a search go out in a single prompt; the backend answers one
//! `#N: CategoryA, CategoryB` line per ad, which is parsed back into labels
//! from the fixed [`Category`] set.

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::clients::http::HttpError;
use crate::constants;
use crate::logging::Logger;
use crate::models::{Ad, Category};

#[derive(Debug, Error)]
pub enum CategorizationError {
    #[error("Categorization backend error: {0}")]
    Backend(#[from] HttpError),

    #[error("Categorization backend returned no candidates")]
    EmptyResponse,
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CategorizationError>;
}

/// The text of an ad that categorization looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdContent {
    pub page_name: String,
    pub ad_creative_bodies: Vec<String>,
    pub ad_creative_link_captions: Vec<String>,
    pub ad_creative_link_titles: Vec<String>,
}

impl From<&Ad> for AdContent {
    fn from(ad: &Ad) -> Self {
        Self {
            page_name: ad.page_name.clone(),
            ad_creative_bodies: ad.ad_creative_bodies.clone(),
            ad_creative_link_captions: ad.ad_creative_link_captions.clone(),
            ad_creative_link_titles: ad.ad_creative_link_titles.clone(),
        }
    }
}

/// Labelled lines for one ad, cut to `MAX_AD_CHARS` characters with `...`
/// appended when anything was dropped.
#[must_use]
pub fn format_ad_content(ad: &AdContent) -> String {
    let content = format!(
        "page_name: {}\nad_creative_bodies: {}\nad_creative_link_captions: {}\nad_creative_link_titles: {}",
        ad.page_name,
        ad.ad_creative_bodies.join(" "),
        ad.ad_creative_link_captions.join(" "),
        ad.ad_creative_link_titles.join(" "),
    );
    let content = content.trim();

    let max = constants::categorization::MAX_AD_CHARS;
    if content.chars().count() > max {
        let mut truncated: String = content.chars().take(max).collect();
        truncated.push_str("...");
        truncated
    } else {
        content.to_string()
    }
}

#[must_use]
pub fn build_prompt(ads: &[AdContent]) -> String {
    let categories = Category::ALL
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    let formatted_ads = ads
        .iter()
        .enumerate()
        .map(|(i, ad)| format!("#{} ad: {}", i + 1, format_ad_content(ad)))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::from(
        "There are parsed ads from facebook. And I need you to categorize given ads into following categories. One ad can fall into few categories.\n\n",
    );
    let _ = write!(prompt, "{categories}\n\n{formatted_ads}\n\n");
    prompt.push_str(
        "Respond in the following format for each ad:\n#1: Category1, Category2\n#2: Category1\n...\nOnly include the ad number and categories, nothing else.",
    );
    prompt
}

/// Maps 1-based ad ordinals to the known categories on their line. Lines
/// that do not look like `#N: ...` are ignored, as are unknown category
/// names; an ad left with no known category gets no entry.
#[must_use]
pub fn parse_response(response: &str) -> BTreeMap<usize, Vec<Category>> {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    let line_re = LINE_RE.get_or_init(|| Regex::new(r"^#(\d+):\s*(.+)$").expect("Invalid regex"));

    let mut results = BTreeMap::new();

    for line in response.lines() {
        let Some(caps) = line_re.captures(line.trim()) else {
            continue;
        };
        let Ok(ordinal) = caps[1].parse::<usize>() else {
            continue;
        };

        let categories: Vec<Category> = caps[2]
            .split(',')
            .filter_map(|name| name.trim().parse().ok())
            .collect();

        if !categories.is_empty() {
            results.insert(ordinal, categories);
        }
    }

    results
}

/// Attaches parsed categories to `ads` by 1-based position.
pub fn apply_categories(ads: &mut [Ad], categories: &BTreeMap<usize, Vec<Category>>) {
    for (i, ad) in ads.iter_mut().enumerate() {
        if let Some(found) = categories.get(&(i + 1)) {
            ad.categories = Some(found.clone());
        }
    }
}

pub struct CategorizationService {
    generator: Arc<dyn TextGenerator>,
    logger: Logger,
}

impl CategorizationService {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            logger: Logger::new("Categorization"),
        }
    }

    pub async fn categorize_ads(
        &self,
        ads: &[AdContent],
    ) -> Result<BTreeMap<usize, Vec<Category>>, CategorizationError> {
        if ads.is_empty() {
            return Ok(BTreeMap::new());
        }

        let prompt = build_prompt(ads);
        self.logger.debug(
            "Sending categorization prompt",
            &json!({"ads": ads.len(), "promptChars": prompt.len()}),
        );

        let response = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                self.logger
                    .error("Error categorizing ads", &e, &json!({"ads": ads.len()}));
                return Err(e);
            }
        };

        let categorized = parse_response(&response);
        self.logger.debug(
            "Parsed categories",
            &json!({"ads": ads.len(), "categorized": categorized.len()}),
        );

        Ok(categorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedGenerator {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        fn new(reply: Result<&str, ()>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, CategorizationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|()| CategorizationError::EmptyResponse)
        }
    }

    fn content(page: &str, body: &str) -> AdContent {
        AdContent {
            page_name: page.to_string(),
            ad_creative_bodies: vec![body.to_string()],
            ..AdContent::default()
        }
    }

    #[test]
    fn parses_valid_lines_and_drops_unknown_categories() {
        let parsed = parse_response(
            "#1: Health & Wellness, Beauty & Personal Care\n#2: garbage-not-a-category",
        );

        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[&1],
            vec![Category::HealthWellness, Category::BeautyPersonalCare]
        );
    }

    #[test]
    fn ignores_chatter_around_answer_lines() {
        let parsed = parse_response(
            "Sure! Here you go:\n\n#1: Others, Made Up\r\n#3:Food & Cooking\nThanks",
        );

        assert_eq!(parsed[&1], vec![Category::Others]);
        assert_eq!(parsed[&3], vec![Category::FoodCooking]);
        assert!(!parsed.contains_key(&2));
    }

    #[test]
    fn truncates_long_ads() {
        let ad = content("Page", &"x".repeat(2000));
        let formatted = format_ad_content(&ad);

        assert!(formatted.ends_with("..."));
        assert_eq!(formatted.chars().count(), 803);
        assert!(formatted.starts_with("page_name: Page\nad_creative_bodies: "));
    }

    #[test]
    fn short_ads_are_untouched() {
        let formatted = format_ad_content(&content("Cafe", "Fresh coffee"));
        assert_eq!(
            formatted,
            "page_name: Cafe\nad_creative_bodies: Fresh coffee\nad_creative_link_captions: \nad_creative_link_titles:"
        );
    }

    #[test]
    fn prompt_lists_categories_and_numbers_ads() {
        let prompt = build_prompt(&[content("A", "one"), content("B", "two")]);

        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()));
        }
        assert!(prompt.contains("#1 ad: page_name: A"));
        assert!(prompt.contains("#2 ad: page_name: B"));
        assert!(prompt.ends_with("Only include the ad number and categories, nothing else."));
    }

    #[tokio::test]
    async fn service_sends_one_prompt_and_parses_reply() {
        let generator = Arc::new(CannedGenerator::new(Ok("#1: Technology & Gadgets\n#2: Others")));
        let service = CategorizationService::new(generator.clone());

        let result = service
            .categorize_ads(&[content("A", "laptop"), content("B", "misc")])
            .await
            .unwrap();

        assert_eq!(result[&1], vec![Category::TechnologyGadgets]);
        assert_eq!(result[&2], vec![Category::Others]);
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_skips_backend() {
        let generator = Arc::new(CannedGenerator::new(Ok("")));
        let service = CategorizationService::new(generator.clone());

        assert!(service.categorize_ads(&[]).await.unwrap().is_empty());
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_errors_propagate() {
        let service = CategorizationService::new(Arc::new(CannedGenerator::new(Err(()))));
        assert!(service.categorize_ads(&[content("A", "x")]).await.is_err());
    }

    #[test]
    fn categories_attach_by_position() {
        let mut ads = vec![Ad::with_id("a"), Ad::with_id("b")];
        let categories = BTreeMap::from([(2, vec![Category::Others])]);

        apply_categories(&mut ads, &categories);

        assert_eq!(ads[0].categories, None);
        assert_eq!(ads[1].categories, Some(vec![Category::Others]));
    }
}
