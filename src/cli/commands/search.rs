use crate::api::validation::{parse_choice, validate_countries, validate_limit};
use crate::config::Config;
use crate::models::{Ad, SearchParams, SearchType};

pub struct SearchArgs {
    pub terms: String,
    pub country: String,
    pub limit: Option<String>,
    pub media_type: Option<String>,
    pub active_status: Option<String>,
    pub exact: bool,
}

pub async fn cmd_search_ads(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let mut params = SearchParams::keyword(args.terms.trim(), validate_countries(&args.country)?);
    params.media_type = parse_choice(args.media_type.as_deref())?;
    params.ad_active_status = parse_choice(args.active_status.as_deref())?;
    if args.exact {
        params.search_type = SearchType::KeywordExactPhrase;
    }

    let limit = validate_limit(
        args.limit.as_deref(),
        config.facebook.page_size(),
        config.facebook.max_results_cap,
    )?;

    let service = super::build_service(config)?;

    println!(
        "Searching for: {} ({})",
        params.search_terms,
        params.country.join(", ")
    );

    let response = service.search_ads(&params, limit).await?;

    if response.data.is_empty() {
        println!("No ads found matching '{}'", params.search_terms);
        return Ok(());
    }

    println!();
    println!("Ads ({}):", response.data.len());
    println!("{:-<70}", "");

    for ad in &response.data {
        print_ad(ad);
    }

    if response.paging.is_some() {
        println!("More ads are available. Raise --limit to fetch them.");
    }

    Ok(())
}

fn print_ad(ad: &Ad) {
    println!("• {} (ID: {})", ad.page_name, ad.id);

    if let Some(body) = ad.ad_creative_bodies.first() {
        let preview: String = body.chars().take(120).collect();
        let ellipsis = if body.chars().count() > 120 { "..." } else { "" };
        println!("  {preview}{ellipsis}");
    }

    if let Some(start) = &ad.ad_delivery_start_time {
        let stop = ad.ad_delivery_stop_time.as_deref().unwrap_or("running");
        println!("  Delivery: {start} → {stop}");
    }

    if !ad.publisher_platforms.is_empty() {
        println!("  Platforms: {}", ad.publisher_platforms.join(", "));
    }

    if let Some(url) = &ad.ad_snapshot_url {
        println!("  Snapshot: {url}");
    }

    println!();
}
