use crate::config::Config;

pub async fn cmd_test_connection(config: &Config) -> anyhow::Result<()> {
    let service = super::build_service(config)?;

    println!("Testing Facebook Ad Library API ({})...", service.api_version());

    let status = service.test_connection().await?;

    println!("✓ Status: {}", status.status);
    println!("  API version: {}", status.api_version);
    println!("  Ads returned: {}", status.response_data.data_count);
    println!(
        "  Paging: {}",
        if status.response_data.has_paging { "yes" } else { "no" }
    );
    println!("  Checked at: {}", status.response_data.timestamp.to_rfc3339());

    Ok(())
}
