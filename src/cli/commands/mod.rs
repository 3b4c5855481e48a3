mod config;
mod connection;
mod search;

pub use config::cmd_show_config;
pub use connection::cmd_test_connection;
pub use search::{SearchArgs, cmd_search_ads};

use std::sync::Arc;

use crate::clients::open_api_log;
use crate::config::Config;
use crate::services::{AdLibraryService, AdLibraryServiceFactory};

fn build_service(config: &Config) -> anyhow::Result<Arc<dyn AdLibraryService>> {
    if !config.facebook.is_configured() {
        anyhow::bail!(
            "Facebook API access token not configured. Set FB_ACCESS_TOKEN or edit config.toml"
        );
    }

    let api_log = open_api_log(
        config.general.api_log_enabled,
        &config.general.api_log_dir,
        "facebook-api",
    );

    Ok(AdLibraryServiceFactory::create(
        &config.facebook,
        None,
        api_log,
    )?)
}
