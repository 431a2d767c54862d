//! HTTP client construction

use crate::errors::LoadTestError;
use reqwest::Client;
use tracing::debug;
use vaultload_config::HttpConfig;

/// Build the shared client for dispatch, polling and attacks
pub fn build_client(config: &HttpConfig) -> Result<Client, LoadTestError> {
    debug!(
        "Creating HTTP client with timeout: {}s",
        config.timeout.as_secs()
    );

    let client = Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent)
        .danger_accept_invalid_certs(!config.verify_ssl)
        .redirect(reqwest::redirect::Policy::limited(
            config.max_redirects as usize,
        ))
        .pool_max_idle_per_host(config.max_idle_per_host)
        .build()?;

    Ok(client)
}
