use crate::shared::error::RemediationError;
use crate::shared::Result;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Builds the shared HTTP client with the tool's user agent
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let version = env!("CARGO_PKG_VERSION");
    let user_agent = format!("autoheal/{}", version);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// GETs `url` and decodes a JSON body. A 404 yields `None`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    service: &str,
    url: &str,
) -> Result<Option<T>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RemediationError::from_reqwest(service, e))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(RemediationError::from_status(service, status).into());
    }

    let body = response
        .json::<T>()
        .await
        .map_err(|e| RemediationError::from_reqwest(service, e))?;
    Ok(Some(body))
}
