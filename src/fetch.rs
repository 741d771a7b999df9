use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, warn};

pub const BASE_URL: &str = "https://movie.douban.com/top250";
pub const PAGE_SIZE: u32 = 25;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

pub fn client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch one listing page. A fetch failure is an error; an empty but
/// successful page comes back as Ok with a body containing no list items,
/// which the caller uses to stop paginating early.
pub async fn fetch_page(client: &Client, start: u32) -> Result<String> {
    for attempt in 0..MAX_RETRIES {
        debug!("Fetching {} with start={}", BASE_URL, start);
        match try_fetch(client, start).await {
            Ok(body) => return Ok(body),
            Err(err) if is_retryable(&err) => {
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "Fetch for start={} failed ({}), retrying in {:.1}s (attempt {}/{})",
                    start,
                    err,
                    backoff.as_secs_f64(),
                    attempt + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(backoff).await;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Request for start={start} failed"))
            }
        }
    }

    try_fetch(client, start)
        .await
        .with_context(|| format!("Request for start={start} failed after {MAX_RETRIES} retries"))
}

async fn try_fetch(client: &Client, start: u32) -> Result<String, reqwest::Error> {
    client
        .get(BASE_URL)
        .query(&[("start", start.to_string()), ("filter", String::new())])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

fn is_retryable(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    match err.status() {
        Some(status) => status.as_u16() == 429 || status.is_server_error(),
        None => false,
    }
}
