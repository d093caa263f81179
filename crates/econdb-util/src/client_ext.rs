use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::trace;

/// Some sources turn away requests that don't look like they came from a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Build a [`reqwest::Client`] with a fixed per-request `timeout`.
///
/// The timeout covers the whole request (connect, headers and body), so a single
/// slow endpoint can never hold up its caller for longer than `timeout`.
pub fn build_client(user_agent: Option<&str>, timeout: Duration) -> reqwest::Result<Client> {
    let mut builder = reqwest::ClientBuilder::new().timeout(timeout);
    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent);
    }
    builder.build()
}

/// What a response status means for a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    /// The endpoint answered, but holds nothing for the request.
    NotFound,
    Failed(StatusCode),
}

pub fn classify(status: StatusCode) -> StatusClass {
    match status {
        StatusCode::OK => StatusClass::Ok,
        StatusCode::NOT_FOUND => StatusClass::NotFound,
        other => StatusClass::Failed(other),
    }
}

pub trait ClientUtilExt {
    fn fetch_text(&self, url: &str) -> impl Future<Output = reqwest::Result<(StatusCode, String)>> + Send;
}

impl ClientUtilExt for Client {
    /// GET `url`, returning the status alongside the full body text.
    ///
    /// The status is handed back rather than checked, so callers decide which
    /// codes are fatal for them.
    async fn fetch_text(&self, url: &str) -> reqwest::Result<(StatusCode, String)> {
        let response = self.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!("GET {url} -> {status} ({} bytes)", body.len());
        Ok((status, body))
    }
}
