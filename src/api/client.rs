use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{redirect, Client, StatusCode};

use super::types::{SearchRequest, SearchResponse, SessionToken};
use crate::core::config::SiteConfig;
use crate::core::{Result, SyncError};

pub const SEARCH_PATH: &str = "/webapi/zoeken/find/";
pub const PROBE_PATH: &str = "/webapi/InschrijfgegevensComponent/Data/";

/// Outcome of a session probe that reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Valid,
    Rejected(u16),
}

/// Authenticated calls against the listings site.
///
/// `probe` returns `Err` only for transport failures; any HTTP answer is a
/// [`ProbeStatus`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteApi: Send + Sync {
    async fn probe(&self, token: &SessionToken) -> Result<ProbeStatus>;

    async fn find(&self, token: &SessionToken, filter: &str) -> Result<SearchResponse>;
}

pub struct SiteClient {
    client: Client,
    endpoint: String,
    session_cookie: String,
    hide_units: Option<String>,
}

impl SiteClient {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        // A redirect means the site sent us to the login page.
        let client = Client::builder()
            .timeout(site.request_timeout())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| SyncError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: site.endpoint().to_string(),
            session_cookie: site.session_cookie.clone(),
            hide_units: site.hide_units.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

#[async_trait]
impl SiteApi for SiteClient {
    async fn probe(&self, token: &SessionToken) -> Result<ProbeStatus> {
        let response = self
            .client
            .get(self.url(PROBE_PATH))
            .header(COOKIE, token.cookie_header(&self.session_cookie))
            .send()
            .await
            .map_err(|e| SyncError::fetch(format!("Session probe failed: {}", e)))?;

        let status = response.status();
        tracing::debug!("Session probe answered {}", status);

        if status == StatusCode::OK {
            Ok(ProbeStatus::Valid)
        } else {
            Ok(ProbeStatus::Rejected(status.as_u16()))
        }
    }

    async fn find(&self, token: &SessionToken, filter: &str) -> Result<SearchResponse> {
        let body = SearchRequest::new(filter.to_string(), self.hide_units.as_deref());

        let response = self
            .client
            .post(self.url(SEARCH_PATH))
            .header(COOKIE, token.cookie_header(&self.session_cookie))
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::fetch(format!("Search request '{}' failed: {}", filter, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Search API error: {} - {}", status, error_text);
            return Err(SyncError::fetch(format!(
                "Search request '{}' returned {}",
                filter, status
            )));
        }

        response.json::<SearchResponse>().await.map_err(|e| {
            SyncError::fetch(format!("Failed to parse search response for '{}': {}", filter, e))
        })
    }
}
