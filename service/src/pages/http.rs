//! HTTP client for the Pagepilot backend

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

use crate::errors::DeployError;
use crate::models::page::{Page, PublishedUpdate};
use crate::pages::PageService;

/// Pages backend client authenticated with a service token
pub struct HttpPageService {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl HttpPageService {
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl PageService for HttpPageService {
    async fn fetch_page(&self, page_id: &str) -> Result<Page, DeployError> {
        let url = format!("{}/internal/pages/{}", self.base_url, page_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DeployError::NotFound(format!("page not found: {}", page_id)));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Page fetch failed: {} - {}", status, body);
            return Err(DeployError::PageApiError(format!("{}: {}", status, body)));
        }

        let page = response.json().await?;
        Ok(page)
    }

    async fn set_published(
        &self,
        page_id: &str,
        update: &PublishedUpdate,
    ) -> Result<(), DeployError> {
        let url = format!("{}/internal/pages/{}/published", self.base_url, page_id);
        debug!("PATCH {}", url);

        let response = self
            .client
            .patch(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .json(update)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Published write-back failed: {} - {}", status, body);
            return Err(DeployError::PageApiError(format!("{}: {}", status, body)));
        }

        Ok(())
    }
}
