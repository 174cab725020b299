//! Documentation Fetcher
//!
//! Retrieves the raw markdown page for a resource type. Transport problems
//! never escape this module: they become [`FetchOutcome::Failed`].

use crate::config::Config;
use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of looking up a resource type's documentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page text
    Found(String),
    /// No page under the direct name or any naming variant
    NotFound,
    /// Timeout or transport error
    Failed(String),
}

/// Anything that can produce documentation text for a resource type
#[allow(async_fn_in_trait)]
pub trait DocSource {
    async fn fetch(&self, resource_type: &str) -> FetchOutcome;
}

/// HTTP client for the provider's documentation host
#[derive(Clone)]
pub struct DocsClient {
    client: Client,
    base_url: String,
    provider_prefix: String,
}

impl DocsClient {
    /// Create a new documentation client
    pub fn new(base_url: &str, provider_prefix: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("importsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider_prefix: provider_prefix.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.docs_base_url,
            &config.provider_prefix,
            config.request_timeout(),
        )
    }

    /// Page name for a resource type: the type without its provider prefix
    pub fn page_name<'a>(&self, resource_type: &'a str) -> &'a str {
        resource_type
            .strip_prefix(self.provider_prefix.as_str())
            .unwrap_or(resource_type)
    }

    /// Build the documentation URL for a page name
    pub fn page_url(&self, page_name: &str) -> String {
        format!(
            "{}/{}.html.markdown",
            self.base_url,
            urlencoding::encode(page_name)
        )
    }

    /// GET a page, returning its body only on 200
    async fn get(&self, url: &str) -> Result<(StatusCode, Option<String>)> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/plain")
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!("{} -> {}", url, status);
            return Ok((status, None));
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok((status, Some(body)))
    }

    async fn try_fetch(&self, resource_type: &str) -> Result<Option<String>> {
        let page = self.page_name(resource_type);
        let (status, body) = self.get(&self.page_url(page)).await?;

        if status != StatusCode::NOT_FOUND {
            return Ok(body);
        }

        for variant in naming_variants(page) {
            let (_, body) = self.get(&self.page_url(&variant)).await?;
            if body.is_some() {
                tracing::debug!("Found {} under variant {}", resource_type, variant);
                return Ok(body);
            }
        }

        Ok(None)
    }
}

impl DocSource for DocsClient {
    async fn fetch(&self, resource_type: &str) -> FetchOutcome {
        match self.try_fetch(resource_type).await {
            Ok(Some(text)) => FetchOutcome::Found(text),
            Ok(None) => {
                tracing::info!("No documentation page for {}", resource_type);
                FetchOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!("Fetching documentation for {} failed: {:#}", resource_type, e);
                FetchOutcome::Failed(format!("{:#}", e))
            }
        }
    }
}

/// Alternative page names tried after a 404: hyphenated, then pluralized
pub fn naming_variants(page_name: &str) -> Vec<String> {
    let mut variants = Vec::with_capacity(2);
    let hyphenated = page_name.replace('_', "-");
    if hyphenated != page_name {
        variants.push(hyphenated);
    }
    variants.push(format!("{}s", page_name));
    variants
}
