//! HTTP client for the Art Institute of Chicago artworks API.
//!
//! The service pages are one-based (`?page=1` is the first page); the
//! `CatalogClient` contract is zero-based, so the offset is applied here and
//! nowhere else.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CatalogClient, CatalogError};
use crate::config::Config;
use crate::model::{Artwork, Page};

/// Fields requested from the service; everything else is dropped server-side.
const ARTWORK_FIELDS: &str = "id,title,place_of_origin,artist_display,inscriptions,date_start,date_end";

#[derive(Debug, Deserialize)]
struct ArtworksResponse {
    data: Vec<Artwork>,
    pagination: PaginationInfo,
}

#[derive(Debug, Deserialize)]
struct PaginationInfo {
    total: usize,
}

/// Catalog client backed by the public artworks endpoint.
#[derive(Debug, Clone)]
pub struct ArticClient {
    http: Client,
    base_url: String,
}

impl ArticClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, CatalogError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CatalogError::Network(format!("building http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        Self::new(
            config.api_base_url.clone(),
            config.request_timeout(),
            &config.user_agent,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn page_url(&self, page_index: usize, page_size: usize) -> String {
        format!(
            "{}/artworks?page={}&limit={page_size}&fields={ARTWORK_FIELDS}",
            self.base_url,
            page_index + 1
        )
    }
}

fn transport_error(err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout(err.to_string())
    } else if err.is_decode() {
        CatalogError::MalformedResponse(err.to_string())
    } else {
        CatalogError::Network(err.to_string())
    }
}

/// Decode a response body into the page it represents.
pub fn decode_page_body(body: &str, page_index: usize) -> Result<Page, CatalogError> {
    let parsed: ArtworksResponse = serde_json::from_str(body)
        .map_err(|e| CatalogError::MalformedResponse(e.to_string()))?;
    Ok(Page {
        page_index,
        items: parsed.data,
        total_count: parsed.pagination.total,
    })
}

#[async_trait]
impl CatalogClient for ArticClient {
    fn id(&self) -> &str {
        "artic"
    }

    async fn fetch_page(&self, page_index: usize, page_size: usize) -> Result<Page, CatalogError> {
        let url = self.page_url(page_index, page_size);
        debug!(%url, page_index, page_size, "catalog: fetching page");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        decode_page_body(&body, page_index)
    }
}
