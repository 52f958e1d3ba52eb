//! External product feed client.
//!
//! The feed is the source of truth for products and sales; nothing
//! catalog-shaped lives in our database. The product list is cached with
//! `moka` (5-minute TTL) because every catalog request starts from the full
//! list; sales are fetched per view, uncached.

mod types;

pub use types::{Product, Sale};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use greengrocer_core::ProductId;

use crate::config::FeedConfig;
use types::{FeedProduct, FeedSale};

/// Cache key for the full product list (the feed has exactly one).
const PRODUCTS_CACHE_KEY: &str = "products";

/// Errors that can occur when talking to the feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP transport error.
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("feed returned status {0}")]
    Status(reqwest::StatusCode),

    /// The response body was not the expected JSON.
    #[error("failed to parse feed response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but violated a data invariant.
    #[error("feed data error: {0}")]
    Data(String),
}

/// Client for the external product feed.
///
/// Cheaply cloneable; the HTTP client and cache are shared.
#[derive(Clone)]
pub struct FeedClient {
    inner: Arc<FeedClientInner>,
}

struct FeedClientInner {
    client: reqwest::Client,
    base_url: String,
    products_cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl FeedClient {
    /// Create a new feed client.
    #[must_use]
    pub fn new(config: &FeedConfig) -> Self {
        let products_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(FeedClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                products_cache,
            }),
        }
    }

    /// Get the full product list, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` if the feed is unreachable, answers with an
    /// error status, or sends data violating the product invariants.
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, FeedError> {
        if let Some(cached) = self.inner.products_cache.get(PRODUCTS_CACHE_KEY).await {
            return Ok(cached);
        }

        let url = format!("{}/products", self.inner.base_url);
        let wire: Vec<FeedProduct> = self.fetch_json(&url).await?;

        let products: Vec<Product> = wire
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;

        let products = Arc::new(products);
        self.inner
            .products_cache
            .insert(PRODUCTS_CACHE_KEY, Arc::clone(&products))
            .await;

        Ok(products)
    }

    /// Get the sale history for one product.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` if the feed is unreachable, answers with an
    /// error status, or sends data violating the sale invariants.
    pub async fn product_sales(&self, id: ProductId) -> Result<Vec<Sale>, FeedError> {
        let url = format!("{}/product-sales?id={}", self.inner.base_url, id);
        let wire: Vec<FeedSale> = self.fetch_json(&url).await?;

        wire.into_iter().map(TryInto::try_into).collect()
    }

    /// GET a URL and decode its JSON body.
    ///
    /// The body is read as text first so a decode failure can log what the
    /// feed actually sent.
    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self.inner.client.get(url).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                url = %url,
                body = %body.chars().take(500).collect::<String>(),
                "Feed returned non-success status"
            );
            return Err(FeedError::Status(status));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                url = %url,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse feed response"
            );
            FeedError::Parse(e)
        })
    }
}
