//! HTTP integration for listing and market data.
//!
//! Both endpoints return loosely typed JSON. Successful payloads are written
//! through to the disk cache so later runs can fall back to them.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::data::cache::DiskCache;
use crate::data::provider::{EntitySource, IngestedEntities, ReferenceProvider};
use crate::data::reference::ReferenceDataset;
use crate::error::{AppError, ProviderError};
use crate::io::ingest::entities_from_value;

const ENV_BASE: &str = "MPI_API_BASE";
const ENV_KEY: &str = "MPI_API_KEY";

pub struct RemoteClient {
    client: Client,
    base_url: String,
    api_key: String,
    cache: DiskCache,
}

impl RemoteClient {
    pub fn from_env(cache: DiskCache, timeout: Duration) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var(ENV_BASE)
            .map_err(|_| AppError::new(2, format!("Missing {ENV_BASE} in environment (.env).")))?;
        let api_key = std::env::var(ENV_KEY)
            .map_err(|_| AppError::new(2, format!("Missing {ENV_KEY} in environment (.env).")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            cache,
        })
    }

    fn get_json(&self, path: &str) -> Result<Value, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(url.clone())
                } else {
                    ProviderError::Unavailable(format!("request to {url} failed: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "{url} returned status {}",
                resp.status()
            )));
        }

        resp.json()
            .map_err(|e| ProviderError::Malformed(format!("{url}: {e}")))
    }
}

impl EntitySource for RemoteClient {
    fn name(&self) -> &str {
        "remote"
    }

    fn fetch_entities(&self) -> Result<IngestedEntities, AppError> {
        let value = self
            .get_json("listings")
            .map_err(|e| AppError::new(4, e.to_string()))?;
        let ingest = entities_from_value(&value)?;
        if let Err(e) = self.cache.write(&self.cache.entities_path(), &value) {
            tracing::warn!(error = %e, "could not cache entities");
        }
        Ok(ingest)
    }
}

impl ReferenceProvider for RemoteClient {
    /// Live fetch, falling back to the cached copy when the request fails.
    fn fetch_reference(&self, entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
        let path = self.cache.reference_path(entity_id);
        let value = match self.get_json(&format!("listings/{entity_id}/market")) {
            Ok(value) => {
                if let Err(e) = self.cache.write(&path, &value) {
                    tracing::warn!(entity = entity_id, error = %e, "could not cache reference data");
                }
                value
            }
            Err(err) => match self.cache.read(&path) {
                Some(cached) => {
                    tracing::warn!(entity = entity_id, error = %err, "using cached reference data");
                    cached
                }
                None => return Err(err),
            },
        };

        let dataset = ReferenceDataset::from_value(&value)?;
        Ok((!dataset.is_empty()).then(|| Arc::new(dataset)))
    }
}
