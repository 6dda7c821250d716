//! Service Usage API
//!
//! Answers "is this API enabled on this project?" with one network call per
//! (project, api) pair for the lifetime of the process. Listing a service on
//! a project that never enabled its API is the common case during a sweep,
//! so the answer is cached aggressively.

use super::client::GcpClient;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Memoized per-project API enablement state
#[derive(Clone, Default)]
pub struct ApiEnablement {
    // One cell per (project, api) pair; concurrent first lookups for the
    // same pair share a single network call. A failed lookup leaves the
    // cell empty so the next caller retries.
    cache: Arc<Mutex<HashMap<(String, String), Arc<OnceCell<bool>>>>>,
}

impl ApiEnablement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `api` (e.g. "compute.googleapis.com") is enabled on `project`.
    ///
    /// The first call per (project, api) pair hits the Service Usage API;
    /// every later call is answered from the cache.
    pub async fn is_enabled(&self, client: &GcpClient, project: &str, api: &str) -> Result<bool> {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache
                .entry((project.to_string(), api.to_string()))
                .or_default()
                .clone()
        };

        let enabled = cell
            .get_or_try_init(|| async {
                let url = client.serviceusage_url(project, api);
                let response = client.get(&url).await?;

                let enabled = response
                    .get("state")
                    .and_then(|v| v.as_str())
                    .map(|state| state == "ENABLED")
                    .unwrap_or(false);

                debug!(project, api, enabled, "Resolved API enablement");

                anyhow::Ok(enabled)
            })
            .await?;

        Ok(*enabled)
    }
}
