//! Cloud Storage buckets
//!
//! A bucket refuses deletion while it holds objects, so removal drains the
//! object listing first and deletes the bucket last. Both steps complete
//! synchronously; there is no operation to wait on.

use super::STORAGE_API;
use crate::gcp::client::append_query;
use crate::gcp::GcpClient;
use crate::sweep::{Lister, Registration, Resource, ScanParams, ScanScope, SweepError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const KIND: &str = "StorageBucket";

pub fn registration() -> Registration {
    Registration::new(KIND, ScanScope::Global, STORAGE_API, Arc::new(StorageBucketLister))
}

pub struct StorageBucketLister;

#[async_trait]
impl Lister for StorageBucketLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Global, STORAGE_API).await?;

        let url = append_query(&params.client.storage_url("b"), "project", params.project());
        let items = params.client.get_paginated(&url, "items").await?;

        Ok(items
            .iter()
            .filter_map(from_json)
            .map(|bucket| Box::new(bucket) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(item: &Value) -> Option<StorageBucket> {
    Some(StorageBucket {
        name: item.get("name")?.as_str()?.to_string(),
    })
}

pub struct StorageBucket {
    name: String,
}

/// Object names may hold slashes and spaces; they travel percent-encoded
fn object_url(client: &GcpClient, bucket: &str, object: &str) -> String {
    client.storage_url(&format!("b/{}/o/{}", bucket, urlencoding::encode(object)))
}

#[async_trait]
impl Resource for StorageBucket {
    fn id(&self) -> String {
        self.name.clone()
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let objects = client
            .get_paginated(&client.storage_objects_url(&self.name), "items")
            .await?;

        if !objects.is_empty() {
            debug!(bucket = %self.name, count = objects.len(), "Draining objects");
        }
        for object in &objects {
            if let Some(name) = object.get("name").and_then(|v| v.as_str()) {
                client.delete(&object_url(client, &self.name, name)).await?;
            }
        }

        client.delete(&client.storage_bucket_url(&self.name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::GcpCredentials;

    #[test]
    fn object_names_are_percent_encoded() {
        let client =
            GcpClient::with_credentials(GcpCredentials::from_static_token("t")).unwrap();
        assert_eq!(
            object_url(&client, "logs", "2024/01 report.txt"),
            "https://storage.googleapis.com/storage/v1/b/logs/o/2024%2F01%20report.txt"
        );
    }
}
