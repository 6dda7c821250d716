//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality. URL builders cover every service the built-in
//! resource types touch; all of them honor the endpoint override so tests
//! can point the whole client at a mock server.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

const COMPUTE_HOST: &str = "https://compute.googleapis.com";
const STORAGE_HOST: &str = "https://storage.googleapis.com";
const RESOURCEMANAGER_HOST: &str = "https://cloudresourcemanager.googleapis.com";
const SERVICEUSAGE_HOST: &str = "https://serviceusage.googleapis.com";
const SQLADMIN_HOST: &str = "https://sqladmin.googleapis.com";
const DNS_HOST: &str = "https://dns.googleapis.com";
const IAM_HOST: &str = "https://iam.googleapis.com";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    endpoint_override: Option<String>,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new() -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials)
    }

    /// Create a client around pre-built credentials (tests use a static token)
    pub fn with_credentials(credentials: GcpCredentials) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            endpoint_override: None,
        })
    }

    /// Route every service at `base` instead of the production hosts.
    ///
    /// Used by tests to aim the client at a wiremock server; the per-service
    /// path prefixes stay distinct, so one server can play every API.
    pub fn with_endpoint(mut self, base: &str) -> Result<Self> {
        let parsed = Url::parse(base).context("Invalid endpoint override URL")?;
        self.endpoint_override = Some(parsed.as_str().trim_end_matches('/').to_string());
        Ok(self)
    }

    /// Clone of this client with its own newly built HTTP transport.
    ///
    /// Environment discovery lists regions through a dedicated short-lived
    /// transport that is dropped when discovery returns.
    pub fn with_fresh_http(&self) -> Result<Self> {
        Ok(Self {
            credentials: self.credentials.clone(),
            http: GcpHttpClient::new()?,
            endpoint_override: self.endpoint_override.clone(),
        })
    }

    fn base<'a>(&'a self, production_host: &'a str) -> &'a str {
        self.endpoint_override.as_deref().unwrap_or(production_host)
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Make a PATCH request to a GCP API
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.patch(url, &token, body).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.delete(url, &token).await
    }

    /// GET every page of a list endpoint, following `nextPageToken`.
    ///
    /// `items_key` names the response field holding the page's array
    /// ("items", "projects", "accounts", ...). Endpoints that omit the field
    /// on an empty page contribute nothing.
    pub async fn get_paginated(&self, url: &str, items_key: &str) -> Result<Vec<Value>> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_url = match &page_token {
                Some(token) => append_query(url, "pageToken", token),
                None => url.to_string(),
            };

            let response = self.get(&page_url).await?;

            if let Some(items) = response.get(items_key).and_then(|v| v.as_array()) {
                all_items.extend(items.iter().cloned());
            }

            match response.get("nextPageToken").and_then(|v| v.as_str()) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(all_items)
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/compute/v1/projects/{}/{}",
            self.base(COMPUTE_HOST),
            project,
            path
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, project: &str, zone: &str, resource: &str) -> String {
        self.compute_url(project, &format!("zones/{}/{}", zone, resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, project: &str, region: &str, resource: &str) -> String {
        self.compute_url(project, &format!("regions/{}/{}", region, resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, project: &str, resource: &str) -> String {
        self.compute_url(project, &format!("global/{}", resource))
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base(STORAGE_HOST), path)
    }

    /// Build Cloud Storage bucket URL
    pub fn storage_bucket_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}", bucket))
    }

    /// Build Cloud Storage objects URL
    pub fn storage_objects_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}/o", bucket))
    }

    // =========================================================================
    // Resource Manager API helpers (v3)
    // =========================================================================

    /// Build Resource Manager API URL
    pub fn resourcemanager_url(&self, path: &str) -> String {
        format!("{}/v3/{}", self.base(RESOURCEMANAGER_HOST), path)
    }

    // =========================================================================
    // Service Usage API helpers
    // =========================================================================

    /// Build Service Usage API URL for one service's state
    pub fn serviceusage_url(&self, project: &str, api: &str) -> String {
        format!(
            "{}/v1/projects/{}/services/{}",
            self.base(SERVICEUSAGE_HOST),
            project,
            api
        )
    }

    // =========================================================================
    // Cloud SQL Admin API helpers
    // =========================================================================

    /// Build Cloud SQL Admin API URL
    pub fn sqladmin_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/sql/v1beta4/projects/{}/{}",
            self.base(SQLADMIN_HOST),
            project,
            path
        )
    }

    // =========================================================================
    // Cloud DNS API helpers
    // =========================================================================

    /// Build Cloud DNS API URL
    pub fn dns_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/dns/v1/projects/{}/{}",
            self.base(DNS_HOST),
            project,
            path
        )
    }

    // =========================================================================
    // IAM API helpers
    // =========================================================================

    /// Build IAM API URL
    pub fn iam_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base(IAM_HOST), path)
    }
}

/// Append a query parameter to a URL that may or may not have one already
pub fn append_query(url: &str, key: &str, value: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, sep, key, urlencoding::encode(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::auth::GcpCredentials;

    fn test_client() -> GcpClient {
        GcpClient::with_credentials(GcpCredentials::from_static_token("test-token")).unwrap()
    }

    #[test]
    fn production_urls() {
        let client = test_client();
        assert_eq!(
            client.compute_zonal_url("my-proj", "us-central1-a", "instances"),
            "https://compute.googleapis.com/compute/v1/projects/my-proj/zones/us-central1-a/instances"
        );
        assert_eq!(
            client.resourcemanager_url("projects:search"),
            "https://cloudresourcemanager.googleapis.com/v3/projects:search"
        );
        assert_eq!(
            client.serviceusage_url("my-proj", "dns.googleapis.com"),
            "https://serviceusage.googleapis.com/v1/projects/my-proj/services/dns.googleapis.com"
        );
    }

    #[test]
    fn endpoint_override_replaces_every_host() {
        let client = test_client().with_endpoint("http://127.0.0.1:9000/").unwrap();
        assert_eq!(
            client.compute_global_url("p", "networks"),
            "http://127.0.0.1:9000/compute/v1/projects/p/global/networks"
        );
        assert_eq!(
            client.storage_bucket_url("some-bucket"),
            "http://127.0.0.1:9000/storage/v1/b/some-bucket"
        );
        assert_eq!(
            client.iam_url("projects/p/serviceAccounts"),
            "http://127.0.0.1:9000/v1/projects/p/serviceAccounts"
        );
    }

    #[test]
    fn endpoint_override_rejects_garbage() {
        assert!(test_client().with_endpoint("not a url").is_err());
    }

    #[test]
    fn append_query_handles_both_forms() {
        assert_eq!(
            append_query("http://x/y", "pageToken", "abc"),
            "http://x/y?pageToken=abc"
        );
        assert_eq!(
            append_query("http://x/y?project=p", "pageToken", "a/b"),
            "http://x/y?project=p&pageToken=a%2Fb"
        );
    }
}
