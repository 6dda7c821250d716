//! Compute Engine VPC networks
//!
//! The very last Compute wave: a network only deletes once its
//! subnetworks, firewall rules and custom routes are gone.

use super::compute::PendingOperation;
use super::{compute_firewall, compute_route, compute_subnetwork, COMPUTE_API};
use crate::gcp::GcpClient;
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, SweepError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "ComputeNetwork";

pub fn registration() -> Registration {
    Registration::new(
        KIND,
        ScanScope::Global,
        COMPUTE_API,
        Arc::new(ComputeNetworkLister),
    )
    .depends_on(&[
        compute_subnetwork::KIND,
        compute_firewall::KIND,
        compute_route::KIND,
    ])
    .capabilities(Capabilities::NONE.with_wait())
}

pub struct ComputeNetworkLister;

#[async_trait]
impl Lister for ComputeNetworkLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Global, COMPUTE_API).await?;

        let url = params.client.compute_global_url(params.project(), "networks");
        let items = params.client.get_paginated(&url, "items").await?;

        Ok(items
            .iter()
            .filter_map(|item| from_json(params.project(), item))
            .map(|network| Box::new(network) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, item: &Value) -> Option<ComputeNetwork> {
    Some(ComputeNetwork {
        project: project.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        pending: PendingOperation::none(),
    })
}

pub struct ComputeNetwork {
    project: String,
    name: String,
    pending: PendingOperation,
}

#[async_trait]
impl Resource for ComputeNetwork {
    fn id(&self) -> String {
        self.name.clone()
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.compute_global_url(&self.project, &format!("networks/{}", self.name));
        let response = client.delete(&url).await?;
        self.pending.begin(&self.project, &response);
        Ok(())
    }

    async fn handle_wait(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        self.pending.check(client).await
    }
}
