//! Compute Engine subnetworks
//!
//! Deletable only once no instance occupies them, so the instance wave
//! runs first.

use super::compute::PendingOperation;
use super::{compute_instance, COMPUTE_API};
use crate::gcp::GcpClient;
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, SweepError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "ComputeSubnetwork";

pub fn registration() -> Registration {
    Registration::new(
        KIND,
        ScanScope::Regional,
        COMPUTE_API,
        Arc::new(ComputeSubnetworkLister),
    )
    .depends_on(&[compute_instance::KIND])
    .capabilities(Capabilities::NONE.with_wait())
}

pub struct ComputeSubnetworkLister;

#[async_trait]
impl Lister for ComputeSubnetworkLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Regional, COMPUTE_API).await?;
        let region = params.region()?;

        let url = params
            .client
            .compute_regional_url(params.project(), region, "subnetworks");
        let items = params.client.get_paginated(&url, "items").await?;

        Ok(items
            .iter()
            .filter_map(|item| from_json(params.project(), region, item))
            .map(|subnetwork| Box::new(subnetwork) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, region: &str, item: &Value) -> Option<ComputeSubnetwork> {
    Some(ComputeSubnetwork {
        project: project.to_string(),
        region: region.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        pending: PendingOperation::none(),
    })
}

pub struct ComputeSubnetwork {
    project: String,
    region: String,
    name: String,
    pending: PendingOperation,
}

#[async_trait]
impl Resource for ComputeSubnetwork {
    fn id(&self) -> String {
        self.name.clone()
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.compute_regional_url(
            &self.project,
            &self.region,
            &format!("subnetworks/{}", self.name),
        );
        let response = client.delete(&url).await?;
        self.pending.begin(&self.project, &response);
        Ok(())
    }

    async fn handle_wait(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        self.pending.check(client).await
    }
}
