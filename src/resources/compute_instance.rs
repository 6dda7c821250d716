//! Compute Engine instances

use super::compute::PendingOperation;
use super::COMPUTE_API;
use crate::gcp::GcpClient;
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, SweepError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "ComputeInstance";

pub fn registration() -> Registration {
    Registration::new(KIND, ScanScope::Zonal, COMPUTE_API, Arc::new(ComputeInstanceLister))
        .capabilities(Capabilities::NONE.with_wait())
}

pub struct ComputeInstanceLister;

#[async_trait]
impl Lister for ComputeInstanceLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Zonal, COMPUTE_API).await?;
        let zone = params.zone()?;

        let url = params
            .client
            .compute_zonal_url(params.project(), zone, "instances");
        let items = params.client.get_paginated(&url, "items").await?;

        Ok(items
            .iter()
            .filter_map(|item| from_json(params.project(), zone, item))
            .map(|instance| Box::new(instance) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, zone: &str, item: &Value) -> Option<ComputeInstance> {
    Some(ComputeInstance {
        project: project.to_string(),
        zone: zone.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        pending: PendingOperation::none(),
    })
}

pub struct ComputeInstance {
    project: String,
    zone: String,
    name: String,
    pending: PendingOperation,
}

#[async_trait]
impl Resource for ComputeInstance {
    fn id(&self) -> String {
        self.name.clone()
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.compute_zonal_url(
            &self.project,
            &self.zone,
            &format!("instances/{}", self.name),
        );
        let response = client.delete(&url).await?;
        self.pending.begin(&self.project, &response);
        Ok(())
    }

    async fn handle_wait(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        self.pending.check(client).await
    }
}
