//! Compute Engine firewall rules

use super::compute::PendingOperation;
use super::COMPUTE_API;
use crate::gcp::GcpClient;
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, SweepError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "ComputeFirewall";

pub fn registration() -> Registration {
    Registration::new(
        KIND,
        ScanScope::Global,
        COMPUTE_API,
        Arc::new(ComputeFirewallLister),
    )
    .capabilities(Capabilities::NONE.with_wait())
}

pub struct ComputeFirewallLister;

#[async_trait]
impl Lister for ComputeFirewallLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Global, COMPUTE_API).await?;

        let url = params.client.compute_global_url(params.project(), "firewalls");
        let items = params.client.get_paginated(&url, "items").await?;

        Ok(items
            .iter()
            .filter_map(|item| from_json(params.project(), item))
            .map(|firewall| Box::new(firewall) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, item: &Value) -> Option<ComputeFirewall> {
    Some(ComputeFirewall {
        project: project.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        pending: PendingOperation::none(),
    })
}

pub struct ComputeFirewall {
    project: String,
    name: String,
    pending: PendingOperation,
}

#[async_trait]
impl Resource for ComputeFirewall {
    fn id(&self) -> String {
        self.name.clone()
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.compute_global_url(&self.project, &format!("firewalls/{}", self.name));
        let response = client.delete(&url).await?;
        self.pending.begin(&self.project, &response);
        Ok(())
    }

    async fn handle_wait(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        self.pending.check(client).await
    }
}
