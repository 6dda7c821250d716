//! Compute Engine routes
//!
//! Every network gets system-generated "default-route-..." entries that
//! are created and destroyed with the network itself; deleting them here
//! would only race the network wave. The filter keeps them out.

use super::compute::PendingOperation;
use super::COMPUTE_API;
use crate::gcp::GcpClient;
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, SweepError, Veto,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "ComputeRoute";

const DEFAULT_ROUTE_PREFIX: &str = "default-route-";

pub fn registration() -> Registration {
    Registration::new(KIND, ScanScope::Global, COMPUTE_API, Arc::new(ComputeRouteLister))
        .capabilities(Capabilities::NONE.with_filter().with_wait())
}

pub struct ComputeRouteLister;

#[async_trait]
impl Lister for ComputeRouteLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Global, COMPUTE_API).await?;

        let url = params.client.compute_global_url(params.project(), "routes");
        let items = params.client.get_paginated(&url, "items").await?;

        Ok(items
            .iter()
            .filter_map(|item| from_json(params.project(), item))
            .map(|route| Box::new(route) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, item: &Value) -> Option<ComputeRoute> {
    Some(ComputeRoute {
        project: project.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        pending: PendingOperation::none(),
    })
}

pub struct ComputeRoute {
    project: String,
    name: String,
    pending: PendingOperation,
}

#[async_trait]
impl Resource for ComputeRoute {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn filter(&self) -> Result<(), Veto> {
        if self.name.starts_with(DEFAULT_ROUTE_PREFIX) {
            return Err(Veto::new("system-generated default route"));
        }
        Ok(())
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.compute_global_url(&self.project, &format!("routes/{}", self.name));
        let response = client.delete(&url).await?;
        self.pending.begin(&self.project, &response);
        Ok(())
    }

    async fn handle_wait(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        self.pending.check(client).await
    }
}
