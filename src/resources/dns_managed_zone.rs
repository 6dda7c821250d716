//! Cloud DNS managed zones
//!
//! A zone only deletes once every record set beyond the apex NS/SOA pair
//! is gone, so the record set wave runs first.

use super::{dns_record_set, DNS_API};
use crate::gcp::GcpClient;
use crate::sweep::{Lister, Registration, Resource, ScanParams, ScanScope, SweepError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "DNSManagedZone";

pub fn registration() -> Registration {
    Registration::new(KIND, ScanScope::Global, DNS_API, Arc::new(DnsManagedZoneLister))
        .depends_on(&[dns_record_set::KIND])
}

pub struct DnsManagedZoneLister;

#[async_trait]
impl Lister for DnsManagedZoneLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Global, DNS_API).await?;

        let url = params.client.dns_url(params.project(), "managedZones");
        let items = params.client.get_paginated(&url, "managedZones").await?;

        Ok(items
            .iter()
            .filter_map(|item| from_json(params.project(), item))
            .map(|zone| Box::new(zone) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, item: &Value) -> Option<DnsManagedZone> {
    Some(DnsManagedZone {
        project: project.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
    })
}

pub struct DnsManagedZone {
    project: String,
    name: String,
}

#[async_trait]
impl Resource for DnsManagedZone {
    fn id(&self) -> String {
        self.name.clone()
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.dns_url(&self.project, &format!("managedZones/{}", self.name));
        client.delete(&url).await?;
        Ok(())
    }
}
