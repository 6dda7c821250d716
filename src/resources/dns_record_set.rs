//! Cloud DNS record sets
//!
//! Record sets are deleted through a change request against their managed
//! zone, and the deletion body must mirror the listed record exactly, so
//! each resource keeps its original JSON around. The apex NS and SOA
//! records cannot be deleted at all; the zone removes them when it goes.

use super::DNS_API;
use crate::gcp::GcpClient;
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, SweepError, Veto,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const KIND: &str = "DNSRecordSet";

pub fn registration() -> Registration {
    Registration::new(KIND, ScanScope::Global, DNS_API, Arc::new(DnsRecordSetLister))
        .capabilities(Capabilities::NONE.with_filter())
}

pub struct DnsRecordSetLister;

#[async_trait]
impl Lister for DnsRecordSetLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Global, DNS_API).await?;

        let zones_url = params.client.dns_url(params.project(), "managedZones");
        let zones = params.client.get_paginated(&zones_url, "managedZones").await?;

        let mut resources: Vec<Box<dyn Resource>> = Vec::new();
        for zone in &zones {
            let Some(zone_name) = zone.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            let apex = zone
                .get("dnsName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let rrsets_url = params
                .client
                .dns_url(params.project(), &format!("managedZones/{}/rrsets", zone_name));
            let rrsets = params.client.get_paginated(&rrsets_url, "rrsets").await?;

            resources.extend(
                rrsets
                    .iter()
                    .filter_map(|item| from_json(params.project(), zone_name, &apex, item))
                    .map(|record| Box::new(record) as Box<dyn Resource>),
            );
        }

        Ok(resources)
    }
}

fn from_json(project: &str, zone: &str, apex: &str, item: &Value) -> Option<DnsRecordSet> {
    Some(DnsRecordSet {
        project: project.to_string(),
        zone: zone.to_string(),
        apex: apex.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        record_type: item.get("type")?.as_str()?.to_string(),
        body: item.clone(),
    })
}

pub struct DnsRecordSet {
    project: String,
    zone: String,
    apex: String,
    name: String,
    record_type: String,
    /// Listed record verbatim; the change request deletes exactly this
    body: Value,
}

impl DnsRecordSet {
    fn is_zone_apex_system_record(&self) -> bool {
        self.name == self.apex && matches!(self.record_type.as_str(), "NS" | "SOA")
    }
}

#[async_trait]
impl Resource for DnsRecordSet {
    fn id(&self) -> String {
        format!("{} {}", self.name, self.record_type)
    }

    fn filter(&self) -> Result<(), Veto> {
        if self.is_zone_apex_system_record() {
            return Err(Veto::new("zone apex system record"));
        }
        Ok(())
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.dns_url(&self.project, &format!("managedZones/{}/changes", self.zone));
        let change = json!({ "deletions": [self.body.clone()] });
        client.post(&url, Some(&change)).await?;
        Ok(())
    }
}
