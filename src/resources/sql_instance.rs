//! Cloud SQL instances
//!
//! The SQL Admin API lists instances project-wide; the regional pass keeps
//! only the instances homed in its region. Instances with deletion
//! protection enabled are reported instead of failed: the protection flag
//! is the user saying "not this one". Setting `DisarmDeletionProtection`
//! flips that: the flag is patched off before the delete is issued.

use super::SQLADMIN_API;
use crate::gcp::{GcpClient, OperationStatus, SqlOperation};
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, Settings, SweepError,
    Veto,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const KIND: &str = "SQLInstance";

/// Settings key allowing deletion protection to be patched off
pub const DISARM_PROTECTION_SETTING: &str = "DisarmDeletionProtection";

const DISARM_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DISARM_POLL_LIMIT: u32 = 30;

pub fn registration() -> Registration {
    Registration::new(
        KIND,
        ScanScope::Regional,
        SQLADMIN_API,
        Arc::new(SqlInstanceLister),
    )
    .settings(&[DISARM_PROTECTION_SETTING])
    .capabilities(Capabilities::NONE.with_filter().with_wait())
}

pub struct SqlInstanceLister;

#[async_trait]
impl Lister for SqlInstanceLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Regional, SQLADMIN_API).await?;
        let region = params.region()?;

        let url = params.client.sqladmin_url(params.project(), "instances");
        let items = params.client.get_paginated(&url, "items").await?;

        Ok(items
            .iter()
            .filter(|item| item.get("region").and_then(|v| v.as_str()) == Some(region))
            .filter_map(|item| from_json(params.project(), item))
            .map(|instance| Box::new(instance) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, item: &Value) -> Option<SqlInstance> {
    let protected = item
        .get("settings")
        .and_then(|s| s.get("deletionProtectionEnabled"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Some(SqlInstance {
        project: project.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        protected,
        disarm_protection: false,
        operation: None,
    })
}

pub struct SqlInstance {
    project: String,
    name: String,
    protected: bool,
    disarm_protection: bool,
    operation: Option<SqlOperation>,
}

impl SqlInstance {
    fn instance_url(&self, client: &GcpClient) -> String {
        client.sqladmin_url(&self.project, &format!("instances/{}", self.name))
    }

    /// Patch deletion protection off and wait for the change to land.
    ///
    /// The SQL Admin API serializes operations per instance; a delete
    /// issued while the patch operation runs would be rejected.
    async fn disarm(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        info!(instance = %self.name, "Disarming deletion protection");
        let body = json!({ "settings": { "deletionProtectionEnabled": false } });
        let response = client.patch(&self.instance_url(client), &body).await?;

        let Some(operation) = SqlOperation::from_response(&self.project, &response) else {
            self.protected = false;
            return Ok(());
        };

        for _ in 0..DISARM_POLL_LIMIT {
            match operation.poll(client).await? {
                OperationStatus::Done => {
                    self.protected = false;
                    return Ok(());
                }
                OperationStatus::Running | OperationStatus::Unknown(_) => {
                    tokio::time::sleep(DISARM_POLL_INTERVAL).await;
                }
                OperationStatus::Failed(message) => {
                    return Err(anyhow::anyhow!(
                        "operation {} failed: {}",
                        operation.name,
                        message
                    )
                    .into());
                }
            }
        }

        Err(anyhow::anyhow!(
            "deletion protection on {} still set after {} polls",
            self.name,
            DISARM_POLL_LIMIT
        )
        .into())
    }
}

#[async_trait]
impl Resource for SqlInstance {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn apply_settings(&mut self, settings: &Settings) {
        if let Some(value) = settings.get_bool(DISARM_PROTECTION_SETTING) {
            self.disarm_protection = value;
        }
    }

    fn filter(&self) -> Result<(), Veto> {
        if self.protected && !self.disarm_protection {
            return Err(Veto::new("deletion protection enabled"));
        }
        Ok(())
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        if self.protected && self.disarm_protection {
            self.disarm(client).await?;
        }

        let response = client.delete(&self.instance_url(client)).await?;

        self.operation = SqlOperation::from_response(&self.project, &response);
        if self.operation.is_none() {
            warn!(instance = %self.name, "Delete response carried no operation");
        }
        Ok(())
    }

    async fn handle_wait(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let Some(operation) = &self.operation else {
            return Ok(());
        };

        match operation.poll(client).await? {
            OperationStatus::Done => {
                self.operation = None;
                Ok(())
            }
            OperationStatus::Running => Err(SweepError::pending(&operation.name)),
            OperationStatus::Failed(message) => Err(anyhow::anyhow!(
                "operation {} failed: {}",
                operation.name,
                message
            )
            .into()),
            OperationStatus::Unknown(status) => {
                warn!(
                    operation = %operation.name,
                    status = %status,
                    "Unexpected operation status, still waiting"
                );
                Err(SweepError::pending(&operation.name))
            }
        }
    }
}
