//! IAM service accounts
//!
//! Google provisions default service accounts (the Compute Engine and App
//! Engine ones) alongside their APIs; deleting them breaks services in ways
//! that outlive the project's resources. They are kept unless the
//! `DeleteDefaultServiceAccounts` setting says otherwise.

use super::IAM_API;
use crate::gcp::GcpClient;
use crate::sweep::{
    Capabilities, Lister, Registration, Resource, ScanParams, ScanScope, Settings, SweepError,
    Veto,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "IAMServiceAccount";

/// Settings key overriding the default-account veto
pub const DELETE_DEFAULT_SETTING: &str = "DeleteDefaultServiceAccounts";

const DEFAULT_ACCOUNT_SUFFIXES: [&str; 2] = [
    "-compute@developer.gserviceaccount.com",
    "@appspot.gserviceaccount.com",
];

pub fn registration() -> Registration {
    Registration::new(
        KIND,
        ScanScope::Global,
        IAM_API,
        Arc::new(IamServiceAccountLister),
    )
    .settings(&[DELETE_DEFAULT_SETTING])
    .capabilities(Capabilities::NONE.with_filter())
}

pub struct IamServiceAccountLister;

#[async_trait]
impl Lister for IamServiceAccountLister {
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError> {
        params.before_list(ScanScope::Global, IAM_API).await?;

        let url = params
            .client
            .iam_url(&format!("projects/{}/serviceAccounts", params.project()));
        let items = params.client.get_paginated(&url, "accounts").await?;

        Ok(items
            .iter()
            .filter_map(|item| from_json(params.project(), item))
            .map(|account| Box::new(account) as Box<dyn Resource>)
            .collect())
    }
}

fn from_json(project: &str, item: &Value) -> Option<IamServiceAccount> {
    Some(IamServiceAccount {
        project: project.to_string(),
        email: item.get("email")?.as_str()?.to_string(),
        delete_default: false,
    })
}

pub struct IamServiceAccount {
    project: String,
    email: String,
    delete_default: bool,
}

impl IamServiceAccount {
    fn is_default_account(&self) -> bool {
        DEFAULT_ACCOUNT_SUFFIXES
            .iter()
            .any(|suffix| self.email.ends_with(suffix))
    }
}

#[async_trait]
impl Resource for IamServiceAccount {
    fn id(&self) -> String {
        self.email.clone()
    }

    fn apply_settings(&mut self, settings: &Settings) {
        if let Some(value) = settings.get_bool(DELETE_DEFAULT_SETTING) {
            self.delete_default = value;
        }
    }

    fn filter(&self) -> Result<(), Veto> {
        if self.is_default_account() && !self.delete_default {
            return Err(Veto::new("default service account"));
        }
        Ok(())
    }

    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError> {
        let url = client.iam_url(&format!(
            "projects/{}/serviceAccounts/{}",
            self.project, self.email
        ));
        client.delete(&url).await?;
        Ok(())
    }
}
