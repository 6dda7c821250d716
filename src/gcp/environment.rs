//! Environment discovery
//!
//! One snapshot of the world taken before any sweeping starts: accessible
//! organizations, the target project, and the region/zone topology of the
//! Compute API. Scope passes iterate this snapshot instead of re-listing
//! locations per resource type.

use super::client::GcpClient;
use super::short_name;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Pseudo-region the global pass runs under
pub const GLOBAL_REGION: &str = "global";

/// An accessible GCP organization
#[derive(Debug, Clone)]
pub struct Organization {
    /// Resource name, e.g. "organizations/123456"
    pub name: String,
    pub display_name: String,
}

impl Organization {
    /// Numeric id with the "organizations/" prefix stripped
    pub fn id(&self) -> &str {
        short_name(&self.name)
    }

    fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            name: value.get("name")?.as_str()?.to_string(),
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// A GCP project as reported by Resource Manager
#[derive(Debug, Clone)]
pub struct Project {
    /// Resource name, e.g. "projects/123456"
    pub name: String,
    pub project_id: String,
    pub display_name: String,
    pub state: String,
}

impl Project {
    /// Numeric id with the "projects/" prefix stripped
    pub fn id(&self) -> &str {
        short_name(&self.name)
    }

    pub fn is_active(&self) -> bool {
        self.state == "ACTIVE"
    }

    fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            name: value.get("name")?.as_str()?.to_string(),
            project_id: value.get("projectId")?.as_str()?.to_string(),
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            state: value
                .get("state")
                .and_then(|v| v.as_str())
                .unwrap_or("STATE_UNSPECIFIED")
                .to_string(),
        })
    }
}

/// Snapshot of organizations, visible projects and region/zone topology
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub organizations: Vec<Organization>,
    /// Every ACTIVE project visible to the credentials
    pub projects: Vec<Project>,
    target_project_id: String,
    regions: Vec<String>,
    zones_by_region: HashMap<String, Vec<String>>,
}

impl Environment {
    /// Discover the environment around `project_id`.
    ///
    /// Any lookup failing is fatal; a run never proceeds on a partial
    /// snapshot. The target project must be visible and ACTIVE.
    pub async fn discover(client: &GcpClient, project_id: &str) -> Result<Self> {
        let organizations = list_organizations(client)
            .await
            .context("Failed to search organizations")?;

        let mut projects = search_projects(client)
            .await
            .context("Failed to enumerate projects")?;

        match projects.iter().find(|p| p.project_id == project_id) {
            None => bail!("Project '{}' is not visible to these credentials", project_id),
            Some(target) if !target.is_active() => bail!(
                "Project '{}' is in state {}, refusing to sweep it",
                project_id,
                target.state
            ),
            Some(_) => {}
        }
        projects.retain(|p| p.is_active());

        // Region listing runs on its own transport, dropped when discovery returns.
        let region_client = client.with_fresh_http()?;
        let region_items = region_client
            .get_paginated(&region_client.compute_url(project_id, "regions"), "items")
            .await
            .context("Failed to list Compute regions")?;

        let mut env = Self {
            organizations,
            projects,
            target_project_id: project_id.to_string(),
            regions: vec![GLOBAL_REGION.to_string()],
            zones_by_region: HashMap::new(),
        };

        for item in &region_items {
            env.index_region(item);
        }

        debug!(
            regions = env.regions.len(),
            zones = env.zones_by_region.values().map(|z| z.len()).sum::<usize>(),
            organizations = env.organizations.len(),
            "Environment discovered"
        );

        Ok(env)
    }

    /// Build a snapshot from an explicit region/zone layout.
    ///
    /// Offline callers (tests, planners) get the same lookup behavior as a
    /// discovered environment, global pseudo-region included.
    pub fn from_topology(topology: Vec<(String, Vec<String>)>) -> Self {
        let mut env = Self {
            regions: vec![GLOBAL_REGION.to_string()],
            ..Default::default()
        };
        for (region, zones) in topology {
            env.regions.push(region.clone());
            env.zones_by_region.insert(region, zones);
        }
        env
    }

    /// Record one region body (`name` + `zones` URL list) in the snapshot
    fn index_region(&mut self, item: &Value) {
        let Some(name) = item.get("name").and_then(|v| v.as_str()) else {
            return;
        };

        let zones: Vec<String> = item
            .get("zones")
            .and_then(|v| v.as_array())
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str())
                    .map(|u| short_name(u).to_string())
                    .collect()
            })
            .unwrap_or_default();

        self.regions.push(name.to_string());
        self.zones_by_region.insert(name.to_string(), zones);
    }

    /// Every known region, the "global" pseudo-region first
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn has_region(&self, name: &str) -> bool {
        self.regions.iter().any(|r| r == name)
    }

    /// Zones inside `region`; empty for unknown regions and for "global"
    pub fn zones_for(&self, region: &str) -> &[String] {
        self.zones_by_region
            .get(region)
            .map(|z| z.as_slice())
            .unwrap_or(&[])
    }

    /// The region a zone belongs to
    pub fn region_of_zone(&self, zone: &str) -> Option<&str> {
        self.zones_by_region
            .iter()
            .find(|(_, zones)| zones.iter().any(|z| z == zone))
            .map(|(region, _)| region.as_str())
    }

    /// The project this sweep targets
    pub fn target_project(&self) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.project_id == self.target_project_id)
    }
}

async fn list_organizations(client: &GcpClient) -> Result<Vec<Organization>> {
    let url = client.resourcemanager_url("organizations:search");
    let items = client.get_paginated(&url, "organizations").await?;
    Ok(items.iter().filter_map(Organization::from_json).collect())
}

async fn search_projects(client: &GcpClient) -> Result<Vec<Project>> {
    let url = client.resourcemanager_url("projects:search");
    let items = client.get_paginated(&url, "projects").await?;
    Ok(items.iter().filter_map(Project::from_json).collect())
}
