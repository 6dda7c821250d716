//! Scan parameters
//!
//! Every lister receives the same strongly typed parameter set: which
//! project, which location, and the shared client/enablement handles. The
//! gate in [`ScanParams::before_list`] is what keeps a lister from running
//! in a pass it does not belong to and from calling an API the project
//! never enabled.

use super::error::{SkipReason, SweepError};
use crate::gcp::{ApiEnablement, GcpClient, GLOBAL_REGION};
use std::fmt;

/// Which kind of location pass a lister runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanScope {
    Global,
    Regional,
    Zonal,
}

impl fmt::Display for ScanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanScope::Global => "global",
            ScanScope::Regional => "regional",
            ScanScope::Zonal => "zonal",
        };
        f.write_str(s)
    }
}

/// A concrete location within a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Global,
    Region(String),
    Zone { region: String, zone: String },
}

impl Location {
    pub fn scope(&self) -> ScanScope {
        match self {
            Location::Global => ScanScope::Global,
            Location::Region(_) => ScanScope::Regional,
            Location::Zone { .. } => ScanScope::Zonal,
        }
    }

    /// Short display form: "global", the region name, or the zone name
    pub fn label(&self) -> &str {
        match self {
            Location::Global => GLOBAL_REGION,
            Location::Region(region) => region,
            Location::Zone { zone, .. } => zone,
        }
    }
}

/// Parameters handed to every lister invocation
#[derive(Clone)]
pub struct ScanParams {
    pub client: GcpClient,
    pub enablement: ApiEnablement,
    project: String,
    location: Location,
}

impl ScanParams {
    pub fn new(
        client: GcpClient,
        enablement: ApiEnablement,
        project: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            client,
            enablement,
            project: project.into(),
            location,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn scope(&self) -> ScanScope {
        self.location.scope()
    }

    /// The pass's region; an error under a global pass
    pub fn region(&self) -> Result<&str, SweepError> {
        match &self.location {
            Location::Region(region) | Location::Zone { region, .. } => Ok(region),
            Location::Global => {
                Err(anyhow::anyhow!("global scan parameters carry no region").into())
            }
        }
    }

    /// The pass's zone; an error outside zonal passes
    pub fn zone(&self) -> Result<&str, SweepError> {
        match &self.location {
            Location::Zone { zone, .. } => Ok(zone),
            _ => Err(anyhow::anyhow!("{} scan parameters carry no zone", self.scope()).into()),
        }
    }

    /// Gate a lister: scope check first, then memoized API enablement.
    ///
    /// The scope check never touches the network, so a regional lister
    /// invoked during a zonal pass costs nothing. Only a matching pass pays
    /// for (at most one) Service Usage lookup per project and API.
    pub async fn before_list(&self, required: ScanScope, api: &str) -> Result<(), SweepError> {
        let actual = self.scope();
        if actual != required {
            return Err(SkipReason::ScopeMismatch { required, actual }.into());
        }

        if !self
            .enablement
            .is_enabled(&self.client, &self.project, api)
            .await?
        {
            return Err(SkipReason::ApiDisabled {
                api: api.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
