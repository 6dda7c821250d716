//! Sweep orchestrator
//!
//! Drives the registry's waves over every configured location. Types inside
//! one wave run concurrently; a wave only starts once the previous wave has
//! fully drained, which is what makes "network after its subnetworks" style
//! dependencies hold.
//!
//! Each listed instance moves through the same pipeline. Settings are
//! injected and the filter gets a chance to veto before removal is issued
//! (or withheld under dry run); types that declared the wait capability are
//! then polled until their operation completes.

use super::error::{SkipReason, SweepError};
use super::params::{Location, ScanParams};
use super::registry::{Registration, Registry};
use super::report::{Outcome, SweepReport};
use super::resource::Resource;
use super::settings::Settings;
use crate::gcp::{ApiEnablement, Environment, GcpClient, GLOBAL_REGION};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Tunable sweep behavior
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Plan removals without issuing them. On unless explicitly disabled.
    pub dry_run: bool,
    /// Pause between polls of a pending operation
    pub poll_interval: Duration,
    /// Give up waiting on one resource's operation after this long
    pub wait_timeout: Duration,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            poll_interval: Duration::from_secs(5),
            wait_timeout: Duration::from_secs(600),
        }
    }
}

/// Expand resolved region names into the location passes a sweep visits.
///
/// "global" becomes the global pass; every other region contributes its
/// regional pass followed by one zonal pass per zone.
pub fn locations_from(env: &Environment, regions: &[String]) -> Vec<Location> {
    let mut locations = Vec::new();
    for region in regions {
        if region == GLOBAL_REGION {
            locations.push(Location::Global);
            continue;
        }
        locations.push(Location::Region(region.clone()));
        for zone in env.zones_for(region) {
            locations.push(Location::Zone {
                region: region.clone(),
                zone: zone.clone(),
            });
        }
    }
    locations
}

pub struct Sweeper {
    client: GcpClient,
    enablement: ApiEnablement,
    registry: Registry,
    project: String,
    locations: Vec<Location>,
    type_filter: Option<HashSet<String>>,
    settings: HashMap<String, Settings>,
    options: SweepOptions,
    cancel: CancellationToken,
}

impl Sweeper {
    pub fn new(client: GcpClient, registry: Registry, project: impl Into<String>) -> Self {
        Self {
            client,
            enablement: ApiEnablement::new(),
            registry,
            project: project.into(),
            locations: vec![Location::Global],
            type_filter: None,
            settings: HashMap::new(),
            options: SweepOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Location passes to run, usually from [`locations_from`]
    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    /// Restrict the sweep to these resource types. `None` means all.
    pub fn with_types(mut self, kinds: Option<HashSet<String>>) -> Self {
        self.type_filter = kinds;
        self
    }

    /// Per-type settings injected into listed resources
    pub fn with_settings(mut self, settings: HashMap<String, Settings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    /// Token that aborts the sweep between resources when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn type_enabled(&self, kind: &str) -> bool {
        self.type_filter
            .as_ref()
            .map_or(true, |set| set.contains(kind))
    }

    /// Run the sweep to completion (or cancellation) and report what happened
    pub async fn run(&self) -> SweepReport {
        let report = Arc::new(Mutex::new(SweepReport::new(
            &self.project,
            self.options.dry_run,
        )));

        info!(
            project = %self.project,
            dry_run = self.options.dry_run,
            types = self.registry.len(),
            locations = self.locations.len(),
            "Starting sweep"
        );

        for (wave_index, wave) in self.registry.waves().into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("Sweep cancelled, abandoning remaining waves");
                break;
            }

            let wave: Vec<&Registration> = wave
                .into_iter()
                .filter(|reg| self.type_enabled(reg.kind))
                .collect();
            if wave.is_empty() {
                continue;
            }

            let kinds: Vec<&str> = wave.iter().map(|r| r.kind).collect();
            debug!(wave = wave_index, types = ?kinds, "Running wave");

            let tasks = wave
                .iter()
                .map(|reg| self.sweep_type(reg, Arc::clone(&report)));
            futures::future::join_all(tasks).await;
        }

        let mut report = match Arc::try_unwrap(report) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        report.finish();

        info!(
            removed = report.removed(),
            would_remove = report.would_remove(),
            filtered = report.filtered(),
            failed = report.failed(),
            "Sweep finished"
        );

        report
    }

    /// Run one resource type across every location pass
    async fn sweep_type(&self, reg: &Registration, report: Arc<Mutex<SweepReport>>) {
        for location in &self.locations {
            if self.cancel.is_cancelled() {
                return;
            }

            let params = ScanParams::new(
                self.client.clone(),
                self.enablement.clone(),
                &self.project,
                location.clone(),
            );

            let resources = match reg.lister.list(&params).await {
                Ok(resources) => resources,
                Err(SweepError::Skip(reason)) => {
                    match &reason {
                        SkipReason::ScopeMismatch { .. } => {
                            trace!(kind = reg.kind, location = location.label(), %reason, "Pass skipped");
                        }
                        SkipReason::ApiDisabled { .. } => {
                            debug!(kind = reg.kind, %reason, "Type skipped");
                            report
                                .lock()
                                .await
                                .record_type_skip(reg.kind, reason.to_string());
                        }
                    }
                    continue;
                }
                Err(err) => {
                    let err = err_to_anyhow(err);
                    warn!(
                        kind = reg.kind,
                        location = location.label(),
                        "Listing failed: {:#}",
                        err
                    );
                    report.lock().await.record_error(format!(
                        "{} {}: listing failed: {:#}",
                        reg.kind,
                        location.label(),
                        err
                    ));
                    continue;
                }
            };

            if resources.is_empty() {
                continue;
            }
            info!(
                kind = reg.kind,
                location = location.label(),
                count = resources.len(),
                "Found resources"
            );

            for mut resource in resources {
                if self.cancel.is_cancelled() {
                    return;
                }
                let id = resource.id();
                let outcome = self.process(reg, resource.as_mut()).await;
                report
                    .lock()
                    .await
                    .record(reg.kind, location.label(), id, outcome);
            }
        }
    }

    /// Settings, filter, removal, wait: one instance through the pipeline
    async fn process(&self, reg: &Registration, resource: &mut dyn Resource) -> Outcome {
        let id = resource.id();

        if !reg.settings.is_empty() {
            if let Some(settings) = self.settings.get(reg.kind) {
                resource.apply_settings(settings);
            }
        }

        if reg.capabilities.filter {
            if let Err(veto) = resource.filter() {
                debug!(kind = reg.kind, id = %id, reason = %veto, "Filtered");
                return Outcome::Filtered(veto.0);
            }
        }

        if self.options.dry_run {
            info!(kind = reg.kind, id = %id, "Would remove (dry run)");
            return Outcome::WouldRemove;
        }

        info!(kind = reg.kind, id = %id, "Removing");
        if let Err(err) = resource.remove(&self.client).await {
            error!(kind = reg.kind, id = %id, "Removal failed: {}", err);
            return Outcome::Failed(err.to_string());
        }

        if reg.capabilities.wait {
            if let Err(err) = self.await_completion(resource).await {
                error!(kind = reg.kind, id = %id, "Wait failed: {}", err);
                return Outcome::Failed(err.to_string());
            }
        }

        Outcome::Removed
    }

    /// Poll `handle_wait` until done, timeout, or cancellation.
    ///
    /// The first poll runs immediately; quick deletions complete without
    /// ever sleeping.
    async fn await_completion(&self, resource: &mut dyn Resource) -> Result<(), SweepError> {
        let deadline = Instant::now() + self.options.wait_timeout;

        loop {
            match resource.handle_wait(&self.client).await {
                Ok(()) => return Ok(()),
                Err(SweepError::WaitPending { operation }) => {
                    if Instant::now() >= deadline {
                        return Err(anyhow::anyhow!(
                            "timed out waiting on operation {}",
                            operation
                        )
                        .into());
                    }
                    trace!(operation = %operation, "Operation still pending");

                    tokio::select! {
                        _ = tokio::time::sleep(self.options.poll_interval) => {}
                        _ = self.cancel.cancelled() => {
                            return Err(anyhow::anyhow!(
                                "cancelled while waiting on operation {}",
                                operation
                            )
                            .into());
                        }
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }
}

fn err_to_anyhow(err: SweepError) -> anyhow::Error {
    match err {
        SweepError::Other(inner) => inner,
        other => anyhow::anyhow!(other.to_string()),
    }
}
