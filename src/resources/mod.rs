//! Built-in resource types
//!
//! One module per resource type; [`builtin_registry`] assembles them all.
//! Dependency declarations here are what give the sweep its waves, e.g. a
//! VPC network waits for its subnetworks, firewalls and routes.

mod compute;
pub mod compute_disk;
pub mod compute_firewall;
pub mod compute_instance;
pub mod compute_network;
pub mod compute_route;
pub mod compute_subnetwork;
pub mod dns_managed_zone;
pub mod dns_record_set;
pub mod iam_service_account;
pub mod sql_instance;
pub mod storage_bucket;

use crate::sweep::{ConfigError, Registry, RegistryBuilder};

pub(crate) const COMPUTE_API: &str = "compute.googleapis.com";
pub(crate) const STORAGE_API: &str = "storage.googleapis.com";
pub(crate) const IAM_API: &str = "iam.googleapis.com";
pub(crate) const DNS_API: &str = "dns.googleapis.com";
pub(crate) const SQLADMIN_API: &str = "sqladmin.googleapis.com";

/// Registry holding every built-in resource type
pub fn builtin_registry() -> Result<Registry, ConfigError> {
    RegistryBuilder::new()
        .register(compute_instance::registration())
        .register(compute_disk::registration())
        .register(compute_subnetwork::registration())
        .register(compute_firewall::registration())
        .register(compute_route::registration())
        .register(compute_network::registration())
        .register(storage_bucket::registration())
        .register(iam_service_account::registration())
        .register(dns_record_set::registration())
        .register(dns_managed_zone::registration())
        .register(sql_instance::registration())
        .build()
}
