//! GCP API layer
//!
//! Authentication, HTTP transport, the service client with its URL builders,
//! environment discovery and long-running operation handles.

pub mod auth;
pub mod client;
pub mod environment;
pub mod http;
pub mod operation;
pub mod serviceusage;

pub use auth::GcpCredentials;
pub use client::GcpClient;
pub use environment::{Environment, GLOBAL_REGION};
pub use operation::{ComputeOperation, OperationScope, OperationStatus, SqlOperation};
pub use serviceusage::ApiEnablement;

/// Last path segment of a GCP resource URL or resource name.
///
/// GCP references resources by full URL ("https://.../zones/us-east1-b") or
/// by prefixed name ("projects/123"); the short name is the trailing segment
/// either way.
pub fn short_name(reference: &str) -> &str {
    reference
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(reference)
}
