//! Shared Compute Engine deletion plumbing
//!
//! Every Compute type deletes the same way: issue the DELETE, remember the
//! returned operation, poll it until done. [`PendingOperation`] holds that
//! state for the resource structs.

use crate::gcp::{ComputeOperation, GcpClient, OperationStatus};
use crate::sweep::SweepError;
use serde_json::Value;
use tracing::warn;

/// Operation handle between `remove` and completion
#[derive(Debug, Default)]
pub(crate) struct PendingOperation {
    operation: Option<ComputeOperation>,
}

impl PendingOperation {
    pub fn none() -> Self {
        Self::default()
    }

    /// Adopt the operation from a mutation's response body.
    ///
    /// A response without an operation name leaves nothing pending; the
    /// next `check` then reports completion straight away.
    pub fn begin(&mut self, project: &str, response: &Value) {
        self.operation = ComputeOperation::from_response(project, response);
        if self.operation.is_none() {
            warn!("Mutation response carried no operation, treating as complete");
        }
    }

    /// Poll once. `Ok(())` means done and clears the handle, so a later
    /// call returns immediately without touching the network.
    pub async fn check(&mut self, client: &GcpClient) -> Result<(), SweepError> {
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
