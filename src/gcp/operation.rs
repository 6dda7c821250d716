//! Long-running operations
//!
//! Compute Engine and Cloud SQL mutations return an operation to poll
//! instead of completing inline. These handles remember just enough of the
//! initial response to poll the right endpoint later, and normalize the
//! status answers into one enum.

use super::client::GcpClient;
use super::short_name;
use anyhow::Result;
use serde_json::Value;

/// Status of a long-running GCP operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    Running,
    Done,
    Failed(String),
    Unknown(String),
}

impl OperationStatus {
    /// Interpret a Compute/SQL style operation body (`status` + `error`)
    fn from_body(response: &Value) -> Self {
        let status = response.get("status").and_then(|v| v.as_str()).unwrap_or("");

        match status {
            "DONE" => {
                if let Some(message) = operation_error(response) {
                    OperationStatus::Failed(message)
                } else {
                    OperationStatus::Done
                }
            }
            "PENDING" | "RUNNING" => OperationStatus::Running,
            other => OperationStatus::Unknown(other.to_string()),
        }
    }
}

/// Collapse an operation's `error.errors[]` list into one message
fn operation_error(response: &Value) -> Option<String> {
    let errors = response.get("error")?.get("errors")?.as_array()?;

    let messages: Vec<&str> = errors
        .iter()
        .filter_map(|e| {
            e.get("message")
                .or_else(|| e.get("code"))
                .and_then(|v| v.as_str())
        })
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// Scope an in-flight Compute operation lives in
#[derive(Debug, Clone, PartialEq)]
pub enum OperationScope {
    Global,
    Region(String),
    Zone(String),
}

/// Handle to an in-flight Compute Engine operation
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeOperation {
    pub project: String,
    pub scope: OperationScope,
    pub name: String,
}

impl ComputeOperation {
    /// Build a handle from the body of the mutation's initial response.
    ///
    /// Compute operation bodies carry `zone` or `region` as full URLs when
    /// scoped; absence of both means a global operation.
    pub fn from_response(project: &str, response: &Value) -> Option<Self> {
        let name = response.get("name")?.as_str()?.to_string();

        let scope = if let Some(zone) = response.get("zone").and_then(|v| v.as_str()) {
            OperationScope::Zone(short_name(zone).to_string())
        } else if let Some(region) = response.get("region").and_then(|v| v.as_str()) {
            OperationScope::Region(short_name(region).to_string())
        } else {
            OperationScope::Global
        };

        Some(Self {
            project: project.to_string(),
            scope,
            name,
        })
    }

    fn poll_url(&self, client: &GcpClient) -> String {
        let path = match &self.scope {
            OperationScope::Global => format!("global/operations/{}", self.name),
            OperationScope::Region(region) => {
                format!("regions/{}/operations/{}", region, self.name)
            }
            OperationScope::Zone(zone) => format!("zones/{}/operations/{}", zone, self.name),
        };
        client.compute_url(&self.project, &path)
    }

    /// Poll the operation once
    pub async fn poll(&self, client: &GcpClient) -> Result<OperationStatus> {
        let response = client.get(&self.poll_url(client)).await?;
        Ok(OperationStatus::from_body(&response))
    }
}

/// Handle to an in-flight Cloud SQL Admin operation
#[derive(Debug, Clone, PartialEq)]
pub struct SqlOperation {
    pub project: String,
    pub name: String,
}

impl SqlOperation {
    pub fn from_response(project: &str, response: &Value) -> Option<Self> {
        let name = response.get("name")?.as_str()?.to_string();
        Some(Self {
            project: project.to_string(),
            name,
        })
    }

    /// Poll the operation once
    pub async fn poll(&self, client: &GcpClient) -> Result<OperationStatus> {
        let url = client.sqladmin_url(&self.project, &format!("operations/{}", self.name));
        let response = client.get(&url).await?;
        Ok(OperationStatus::from_body(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_zonal_operation_from_response() {
        let response = json!({
            "name": "operation-12345",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-east1-b",
            "status": "PENDING"
        });

        let op = ComputeOperation::from_response("p", &response).unwrap();
        assert_eq!(op.name, "operation-12345");
        assert_eq!(op.scope, OperationScope::Zone("us-east1-b".to_string()));
    }

    #[test]
    fn missing_zone_and_region_means_global() {
        let response = json!({ "name": "op-1", "status": "RUNNING" });
        let op = ComputeOperation::from_response("p", &response).unwrap();
        assert_eq!(op.scope, OperationScope::Global);
    }

    #[test]
    fn response_without_name_yields_no_handle() {
        assert!(ComputeOperation::from_response("p", &json!({"status": "DONE"})).is_none());
    }

    #[test]
    fn done_without_error_is_done() {
        assert_eq!(
            OperationStatus::from_body(&json!({"status": "DONE"})),
            OperationStatus::Done
        );
    }

    #[test]
    fn done_with_error_is_failed() {
        let body = json!({
            "status": "DONE",
            "error": { "errors": [
                { "code": "RESOURCE_IN_USE_BY_ANOTHER_RESOURCE", "message": "disk is attached" },
                { "message": "second problem" }
            ]}
        });
        assert_eq!(
            OperationStatus::from_body(&body),
            OperationStatus::Failed("disk is attached; second problem".to_string())
        );
    }

    #[test]
    fn pending_and_running_map_to_running() {
        for status in ["PENDING", "RUNNING"] {
            assert_eq!(
                OperationStatus::from_body(&json!({ "status": status })),
                OperationStatus::Running
            );
        }
    }

    #[test]
    fn unexpected_status_is_surfaced() {
        assert_eq!(
            OperationStatus::from_body(&json!({"status": "PAUSED"})),
            OperationStatus::Unknown("PAUSED".to_string())
        );
    }
}
