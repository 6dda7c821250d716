//! Integration tests against mocked GCP endpoints
//!
//! The client's endpoint override points every service at one wiremock
//! server, so these tests drive the real transport, discovery, gate and
//! lister code paths. Mock expectations double as call-count assertions;
//! they are verified when the server drops.

use gcpsweep::gcp::{ApiEnablement, Environment, GcpClient, GcpCredentials};
use gcpsweep::resources::{compute_instance, sql_instance, storage_bucket};
use gcpsweep::sweep::{Lister, Location, ScanParams, Settings, SkipReason, SweepError};
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "acme-sandbox";
const TOKEN: &str = "test-token";

fn client_for(server: &MockServer) -> GcpClient {
    GcpClient::with_credentials(GcpCredentials::from_static_token(TOKEN))
        .expect("client")
        .with_endpoint(&server.uri())
        .expect("endpoint override")
}

fn zonal_params(client: &GcpClient, zone: &str) -> ScanParams {
    ScanParams::new(
        client.clone(),
        ApiEnablement::new(),
        PROJECT,
        Location::Zone {
            region: zone.rsplit_once('-').map(|(r, _)| r.to_string()).unwrap(),
            zone: zone.to_string(),
        },
    )
}

fn regional_params(client: &GcpClient, region: &str) -> ScanParams {
    ScanParams::new(
        client.clone(),
        ApiEnablement::new(),
        PROJECT,
        Location::Region(region.to_string()),
    )
}

fn global_params(client: &GcpClient) -> ScanParams {
    ScanParams::new(
        client.clone(),
        ApiEnablement::new(),
        PROJECT,
        Location::Global,
    )
}

async fn mock_api_enabled(server: &MockServer, api: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/projects/{PROJECT}/services/{api}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("projects/123/services/{api}"),
            "state": "ENABLED"
        })))
        .mount(server)
        .await;
}

/// Discovery assembles organizations, the project and the zone topology
#[tokio::test]
async fn environment_discovery_builds_topology() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/organizations:search"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organizations": [
                {"name": "organizations/123456789", "displayName": "acme.example"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/projects:search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [
                {
                    "name": "projects/987654",
                    "projectId": PROJECT,
                    "displayName": "Acme Sandbox",
                    "state": "ACTIVE"
                },
                {
                    "name": "projects/111111",
                    "projectId": "acme-graveyard",
                    "displayName": "Old Sandbox",
                    "state": "DELETE_REQUESTED"
                }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/compute/v1/projects/{PROJECT}/regions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "name": "us-central1",
                    "zones": [
                        "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a",
                        "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-b"
                    ]
                },
                {
                    "name": "europe-west1",
                    "zones": [
                        "https://www.googleapis.com/compute/v1/projects/p/zones/europe-west1-d"
                    ]
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let env = Environment::discover(&client, PROJECT)
        .await
        .expect("discovery succeeds");

    assert_eq!(env.organizations.len(), 1);
    assert_eq!(env.organizations[0].id(), "123456789");
    assert_eq!(env.target_project().unwrap().project_id, PROJECT);
    assert_eq!(env.projects.len(), 1, "non-ACTIVE projects are dropped");
    assert_eq!(env.regions(), &["global", "us-central1", "europe-west1"]);
    assert_eq!(env.zones_for("us-central1"), &["us-central1-a", "us-central1-b"]);
    assert_eq!(env.region_of_zone("europe-west1-d"), Some("europe-west1"));
}

/// Discovery refuses projects that are shutting down or out of sight
#[tokio::test]
async fn discovery_rejects_inactive_projects() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/organizations:search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organizations": []})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/projects:search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [{
                "name": "projects/987654",
                "projectId": PROJECT,
                "state": "DELETE_REQUESTED"
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = Environment::discover(&client, PROJECT).await.unwrap_err();
    assert!(err.to_string().contains("DELETE_REQUESTED"));

    let err = Environment::discover(&client, "acme-phantom").await.unwrap_err();
    assert!(err.to_string().contains("not visible"));
}

/// Discovery is all-or-nothing; a failing organization search aborts it
#[tokio::test]
async fn discovery_is_fatal_when_organization_search_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/organizations:search"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": 500, "message": "backend error"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/projects:search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [{
                "name": "projects/987654",
                "projectId": PROJECT,
                "state": "ACTIVE"
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/compute/v1/projects/{PROJECT}/regions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = Environment::discover(&client, PROJECT).await.unwrap_err();
    assert!(format!("{err:#}").contains("organizations"));
}

/// The enablement cache asks the Service Usage API exactly once per
/// (project, api) pair no matter how many passes consult it
#[tokio::test]
async fn api_enablement_is_memoized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/projects/{PROJECT}/services/compute.googleapis.com"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/123/services/compute.googleapis.com",
            "state": "ENABLED"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let enablement = ApiEnablement::new();

    for _ in 0..5 {
        let enabled = enablement
            .is_enabled(&client, PROJECT, "compute.googleapis.com")
            .await
            .expect("lookup succeeds");
        assert!(enabled);
    }

    server.verify().await;
}

/// A disabled API turns into a typed skip before any resource call is made
#[tokio::test]
async fn disabled_api_gates_the_lister() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/projects/{PROJECT}/services/compute.googleapis.com"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/123/services/compute.googleapis.com",
            "state": "DISABLED"
        })))
        .mount(&server)
        .await;

    // The instances endpoint must never be hit
    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{PROJECT}/zones/us-central1-a/instances"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = zonal_params(&client, "us-central1-a");

    let err = compute_instance::ComputeInstanceLister
        .list(&params)
        .await
        .err()
        .expect("listing should be gated");

    match err {
        SweepError::Skip(SkipReason::ApiDisabled { api }) => {
            assert_eq!(api, "compute.googleapis.com");
        }
        other => panic!("expected an API-disabled skip, got {other:?}"),
    }

    server.verify().await;
}

/// Listing follows nextPageToken across pages
#[tokio::test]
async fn instance_listing_paginates() {
    let server = MockServer::start().await;
    mock_api_enabled(&server, "compute.googleapis.com").await;

    let instances_path = format!("/compute/v1/projects/{PROJECT}/zones/us-central1-a/instances");

    // Second page, matched by its token
    Mock::given(method("GET"))
        .and(path(instances_path.clone()))
        .and(query_param("pageToken", "token-page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "worker-3"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // First page
    Mock::given(method("GET"))
        .and(path(instances_path))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "worker-1"}, {"name": "worker-2"}],
            "nextPageToken": "token-page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = zonal_params(&client, "us-central1-a");

    let resources = compute_instance::ComputeInstanceLister
        .list(&params)
        .await
        .expect("listing succeeds");

    let ids: Vec<String> = resources.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["worker-1", "worker-2", "worker-3"]);

    server.verify().await;
}

/// Removal issues the DELETE, then polls the returned operation until it
/// reports done; once done, further wait calls stay off the network
#[tokio::test]
async fn instance_removal_polls_operation_to_done() {
    let server = MockServer::start().await;
    mock_api_enabled(&server, "compute.googleapis.com").await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{PROJECT}/zones/us-central1-a/instances"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "worker-1"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!(
            "/compute/v1/projects/{PROJECT}/zones/us-central1-a/instances/worker-1"
        )))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operation-77",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a",
            "status": "PENDING"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let operation_path = format!(
        "/compute/v1/projects/{PROJECT}/zones/us-central1-a/operations/operation-77"
    );

    Mock::given(method("GET"))
        .and(path(operation_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operation-77",
            "status": "RUNNING"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(operation_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operation-77",
            "status": "DONE"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = zonal_params(&client, "us-central1-a");

    let mut resources = compute_instance::ComputeInstanceLister
        .list(&params)
        .await
        .expect("listing succeeds");
    let instance = resources.first_mut().expect("one instance");

    instance.remove(&client).await.expect("delete accepted");

    let first = instance.handle_wait(&client).await;
    assert!(
        matches!(first, Err(SweepError::WaitPending { ref operation }) if operation == "operation-77"),
        "first poll should be pending: {first:?}"
    );

    instance.handle_wait(&client).await.expect("second poll completes");

    // Handle is cleared; the operation endpoint's expect(1) counts would
    // fail on verify if this made another call.
    instance.handle_wait(&client).await.expect("no-op after done");

    server.verify().await;
}

/// An operation that completes with an error payload is a terminal
/// failure carrying the upstream message, never another pending signal
#[tokio::test]
async fn failed_operation_is_terminal_not_pending() {
    let server = MockServer::start().await;
    mock_api_enabled(&server, "compute.googleapis.com").await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{PROJECT}/zones/us-central1-a/instances"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "worker-1"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!(
            "/compute/v1/projects/{PROJECT}/zones/us-central1-a/instances/worker-1"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operation-13",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a",
            "status": "PENDING"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{PROJECT}/zones/us-central1-a/operations/operation-13"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operation-13",
            "status": "DONE",
            "error": { "errors": [
                { "code": "RESOURCE_IN_USE_BY_ANOTHER_RESOURCE", "message": "instance is in use" }
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = zonal_params(&client, "us-central1-a");

    let mut resources = compute_instance::ComputeInstanceLister
        .list(&params)
        .await
        .expect("listing succeeds");
    let instance = resources.first_mut().expect("one instance");

    instance.remove(&client).await.expect("delete accepted");

    let err = instance
        .handle_wait(&client)
        .await
        .err()
        .expect("wait should fail");
    assert!(
        matches!(err, SweepError::Other(_)),
        "failure payload must be terminal, got {err:?}"
    );
    let text = format!("{err:#}");
    assert!(text.contains("operation-13"));
    assert!(text.contains("instance is in use"));

    server.verify().await;
}

/// Upstream error messages survive into the returned error
#[tokio::test]
async fn upstream_error_message_is_surfaced() {
    let server = MockServer::start().await;
    mock_api_enabled(&server, "compute.googleapis.com").await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/compute/v1/projects/{PROJECT}/zones/us-central1-a/instances"
        )))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "Required 'compute.instances.list' permission"
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = zonal_params(&client, "us-central1-a");

    let err = compute_instance::ComputeInstanceLister
        .list(&params)
        .await
        .err()
        .expect("listing should fail");
    let text = format!("{err:#}");
    assert!(text.contains("403"));
    assert!(text.contains("compute.instances.list"));
}

/// The SQL listing is project-wide; a regional pass keeps only its own
#[tokio::test]
async fn sql_instances_are_filtered_by_region() {
    let server = MockServer::start().await;
    mock_api_enabled(&server, "sqladmin.googleapis.com").await;

    Mock::given(method("GET"))
        .and(path(format!("/sql/v1beta4/projects/{PROJECT}/instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"name": "db-central", "region": "us-central1", "settings": {}},
                {"name": "db-europe", "region": "europe-west1", "settings": {}}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = regional_params(&client, "us-central1");

    let resources = sql_instance::SqlInstanceLister
        .list(&params)
        .await
        .expect("listing succeeds");

    let ids: Vec<String> = resources.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["db-central"]);
}

/// With the disarm setting, a protected instance is patched free of
/// deletion protection before the delete goes out
#[tokio::test]
async fn sql_disarm_unlocks_protected_instance() {
    let server = MockServer::start().await;
    mock_api_enabled(&server, "sqladmin.googleapis.com").await;

    Mock::given(method("GET"))
        .and(path(format!("/sql/v1beta4/projects/{PROJECT}/instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "name": "primary",
                "region": "us-central1",
                "settings": { "deletionProtectionEnabled": true }
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("/sql/v1beta4/projects/{PROJECT}/instances/primary")))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-disarm",
            "status": "PENDING"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sql/v1beta4/projects/{PROJECT}/operations/op-disarm")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-disarm",
            "status": "DONE"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/sql/v1beta4/projects/{PROJECT}/instances/primary")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-delete",
            "status": "PENDING"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sql/v1beta4/projects/{PROJECT}/operations/op-delete")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-delete",
            "status": "DONE"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = regional_params(&client, "us-central1");

    let mut resources = sql_instance::SqlInstanceLister
        .list(&params)
        .await
        .expect("listing succeeds");
    let instance = resources.first_mut().expect("one instance");

    let mut settings = Settings::new();
    settings.set(sql_instance::DISARM_PROTECTION_SETTING, true);
    instance.apply_settings(&settings);
    instance.filter().expect("disarm setting clears the veto");

    instance.remove(&client).await.expect("patch then delete accepted");
    instance.handle_wait(&client).await.expect("delete completes");

    server.verify().await;
}

/// Bucket removal deletes every object before the bucket itself
#[tokio::test]
async fn bucket_removal_drains_objects_first() {
    let server = MockServer::start().await;
    mock_api_enabled(&server, "storage.googleapis.com").await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .and(query_param("project", PROJECT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "build-artifacts"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b/build-artifacts/o"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "release/v1.tar.gz"}, {"name": "logs.txt"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/b/build-artifacts/o/release%2Fv1.tar.gz"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/b/build-artifacts/o/logs.txt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/b/build-artifacts"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = global_params(&client);

    let mut resources = storage_bucket::StorageBucketLister
        .list(&params)
        .await
        .expect("listing succeeds");
    let bucket = resources.first_mut().expect("one bucket");

    bucket.remove(&client).await.expect("bucket removed");

    server.verify().await;
}
