//! Integration tests for configuration loading

use axum_test::TestServer;
use serde_json::Value;
use std::io::Write;
use warden::prelude::*;

resource_model!(Note, "Note", { text: String });

fn notes() -> ResourceConfig {
    ResourceConfig::new::<Note>()
        .permissions(PermissionMap::new().grant(Role::admin(), [Operation::Read]))
}

#[test]
fn test_load_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
bind_address: 0.0.0.0:9000
api_prefix: /v2
log_filter: warden=debug
pagination:
  default_limit: 25
  max_limit: 50
"#
    )
    .unwrap();

    let config = ServerConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.bind_address, "0.0.0.0:9000");
    assert_eq!(config.api_prefix, "/v2");
    assert_eq!(config.log_filter, "warden=debug");
    assert_eq!(config.pagination.default_limit, 25);
    assert_eq!(config.pagination.max_limit, 50);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    assert!(ServerConfig::from_yaml_file(path.to_str().unwrap()).is_err());
}

#[test]
fn test_invalid_limits_are_rejected() {
    let yaml = "pagination:\n  default_limit: 80\n  max_limit: 20\n";
    assert!(ServerConfig::from_yaml_str(yaml).is_err());
}

#[test]
fn test_malformed_yaml_is_rejected() {
    assert!(ServerConfig::from_yaml_str("pagination: [1, 2").is_err());
}

#[tokio::test]
async fn test_prefix_drives_routes() {
    let config = ServerConfig::from_yaml_str("api_prefix: /v2/\n").unwrap();
    let app = ServerBuilder::new()
        .with_config(config)
        .register(notes())
        .unwrap()
        .build()
        .unwrap();
    let server = TestServer::try_new(app).expect("Failed to create test server");

    let response = server.get("/v2").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let endpoints = body["data"][0]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints[0]["path"], "/v2/notes");

    // Anonymous, so the route exists but access is denied
    server
        .get("/v2/notes")
        .await
        .assert_status(axum::http::StatusCode::FORBIDDEN);
    server
        .get("/api/notes")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_size_is_capped_by_config() {
    let config = ServerConfig::from_yaml_str("pagination:\n  default_limit: 2\n  max_limit: 3\n")
        .unwrap();
    let store = InMemoryStore::new();
    for i in 0..5 {
        let mut record = Record::new();
        record.set("text", format!("note {}", i));
        store.create("notes", record).await.unwrap();
    }

    let verifier = StaticTokenVerifier::new()
        .with_token("root", Claims::new("sub-root").with_email("root@example.com"));
    let admin = User::new(
        "Root".to_string(),
        "root@example.com".to_string(),
        "sub-root".to_string(),
        RoleSet::parse_list("admin"),
    );
    let mut record = Record::from_model(&admin).unwrap();
    record.remove("id");
    store.create("users", record).await.unwrap();

    let app = ServerBuilder::new()
        .with_config(config)
        .with_store(store)
        .with_token_verifier(verifier)
        .with_user_resource()
        .unwrap()
        .register(notes())
        .unwrap()
        .build()
        .unwrap();
    let server = TestServer::try_new(app).expect("Failed to create test server");

    let body: Value = server
        .get("/api/notes")
        .authorization_bearer("root")
        .await
        .json();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let body: Value = server
        .get("/api/notes?limit=50")
        .authorization_bearer("root")
        .await
        .json();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["pagination"]["limit"], 3);
}
