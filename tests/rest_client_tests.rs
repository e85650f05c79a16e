//! # REST Client Tests
//!
//! Drives `RestClient` against a wiremock server to pin down paths, methods,
//! authentication, request bodies and error mapping.

mod common;

use bitbucket_server_controller::bitbucket::rest::{ClientConfig, RestClient, TlsOptions};
use bitbucket_server_controller::bitbucket::{
    AccessKey, AccessKeyApi, ClientError, Permission, Repo, Webhook, WebhookApi,
    WebhookConfiguration,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEYS_PATH: &str = "/rest/keys/1.0/projects/PROJ/repos/service/ssh";
const HOOKS_PATH: &str = "/rest/api/1.0/projects/PROJ/repos/service/webhooks";

fn client(server: &MockServer) -> RestClient {
    common::init_rustls();
    RestClient::new(ClientConfig {
        base_url: server.uri(),
        token: "s3cr3t".to_string(),
        tls: TlsOptions::default(),
    })
    .unwrap()
}

fn repo() -> Repo {
    Repo::new("PROJ", "service")
}

fn json_response(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

fn key_description(id: i64, permission: &str) -> serde_json::Value {
    json!({
        "key": {
            "id": id,
            "text": "ssh-rsa AAAAB3NzaC1yc2E ci",
            "label": "ci"
        },
        "permission": permission
    })
}

#[tokio::test]
async fn test_get_access_key_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{KEYS_PATH}/42")))
        .and(header("authorization", "Bearer s3cr3t"))
        .respond_with(json_response(200, key_description(42, "REPO_WRITE")))
        .expect(1)
        .mount(&server)
        .await;

    let key = client(&server).get_access_key(&repo(), 42).await.unwrap();

    assert_eq!(
        key,
        AccessKey {
            id: 42,
            key: "ssh-rsa AAAAB3NzaC1yc2E ci".to_string(),
            label: "ci".to_string(),
            permission: Permission::RepoWrite,
        }
    );
}

#[tokio::test]
async fn test_create_access_key_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(KEYS_PATH))
        .and(body_json(json!({
            "key": { "text": "ssh-rsa AAAAB3NzaC1yc2E ci", "label": "ci" },
            "permission": "REPO_READ"
        })))
        .respond_with(json_response(201, key_description(7, "REPO_READ")))
        .expect(1)
        .mount(&server)
        .await;

    let desired = AccessKey {
        id: 0,
        key: "ssh-rsa AAAAB3NzaC1yc2E ci".to_string(),
        label: "ci".to_string(),
        permission: Permission::RepoRead,
    };
    let created = client(&server)
        .create_access_key(&repo(), &desired)
        .await
        .unwrap();

    assert_eq!(created.id, 7);
}

#[tokio::test]
async fn test_update_access_key_permission_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{KEYS_PATH}/42/permission/REPO_WRITE")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .update_access_key_permission(&repo(), 42, Permission::RepoWrite)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_access_keys_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [key_description(1, "REPO_READ"), key_description(2, "REPO_READ")],
            "isLastPage": false,
            "nextPageStart": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .and(query_param("start", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [key_description(3, "REPO_WRITE")],
            "isLastPage": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = client(&server).list_access_keys(&repo()).await.unwrap();

    let ids: Vec<i64> = keys.iter().map(|k| k.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(keys[2].permission, Permission::RepoWrite);
}

#[tokio::test]
async fn test_delete_missing_access_key_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{KEYS_PATH}/42")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_access_key(&repo(), 42)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_error_body_is_rendered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(HOOKS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [
                { "context": "url", "message": "must be https", "exceptionName": null },
                { "context": null, "message": "name is taken", "exceptionName": "DuplicateWebhookException" }
            ]
        })))
        .mount(&server)
        .await;

    let hook = Webhook {
        name: "ci".to_string(),
        url: "http://ci.example.com".to_string(),
        ..Webhook::default()
    };
    let err = client(&server)
        .create_webhook(&repo(), &hook)
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(
                message,
                "url: must be https; name is taken (DuplicateWebhookException)"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_webhook_body_omits_server_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(HOOKS_PATH))
        .and(body_json(json!({
            "name": "ci",
            "configuration": { "secret": "abc" },
            "events": ["repo:refs_changed"],
            "url": "https://ci.example.com/hook",
            "active": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 12,
            "name": "ci",
            "createdDate": 1_600_000_000_000_i64,
            "updatedDate": 1_600_000_000_000_i64,
            "events": ["repo:refs_changed"],
            "configuration": { "secret": "abc" },
            "url": "https://ci.example.com/hook",
            "active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hook = Webhook {
        id: 99,
        name: "ci".to_string(),
        configuration: WebhookConfiguration {
            secret: Some("abc".to_string()),
        },
        events: vec!["repo:refs_changed".to_string()],
        url: "https://ci.example.com/hook".to_string(),
        active: Some(true),
        created_date: Some(1),
        updated_date: Some(2),
    };
    let created = client(&server).create_webhook(&repo(), &hook).await.unwrap();

    assert_eq!(created.id, 12);
    assert_eq!(created.created_date, Some(1_600_000_000_000));
}

#[tokio::test]
async fn test_update_webhook_uses_put_on_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{HOOKS_PATH}/12")))
        .and(body_json(json!({
            "name": "ci",
            "configuration": {},
            "events": ["pr:opened"],
            "url": "https://ci.example.com/hook",
            "active": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "name": "ci",
            "events": ["pr:opened"],
            "url": "https://ci.example.com/hook"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hook = Webhook {
        name: "ci".to_string(),
        events: vec!["pr:opened".to_string()],
        url: "https://ci.example.com/hook".to_string(),
        active: Some(true),
        ..Webhook::default()
    };
    let updated = client(&server)
        .update_webhook(&repo(), 12, &hook)
        .await
        .unwrap();

    assert_eq!(updated.id, 12);
    assert_eq!(updated.configuration.secret, None);
}

#[tokio::test]
async fn test_malformed_response_is_decode_error() {
    let server = MockServer::start().await;
    let maintenance = ResponseTemplate::new(200).set_body_string("<html>");
    Mock::given(method("GET"))
        .and(path(format!("{HOOKS_PATH}/12")))
        .respond_with(maintenance)
        .mount(&server)
        .await;

    let err = client(&server).get_webhook(&repo(), 12).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}
