use std::fs;
use std::path::Path;

use anyhow::Result;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use serial_test::serial;
use switchyard_host::{Host, HostConfig};
use tempfile::TempDir;
use tower::ServiceExt;

fn write_fixture(dir: &Path, service: &str, envelope: Value) {
    fs::write(dir.join(format!("{service}.json")), envelope.to_string()).unwrap();
}

/// A fixture-backed host with one view of every kind.
fn host(fixtures: &TempDir) -> Result<Host> {
    let root = fixtures.path();
    fs::write(
        root.join("channels.hbs"),
        "{{#each items}}<li>{{this.name}}</li>{{/each}}",
    )?;
    let raw = format!(
        r#"
        locale = "en"

        [gateway]
        location = "fs://{root}"

        [[clusters]]
        id = "1"
        name = "dev"

        [[views]]
        name = "channel-list"
        kind = "index"
        route = "/channels"
        service = "zato.channel.get-list"
        template = "channels.html"
        template_file = "{root}/channels.hbs"
        schema = {{ output_required = ["name"], output_optional = ["is_active"], output_repeated = true }}

        [[views]]
        name = "channel-raw"
        kind = "index"
        route = "/channels/raw"
        service = "zato.channel.get-list"
        template = "unregistered.html"
        schema = {{ output_required = ["name"], output_repeated = true }}

        [[views]]
        name = "channel-edit"
        kind = "edit"
        route = "/channels/edit"
        service = "zato.channel.edit"
        schema = {{ input_required = ["name"], output_required = ["id", "name"] }}
        hooks = {{ object_label = "channel", name_field = "name" }}

        [[views]]
        name = "channel-delete"
        kind = "delete"
        route = "/channels/delete"
        service = "zato.channel.delete"
        hooks = {{ object_label = "channel" }}

        [[views]]
        name = "channel-password"
        kind = "change_password"
        route = "/channels/password"
        service = "zato.channel.change-password"
        "#,
        root = root.display()
    );
    let config = HostConfig::from_toml_str(&raw)?;
    Host::from_config(&config)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
#[serial]
async fn index_renders_the_registered_template() -> Result<()> {
    let fixtures = TempDir::new()?;
    write_fixture(
        fixtures.path(),
        "zato.channel.get-list",
        json!({"ok": true, "data": {"item": [{"name": "crm"}, {"name": {"text": "billing"}}]}}),
    );
    let host = host(&fixtures)?;

    let response = host
        .router()
        .oneshot(Request::get("/channels?cluster=1").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(body_text(response).await, "<li>crm</li><li>billing</li>");
    Ok(())
}

#[tokio::test]
#[serial]
async fn index_without_template_returns_the_payload_as_json() -> Result<()> {
    let fixtures = TempDir::new()?;
    write_fixture(
        fixtures.path(),
        "zato.channel.get-list",
        json!({"ok": true, "data": {"item": [{"name": "crm"}]}}),
    );
    let host = host(&fixtures)?;

    let response = host
        .router()
        .oneshot(Request::get("/channels/raw?cluster=1").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let payload: Value = serde_json::from_str(&body_text(response).await)?;
    assert_eq!(payload["cluster_id"], json!("1"));
    assert_eq!(payload["items"], json!([{"name": "crm"}]));
    assert_eq!(payload["item"], Value::Null);
    assert_eq!(payload["zato_clusters"][0]["name"], json!("dev"));
    assert_eq!(payload["choose_cluster_form"]["cluster"], json!("1"));
    Ok(())
}

#[tokio::test]
#[serial]
async fn edit_replies_with_javascript_json() -> Result<()> {
    let fixtures = TempDir::new()?;
    write_fixture(
        fixtures.path(),
        "zato.channel.edit",
        json!({"ok": true, "data": {"id": 7, "name": "crm"}}),
    );
    let host = host(&fixtures)?;

    let response = host
        .router()
        .oneshot(form("/channels/edit", "cluster=1&id=7&edit-name=crm"))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/javascript"
    );
    let body: Value = serde_json::from_str(&body_text(response).await)?;
    assert_eq!(
        body,
        json!({"message": "Successfully updated the channel [crm]", "id": "7", "name": "crm"})
    );
    Ok(())
}

#[tokio::test]
#[serial]
async fn delete_by_path_id_returns_empty_ok() -> Result<()> {
    let fixtures = TempDir::new()?;
    write_fixture(
        fixtures.path(),
        "zato.channel.delete",
        json!({"ok": false, "data": null}),
    );
    let host = host(&fixtures)?;

    let response = host
        .router()
        .oneshot(form("/channels/delete/7", "cluster=1"))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn delete_without_fixture_is_a_server_error() -> Result<()> {
    let fixtures = TempDir::new()?;
    let host = host(&fixtures)?;

    let response = host
        .router()
        .oneshot(form("/channels/delete/7", "cluster=1"))
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.starts_with("Could not delete the channel, e:["), "{body}");
    assert!(body.contains("no fixture for service `zato.channel.delete`"));

    let health = host
        .router()
        .oneshot(Request::get("/healthz").body(Body::empty())?)
        .await?;
    let health: Value = serde_json::from_str(&body_text(health).await)?;
    assert_eq!(health["dispatch"]["failures"], json!(1));
    assert_eq!(health["dispatch"]["invoke_errors"], json!(1));
    Ok(())
}

#[tokio::test]
#[serial]
async fn wrong_method_gets_405_with_allow_header() -> Result<()> {
    let fixtures = TempDir::new()?;
    let host = host(&fixtures)?;

    let response = host
        .router()
        .oneshot(Request::get("/channels/delete").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST");
    assert_eq!(
        body_text(response).await,
        "Method [GET] is not allowed here [channel-delete], methods allowed:[POST]"
    );
    Ok(())
}

#[tokio::test]
#[serial]
async fn change_password_confirms_with_default_message() -> Result<()> {
    let fixtures = TempDir::new()?;
    write_fixture(
        fixtures.path(),
        "zato.channel.change-password",
        json!({"ok": true, "data": null}),
    );
    let host = host(&fixtures)?;

    let response = host
        .router()
        .oneshot(form(
            "/channels/password/3",
            "password1=s3cret&password2=s3cret",
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await)?;
    assert_eq!(body, json!({"message": "Password updated"}));
    Ok(())
}
