mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

// Validation short-circuits before handlers touch the store, so these
// checks run the full HTTP pipeline regardless of database availability.

#[tokio::test]
async fn register_with_invalid_fields_returns_field_errors() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({ "name": "", "email": "not-an-email", "password": "abc" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    let errors = body["errors"].as_array().expect("errors array");
    let fields: Vec<&str> = errors.iter().filter_map(|e| e["field"].as_str()).collect();
    assert_eq!(fields, vec!["name", "email", "password"]);
    Ok(())
}

#[tokio::test]
async fn login_without_password_is_400() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({ "email": "jane@example.com" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    let errors = body["errors"].as_array().expect("errors array");
    assert_eq!(errors[0]["field"], "password");
    Ok(())
}

#[tokio::test]
async fn post_creation_with_empty_body_reports_every_field() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let claims = scribe_api_rust::auth::Claims::new(uuid::Uuid::new_v4(), "user".to_string());
    let token = scribe_api_rust::auth::generate_jwt(claims)?;

    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .bearer_auth(token)
        .json(&json!({}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    let errors = body["errors"].as_array().expect("errors array");
    let fields: Vec<&str> = errors.iter().filter_map(|e| e["field"].as_str()).collect();
    assert_eq!(fields, vec!["title", "content", "category"]);
    Ok(())
}

#[tokio::test]
async fn listing_with_malformed_category_filter_is_400() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/posts?category=technology", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    let errors = body["errors"].as_array().expect("errors array");
    assert_eq!(errors[0]["field"], "category");
    Ok(())
}
