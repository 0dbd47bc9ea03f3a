mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

// Every mutation endpoint sits behind the bearer-token gate; these checks
// exercise the gate itself, which rejects before any handler or store work.

#[tokio::test]
async fn post_creation_without_token_is_401() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/posts", server.base_url))
        .json(&json!({ "title": "Hello", "content": "World" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing Authorization header");
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_401() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .delete(format!("{}/api/posts/some-slug", server.base_url))
        .bearer_auth("not.a.token")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_is_401() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/categories", server.base_url))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .json(&json!({ "name": "Tech" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn non_admin_token_is_403_for_category_mutations() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // The server runs with the development JWT secret, so the test can
    // mint a token for a plain user
    let claims = scribe_api_rust::auth::Claims::new(uuid::Uuid::new_v4(), "user".to_string());
    let token = scribe_api_rust::auth::generate_jwt(claims)?;

    let res = client
        .post(format!("{}/api/categories", server.base_url))
        .bearer_auth(token)
        .json(&json!({ "name": "Tech" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], "Admin access required");
    Ok(())
}
