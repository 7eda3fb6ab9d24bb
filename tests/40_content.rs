mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn lessons_are_keyed_by_id() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .get(format!("{}/lessons", server.base_url))
        .bearer_auth(common::TEST_TOKEN)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body.as_object().map(|m| m.len()), Some(2), "unexpected lessons: {}", body);
    assert_eq!(body["2"]["title"], "Loops");
    Ok(())
}

#[tokio::test]
async fn missing_challenge_catalog_is_empty_object() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .get(format!("{}/challenges", server.base_url))
        .bearer_auth(common::TEST_TOKEN)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<serde_json::Value>().await?, serde_json::json!({}));
    Ok(())
}

#[tokio::test]
async fn catalogs_require_auth() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(format!("{}/challenges", server.base_url)).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
