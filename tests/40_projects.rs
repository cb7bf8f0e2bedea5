mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{console_auth, create_project, custom_auth, read, TestServer};

#[tokio::test]
async fn projects_are_scoped_to_their_owner() -> Result<()> {
    let server = TestServer::spawn().await?;
    let alice = console_auth("alice", "alice@x.com");
    let bob = console_auth("bob", "bob@x.com");

    let id = create_project(&server, "alice", "Blog").await?;
    create_project(&server, "bob", "Shop").await?;

    let (status, body) = read(server.get("/project").header("Authorization", &alice).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    let projects = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["ID"], id.as_str());
    assert_eq!(projects[0]["OwnerUserID"], "alice");

    let resp = server
        .get(&format!("/project/{}", id))
        .header("Authorization", &bob)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .delete(&format!("/project/{}", id))
        .header("Authorization", &bob)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn owner_updates_and_deletes_project() -> Result<()> {
    let server = TestServer::spawn().await?;
    let alice = console_auth("alice", "alice@x.com");
    let id = create_project(&server, "alice", "Blog").await?;

    let (status, body) = read(
        server
            .put(&format!("/project/{}", id))
            .header("Authorization", &alice)
            .json(&json!({"Name": "Journal", "Description": "renamed"}))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["Name"], "Journal");

    let resp = server
        .delete(&format!("/project/{}", id))
        .header("Authorization", &alice)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn custom_tokens_cannot_manage_projects() -> Result<()> {
    let server = TestServer::spawn().await?;

    let resp = server
        .post("/project")
        .header("Authorization", custom_auth("p1", "a@x.com", "Admin"))
        .json(&json!({"Name": "Sneaky"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn profile_is_created_on_first_access() -> Result<()> {
    let server = TestServer::spawn().await?;
    let auth = console_auth("owner-1", "o@x.com");

    let (status, body) = read(server.get("/profile").header("Authorization", &auth).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["UserID"], "owner-1");
    assert_eq!(body["data"]["Email"], "o@x.com");

    let (status, body) = read(
        server
            .put("/profile")
            .header("Authorization", &auth)
            .json(&json!({"Name": "Olive", "Preferences": {"theme": "dark"}}))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["Preferences"]["theme"], "dark");

    let (_, body) = read(server.get("/profile").header("Authorization", &auth).send().await?).await?;
    assert_eq!(body["data"]["Name"], "Olive");
    Ok(())
}
