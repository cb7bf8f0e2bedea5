mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{console_auth, create_project, custom_auth, read, TestServer};

#[tokio::test]
async fn anonymous_signup_is_forced_to_guest() -> Result<()> {
    let server = TestServer::spawn().await?;

    let resp = server
        .post("/user")
        .json(&json!({
            "ProjectID": "p1",
            "Email": "Mallory@X.com",
            "Password": "hunter22",
            "Role": "Admin"
        }))
        .send()
        .await?;
    let (status, body) = read(resp).await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["created"], true);
    assert_eq!(body["data"]["user"]["Role"], "Guest");
    assert_eq!(body["data"]["user"]["Email"], "mallory@x.com");
    assert_eq!(body["data"]["user"]["Password"], "*****");
    assert!(body["data"]["user"].get("PasswordHash").is_none());
    Ok(())
}

#[tokio::test]
async fn repeated_create_reports_existing_user() -> Result<()> {
    let server = TestServer::spawn().await?;
    let user = json!({"ProjectID": "p1", "Email": "a@x.com", "Name": "Ann", "Password": "pw-one"});

    let resp = server.post("/user").json(&user).send().await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let again = json!({"ProjectID": "p1", "Email": "a@x.com", "Name": "Not Ann", "Password": "pw-two"});
    let (status, body) = read(server.post("/user").json(&again).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"created": false, "ProjectID": "p1", "Email": "a@x.com"})
    );

    // The original password still logs in
    let resp = server
        .post("/login/p1")
        .json(&json!({"Email": "a@x.com", "Password": "pw-one"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn user_reads_are_always_redacted() -> Result<()> {
    let server = TestServer::spawn().await?;
    server
        .post("/user")
        .json(&json!({"ProjectID": "p1", "Email": "a@x.com", "Password": "pw"}))
        .send()
        .await?;

    let admin = custom_auth("p1", "boss@x.com", "Admin");
    let (status, body) = read(server.get("/user/p1").header("Authorization", &admin).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(users.len(), 1);
    assert!(users.iter().all(|u| u["Password"] == "*****"));

    let own = custom_auth("p1", "a@x.com", "Guest");
    let (status, body) = read(
        server
            .get("/user/p1/a@x.com")
            .header("Authorization", &own)
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["Password"], "*****");
    Ok(())
}

#[tokio::test]
async fn non_admin_console_user_writes_only_own_record() -> Result<()> {
    let server = TestServer::spawn().await?;
    let project_id = create_project(&server, "sub-a", "Shop").await?;

    for email in ["a@x.com", "b@x.com"] {
        server
            .post("/user")
            .json(&json!({"ProjectID": project_id, "Email": email, "Password": "pw"}))
            .send()
            .await?;
    }

    let caller = console_auth("sub-a", "a@x.com");

    let resp = server
        .put(&format!("/user/{}/b@x.com", project_id))
        .header("Authorization", &caller)
        .json(&json!({"Name": "Bee"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (status, body) = read(
        server
            .put(&format!("/user/{}/a@x.com", project_id))
            .header("Authorization", &caller)
            .json(&json!({"Name": "Ay", "Role": "Admin"}))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["Name"], "Ay");
    assert_eq!(body["data"]["Role"], "Guest");
    Ok(())
}

#[tokio::test]
async fn user_list_needs_project_admin() -> Result<()> {
    let server = TestServer::spawn().await?;

    let resp = server
        .get("/user/p1")
        .header("Authorization", custom_auth("p1", "a@x.com", "Guest"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = server.get("/user/p1").send().await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn admin_deletes_user() -> Result<()> {
    let server = TestServer::spawn().await?;
    server
        .post("/user")
        .json(&json!({"ProjectID": "p1", "Email": "a@x.com"}))
        .send()
        .await?;

    let admin = custom_auth("p1", "boss@x.com", "Admin");
    let resp = server
        .delete("/user/p1/a@x.com")
        .header("Authorization", &admin)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = server
        .get("/user/p1/a@x.com")
        .header("Authorization", &admin)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
