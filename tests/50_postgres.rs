//! Store-sensitive scenarios re-run against PostgreSQL.
//!
//! Each test returns early when `DATABASE_URL` is unset. Ids and emails are
//! unique per test because the database outlives a single run.

mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{user_created, TestApp};
use serde_json::json;
use uuid::Uuid;

macro_rules! pg_app {
    () => {
        match TestApp::postgres().await? {
            Some(app) => app,
            None => return Ok(()),
        }
    };
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

fn titles(body: &serde_json::Value) -> Vec<String> {
    body["todos"]
        .as_array()
        .map(|todos| {
            todos
                .iter()
                .filter_map(|t| t["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pg_concurrent_creates_never_exceed_quota() -> Result<()> {
    let app = Arc::new(pg_app!());
    let user = unique("user");
    let token = app.member(&user).await?;

    let mut handles = Vec::new();
    for i in 0..10 {
        let app = app.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            app.post("/api/todos", Some(&token), json!({ "title": format!("race {}", i) }))
                .await
                .map(|res| res.status)
        }));
    }

    let mut created = 0;
    for handle in handles {
        let status = handle.await??;
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }
    assert_eq!(created, 3);

    let res = app.get("/api/todos", Some(&token)).await?;
    assert_eq!(titles(&res.body).len(), 3);
    Ok(())
}

#[tokio::test]
async fn pg_webhook_replay_is_idempotent() -> Result<()> {
    let app = pg_app!();
    let user = unique("user");
    let email = format!("{}@example.com", user);
    let event = user_created(&user, &email);

    let res = app.webhook(&event).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "User created successfully");

    let res = app.webhook(&event).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "User already exists");

    let stored = app.store.find_user(&user).await?;
    let stored = stored.ok_or_else(|| anyhow::anyhow!("user not provisioned"))?;
    assert_eq!(stored.email, email);
    assert!(!stored.is_subscribed);
    Ok(())
}

#[tokio::test]
async fn pg_duplicate_email_for_new_id_conflicts() -> Result<()> {
    let app = pg_app!();
    let first = unique("user");
    let second = unique("user");
    let email = format!("{}@example.com", first);

    app.webhook(&user_created(&first, &email)).await?;
    let res = app.webhook(&user_created(&second, &email)).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["code"], "CONFLICT");
    assert!(app.store.find_user(&second).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn pg_search_treats_wildcards_literally() -> Result<()> {
    let app = pg_app!();
    let user = unique("user");
    let token = app.member(&user).await?;
    app.post("/api/subscription", Some(&token), json!({})).await?;

    for title in ["100% Done", "1000 done", "a_b", "axb", "back\\slash", "backslash"] {
        app.create_todo(&token, title).await?;
    }

    let res = app.get("/api/todos?search=%25", Some(&token)).await?;
    assert_eq!(titles(&res.body), vec!["100% Done"]);
    assert_eq!(res.body["totalPages"], 1);

    let res = app.get("/api/todos?search=_", Some(&token)).await?;
    assert_eq!(titles(&res.body), vec!["a_b"]);

    let res = app.get("/api/todos?search=%5C", Some(&token)).await?;
    assert_eq!(titles(&res.body), vec!["back\\slash"]);

    let res = app.get("/api/todos?search=DONE", Some(&token)).await?;
    assert_eq!(titles(&res.body).len(), 2);

    let res = app.get("/api/todos?search=nothing-matches", Some(&token)).await?;
    assert_eq!(res.body["todos"], json!([]));
    assert_eq!(res.body["totalPages"], 0);
    Ok(())
}

#[tokio::test]
async fn pg_paging_counts_with_the_listing_filter() -> Result<()> {
    let app = pg_app!();
    let user = unique("user");
    let token = app.member(&user).await?;
    app.post("/api/subscription", Some(&token), json!({})).await?;

    for i in 0..12 {
        app.create_todo(&token, &format!("Report {}", i)).await?;
    }
    app.create_todo(&token, "groceries").await?;

    let res = app.get("/api/todos?search=report", Some(&token)).await?;
    assert_eq!(res.body["totalPages"], 2);
    assert_eq!(titles(&res.body).len(), 10);

    let res = app.get("/api/todos?search=report&page=2", Some(&token)).await?;
    assert_eq!(res.body["currentPage"], 2);
    assert_eq!(titles(&res.body).len(), 2);
    Ok(())
}

#[tokio::test]
async fn pg_todos_are_owner_scoped() -> Result<()> {
    let app = pg_app!();
    let owner = app.member(&unique("owner")).await?;
    let intruder = app.member(&unique("intruder")).await?;
    let id = app.create_todo(&owner, "private").await?;
    let path = format!("/api/todos/{}", id);

    assert_eq!(app.get(&path, Some(&intruder)).await?.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.put(&path, Some(&intruder), json!({ "completed": true })).await?.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.delete(&path, Some(&intruder)).await?.status, StatusCode::NOT_FOUND);

    let res = app.put(&path, Some(&owner), json!({ "completed": true })).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "private");
    assert_eq!(res.body["completed"], true);

    assert_eq!(app.delete(&path, Some(&owner)).await?.status, StatusCode::OK);
    assert_eq!(app.delete(&path, Some(&owner)).await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn pg_expired_subscription_is_written_back() -> Result<()> {
    let app = pg_app!();
    let user = unique("user");
    let token = app.member(&user).await?;

    let now = Utc::now();
    app.store.activate_subscription(&user, now + Duration::days(1)).await?;
    assert!(app.store.lapse_subscription(&user, now).await?.is_none());

    app.store.activate_subscription(&user, now - Duration::days(1)).await?;
    let res = app.get("/api/subscription", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "isSubscribed": false, "subscriptionEnds": null }));

    let stored = app.store.find_user(&user).await?;
    let stored = stored.ok_or_else(|| anyhow::anyhow!("user vanished"))?;
    assert!(!stored.is_subscribed);
    assert!(stored.subscription_ends.is_none());
    Ok(())
}
