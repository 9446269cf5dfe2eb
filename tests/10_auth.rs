mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{unique, TestServer, SECRET};
use family_organizer::auth::{Claims, TokenSigner};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], json!(true));
    Ok(())
}

#[tokio::test]
async fn first_member_is_accepted_second_is_pending() -> Result<()> {
    let server = TestServer::spawn().await?;
    let family = unique("family");

    let res = server.register(&family, &unique("alice")).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let alice = common::data(res).await?;
    assert_eq!(alice["is_accepted"], json!(true));
    assert!(alice.get("password_hash").is_none(), "hash leaked: {}", alice);

    let bob = common::data(server.register(&family, &unique("bob")).await?).await?;
    assert_eq!(bob["is_accepted"], json!(false));
    assert_eq!(bob["family_id"], alice["family_id"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_username_is_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let username = unique("carol");

    server.member(&unique("family"), &username).await?;
    let res = server.register(&unique("other"), &username).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["code"], json!("DUPLICATE_USERNAME"));
    Ok(())
}

#[tokio::test]
async fn register_requires_every_field() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/register"))
        .json(&json!({ "family_name": "x", "username": "  ", "password": "pw", "email": "e" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;
    let username = unique("dave");
    server.member(&unique("family"), &username).await?;

    let res = server
        .client
        .post(server.url("/login"))
        .json(&json!({ "username": username, "password": "nope" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/login"))
        .json(&json!({ "username": unique("ghost"), "password": "nope" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_returns_token_for_whoami() -> Result<()> {
    let server = TestServer::spawn().await?;
    let family = unique("family");
    let username = unique("erin");
    let (user, token) = server.member(&family, &username).await?;

    let me = common::data(server.get("/me", &token).send().await?).await?;
    assert_eq!(me["user"]["id"], user["id"]);
    assert_eq!(me["user"]["username"], json!(username));
    assert_eq!(me["family"]["name"], json!(family));
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/tasks")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/tasks"))
        .header("Authorization", "Token abc")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.get("/tasks", "not-a-jwt").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn expired_and_tampered_tokens_are_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (user, token) = server.member(&unique("family"), &unique("frank")).await?;
    let user_id = user["id"].as_i64().expect("user id");

    let signer = TokenSigner::new(SECRET, Duration::hours(24))?;
    let expired = signer.sign(&Claims {
        sub: user_id,
        accepted: true,
        exp: (Utc::now() - Duration::minutes(5)).timestamp(),
        iat: (Utc::now() - Duration::hours(25)).timestamp(),
    })?;
    let res = server.get("/tasks", &expired).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = TokenSigner::new("some-other-secret", Duration::hours(24))?.sign(&Claims {
        sub: user_id,
        accepted: true,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
        iat: Utc::now().timestamp(),
    })?;
    let res = server.get("/tasks", &forged).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Flip the first character of the signature segment
    let sig_start = token.rfind('.').expect("three-part token") + 1;
    let first = &token[sig_start..sig_start + 1];
    let replacement = if first == "A" { "B" } else { "A" };
    let tampered = format!("{}{}{}", &token[..sig_start], replacement, &token[sig_start + 1..]);
    let res = server.get("/tasks", &tampered).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.get("/tasks", &token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_user_is_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;

    let token = TokenSigner::new(SECRET, Duration::hours(1))?.sign(&Claims {
        sub: 987_654,
        accepted: true,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
        iat: Utc::now().timestamp(),
    })?;
    let res = server.get("/me", &token).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn pending_member_can_read_but_not_write_until_accepted() -> Result<()> {
    let server = TestServer::spawn().await?;
    let family = unique("family");
    let (_, alice) = server.member(&family, &unique("alice")).await?;
    let (bob_user, bob) = server.member(&family, &unique("bob")).await?;

    let res = server.get("/tasks", &bob).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    for (path, body) in [
        ("/tasks", json!({ "title": "Dishes" })),
        ("/meals", json!({ "name": "Soup" })),
        ("/recipes", json!({ "name": "Soup" })),
        ("/grocery_items", json!({ "name": "Milk", "quantity": "1 gal" })),
        ("/thoughts", json!({ "content": "hello" })),
    ] {
        let res = server.post(path, &bob, body).send().await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "POST {}", path);
    }

    // A pending member cannot accept anyone, including themselves
    let accept_path = format!("/family/users/{}/accept", bob_user["id"]);
    let res = server.put(&accept_path, &bob, json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let accepted = common::data(server.put(&accept_path, &alice, json!({})).send().await?).await?;
    assert_eq!(accepted["is_accepted"], json!(true));

    // Same token, the guard reads the live flag
    let res = server.post("/tasks", &bob, json!({ "title": "Dishes" })).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let members = common::data(server.get("/family/users", &alice).send().await?).await?;
    assert_eq!(members.as_array().map(Vec::len), Some(2));
    Ok(())
}
