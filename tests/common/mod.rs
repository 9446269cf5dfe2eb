#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};

use family_organizer::config::AppConfig;
use family_organizer::database::{MemoryStore, Store};
use family_organizer::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

/// A real server on a free port, backed by an in-memory store.
///
/// Each test gets its own server; it lives on the test's runtime and stops
/// with it.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Self::spawn_with_store(store).await
    }

    pub async fn spawn_with_store(store: Arc<dyn Store>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = AppState::new(AppConfig::for_testing(SECRET), store)?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn put(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    /// POST /register, returning the raw response
    pub async fn register(&self, family: &str, username: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/register"))
            .json(&json!({
                "family_name": family,
                "username": username,
                "password": "correct horse battery staple",
                "email": format!("{}@example.com", username),
            }))
            .send()
            .await?)
    }

    /// POST /login with the password `register` uses, returning the token
    pub async fn login(&self, username: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "username": username, "password": "correct horse battery staple" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());

        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response missing token")
    }

    /// Register and log in; returns (user record, token)
    pub async fn member(&self, family: &str, username: &str) -> Result<(Value, String)> {
        let res = self.register(family, username).await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        let body: Value = res.json().await?;
        let token = self.login(username).await?;
        Ok((body["data"].clone(), token))
    }
}

/// Unique name so tests never collide on family or username
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// `data` of a success envelope
pub async fn data(res: reqwest::Response) -> Result<Value> {
    let body: Value = res.json().await?;
    anyhow::ensure!(body["success"] == json!(true), "not a success envelope: {}", body);
    Ok(body["data"].clone())
}

/// Long names and a merge whose total is longer than either input quantity.
/// Run against every store backend.
pub async fn assert_long_values_merge(server: &TestServer, token: &str) -> Result<()> {
    let name = format!("Imported{}", " sparkling mineral water".repeat(8));
    let unit = "bottlesofthekindwiththeresealableplasticcaps".to_string();

    let res = server
        .post("/grocery_items", token, json!({ "name": name, "quantity": format!("0.1 {}", unit) }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed: {}", res.status());

    let res = server
        .post("/grocery_items", token, json!({ "name": name, "quantity": format!("0.2 {}", unit) }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "merge failed: {}", res.status());

    let merged = data(res).await?;
    let expected = format!("{} {}", 0.1_f64 + 0.2_f64, unit);
    anyhow::ensure!(expected.len() > 60, "scenario should exceed the old column width");
    anyhow::ensure!(
        merged["item"]["quantity"] == json!(expected),
        "unexpected merged quantity: {}",
        merged["item"]["quantity"]
    );
    anyhow::ensure!(merged["item"]["name"] == json!(name), "name was altered");
    Ok(())
}
