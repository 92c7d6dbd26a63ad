#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use school_api::app::{app, AppState};
use school_api::auth::{generate_jwt, Claims, TenantMembership};
use school_api::database::MemoryStore;
use school_api::promotion::FixedClock;

pub const SECRET: &str = "integration-test-secret";

/// In-process server over a fresh in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a server whose clock reads `year-month-day`
    pub async fn start_on(year: i32, month: u32, day: u32) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_parts(store.clone(), Arc::new(FixedClock::on(year, month, day)), SECRET);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            port,
            base_url,
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .patch(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .delete(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    /// Create a level as an administrator and return its id
    pub async fn level(&self, name: &str, system: &str, order: i32, next: Option<&str>, is_final: bool) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/academic-levels",
                &admin_token(),
                json!({
                    "displayName": name,
                    "academicSystem": system,
                    "levelOrder": order,
                    "nextLevel": next,
                    "isFinal": is_final
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "level create failed: {}", body);
        id_of(&body["data"])
    }

    pub async fn stream(&self, tenant: &str, name: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/streams",
                &admin_token(),
                json!({ "tenant": tenant, "streamName": name, "streamCode": name }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "stream create failed: {}", body);
        id_of(&body["data"])
    }

    pub async fn class(&self, tenant: &str, year: i32, level: &str, stream: Option<&str>) -> Result<Value> {
        let (status, body) = self
            .post(
                "/api/classes",
                &admin_token(),
                json!({ "tenant": tenant, "academicYear": year, "academicLevel": level, "stream": stream }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "class create failed: {}", body);
        Ok(body["data"].clone())
    }
}

pub fn id_of(value: &Value) -> Result<String> {
    value["id"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("no id in {}", value))
}

pub fn token(roles: &[&str], tenants: &[&str]) -> String {
    let claims = Claims::new(
        Uuid::new_v4(),
        "Test Caller",
        roles.iter().map(|r| r.to_string()).collect(),
        tenants
            .iter()
            .map(|t| TenantMembership {
                tenant: t.to_string(),
                roles: vec!["school-admin".to_string()],
            })
            .collect(),
        1,
    );
    generate_jwt(&claims, SECRET).expect("token")
}

pub fn admin_token() -> String {
    token(&["super-admin"], &[])
}
