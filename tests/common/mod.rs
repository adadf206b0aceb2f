#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// A server process owned by one test; killed when dropped
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_zolaris-api-rust"));
        cmd.env("ZOLARIS_API_PORT", port.to_string())
            .env("DATABASE_APPLY_SCHEMA_ON_START", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// The database URL, or `None` (with a note) when no database is configured
pub fn database_url() -> Option<String> {
    let _ = dotenvy::dotenv();
    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            None
        }
    }
}

/// A freshly spawned server, or `None` when no database is configured
pub async fn start_server() -> Result<Option<TestServer>> {
    if database_url().is_none() {
        return Ok(None);
    }

    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(Some(server))
}

/// Thin JSON client that sends `X-User-ID` on every request
pub struct ApiClient {
    base_url: String,
    user_id: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(server: &TestServer, user_id: &str) -> Self {
        Self {
            base_url: server.base_url.clone(),
            user_id: user_id.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("x-user-id", &self.user_id)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("x-user-id", &self.user_id)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    /// Register a uniquely named category and return its id
    pub async fn category(&self, kind: &str) -> Result<String> {
        let name = format!("{}-{}", kind, uuid::Uuid::new_v4().simple());
        let (status, body) = self.post("/category", json!({ "name": name, "type": kind })).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "category create failed: {body}");
        body["data"]["id"]
            .as_str()
            .map(str::to_string)
            .context("category id missing")
    }

    pub async fn create(&self, path: &str, body: Value) -> Result<String> {
        let (status, body) = self.post(path, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "entity create failed: {body}");
        body["data"]["entityId"]
            .as_str()
            .map(str::to_string)
            .context("entity id missing")
    }
}
