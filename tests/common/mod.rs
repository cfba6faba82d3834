#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

/// Secret shared between the spawned server and the tokens minted here.
pub const TEST_SECRET: &str = "integration-test-secret";

static SERVER: OnceLock<TestServer> = OnceLock::new();

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

        // Spawn the already-built binary to keep start fast during tests
        let mut cmd = Command::new("target/debug/scenario-api");
        cmd.env("SCENARIO_API_PORT", port.to_string())
            .env("AUTH_JWT_SECRET", TEST_SECRET)
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
            let url = format!("{}/ping", self.base_url);
            if let Ok(resp) = client.post(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

fn mint(email: &str, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": format!("sub-{}", email),
        "email": email,
        "exp": now + exp_offset_secs,
        "iat": now,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("failed to mint test token")
}

/// Valid token for the given user, one hour of lifetime.
pub fn token_for(email: &str) -> String {
    mint(email, 3600)
}

/// Token that expired two hours ago (past any validation leeway).
pub fn expired_token_for(email: &str) -> String {
    mint(email, -7200)
}

/// Create a scenario for the user and return its id.
pub async fn create_scenario(server: &TestServer, email: &str, name: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/addScenario", server.base_url))
        .bearer_auth(token_for(email))
        .json(&json!({"name": name}))
        .send()
        .await?;
    anyhow::ensure!(resp.status() == StatusCode::CREATED, "addScenario failed: {}", resp.status());

    let body: serde_json::Value = resp.json().await?;
    Ok(body["data"]["scenarioId"]
        .as_str()
        .context("missing scenarioId")?
        .to_string())
}
