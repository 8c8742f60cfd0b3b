use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::{AssignmentReply, AssignmentsResponse, KolekApi, WriteAck};
use crate::collector::{CollectorProfile, PasswordChange};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::session::Role;

/// reqwest-backed client for the PHP endpoints under `base_url`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("API base URL is empty".to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, script: &str) -> String {
        format!("{}/{}", self.base_url, script)
    }

    async fn get<T: DeserializeOwned>(&self, script: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(script);
        debug!(%url, "GET");
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        interpret(status, &body).inspect_err(|e| warn!(%url, status, "request failed: {e}"))
    }

    async fn post<B: Serialize + ?Sized>(&self, script: &str, body: &B) -> Result<WriteAck> {
        let url = self.endpoint(script);
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        interpret_ack(status, &bytes).inspect_err(|e| warn!(%url, status, "request failed: {e}"))
    }
}

#[async_trait]
impl KolekApi for HttpApi {
    async fn my_assignments(&self, user_id: &Id, role: Role) -> Result<AssignmentsResponse> {
        self.get(
            "get_my_assignments.php",
            &[("user_id", user_id.as_str()), ("role", role.as_str())],
        )
        .await
    }

    async fn respond_assignment(&self, reply: &AssignmentReply) -> Result<WriteAck> {
        self.post("respond_assignment.php", reply).await
    }

    async fn garbage_collector(&self, id: &Id) -> Result<CollectorProfile> {
        self.get("get_garbage_collector.php", &[("id", id.as_str())]).await
    }

    async fn update_garbage_collector(&self, profile: &CollectorProfile) -> Result<WriteAck> {
        self.post("update_garbage_collector.php", profile).await
    }

    async fn change_password(&self, change: &PasswordChange) -> Result<WriteAck> {
        self.post("change_password.php", change).await
    }
}

/// Turns a status code and body into the typed payload or an error carrying
/// the server's `message`.
pub fn interpret<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T> {
    check_status(status, body)?;
    serde_json::from_slice(body).map_err(Error::Malformed)
}

/// Like [`interpret`] for write endpoints, where an empty body is fine.
pub fn interpret_ack(status: u16, body: &[u8]) -> Result<WriteAck> {
    check_status(status, body)?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(WriteAck::default());
    }
    serde_json::from_slice(body).map_err(Error::Malformed)
}

fn check_status(status: u16, body: &[u8]) -> Result<()> {
    if (200..300).contains(&status) {
        return Ok(());
    }

    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {status}"));

    Err(Error::Status { status, message })
}
