use crate::domain::models::TaskRecord;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Mutex;
use url::Url;

const RTDB_ROOT: &str = "gamificationUserData";

/// Remote side of the reconciliation protocol: point fetch and full-record
/// put at `gamificationUserData/{uid}/{normalized_task}`.
#[async_trait]
pub trait RemoteTaskStore: Send + Sync {
    async fn fetch(&self, uid: &str, task_name: &str) -> Result<Option<TaskRecord>, InfraError>;
    async fn put(&self, uid: &str, task_name: &str, record: &TaskRecord)
    -> Result<(), InfraError>;
}

/// Realtime-database REST client. Paths are suffixed with `.json` and an
/// `auth` query parameter carries the ID token of the signed-in user when
/// one is set.
#[derive(Debug, Default)]
pub struct ReqwestRtdbClient {
    client: Client,
    base_url: String,
    auth_token: Mutex<Option<String>>,
}

impl ReqwestRtdbClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            auth_token: Mutex::new(None),
        }
    }

    pub fn set_auth_token(&self, token: Option<String>) -> Result<(), InfraError> {
        let mut guard = self
            .auth_token
            .lock()
            .map_err(|error| InfraError::Remote(format!("auth token lock poisoned: {error}")))?;
        *guard = token.map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        Ok(())
    }

    fn auth_token(&self) -> Result<Option<String>, InfraError> {
        let guard = self
            .auth_token
            .lock()
            .map_err(|error| InfraError::Remote(format!("auth token lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Remote(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn remote_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("realtime database error: http {}", status.as_u16())
        } else {
            format!(
                "realtime database error: http {}; body={body}",
                status.as_u16()
            )
        };
        InfraError::Remote(message)
    }

    fn record_endpoint(&self, uid: &str, task_name: &str) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| InfraError::Remote(format!("invalid database base url: {error}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| InfraError::Remote("database base URL cannot be a base".to_string()))?;
            segments.push(RTDB_ROOT);
            segments.push(uid);
            segments.push(&format!("{task_name}.json"));
        }
        if let Some(token) = self.auth_token()? {
            url.query_pairs_mut().append_pair("auth", &token);
        }
        Ok(url)
    }
}

#[async_trait]
impl RemoteTaskStore for ReqwestRtdbClient {
    async fn fetch(&self, uid: &str, task_name: &str) -> Result<Option<TaskRecord>, InfraError> {
        Self::ensure_non_empty(uid, "uid")?;
        Self::ensure_non_empty(task_name, "task name")?;

        let endpoint = self.record_endpoint(uid, task_name)?;
        let response = self.client.get(endpoint).send().await.map_err(|error| {
            InfraError::Remote(format!("network error while fetching task record: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Remote(format!("failed reading task record response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::remote_http_error(status, &body));
        }

        // An absent record comes back as the literal JSON `null`.
        serde_json::from_str::<Option<TaskRecord>>(&body).map_err(|error| {
            InfraError::Remote(format!("invalid task record payload: {error}; body={body}"))
        })
    }

    async fn put(
        &self,
        uid: &str,
        task_name: &str,
        record: &TaskRecord,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(uid, "uid")?;
        Self::ensure_non_empty(task_name, "task name")?;

        let endpoint = self.record_endpoint(uid, task_name)?;
        let response = self
            .client
            .put(endpoint)
            .json(record)
            .send()
            .await
            .map_err(|error| {
                InfraError::Remote(format!("network error while writing task record: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Remote(format!("failed reading task record write response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::remote_http_error(status, &body));
        }
        Ok(())
    }
}
