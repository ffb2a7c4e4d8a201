use crate::infrastructure::credential_store::{CredentialStore, SavedCredentials};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::sync::{Arc, Mutex};

const SIGN_IN_ENDPOINT: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const SESSION_LEEWAY_SECONDS: i64 = 60;

/// Result of an email/password sign-in. The uid scopes remote paths; the ID
/// token authenticates database requests until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub uid: String,
    pub id_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + Duration::seconds(leeway_seconds)
            && !self.id_token.trim().is_empty()
            && !self.uid.trim().is_empty()
    }
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, InfraError>;
}

/// Identity Toolkit REST client for `accounts:signInWithPassword`.
#[derive(Debug, Clone)]
pub struct ReqwestIdentityClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequestPayload<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponsePayload {
    local_id: Option<String>,
    id_token: Option<String>,
    expires_in: Option<String>,
    error: Option<IdentityErrorPayload>,
}

#[derive(Debug, serde::Deserialize)]
struct IdentityErrorPayload {
    message: Option<String>,
}

impl ReqwestIdentityClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl AuthClient for ReqwestIdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, InfraError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(InfraError::Auth(
                "email and password must not be empty".to_string(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(InfraError::Auth("api key is not configured".to_string()));
        }

        let response = self
            .client
            .post(SIGN_IN_ENDPOINT)
            .query(&[("key", self.api_key.as_str())])
            .json(&SignInRequestPayload {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|error| InfraError::Auth(format!("sign-in request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Auth(format!("failed reading sign-in response: {error}")))?;

        let parsed = serde_json::from_str::<SignInResponsePayload>(&body).map_err(|error| {
            InfraError::Auth(format!("invalid sign-in payload: {error}; body={body}"))
        })?;

        if !status.is_success() || parsed.error.is_some() {
            let detail = parsed
                .error
                .and_then(|error| error.message)
                .unwrap_or_else(|| format!("http_{}", status.as_u16()));
            return Err(InfraError::Auth(format!("sign-in rejected: {detail}")));
        }

        let uid = parsed
            .local_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| InfraError::Auth("sign-in response did not include a uid".to_string()))?;
        let id_token = parsed
            .id_token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| InfraError::Auth("sign-in response did not include a token".to_string()))?;
        // expiresIn is a string of seconds on this endpoint.
        let expires_in = parsed
            .expires_in
            .as_deref()
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0)
            .max(0);

        Ok(AuthSession {
            uid,
            id_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Session cache over a credential store and an auth client: signs in with
/// explicit credentials, re-authenticates silently from saved ones, and
/// answers "who is signed in" for the sync path.
pub struct AuthManager<S, C>
where
    S: CredentialStore,
    C: AuthClient,
{
    credential_store: Arc<S>,
    auth_client: Arc<C>,
    session: Mutex<Option<AuthSession>>,
    now_provider: NowProvider,
}

impl<S, C> AuthManager<S, C>
where
    S: CredentialStore,
    C: AuthClient,
{
    pub fn new(credential_store: Arc<S>, auth_client: Arc<C>) -> Self {
        Self {
            credential_store,
            auth_client,
            session: Mutex::new(None),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<AuthSession, InfraError> {
        let session = self.auth_client.sign_in(email, password).await?;
        if remember {
            self.credential_store.save(&SavedCredentials {
                email: email.to_string(),
                password: password.to_string(),
            })?;
        }
        self.store_session(Some(session.clone()))?;
        Ok(session)
    }

    /// Valid cached session, or a silent re-sign-in from saved credentials.
    /// `Ok(None)` means nobody is signed in and no credentials are saved.
    pub async fn ensure_session(&self) -> Result<Option<AuthSession>, InfraError> {
        if let Some(session) = self.current_session()? {
            return Ok(Some(session));
        }
        let Some(credentials) = self.credential_store.load()? else {
            return Ok(None);
        };
        let session = self
            .auth_client
            .sign_in(&credentials.email, &credentials.password)
            .await?;
        self.store_session(Some(session.clone()))?;
        Ok(Some(session))
    }

    pub fn current_session(&self) -> Result<Option<AuthSession>, InfraError> {
        let guard = self
            .session
            .lock()
            .map_err(|error| InfraError::Auth(format!("session lock poisoned: {error}")))?;
        let now = (self.now_provider)();
        Ok(guard
            .as_ref()
            .filter(|session| session.is_valid_at(now, SESSION_LEEWAY_SECONDS))
            .cloned())
    }

    pub fn current_uid(&self) -> Result<Option<String>, InfraError> {
        Ok(self.current_session()?.map(|session| session.uid))
    }

    pub fn sign_out(&self) -> Result<(), InfraError> {
        self.credential_store.delete()?;
        self.store_session(None)
    }

    fn store_session(&self, session: Option<AuthSession>) -> Result<(), InfraError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| InfraError::Auth(format!("session lock poisoned: {error}")))?;
        *guard = session;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::credential_store::InMemoryCredentialStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeAuthClient {
        uid: String,
        sign_in_calls: AtomicUsize,
        fail: bool,
    }

    impl FakeAuthClient {
        fn succeeding(uid: &str) -> Self {
            Self {
                uid: uid.to_string(),
                sign_in_calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                uid: String::new(),
                sign_in_calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl AuthClient for FakeAuthClient {
        async fn sign_in(&self, _email: &str, _password: &str) -> Result<AuthSession, InfraError> {
            self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InfraError::Auth("invalid password".to_string()));
            }
            Ok(AuthSession {
                uid: self.uid.clone(),
                id_token: "token".to_string(),
                expires_at: fixed_time() + Duration::seconds(3600),
            })
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn manager(
        client: FakeAuthClient,
    ) -> (
        AuthManager<InMemoryCredentialStore, FakeAuthClient>,
        Arc<InMemoryCredentialStore>,
        Arc<FakeAuthClient>,
    ) {
        let store = Arc::new(InMemoryCredentialStore::default());
        let client = Arc::new(client);
        let manager = AuthManager::new(Arc::clone(&store), Arc::clone(&client))
            .with_now_provider(Arc::new(fixed_time));
        (manager, store, client)
    }

    #[tokio::test]
    async fn sign_in_caches_session_and_saves_credentials() {
        let (manager, store, _client) = manager(FakeAuthClient::succeeding("uid-1"));
        let session = manager
            .sign_in("user@example.com", "hunter2", true)
            .await
            .expect("sign in");

        assert_eq!(session.uid, "uid-1");
        assert_eq!(manager.current_uid().expect("uid"), Some("uid-1".to_string()));
        assert_eq!(
            store.load().expect("saved credentials"),
            Some(SavedCredentials {
                email: "user@example.com".to_string(),
                password: "hunter2".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn sign_in_without_remember_keeps_store_empty() {
        let (manager, store, _client) = manager(FakeAuthClient::succeeding("uid-1"));
        manager
            .sign_in("user@example.com", "hunter2", false)
            .await
            .expect("sign in");
        assert!(store.load().expect("load").is_none());
    }

    #[tokio::test]
    async fn ensure_session_reauthenticates_from_saved_credentials() {
        let (manager, store, client) = manager(FakeAuthClient::succeeding("uid-1"));
        store
            .save(&SavedCredentials {
                email: "user@example.com".to_string(),
                password: "hunter2".to_string(),
            })
            .expect("seed credentials");

        let session = manager.ensure_session().await.expect("ensure");
        assert_eq!(session.map(|value| value.uid), Some("uid-1".to_string()));
        assert_eq!(client.sign_in_calls.load(Ordering::SeqCst), 1);

        // Cached session, no second network call.
        let _ = manager.ensure_session().await.expect("ensure again");
        assert_eq!(client.sign_in_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ensure_session_without_credentials_is_none() {
        let (manager, _store, client) = manager(FakeAuthClient::succeeding("uid-1"));
        assert!(manager.ensure_session().await.expect("ensure").is_none());
        assert_eq!(client.sign_in_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_sign_in_propagates_and_caches_nothing() {
        let (manager, _store, _client) = manager(FakeAuthClient::failing());
        assert!(manager.sign_in("user@example.com", "wrong", true).await.is_err());
        assert!(manager.current_uid().expect("uid").is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_session_and_credentials() {
        let (manager, store, _client) = manager(FakeAuthClient::succeeding("uid-1"));
        manager
            .sign_in("user@example.com", "hunter2", true)
            .await
            .expect("sign in");

        manager.sign_out().expect("sign out");
        assert!(manager.current_uid().expect("uid").is_none());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn expired_session_is_not_current() {
        let (manager, _store, _client) = manager(FakeAuthClient::succeeding("uid-1"));
        manager
            .store_session(Some(AuthSession {
                uid: "uid-1".to_string(),
                id_token: "token".to_string(),
                expires_at: fixed_time() + Duration::seconds(30),
            }))
            .expect("store session");
        // Inside the leeway window counts as expired.
        assert!(manager.current_uid().expect("uid").is_none());
    }
}
