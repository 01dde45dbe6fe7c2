//! Authentication gateway.
//!
//! [`FirebaseAuthClient`] talks to the Identity Toolkit REST API, keeps the
//! profile document in Firestore `users/{uid}`, and mirrors the signed-in
//! user into the single-row local cache.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::FirebaseConfig;
use crate::firestore::FirestoreClient;
use crate::models::User;
use crate::services::CacheService;
use crate::util::{compact_text, unix_millis_now, unix_timestamp_now};
use crate::{validation, Error, Result};

const USERS_COLLECTION: &str = "users";
const EXPIRY_SKEW_SECONDS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;
/// Identity Toolkit requires a redirect URI even for token exchanges
const IDP_REQUEST_URI: &str = "http://localhost";

/// Identity providers accepted by federated sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FederatedProvider {
    Google,
    Facebook,
    Apple,
}

impl FederatedProvider {
    pub const fn provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
            Self::Facebook => "facebook.com",
            Self::Apple => "apple.com",
        }
    }

    /// Facebook hands out access tokens; the others issue OIDC id tokens.
    fn post_body(self, token: &str) -> String {
        let kind = match self {
            Self::Facebook => "access_token",
            Self::Google | Self::Apple => "id_token",
        };
        format!(
            "{kind}={}&providerId={}",
            urlencoding::encode(token),
            self.provider_id()
        )
    }
}

impl std::str::FromStr for FederatedProvider {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" | "google.com" => Ok(Self::Google),
            "facebook" | "facebook.com" => Ok(Self::Facebook),
            "apple" | "apple.com" => Ok(Self::Apple),
            other => Err(Error::validation(
                "provider",
                format!("unsupported identity provider '{other}'"),
            )),
        }
    }
}

/// Everything needed to open a new account
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone_number: Option<String>,
    pub preferred_language: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("phone_number", &self.phone_number)
            .field("preferred_language", &self.preferred_language)
            .finish()
    }
}

/// Credential exchange and current-user observation
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in_email(&self, email: &str, password: &str) -> Result<User>;

    async fn sign_in_federated(&self, provider: FederatedProvider, token: &str) -> Result<User>;

    async fn register(&self, registration: Registration) -> Result<User>;

    async fn reset_password(&self, email: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    /// Live view of the signed-in user; `None` when signed out.
    fn observe_current_user(&self) -> watch::Receiver<Option<User>>;
}

/// Tokens for the signed-in account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user_id: String,
    pub email: Option<String>,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}

/// Where session tokens live between runs
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> Result<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
}

/// Identity Toolkit client
pub struct FirebaseAuthClient<S: SessionPersistence> {
    identity_url: String,
    secure_token_url: String,
    api_key: String,
    client: Client,
    firestore: FirestoreClient,
    cache: CacheService,
    store: S,
    current: watch::Sender<Option<User>>,
}

impl<S: SessionPersistence> FirebaseAuthClient<S> {
    /// Build a client whose current-user observation starts from the cache.
    pub async fn new(config: &FirebaseConfig, cache: CacheService, store: S) -> Result<Self> {
        let cached = cache.current_user().await?;
        let (current, _) = watch::channel(cached);
        Ok(Self {
            identity_url: config.identity_url.clone(),
            secure_token_url: config.secure_token_url.clone(),
            api_key: config.api_key.clone(),
            client: Client::builder().build()?,
            firestore: FirestoreClient::new(config)?,
            cache,
            store,
            current,
        })
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    /// Load the persisted session, refreshing it when expired.
    ///
    /// A session that can no longer be refreshed is discarded along with the
    /// cached user.
    pub async fn restore_session(&self) -> Result<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(mut refreshed) => {
                if refreshed.email.is_none() {
                    refreshed.email = stored.email;
                    self.store.save_session(&refreshed)?;
                }
                Ok(Some(refreshed))
            }
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {error}");
                self.forget().await?;
                Ok(None)
            }
        }
    }

    /// Exchange a refresh token for a fresh id token.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(Error::InvalidCredentials);
        }
        let payload = serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });
        let response: RefreshResponse = self
            .post(format!("{}/token", self.secure_token_url), &payload)
            .await?;
        let session = response.into_session();
        self.store.save_session(&session)?;
        Ok(session)
    }

    /// Firestore client authenticated as the restored session, if any.
    pub async fn authorized_firestore(&self) -> Result<Option<FirestoreClient>> {
        Ok(self
            .restore_session()
            .await?
            .map(|session| self.firestore.with_id_token(session.id_token)))
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: String,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_identity_error(status, &body));
        }
        Ok(response.json::<T>().await?)
    }

    async fn identity_call(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<IdentityResponse> {
        self.post(format!("{}/accounts:{method}", self.identity_url), payload)
            .await
    }

    /// Persist tokens, load or create the profile, bump `lastLoginAt`.
    async fn complete_sign_in(&self, response: IdentityResponse) -> Result<User> {
        let session = response.session()?;
        let firestore = self.firestore.with_id_token(session.id_token.clone());
        let now = unix_millis_now();

        let mut user = match firestore
            .get_document::<User>(USERS_COLLECTION, &session.user_id)
            .await?
        {
            Some(user) => user,
            None => {
                let mut user = User::new(&session.user_id, response.email.clone());
                user.display_name = response.display_name.clone();
                user.created_at = now;
                user
            }
        };
        user.last_login_at = now;
        firestore
            .set_document(USERS_COLLECTION, &user.id, &user)
            .await?;

        self.remember(&session, &user).await?;
        tracing::info!("Signed in as {}", user.label());
        Ok(user)
    }

    async fn remember(&self, session: &AuthSession, user: &User) -> Result<()> {
        self.store.save_session(session)?;
        self.cache.replace_current_user(user).await?;
        self.current.send_replace(Some(user.clone()));
        Ok(())
    }

    async fn forget(&self) -> Result<()> {
        self.store.clear_session()?;
        self.cache.clear_current_user().await?;
        self.current.send_replace(None);
        Ok(())
    }
}

#[async_trait]
impl<S: SessionPersistence> AuthGateway for FirebaseAuthClient<S> {
    async fn sign_in_email(&self, email: &str, password: &str) -> Result<User> {
        let email = validation::email(email)?;
        validation::password(password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let response = self.identity_call("signInWithPassword", &payload).await?;
        self.complete_sign_in(response).await
    }

    async fn sign_in_federated(&self, provider: FederatedProvider, token: &str) -> Result<User> {
        if token.trim().is_empty() {
            return Err(Error::validation("token", "Provider token is required"));
        }
        let payload = serde_json::json!({
            "postBody": provider.post_body(token.trim()),
            "requestUri": IDP_REQUEST_URI,
            "returnSecureToken": true,
            "returnIdpCredential": true,
        });
        let response = self.identity_call("signInWithIdp", &payload).await?;
        self.complete_sign_in(response).await
    }

    async fn register(&self, registration: Registration) -> Result<User> {
        let email = validation::email(&registration.email)?;
        validation::password(&registration.password)?;
        let display_name = validation::display_name(&registration.display_name)?;
        let phone_number = validation::phone_number(registration.phone_number.as_deref())?;
        let preferred_language = validation::language(&registration.preferred_language)?;

        let payload = serde_json::json!({
            "email": email,
            "password": registration.password,
            "returnSecureToken": true,
        });
        let response = self.identity_call("signUp", &payload).await?;
        let session = response.session()?;

        let now = unix_millis_now();
        let mut user = User::new(&session.user_id, Some(email));
        user.display_name = Some(display_name);
        user.phone_number = phone_number;
        user.preferred_language = preferred_language;
        user.created_at = now;
        user.last_login_at = now;

        self.firestore
            .with_id_token(session.id_token.clone())
            .create_document(USERS_COLLECTION, &user.id, &user)
            .await?;
        self.remember(&session, &user).await?;
        tracing::info!("Registered {}", user.label());
        Ok(user)
    }

    async fn reset_password(&self, email: &str) -> Result<()> {
        let email = validation::email(email)?;
        let payload = serde_json::json!({
            "requestType": "PASSWORD_RESET",
            "email": email,
        });
        let _: serde_json::Value = self
            .post(format!("{}/accounts:sendOobCode", self.identity_url), &payload)
            .await?;
        tracing::info!("Password reset requested");
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.forget().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    fn observe_current_user(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    local_id: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    /// Seconds, as a decimal string
    expires_in: Option<String>,
}

impl IdentityResponse {
    fn session(&self) -> Result<AuthSession> {
        match (&self.local_id, &self.id_token, &self.refresh_token) {
            (Some(user_id), Some(id_token), Some(refresh_token)) => Ok(AuthSession {
                id_token: id_token.clone(),
                refresh_token: refresh_token.clone(),
                expires_at: expires_at(self.expires_in.as_deref()),
                user_id: user_id.clone(),
                email: self.email.clone(),
            }),
            _ => Err(Error::Unknown(
                "Identity response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
    user_id: String,
}

impl RefreshResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            expires_at: expires_at(self.expires_in.as_deref()),
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            user_id: self.user_id,
            email: None,
        }
    }
}

fn expires_at(expires_in: Option<&str>) -> i64 {
    let lifetime = expires_in
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS);
    unix_timestamp_now().saturating_add(lifetime)
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error: Option<IdentityError>,
}

#[derive(Debug, Deserialize)]
struct IdentityError {
    message: Option<String>,
}

/// Map an Identity Toolkit failure onto the error taxonomy.
///
/// Messages look like `WEAK_PASSWORD : Password should be at least 6
/// characters`; the code before the colon decides the variant.
pub fn map_identity_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<IdentityErrorBody>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| compact_text(body));
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };
    let detail_or = |fallback: &str| {
        if detail.is_empty() {
            fallback.to_string()
        } else {
            detail.to_string()
        }
    };

    match code {
        "EMAIL_EXISTS" => Error::UserCollision(detail_or("this email")),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "USER_NOT_FOUND" | "INVALID_IDP_RESPONSE" | "INVALID_REFRESH_TOKEN" | "TOKEN_EXPIRED"
        | "INVALID_ID_TOKEN" => Error::InvalidCredentials,
        "WEAK_PASSWORD" => Error::validation("password", detail_or("Password is too weak")),
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            Error::validation("email", detail_or("Enter a valid email address"))
        }
        _ if status.is_server_error() => Error::Network(format!("{message} ({})", status.as_u16())),
        "" => Error::Unknown(format!("HTTP {}", status.as_u16())),
        _ => Error::Unknown(format!("{message} ({})", status.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySessions(Arc<Mutex<Option<AuthSession>>>);

    impl SessionPersistence for MemorySessions {
        fn load_session(&self) -> Result<Option<AuthSession>> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn save_session(&self, session: &AuthSession) -> Result<()> {
            *self.0.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        fn clear_session(&self) -> Result<()> {
            *self.0.lock().unwrap() = None;
            Ok(())
        }
    }

    fn firebase() -> FirebaseConfig {
        FirebaseConfig {
            project_id: "demo".to_string(),
            api_key: "key".to_string(),
            documents_url: "http://127.0.0.1:9/v1/projects/demo/databases/(default)/documents"
                .to_string(),
            identity_url: "http://127.0.0.1:9/v1".to_string(),
            secure_token_url: "http://127.0.0.1:9/v1".to_string(),
        }
    }

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            id_token: "secret-id-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user_id: "uid-1".to_string(),
            email: Some("ana@example.com".to_string()),
        }
    }

    #[test]
    fn identity_errors_map_to_taxonomy() {
        let body = |message: &str| format!(r#"{{"error":{{"code":400,"message":"{message}"}}}}"#);
        let bad = StatusCode::BAD_REQUEST;

        assert!(matches!(
            map_identity_error(bad, &body("EMAIL_EXISTS")),
            Error::UserCollision(_)
        ));
        for code in ["EMAIL_NOT_FOUND", "INVALID_PASSWORD", "INVALID_LOGIN_CREDENTIALS"] {
            assert!(matches!(
                map_identity_error(bad, &body(code)),
                Error::InvalidCredentials
            ));
        }
        match map_identity_error(
            bad,
            &body("WEAK_PASSWORD : Password should be at least 6 characters"),
        ) {
            Error::Validation { field, message } => {
                assert_eq!(field, "password");
                assert_eq!(message, "Password should be at least 6 characters");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            map_identity_error(bad, &body("INVALID_EMAIL")),
            Error::Validation { field: "email", .. }
        ));
        assert!(matches!(
            map_identity_error(StatusCode::SERVICE_UNAVAILABLE, "upstream down"),
            Error::Network(_)
        ));
        assert!(matches!(
            map_identity_error(bad, &body("OPERATION_NOT_ALLOWED")),
            Error::Unknown(_)
        ));
    }

    #[test]
    fn federated_post_body_uses_provider_token_kind() {
        assert_eq!(
            FederatedProvider::Google.post_body("a b"),
            "id_token=a%20b&providerId=google.com"
        );
        assert_eq!(
            FederatedProvider::Facebook.post_body("tok"),
            "access_token=tok&providerId=facebook.com"
        );
        assert_eq!(
            "Apple".parse::<FederatedProvider>().unwrap(),
            FederatedProvider::Apple
        );
        assert!("myspace".parse::<FederatedProvider>().is_err());
    }

    #[test]
    fn identity_response_requires_tokens() {
        let complete: IdentityResponse = serde_json::from_str(
            r#"{"localId":"uid-1","email":"ana@example.com","idToken":"t","refreshToken":"r","expiresIn":"3600"}"#,
        )
        .unwrap();
        let session = complete.session().unwrap();
        assert_eq!(session.user_id, "uid-1");
        assert!(!session.is_expired());

        let partial: IdentityResponse = serde_json::from_str(r#"{"localId":"uid-1"}"#).unwrap();
        assert!(partial.session().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", session(0));
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));

        let registration = Registration {
            email: "ana@example.com".to_string(),
            password: "hunter22".to_string(),
            display_name: "Ana".to_string(),
            phone_number: None,
            preferred_language: "en".to_string(),
        };
        assert!(!format!("{registration:?}").contains("hunter22"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn observation_is_seeded_from_cache() {
        let cache = CacheService::open_in_memory().await.unwrap();
        let user = User::new("uid-1", Some("ana@example.com".to_string()));
        cache.replace_current_user(&user).await.unwrap();

        let client = FirebaseAuthClient::new(&firebase(), cache, MemorySessions::default())
            .await
            .unwrap();

        assert_eq!(*client.observe_current_user().borrow(), Some(user));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sign_out_clears_session_cache_and_observers() {
        let cache = CacheService::open_in_memory().await.unwrap();
        let sessions = MemorySessions::default();
        let client = FirebaseAuthClient::new(&firebase(), cache.clone(), sessions.clone())
            .await
            .unwrap();
        let user = User::new("uid-1", None);
        client.remember(&session(i64::MAX), &user).await.unwrap();
        let mut observer = client.observe_current_user();
        assert_eq!(*observer.borrow_and_update(), Some(user));

        client.sign_out().await.unwrap();

        assert!(observer.has_changed().unwrap());
        assert_eq!(*observer.borrow(), None);
        assert_eq!(cache.current_user().await.unwrap(), None);
        assert_eq!(sessions.load_session().unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_input_never_reaches_the_network() {
        let cache = CacheService::open_in_memory().await.unwrap();
        let client = FirebaseAuthClient::new(&firebase(), cache, MemorySessions::default())
            .await
            .unwrap();

        assert!(matches!(
            client.sign_in_email("not-an-email", "secret1").await,
            Err(Error::Validation { field: "email", .. })
        ));
        assert!(matches!(
            client.sign_in_email("ana@example.com", "123").await,
            Err(Error::Validation { field: "password", .. })
        ));
        let registration = Registration {
            email: "ana@example.com".to_string(),
            password: "secret1".to_string(),
            display_name: " ".to_string(),
            phone_number: None,
            preferred_language: "en".to_string(),
        };
        assert!(matches!(
            client.register(registration).await,
            Err(Error::Validation { field: "display_name", .. })
        ));
        assert!(matches!(
            client.reset_password("").await,
            Err(Error::Validation { field: "email", .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn live_session_is_restored_without_refresh() {
        let cache = CacheService::open_in_memory().await.unwrap();
        let sessions = MemorySessions::default();
        sessions.save_session(&session(i64::MAX)).unwrap();
        let client = FirebaseAuthClient::new(&firebase(), cache, sessions)
            .await
            .unwrap();

        let restored = client.restore_session().await.unwrap();

        assert_eq!(restored, Some(session(i64::MAX)));
        assert!(client.authorized_firestore().await.unwrap().unwrap().is_authenticated());
    }
}
