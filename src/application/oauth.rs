use crate::domain::models::OAuthToken;
use crate::infrastructure::credential_store::SessionTokenStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::oauth_client::{OAuthCodeExchangeRequest, OAuthHttpClient, OAuthTokenResponse};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use url::Url;

const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/oauth2/callback";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub token_endpoint: String,
    pub authorization_endpoint: String,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
        }
    }
}

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Acquires the calendar access token once through the consent flow and keeps it
/// for the process. There is no refresh; an expired token fails at the API call.
pub struct OAuthManager<C>
where
    C: OAuthHttpClient + ?Sized,
{
    config: OAuthConfig,
    session: Arc<SessionTokenStore>,
    oauth_client: Arc<C>,
    now_provider: NowProvider,
}

impl<C> OAuthManager<C>
where
    C: OAuthHttpClient + ?Sized,
{
    pub fn new(config: OAuthConfig, session: Arc<SessionTokenStore>, oauth_client: Arc<C>) -> Self {
        Self {
            config,
            session,
            oauth_client,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn build_authorization_url(&self, state: &str) -> Result<String, InfraError> {
        if state.trim().is_empty() {
            return Err(InfraError::OAuth("state must not be empty".to_string()));
        }
        if self.config.scopes.is_empty() {
            return Err(InfraError::OAuth("at least one scope is required".to_string()));
        }

        let mut url = Url::parse(&self.config.authorization_endpoint)
            .map_err(|error| InfraError::OAuth(format!("invalid authorization endpoint: {error}")))?;
        let scope = self.config.scopes.join(" ");

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &scope)
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.to_string())
    }

    pub async fn authenticate_with_code(&self, authorization_code: &str) -> Result<OAuthToken, InfraError> {
        if authorization_code.trim().is_empty() {
            return Err(InfraError::OAuth("authorization code must not be empty".to_string()));
        }

        let response = self
            .oauth_client
            .exchange_authorization_code(OAuthCodeExchangeRequest {
                token_endpoint: self.config.token_endpoint.clone(),
                client_id: self.config.client_id.clone(),
                client_secret: self.config.client_secret.clone(),
                redirect_uri: self.config.redirect_uri.clone(),
                authorization_code: authorization_code.trim().to_string(),
            })
            .await?;

        let token = self.token_from_response(response);
        self.session.save_token(&token)?;
        Ok(token)
    }

    /// The session token, expired or not.
    pub fn access_token(&self) -> Result<String, InfraError> {
        self.session
            .load_token()?
            .map(|token| token.access_token)
            .ok_or_else(|| InfraError::OAuth("google authentication required".to_string()))
    }

    fn token_from_response(&self, response: OAuthTokenResponse) -> OAuthToken {
        let expires_at = (self.now_provider)() + Duration::seconds(response.expires_in.max(0));
        OAuthToken {
            access_token: response.access_token,
            expires_at,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: response.scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FakeOAuthHttpClient {
        response: Mutex<Result<OAuthTokenResponse, String>>,
        exchange_calls: AtomicUsize,
        last_code: Mutex<Option<String>>,
    }

    impl Default for FakeOAuthHttpClient {
        fn default() -> Self {
            Self {
                response: Mutex::new(Ok(OAuthTokenResponse {
                    access_token: "fake_access".to_string(),
                    expires_in: 3600,
                    token_type: Some("Bearer".to_string()),
                    scope: Some(DEFAULT_SCOPE.to_string()),
                })),
                exchange_calls: AtomicUsize::new(0),
                last_code: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl OAuthHttpClient for FakeOAuthHttpClient {
        async fn exchange_authorization_code(
            &self,
            request: OAuthCodeExchangeRequest,
        ) -> Result<OAuthTokenResponse, InfraError> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_code.lock().expect("code mutex poisoned") = Some(request.authorization_code);
            self.response
                .lock()
                .expect("response mutex poisoned")
                .clone()
                .map_err(InfraError::OAuth)
        }
    }

    fn test_config() -> OAuthConfig {
        OAuthConfig::new(
            "client-id",
            "client-secret",
            "http://localhost/oauth2/callback",
            vec![DEFAULT_SCOPE.to_string()],
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-16T00:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn authorization_url_carries_client_scope_and_state() {
        let manager = OAuthManager::new(
            test_config(),
            Arc::new(SessionTokenStore::default()),
            Arc::new(FakeOAuthHttpClient::default()),
        );
        let url = manager.build_authorization_url("state-123").expect("url");
        let parsed = Url::parse(&url).expect("valid url");
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(pairs.contains(&("client_id".to_string(), "client-id".to_string())));
        assert!(pairs.contains(&("scope".to_string(), DEFAULT_SCOPE.to_string())));
        assert!(pairs.contains(&("state".to_string(), "state-123".to_string())));
        assert!(pairs.contains(&("prompt".to_string(), "consent".to_string())));
    }

    #[test]
    fn authorization_url_requires_state() {
        let manager = OAuthManager::new(
            test_config(),
            Arc::new(SessionTokenStore::default()),
            Arc::new(FakeOAuthHttpClient::default()),
        );
        assert!(manager.build_authorization_url(" ").is_err());
    }

    #[tokio::test]
    async fn authenticate_with_code_saves_token_to_session() {
        let session = Arc::new(SessionTokenStore::default());
        let client = Arc::new(FakeOAuthHttpClient::default());
        let manager = OAuthManager::new(test_config(), Arc::clone(&session), Arc::clone(&client))
            .with_now_provider(Arc::new(fixed_now));

        let token = manager
            .authenticate_with_code("  sample-code ")
            .await
            .expect("authenticate with code");

        assert_eq!(token.access_token, "fake_access");
        assert_eq!(token.expires_at, fixed_now() + Duration::seconds(3600));
        assert_eq!(
            client.last_code.lock().expect("code mutex poisoned").as_deref(),
            Some("sample-code")
        );
        assert_eq!(manager.access_token().expect("token"), "fake_access");
        assert_eq!(
            session.load_token().expect("session readable"),
            Some(token)
        );
    }

    #[tokio::test]
    async fn failed_exchange_leaves_session_empty() {
        let session = Arc::new(SessionTokenStore::default());
        let client = Arc::new(FakeOAuthHttpClient::default());
        *client.response.lock().expect("response mutex poisoned") =
            Err("token endpoint error: invalid_grant".to_string());
        let manager = OAuthManager::new(test_config(), Arc::clone(&session), Arc::clone(&client));

        let result = manager.authenticate_with_code("bad-code").await;
        assert!(matches!(result, Err(InfraError::OAuth(_))));
        assert!(session.load_token().expect("session readable").is_none());
        assert!(manager.access_token().is_err());
    }

    #[tokio::test]
    async fn empty_code_does_not_call_token_endpoint() {
        let client = Arc::new(FakeOAuthHttpClient::default());
        let manager = OAuthManager::new(
            test_config(),
            Arc::new(SessionTokenStore::default()),
            Arc::clone(&client),
        );
        assert!(manager.authenticate_with_code("").await.is_err());
        assert_eq!(client.exchange_calls.load(Ordering::SeqCst), 0);
    }
}
