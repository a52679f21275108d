use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;

#[derive(Debug, Clone)]
pub struct OAuthCodeExchangeRequest {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorization_code: String,
}

#[derive(Debug, Clone)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

#[async_trait]
pub trait OAuthHttpClient: Send + Sync {
    async fn exchange_authorization_code(
        &self,
        request: OAuthCodeExchangeRequest,
    ) -> Result<OAuthTokenResponse, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestOAuthClient {
    client: Client,
}

#[derive(Debug, serde::Deserialize)]
struct GoogleTokenResponsePayload {
    access_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl ReqwestOAuthClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

fn token_from_payload(status: u16, body: &str) -> Result<OAuthTokenResponse, InfraError> {
    let parsed = serde_json::from_str::<GoogleTokenResponsePayload>(body).map_err(|error| {
        InfraError::OAuth(format!("invalid token response payload: {error}; body={body}"))
    })?;

    if !(200..300).contains(&status) || parsed.error.is_some() {
        let code = parsed.error.unwrap_or_else(|| format!("http_{status}"));
        let detail = parsed
            .error_description
            .unwrap_or_else(|| body.to_string());
        return Err(InfraError::OAuth(format!("token endpoint error: {code}; {detail}")));
    }

    let access_token = parsed
        .access_token
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| InfraError::OAuth("token response did not include access_token".to_string()))?;

    Ok(OAuthTokenResponse {
        access_token,
        expires_in: parsed.expires_in.unwrap_or(0).max(0),
        token_type: parsed.token_type,
        scope: parsed.scope,
    })
}

#[async_trait]
impl OAuthHttpClient for ReqwestOAuthClient {
    async fn exchange_authorization_code(
        &self,
        request: OAuthCodeExchangeRequest,
    ) -> Result<OAuthTokenResponse, InfraError> {
        let params = [
            ("grant_type", "authorization_code".to_string()),
            ("client_id", request.client_id),
            ("client_secret", request.client_secret),
            ("redirect_uri", request.redirect_uri),
            ("code", request.authorization_code),
        ];

        let response = self
            .client
            .post(&request.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|error| InfraError::OAuth(format!("request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::OAuth(format!("failed reading token response: {error}")))?;

        token_from_payload(status.as_u16(), &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_payload_is_parsed() {
        let body = r#"{"access_token":"ya29.token","expires_in":3599,"token_type":"Bearer","scope":"https://www.googleapis.com/auth/calendar.events"}"#;
        let token = token_from_payload(200, body).expect("token");
        assert_eq!(token.access_token, "ya29.token");
        assert_eq!(token.expires_in, 3599);
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
    }

    #[test]
    fn token_endpoint_error_is_reported() {
        let body = r#"{"error":"invalid_grant","error_description":"Bad Request"}"#;
        let error = token_from_payload(400, body).expect_err("oauth error");
        assert_eq!(
            error.to_string(),
            "OAuth error: token endpoint error: invalid_grant; Bad Request"
        );
    }

    #[test]
    fn missing_access_token_is_rejected() {
        let error = token_from_payload(200, r#"{"expires_in":10}"#).expect_err("no token");
        assert!(matches!(error, InfraError::OAuth(_)));
    }

    #[test]
    fn negative_expiry_is_clamped() {
        let token = token_from_payload(200, r#"{"access_token":"abc","expires_in":-5}"#)
            .expect("token");
        assert_eq!(token.expires_in, 0);
    }
}
