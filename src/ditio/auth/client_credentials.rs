//! Authorize using the client credentials flow.

use reqwest::{header, StatusCode};
use serde::Deserialize;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("form encoding: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
    /// The token endpoint answered, but without a usable access token.
    #[error("authentication failed ({status} status code), response: {body}")]
    Authentication { status: u16, body: String },
}

pub struct ClientCredentials {
    pub client: reqwest::Client,
    /// Full address of the `/connect/token` endpoint.
    pub token_url: reqwest::Url,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ClientCredentials {
    /// Perform the client credentials flow.
    ///
    /// Only transport failures surface as [`Error::Reqwest`]. Any response
    /// that does not carry a non-empty `access_token` (error status, non-JSON
    /// body, empty or missing field) is an [`Error::Authentication`] holding
    /// the raw body.
    pub async fn perform(&self) -> Result<AuthResponse, Error> {
        let scope = self.scopes.join(" ");
        let params = &[
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];
        let params = serde_urlencoded::to_string(params)?;

        let req = self
            .client
            .post(self.token_url.clone())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ACCEPT, "application/json")
            .body(params)
            .build()?;

        let res = self.client.execute(req).await?;
        let status = res.status();
        let body = res.text().await?;

        match AuthResponse::parse(status, &body) {
            Some(auth) => {
                debug!(
                    message = "Token endpoint responded",
                    status = status.as_u16(),
                    token_len = auth.access_token.len(),
                    expires_in_secs = auth.expires_in,
                );
                Ok(auth)
            }
            None => {
                warn!(message = "Authentication failed", status = status.as_u16());
                Err(Error::Authentication {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAuthResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

/// Whole seconds from a number or numeric string; anything else is zero.
fn lifetime_secs(value: Option<&serde_json::Value>) -> u64 {
    use serde_json::Value;

    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_or(0, |f| {
            if f > 0.0 {
                f as u64
            } else {
                0
            }
        }),
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    /// The requested access token.
    pub access_token: String,
    /// The amount of time that an access token is valid (in seconds).
    /// Zero when the identity provider did not declare a lifetime.
    pub expires_in: u64,
}

impl AuthResponse {
    fn parse(status: StatusCode, body: &str) -> Option<Self> {
        if !status.is_success() {
            return None;
        }
        let raw: RawAuthResponse = serde_json::from_str(body).ok()?;
        let access_token = raw.access_token.filter(|token| !token.is_empty())?;
        Some(Self {
            access_token,
            expires_in: lifetime_secs(raw.expires_in.as_ref()),
        })
    }
}

/// Declared lifetimes are capped at ten years.
const MAX_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Instant,
}

impl Token {
    /// Anchor the declared lifetime at `now`.
    ///
    /// A lifetime the clock cannot represent yields a token that is already
    /// due for refresh.
    pub fn issued_at(auth: AuthResponse, now: Instant) -> Self {
        let AuthResponse {
            access_token,
            expires_in,
        } = auth;
        let lifetime = Duration::from_secs(expires_in).min(MAX_LIFETIME);
        Self {
            access_token,
            expires_at: now.checked_add(lifetime).unwrap_or(now),
        }
    }
}

impl From<AuthResponse> for Token {
    fn from(auth: AuthResponse) -> Self {
        Self::issued_at(auth, Instant::now())
    }
}

#[async_trait::async_trait]
impl super::TokenProvider for ClientCredentials {
    type Token = Token;
    type Error = Error;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error> {
        let auth_response = self.perform().await?;
        info!(
            message = "Authentication succeeded",
            expires_in_secs = auth_response.expires_in,
        );
        let token = auth_response.into();
        Ok(token)
    }
}

impl super::Token for Token {
    fn access_token(&self) -> &str {
        self.access_token.as_str()
    }
}

impl super::ExpiringToken for Token {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::super::TokenProvider;
    use super::*;

    fn credentials(server: &mockito::Server) -> ClientCredentials {
        ClientCredentials {
            client: reqwest::Client::new(),
            token_url: format!("{}/connect/token", server.url()).parse().unwrap(),
            client_id: "integration-client".into(),
            client_secret: "s3cret".into(),
            scopes: vec!["api1".into(), "api2".into()],
        }
    }

    #[test]
    fn parse_accepts_token_with_lifetime() {
        let auth = AuthResponse::parse(
            StatusCode::OK,
            r#"{"access_token":"abc","expires_in":3600,"token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(
            auth,
            AuthResponse {
                access_token: "abc".into(),
                expires_in: 3600,
            }
        );
    }

    #[test]
    fn parse_rejects_empty_or_missing_token() {
        assert!(AuthResponse::parse(StatusCode::OK, r#"{"access_token":"","expires_in":3600}"#).is_none());
        assert!(AuthResponse::parse(StatusCode::OK, r#"{"expires_in":3600}"#).is_none());
        assert!(AuthResponse::parse(StatusCode::OK, "not json").is_none());
        assert!(AuthResponse::parse(
            StatusCode::BAD_REQUEST,
            r#"{"access_token":"abc","expires_in":3600}"#
        )
        .is_none());
    }

    #[test]
    fn parse_defaults_missing_lifetime_to_zero() {
        let auth = AuthResponse::parse(StatusCode::OK, r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(auth.expires_in, 0);
    }

    #[test]
    fn expiry_is_anchored_at_issue_time() {
        let now = Instant::now();
        let token = Token::issued_at(
            AuthResponse {
                access_token: "abc".into(),
                expires_in: 3600,
            },
            now,
        );
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_at, now + Duration::from_secs(3600));
    }

    #[test]
    fn parse_tolerates_odd_lifetimes() {
        let lifetime = |body: &str| AuthResponse::parse(StatusCode::OK, body).unwrap().expires_in;
        assert_eq!(lifetime(r#"{"access_token":"abc","expires_in":"3600"}"#), 3600);
        assert_eq!(lifetime(r#"{"access_token":"abc","expires_in":3600.7}"#), 3600);
        assert_eq!(lifetime(r#"{"access_token":"abc","expires_in":-5}"#), 0);
        assert_eq!(lifetime(r#"{"access_token":"abc","expires_in":"soon"}"#), 0);
        assert_eq!(lifetime(r#"{"access_token":"abc","expires_in":null}"#), 0);
    }

    #[test]
    fn huge_lifetime_is_capped() {
        let now = Instant::now();
        let token = Token::issued_at(
            AuthResponse {
                access_token: "abc".into(),
                expires_in: u64::MAX,
            },
            now,
        );
        assert_eq!(token.expires_at, now + MAX_LIFETIME);
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = ClientCredentials {
            client: reqwest::Client::new(),
            token_url: "https://ids.example.com/connect/token".parse().unwrap(),
            client_id: "integration-client".into(),
            client_secret: "s3cret".into(),
            scopes: vec![],
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("integration-client"));
        assert!(!debug.contains("s3cret"));
    }

    #[tokio::test]
    async fn sends_client_credentials_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/connect/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "integration-client".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
                Matcher::UrlEncoded("scope".into(), "api1 api2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"abc","expires_in":3600,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let before = Instant::now();
        let token = credentials(&server).get_auth_token().await.unwrap();
        let after = Instant::now();

        mock.assert_async().await;
        assert_eq!(token.access_token, "abc");
        assert!(token.expires_at >= before + Duration::from_secs(3600));
        assert!(token.expires_at <= after + Duration::from_secs(3600));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn token_value_stays_out_of_logs() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/connect/token")
            .with_status(200)
            .with_body(r#"{"access_token":"eyJ-very-secret","expires_in":3600}"#)
            .create_async()
            .await;

        let token = credentials(&server).get_auth_token().await.unwrap();

        assert_eq!(token.access_token, "eyJ-very-secret");
        assert!(logs_contain("token_len=15"));
        assert!(!logs_contain("eyJ-very-secret"));
    }

    #[tokio::test]
    async fn huge_declared_lifetime_still_yields_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/connect/token")
            .with_status(200)
            .with_body(r#"{"access_token":"abc","expires_in":18446744073709551615}"#)
            .create_async()
            .await;

        let token = credentials(&server).get_auth_token().await.unwrap();
        assert_eq!(token.access_token, "abc");
        assert!(token.expires_at > Instant::now());
    }

    #[tokio::test]
    async fn empty_token_is_authentication_error_with_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/connect/token")
            .with_status(200)
            .with_body(r#"{"access_token":"","expires_in":3600}"#)
            .create_async()
            .await;

        let err = credentials(&server).get_auth_token().await.unwrap_err();
        match err {
            Error::Authentication { status, body } => {
                assert_eq!(status, 200);
                assert!(body.contains(r#""access_token":"""#));
            }
            other => panic!("expected authentication error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_client_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/connect/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let err = credentials(&server).perform().await.unwrap_err();
        match err {
            Error::Authentication { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_client"));
            }
            other => panic!("expected authentication error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let creds = ClientCredentials {
            client: reqwest::Client::new(),
            token_url: "http://127.0.0.1:1/connect/token".parse().unwrap(),
            client_id: "integration-client".into(),
            client_secret: "s3cret".into(),
            scopes: vec![],
        };
        assert!(matches!(creds.perform().await, Err(Error::Reqwest(_))));
    }
}
