//! Connection settings, read from flags or `DITIO_*` environment variables.

use std::time::Duration;

use clap::Args;
use reqwest::Url;

use crate::ditio::{
    self,
    auth::{client_credentials::ClientCredentials, token_manager::TokenManager},
};

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://ditio-ids-we-test.azurewebsites.net";
pub const DEFAULT_API_BASE_URL: &str = "https://ditio-api-test.azurewebsites.net";

#[derive(Clone, Args)]
pub struct Config {
    /// Identity provider base URL
    #[arg(long, env = "DITIO_IDENTITY_BASE_URL", default_value = DEFAULT_IDENTITY_BASE_URL)]
    pub identity_base_url: Url,

    /// Integration API base URL
    #[arg(long, env = "DITIO_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: Url,

    /// OAuth2 client id
    #[arg(long, env = "DITIO_CLIENT_ID")]
    pub client_id: String,

    /// OAuth2 client secret
    #[arg(long, env = "DITIO_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Requested scopes, space separated
    #[arg(long, env = "DITIO_SCOPE", value_delimiter = ' ', default_value = "")]
    pub scope: Vec<String>,

    /// Company that owns created machines
    #[arg(long, env = "DITIO_COMPANY_ID", default_value = "")]
    pub company_id: String,

    /// Per-request timeout in seconds, for both the identity provider and the API
    #[arg(long, env = "DITIO_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("identity_base_url", &self.identity_base_url.as_str())
            .field("api_base_url", &self.api_base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("company_id", &self.company_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("{0} cannot be a base URL")]
    NotABase(Url),
}

pub type Client = ditio::Client<TokenManager<ClientCredentials>>;

impl Config {
    pub fn http_client(&self) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .build()?;
        Ok(client)
    }

    /// `{identity_base_url}/connect/token`
    pub fn token_url(&self) -> Result<Url, Error> {
        let mut url = self.identity_base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::NotABase(self.identity_base_url.clone()))?
            .pop_if_empty()
            .extend(["connect", "token"]);
        Ok(url)
    }

    pub fn client_credentials(&self, client: reqwest::Client) -> Result<ClientCredentials, Error> {
        Ok(ClientCredentials {
            client,
            token_url: self.token_url()?,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: self.scope.iter().filter(|s| !s.is_empty()).cloned().collect(),
        })
    }

    /// Wire the caching token provider and the API client onto one
    /// `reqwest::Client`.
    pub fn build(&self) -> Result<Client, Error> {
        let http = self.http_client()?;
        let auth_token_provider = TokenManager::new(self.client_credentials(http.clone())?);
        Ok(ditio::Client {
            client: http,
            base_url: self.api_base_url.clone(),
            auth_token_provider,
        })
    }
}
