//! Ditio integration API client.

use reqwest::{header, Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use self::{
    auth::Token,
    model::{Machine, Resource, Task},
    utils::check_status,
};
pub use self::utils::ApiError;

pub mod auth;
pub mod model;
mod utils;

const INTEGRATION_PATH: [&str; 3] = ["api", "v4", "integration"];

pub struct Client<AuthTokenProvider> {
    pub client: reqwest::Client,
    pub base_url: Url,
    pub auth_token_provider: AuthTokenProvider,
}

#[derive(Debug, thiserror::Error)]
pub enum Error<AuthError> {
    #[error("auth: {0}")]
    Auth(#[source] AuthError),
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("api: {0}")]
    Api(#[from] ApiError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} record has no id")]
    MissingId(&'static str),
    #[error("API base URL cannot be a base")]
    BaseUrl,
    /// Empty, `.` and `..` would be dropped or resolved by the URL parser
    /// and address a different resource.
    #[error("invalid path segment {0:?}")]
    InvalidSegment(String),
}

impl<AuthTokenProvider> Client<AuthTokenProvider>
where
    AuthTokenProvider: auth::TokenProvider,
{
    fn build_url(&self, segments: &[&str]) -> Result<Url, Error<AuthTokenProvider::Error>> {
        if let Some(segment) = segments
            .iter()
            .find(|segment| matches!(segment.trim(), "" | "." | ".."))
        {
            return Err(Error::InvalidSegment((*segment).to_owned()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::BaseUrl)?
            .pop_if_empty()
            .extend(INTEGRATION_PATH)
            .extend(segments);
        Ok(url)
    }

    fn build_request<B>(
        &self,
        auth_token: &str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Request, Error<AuthTokenProvider::Error>>
    where
        B: Serialize + ?Sized,
    {
        let builder = self
            .client
            .request(method, url)
            .bearer_auth(auth_token)
            .header(header::ACCEPT, "application/json");

        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };

        builder.build().map_err(Error::Reqwest)
    }

    async fn get_auth_token(&self) -> Result<String, Error<AuthTokenProvider::Error>> {
        let token = self
            .auth_token_provider
            .get_auth_token()
            .await
            .map_err(Error::Auth)?;
        Ok(token.access_token().to_owned())
    }

    async fn exec<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, Error<AuthTokenProvider::Error>>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.build_url(segments)?;
        let auth_token = self.get_auth_token().await?;
        let path = url.path().to_owned();
        let request = self.build_request(&auth_token, method.clone(), url, body)?;

        let res = self.client.execute(request).await?;
        let status = res.status();
        let text = res.text().await?;

        info!(
            message = "Integration API call",
            path = %path,
            method = %method,
            status = status.as_u16(),
            response = %text,
        );

        check_status(status, &text)?;
        Self::parse_json(&text)
    }

    /// Empty bodies parse as JSON `null`.
    fn parse_json<T>(text: &str) -> Result<T, Error<AuthTokenProvider::Error>>
    where
        T: DeserializeOwned,
    {
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(text)?)
    }

    pub async fn get<R: Resource>(&self, id: &str) -> Result<R, Error<AuthTokenProvider::Error>> {
        self.exec(Method::GET, &[R::COLLECTION, id], None::<&()>)
            .await
    }

    pub async fn create<R: Resource>(
        &self,
        record: &R,
    ) -> Result<R, Error<AuthTokenProvider::Error>> {
        self.exec(Method::POST, &[R::COLLECTION], Some(record)).await
    }

    /// PUT the whole record to its id. Fails before any request if the
    /// record has no id.
    pub async fn update<R: Resource>(
        &self,
        record: &R,
    ) -> Result<Value, Error<AuthTokenProvider::Error>> {
        let id = record.id().ok_or(Error::MissingId(R::COLLECTION))?;
        self.exec(Method::PUT, &[R::COLLECTION, id], Some(record))
            .await
    }

    pub async fn delete<R: Resource>(
        &self,
        id: &str,
    ) -> Result<Value, Error<AuthTokenProvider::Error>> {
        self.exec(Method::DELETE, &[R::COLLECTION, id], None::<&()>)
            .await
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, Error<AuthTokenProvider::Error>> {
        self.get(id).await
    }

    pub async fn get_task_by_external_ids(
        &self,
        external_project_number: &str,
        external_id: &str,
    ) -> Result<Task, Error<AuthTokenProvider::Error>> {
        let segments = [
            Task::COLLECTION,
            "by-external-project-number",
            external_project_number,
            "by-external-id",
            external_id,
        ];
        self.exec(Method::GET, &segments, None::<&()>).await
    }

    pub async fn create_task(&self, task: &Task) -> Result<Task, Error<AuthTokenProvider::Error>> {
        self.create(task).await
    }

    pub async fn update_task(&self, task: &Task) -> Result<Value, Error<AuthTokenProvider::Error>> {
        self.update(task).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<Value, Error<AuthTokenProvider::Error>> {
        self.delete::<Task>(id).await
    }

    pub async fn get_machine(&self, id: &str) -> Result<Machine, Error<AuthTokenProvider::Error>> {
        self.get(id).await
    }

    pub async fn get_machine_by_number(
        &self,
        machine_number: &str,
    ) -> Result<Machine, Error<AuthTokenProvider::Error>> {
        let segments = [Machine::COLLECTION, "by-machine-number", machine_number];
        self.exec(Method::GET, &segments, None::<&()>).await
    }

    pub async fn create_machine(
        &self,
        machine: &Machine,
    ) -> Result<Machine, Error<AuthTokenProvider::Error>> {
        self.create(machine).await
    }

    pub async fn update_machine(
        &self,
        machine: &Machine,
    ) -> Result<Value, Error<AuthTokenProvider::Error>> {
        self.update(machine).await
    }

    pub async fn delete_machine(&self, id: &str) -> Result<Value, Error<AuthTokenProvider::Error>> {
        self.delete::<Machine>(id).await
    }
}

/// API failures are logged and become `None`; everything else propagates.
fn degrade<T, AuthError>(result: Result<T, Error<AuthError>>) -> Result<Option<T>, anyhow::Error>
where
    AuthError: std::error::Error + Send + Sync + 'static,
{
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Api(err)) => {
            warn!(
                message = "Unexpected response",
                status = err.status_code,
                server_error = err.is_server_error(),
                detail = %err.detail(),
            );
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

#[async_trait::async_trait]
impl<AuthTokenProvider> crate::core::Integration for Client<AuthTokenProvider>
where
    AuthTokenProvider: auth::TokenProvider,
    <AuthTokenProvider as auth::TokenProvider>::Error: std::error::Error + 'static,
{
    async fn get_task(&self, id: &crate::core::IdRef) -> Result<Option<Task>, anyhow::Error> {
        degrade(self.get_task(id).await)
    }

    async fn get_task_by_external_ids(
        &self,
        external_project_number: &str,
        external_id: &str,
    ) -> Result<Option<Task>, anyhow::Error> {
        degrade(
            self.get_task_by_external_ids(external_project_number, external_id)
                .await,
        )
    }

    async fn create_task(&self, task: &Task) -> Result<Option<Task>, anyhow::Error> {
        degrade(self.create_task(task).await)
    }

    async fn update_task(&self, task: &Task) -> Result<Option<Value>, anyhow::Error> {
        degrade(self.update_task(task).await)
    }

    async fn delete_task(&self, id: &crate::core::IdRef) -> Result<Option<Value>, anyhow::Error> {
        degrade(self.delete_task(id).await)
    }

    async fn get_machine(&self, id: &crate::core::IdRef) -> Result<Option<Machine>, anyhow::Error> {
        degrade(self.get_machine(id).await)
    }

    async fn get_machine_by_number(
        &self,
        machine_number: &str,
    ) -> Result<Option<Machine>, anyhow::Error> {
        degrade(self.get_machine_by_number(machine_number).await)
    }

    async fn create_machine(&self, machine: &Machine) -> Result<Option<Machine>, anyhow::Error> {
        degrade(self.create_machine(machine).await)
    }

    async fn update_machine(&self, machine: &Machine) -> Result<Option<Value>, anyhow::Error> {
        degrade(self.update_machine(machine).await)
    }

    async fn delete_machine(
        &self,
        id: &crate::core::IdRef,
    ) -> Result<Option<Value>, anyhow::Error> {
        degrade(self.delete_machine(id).await)
    }
}
