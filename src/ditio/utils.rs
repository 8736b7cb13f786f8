use reqwest::StatusCode;

/// A non-success answer from the integration API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status_code} status code: {}", detail(.message, .body))]
pub struct ApiError {
    pub status_code: u16,
    /// `error.message` from the API's error envelope, when the body has one.
    pub message: Option<String>,
    pub body: String,
}

impl ApiError {
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }

    pub fn detail(&self) -> &str {
        detail(&self.message, &self.body)
    }
}

fn detail<'a>(message: &'a Option<String>, body: &'a str) -> &'a str {
    message.as_deref().unwrap_or(body)
}

pub fn check_status(status: StatusCode, body: &str) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    Err(ApiError {
        status_code: status.as_u16(),
        message: envelope_message(body),
        body: body.to_owned(),
    })
}

/// `{"error":{"message":"..."}}`
fn envelope_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}
