use std::sync::{Arc, PoisonError, RwLock};

use derive_more::Display;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

#[derive(Debug, Display)]
pub enum ClientError {
    #[display(fmt = "HTTP {}: {}", status, message)]
    Server { status: u16, message: String },
    #[display(fmt = "network: {}", _0)]
    Network(reqwest::Error),
    #[display(fmt = "decode: {}", _0)]
    Decode(String),
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err)
    }
}

impl ClientError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pulls `message`, or the joined field errors, out of an error body.
fn server_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match value.get("errors").and_then(Value::as_array) {
        Some(errors) => errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(", "),
        None => body.to_string(),
    }
}

/// Thin JSON client for the REST API. Clones share the bearer token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    /// Including the API prefix, e.g. `http://localhost:5000/api`
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ClientError::Server {
            status: status.as_u16(),
            message: server_message(&body),
        })
    }

    async fn parse<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ClientError> {
        Self::check(resp)
            .await?
            .json::<R>()
            .await
            .map_err(|e| ClientError::Decode(format!("response body: {e}")))
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        let resp = self.authed(self.http.get(self.url(path))).send().await?;
        Self::parse(resp).await
    }

    pub async fn get_with_query<Q, R>(&self, path: &str, query: &Q) -> Result<R, ClientError>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self.authed(self.http.get(self.url(path)).query(query)).send().await?;
        Self::parse(resp).await
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self.authed(self.http.post(self.url(path)).json(body)).send().await?;
        Self::parse(resp).await
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self.authed(self.http.put(self.url(path)).json(body)).send().await?;
        Self::parse(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let resp = self.authed(self.http.delete(self.url(path))).send().await?;
        Self::check(resp).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_server_messages() {
        assert_eq!(server_message(r#"{"message":"User already exists"}"#), "User already exists");
        assert_eq!(
            server_message(r#"{"errors":[{"field":"title","message":"Title is required"},{"field":"type","message":"Invalid request type"}]}"#),
            "Title is required, Invalid request type"
        );
        assert_eq!(server_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn clones_share_the_token() {
        let a = ApiClient::new("http://localhost:5000/api/");
        let b = a.clone();
        a.set_token(Some("t0k3n".into()));
        assert_eq!(b.token().as_deref(), Some("t0k3n"));
        assert_eq!(b.url("/health"), "http://localhost:5000/api/health");
    }
}
