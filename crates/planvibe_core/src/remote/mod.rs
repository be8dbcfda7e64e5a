//! HTTP access to the PlanVibe REST backend.
//!
//! Every call is a single blocking round trip: no retry, no timeout policy
//! beyond the transport's own, no request coalescing. Responses are
//! normalized into `Result`: an `{"error": "..."}` body becomes
//! [`AppError::Remote`] with the server's text unchanged.

pub mod auth;
pub mod dashboard;
pub mod goals;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::AppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Performs one request. Any HTTP status counts as a response; only failures
/// to get one at all are errors.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, AppError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, AppError> {
        let mut call = self.agent.request(request.method.as_str(), &request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match request.body.as_deref() {
            Some(body) => call.send_string(body),
            None => call.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(AppError::network(err.to_string())),
        };

        let status = response.status();
        let body = response
            .into_string()
            .map_err(|err| AppError::network(err.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self::with_transport(base_url, Box::new(UreqTransport::new()))
    }

    pub fn with_transport<S: Into<String>>(base_url: S, transport: Box<dyn Transport>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: None,
            transport,
        }
    }

    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.execute(Method::Get, path, None, false)
    }

    pub(crate) fn get_authenticated<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.execute(Method::Get, path, None, true)
    }

    pub(crate) fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let body = serde_json::to_string(body)?;
        self.execute(Method::Post, path, Some(body), false)
    }

    pub(crate) fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let body = serde_json::to_string(body)?;
        self.execute(Method::Put, path, Some(body), false)
    }

    pub(crate) fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.execute(Method::Delete, path, None, false)
    }

    fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        authenticated: bool,
    ) -> Result<T, AppError> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if authenticated {
            let token = self
                .token
                .as_deref()
                .ok_or_else(|| AppError::invalid_input("not logged in"))?;
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let request = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        };
        debug!(method = method.as_str(), url = %request.url, "sending request");

        let response = self.transport.send(&request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, AppError> {
    let value: serde_json::Value = serde_json::from_str(&response.body).map_err(|err| {
        AppError::invalid_data(format!(
            "unreadable response body (status {}): {}",
            response.status, err
        ))
    })?;

    if let Some(message) = value.get("error").and_then(serde_json::Value::as_str) {
        return Err(AppError::remote(message));
    }
    if !(200..300).contains(&response.status) {
        return Err(AppError::remote(format!(
            "server responded with status {}",
            response.status
        )));
    }

    serde_json::from_value(value)
        .map_err(|err| AppError::invalid_data(format!("unexpected response shape: {err}")))
}

/// Ids are spliced into request paths, so only URL-safe characters are allowed.
pub(crate) fn path_id(raw: &str) -> Result<&str, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(AppError::invalid_input(format!("invalid id '{trimmed}'")));
    }
    Ok(trimmed)
}

/// Acknowledgement body such as `{"message": "Task deleted"}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}
