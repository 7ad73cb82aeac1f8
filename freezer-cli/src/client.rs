//! HTTP client for the freezer-api session endpoints.

use freezer_types::{RunResult, Session};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Header carrying the owner identity of a request.
const USER_ID_HEADER: &str = "X-User-Id";

/// Errors returned by [`ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport or decoding failure.
    #[error("http error: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("{title} ({status}): {description}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error title from the response body.
        title: String,
        /// Error description from the response body.
        description: String,
    },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ClientError::ConnectionFailed(e.to_string())
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    title: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    sessions: Vec<Session>,
}

/// Reply to a `start` or `end` action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionReply {
    /// "success", "hold-off" or "out-of-sync".
    pub result: String,
    /// Session tag after the action.
    pub session_tag: i64,
}

/// Client for one freezer-api endpoint, acting as one owner.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    user: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client. Requests carry `X-User-Id` when `user` is set.
    pub fn new(base_url: &str, user: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
            http: reqwest::Client::new(),
        }
    }

    /// Get the base URL.
    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the URL for the session collection.
    pub fn sessions_url(&self) -> String {
        format!("{}/sessions", self.base_url)
    }

    /// Build the URL for one session.
    pub fn session_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}", self.base_url, session_id)
    }

    /// Build the URL for a job attached to a session.
    pub fn job_url(&self, session_id: &str, job_id: &str) -> String {
        format!("{}/sessions/{}/jobs/{}", self.base_url, session_id, job_id)
    }

    /// Create a session and return its id.
    pub async fn create_session(&self, document: &Value) -> Result<String, ClientError> {
        let response = self
            .request(reqwest::Method::POST, self.sessions_url())
            .json(document)
            .send()
            .await?;
        let created: SessionCreated = check(response).await?.json().await?;
        Ok(created.session_id)
    }

    /// Fetch one session.
    pub async fn get_session(&self, session_id: &str) -> Result<Session, ClientError> {
        let response = self
            .request(reqwest::Method::GET, self.session_url(session_id))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// List sessions page by page.
    pub async fn list_sessions(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Session>, ClientError> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset));
        }

        let response = self
            .request(reqwest::Method::GET, self.sessions_url())
            .query(&query)
            .send()
            .await?;
        let list: SessionList = check(response).await?.json().await?;
        Ok(list.sessions)
    }

    /// Delete a session.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        let response = self
            .request(reqwest::Method::DELETE, self.session_url(session_id))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Attach a job to a session. Attaching an existing job is a no-op.
    pub async fn attach_job(
        &self,
        session_id: &str,
        job_id: &str,
        client_id: Option<&str>,
    ) -> Result<(), ClientError> {
        let mut request = self.request(reqwest::Method::PUT, self.job_url(session_id, job_id));
        if let Some(client_id) = client_id {
            request = request.json(&json!({ "client_id": client_id }));
        }
        check(request.send().await?).await?;
        Ok(())
    }

    /// Detach a job from a session.
    pub async fn detach_job(&self, session_id: &str, job_id: &str) -> Result<(), ClientError> {
        let response = self
            .request(reqwest::Method::DELETE, self.job_url(session_id, job_id))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Report that a job's backup round is starting.
    pub async fn start(
        &self,
        session_id: &str,
        job_id: &str,
        current_tag: i64,
    ) -> Result<ActionReply, ClientError> {
        self.action(
            session_id,
            json!({ "start": { "job_id": job_id, "current_tag": current_tag } }),
        )
        .await
    }

    /// Report that a job finished with `result`.
    pub async fn end(
        &self,
        session_id: &str,
        job_id: &str,
        result: &RunResult,
    ) -> Result<ActionReply, ClientError> {
        self.action(
            session_id,
            json!({ "end": { "job_id": job_id, "result": result.as_str() } }),
        )
        .await
    }

    async fn action(&self, session_id: &str, body: Value) -> Result<ActionReply, ClientError> {
        let url = format!("{}/action", self.session_url(session_id));
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let request = self.http.request(method, url);
        match &self.user {
            Some(user) => request.header(USER_ID_HEADER, user),
            None => request,
        }
    }
}

/// Turn a non-success response into [`ClientError::Api`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (title, description) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => (err.title, err.description),
        Err(_) => (
            status.canonical_reason().unwrap_or("Error").to_string(),
            body,
        ),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        title,
        description,
    })
}
