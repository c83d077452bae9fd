//! HTTP client for the remote note store.
//!
//! This module provides the production `NoteGateway`:
//! - `GET /notes`, `POST /notes`, `PUT /notes/{id}`, `DELETE /notes/{id}`
//! - Bearer token taken from an explicit `Session` at construction
//! - `login` / `signup` helpers that obtain such a session

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{NoteError, NoteResult};
use crate::gateway::NoteGateway;
use crate::models::{Note, NoteDraft, NoteId, NotePatch};

/// Authenticated session context handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// Account details returned by login and signup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Login request
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Signup request
#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Login / signup response
#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: UserInfo,
}

/// Error body the store attaches to failures
#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

/// Note store client over HTTP
pub struct HttpNoteGateway {
    client: Client,
    base_url: String,
    session: Option<Session>,
}

impl HttpNoteGateway {
    /// Create a new gateway
    ///
    /// `base_url` is the API root (e.g. `http://localhost:5000/api`). A gateway
    /// without a session fails every call with `NoteError::Unauthorized`.
    pub fn new(
        base_url: impl Into<String>,
        session: Option<Session>,
        timeout: Duration,
    ) -> NoteResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Create a gateway from the stored configuration and session token
    pub fn from_config(config: &Config) -> NoteResult<Self> {
        Self::new(
            config.api_base_url(),
            config.session_token().map(Session::new),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn notes_url(&self) -> String {
        format!("{}/notes", self.base_url)
    }

    fn note_url(&self, id: &NoteId) -> String {
        format!("{}/notes/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    fn bearer(&self) -> NoteResult<&str> {
        self.session
            .as_ref()
            .map(|s| s.token.as_str())
            .ok_or(NoteError::Unauthorized)
    }

    /// Decode a mutation response. The store may answer with the note or with
    /// a bare acknowledgement; only the former yields `Some`.
    async fn decode_optional_note(response: Response) -> NoteResult<Option<Note>> {
        let body = response.text().await?;
        match serde_json::from_str::<Note>(&body) {
            Ok(note) => Ok(Some(note)),
            Err(e) => {
                tracing::debug!("Mutation response is not a note ({}): {}", e, body);
                Ok(None)
            }
        }
    }
}

impl NoteGateway for HttpNoteGateway {
    async fn fetch_all(&self) -> NoteResult<Vec<Note>> {
        let token = self.bearer()?;
        let response = self
            .client
            .get(self.notes_url())
            .bearer_auth(token)
            .send()
            .await?;
        let response = check_status(response, "fetch notes").await?;

        response
            .json::<Vec<Note>>()
            .await
            .map_err(|e| NoteError::Decode(format!("Failed to parse notes: {}", e)))
    }

    async fn create(&self, draft: &NoteDraft) -> NoteResult<Option<Note>> {
        let token = self.bearer()?;
        let response = self
            .client
            .post(self.notes_url())
            .bearer_auth(token)
            .json(draft)
            .send()
            .await?;
        let response = check_status(response, "create note").await?;
        Self::decode_optional_note(response).await
    }

    async fn update(&self, id: &NoteId, patch: &NotePatch) -> NoteResult<Option<Note>> {
        let token = self.bearer()?;
        let response = self
            .client
            .put(self.note_url(id))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?;
        let response = check_status(response, &format!("update note {}", id)).await?;
        Self::decode_optional_note(response).await
    }

    async fn delete(&self, id: &NoteId) -> NoteResult<()> {
        let token = self.bearer()?;
        let response = self
            .client
            .delete(self.note_url(id))
            .bearer_auth(token)
            .send()
            .await?;
        check_status(response, &format!("delete note {}", id)).await?;
        Ok(())
    }
}

/// Log in and return the session plus account details
pub async fn login(
    base_url: &str,
    email: &str,
    password: &str,
    timeout: Duration,
) -> NoteResult<(Session, UserInfo)> {
    let client = build_client(timeout)?;
    let response = client
        .post(format!("{}/login", base_url.trim_end_matches('/')))
        .json(&LoginRequest { email, password })
        .send()
        .await?;
    let response = check_status(response, "login").await?;
    let auth: AuthResponse = response
        .json()
        .await
        .map_err(|e| NoteError::Decode(format!("Failed to parse login response: {}", e)))?;

    tracing::info!("Logged in as {}", auth.user.username);
    Ok((Session::new(auth.token), auth.user))
}

/// Create an account and return its session plus account details
pub async fn signup(
    base_url: &str,
    username: &str,
    email: &str,
    password: &str,
    timeout: Duration,
) -> NoteResult<(Session, UserInfo)> {
    let client = build_client(timeout)?;
    let response = client
        .post(format!("{}/signup", base_url.trim_end_matches('/')))
        .json(&SignupRequest {
            username,
            email,
            password,
        })
        .send()
        .await?;
    let response = check_status(response, "signup").await?;
    let auth: AuthResponse = response
        .json()
        .await
        .map_err(|e| NoteError::Decode(format!("Failed to parse signup response: {}", e)))?;

    tracing::info!("Signed up as {}", auth.user.username);
    Ok((Session::new(auth.token), auth.user))
}

fn build_client(timeout: Duration) -> NoteResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NoteError::Network(e.to_string()))
}

/// Map non-success statuses onto the error taxonomy.
async fn check_status(response: Response, operation: &str) -> NoteResult<Response> {
    let status = response.status();
    tracing::debug!("{} -> HTTP {}", operation, status);

    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NoteError::Unauthorized),
        StatusCode::NOT_FOUND => Err(NoteError::NotFound(operation.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<MessageResponse>(&body)
                .map(|m| m.message)
                .unwrap_or(body);
            Err(NoteError::http(
                status.as_u16(),
                format!("{} failed: {}", operation, message),
            ))
        }
    }
}
