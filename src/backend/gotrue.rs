use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::{SessionStore, now_secs};

use super::rest::{Method, RestClient, RestRequest, send_blocking};
use super::{AuthProvider, Credentials, Session, User};

const AUTH_PREFIX: &str = "/auth/v1";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    expires_at: Option<u64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: u64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Hosted password-based auth service. Sessions are cached in a
/// [`SessionStore`] shared with the data store adapter.
pub struct GoTrueAuth {
    client: Arc<dyn RestClient>,
    sessions: Arc<SessionStore>,
}

impl GoTrueAuth {
    pub fn new(client: Arc<dyn RestClient>, sessions: Arc<SessionStore>) -> Self {
        Self { client, sessions }
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session> {
        let request = RestRequest::new(Method::Post, format!("{AUTH_PREFIX}/token"))
            .query("grant_type", grant_type)
            .body(body);
        let value = send_blocking(&self.client, request)
            .await?
            .ok_or_else(|| Error::Decode("empty token response".to_string()))?;
        let token: TokenResponse = serde_json::from_value(value)
            .map_err(|e| Error::Decode(format!("invalid token response: {e}")))?;
        let session = token.into_session(now_secs());
        self.sessions.set(session.clone())?;
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        debug!("refreshing expired session");
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}

impl AuthProvider for GoTrueAuth {
    async fn current_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.sessions.get() else {
            return Ok(None);
        };
        if !session.is_expired(now_secs()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            self.sessions.clear()?;
            return Ok(None);
        };
        match self.refresh(&refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "session refresh failed, signing out");
                self.sessions.clear()?;
                Ok(None)
            }
        }
    }

    async fn current_user(&self) -> Result<Option<User>> {
        let Some(session) = self.current_session().await? else {
            return Ok(None);
        };
        let request = RestRequest::new(Method::Get, format!("{AUTH_PREFIX}/user"))
            .bearer(Some(session.access_token));
        match send_blocking(&self.client, request).await {
            Ok(Some(value)) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::Decode(format!("invalid user response: {e}"))),
            Ok(None) => Ok(None),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn end_session(&self) -> Result<()> {
        if let Some(session) = self.sessions.get() {
            let request = RestRequest::new(Method::Post, format!("{AUTH_PREFIX}/logout"))
                .bearer(Some(session.access_token));
            if let Err(e) = send_blocking(&self.client, request).await {
                warn!(error = %e, "remote sign-out failed, clearing local session anyway");
            }
        }
        self.sessions.clear()?;
        info!("signed out");
        Ok(())
    }

    async fn begin_session(&self, credentials: &Credentials) -> Result<Session> {
        let session = self
            .token_grant(
                "password",
                serde_json::json!({
                    "email": credentials.email,
                    "password": credentials.password,
                }),
            )
            .await
            .map_err(|e| match e {
                Error::HttpStatus { message, .. } => Error::AuthRequired(message),
                other => other,
            })?;
        info!(user = %session.user.id, "signed in");
        Ok(session)
    }
}
