pub mod gotrue;
pub mod postgrest;
pub mod rest;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds after which the access token is stale.
    #[serde(default)]
    pub expires_at: Option<u64>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self, now_secs: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_secs)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Row filter understood by the data store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    /// Case-insensitive substring match.
    ILike { column: String, needle: String },
    In { column: String, values: Vec<String> },
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn ilike(column: &str, needle: impl Into<String>) -> Self {
        Filter::ILike {
            column: column.to_string(),
            needle: needle.into(),
        }
    }

    pub fn is_in(column: &str, values: Vec<String>) -> Self {
        Filter::In {
            column: column.to_string(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// A read request: one table, all filters ANDed, optional ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

/// Hosted authentication service.
pub trait AuthProvider {
    /// The locally known session, if any.
    fn current_session(&self) -> impl Future<Output = Result<Option<Session>>> + Send;

    /// The user behind the current session, as confirmed by the service.
    fn current_user(&self) -> impl Future<Output = Result<Option<User>>> + Send;

    fn end_session(&self) -> impl Future<Output = Result<()>> + Send;

    fn begin_session(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Session>> + Send;
}

/// Hosted table store. Records travel as JSON objects.
pub trait DataStore {
    fn query(&self, select: &Select)
    -> impl Future<Output = Result<Vec<serde_json::Value>>> + Send;

    /// Insert one record and return it as stored (with server-assigned fields).
    fn insert(
        &self,
        table: &str,
        record: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;

    fn update(
        &self,
        table: &str,
        patch: serde_json::Value,
        filters: &[Filter],
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete(&self, table: &str, filters: &[Filter]) -> impl Future<Output = Result<()>> + Send;
}
