use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::session::SessionStore;

use super::rest::{Method, RestClient, RestRequest, send_blocking};
use super::{DataStore, Filter, Select};

const REST_PREFIX: &str = "/rest/v1";

/// Hosted table store speaking the PostgREST query-string dialect.
pub struct PostgrestStore {
    client: Arc<dyn RestClient>,
    sessions: Arc<SessionStore>,
}

impl PostgrestStore {
    pub fn new(client: Arc<dyn RestClient>, sessions: Arc<SessionStore>) -> Self {
        Self { client, sessions }
    }

    fn request(&self, method: Method, table: &str) -> RestRequest {
        RestRequest::new(method, format!("{REST_PREFIX}/{table}")).bearer(self.sessions.access_token())
    }

    async fn send(&self, request: RestRequest) -> Result<Option<serde_json::Value>> {
        send_blocking(&self.client, request).await
    }
}

/// Encode one filter as a `(column, operator.value)` query pair.
pub fn encode_filter(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq { column, value } => (column.clone(), format!("eq.{value}")),
        Filter::ILike { column, needle } => (column.clone(), format!("ilike.%{needle}%")),
        Filter::In { column, values } => {
            let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
            (column.clone(), format!("in.({})", quoted.join(",")))
        }
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn with_filters(mut request: RestRequest, filters: &[Filter]) -> RestRequest {
    for filter in filters {
        let (key, value) = encode_filter(filter);
        request.query.push((key, value));
    }
    request
}

fn require_filters(filters: &[Filter], op: &str) -> Result<()> {
    if filters.is_empty() {
        return Err(Error::Validation(format!("refusing unfiltered {op}")));
    }
    Ok(())
}

impl DataStore for PostgrestStore {
    async fn query(&self, select: &Select) -> Result<Vec<serde_json::Value>> {
        let mut request = self.request(Method::Get, &select.table).query("select", "*");
        if let Some(ref order) = select.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            request = request.query("order", format!("{}.{dir}", order.column));
        }
        let request = with_filters(request, &select.filters);
        debug!(table = %select.table, query = ?request.query, "querying rows");

        match self.send(request).await? {
            Some(serde_json::Value::Array(rows)) => Ok(rows),
            Some(other) => Err(Error::Decode(format!(
                "expected an array of rows, got: {other}"
            ))),
            None => Ok(Vec::new()),
        }
    }

    async fn insert(&self, table: &str, record: serde_json::Value) -> Result<serde_json::Value> {
        let request = self
            .request(Method::Post, table)
            .prefer("return=representation")
            .body(record);

        match self.send(request).await? {
            Some(serde_json::Value::Array(mut rows)) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            Some(row @ serde_json::Value::Object(_)) => Ok(row),
            _ => Err(Error::Decode("insert returned no row".to_string())),
        }
    }

    async fn update(
        &self,
        table: &str,
        patch: serde_json::Value,
        filters: &[Filter],
    ) -> Result<()> {
        require_filters(filters, "update")?;
        let request = with_filters(
            self.request(Method::Patch, table)
                .prefer("return=minimal")
                .body(patch),
            filters,
        );
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        require_filters(filters, "delete")?;
        let request = with_filters(
            self.request(Method::Delete, table).prefer("return=minimal"),
            filters,
        );
        self.send(request).await?;
        Ok(())
    }
}
