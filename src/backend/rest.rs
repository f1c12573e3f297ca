use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    /// Path below the project URL, e.g. `/rest/v1/tasks`.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Bearer token; the client falls back to its public key when `None`.
    pub bearer: Option<String>,
    pub prefer: Option<&'static str>,
    pub body: Option<serde_json::Value>,
}

impl RestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            bearer: None,
            prefer: None,
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    pub fn prefer(mut self, prefer: &'static str) -> Self {
        self.prefer = Some(prefer);
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Abstraction over HTTP execution for testability.
pub trait RestClient: Send + Sync {
    /// Send a request. Returns the decoded JSON body, or `None` for an
    /// empty response.
    fn send(&self, request: RestRequest) -> Result<Option<serde_json::Value>>;
}

/// Real client backed by `ureq`. Every request carries the project's public
/// key in the `apikey` header.
pub struct UreqClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl RestClient for UreqClient {
    fn send(&self, request: RestRequest) -> Result<Option<serde_json::Value>> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, %url, query = ?request.query, "sending request");

        let bearer = request.bearer.as_deref().unwrap_or(&self.api_key);
        let mut req = self
            .agent
            .request(&request.method.to_string(), &url)
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {bearer}"))
            .set("Accept", "application/json");
        if let Some(prefer) = request.prefer {
            req = req.set("Prefer", prefer);
        }
        for (key, value) in &request.query {
            req = req.query(key, value);
        }

        let result = match request.body {
            Some(ref body) => req.send_json(body),
            None => req.call(),
        };

        match result {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?;
                parse_body(&text)
            }
            Err(ureq::Error::Status(status, response)) => {
                let text = response.into_string().unwrap_or_default();
                Err(Error::HttpStatus {
                    status,
                    message: error_message(&text),
                })
            }
            Err(ureq::Error::Transport(e)) => Err(Error::Transport(e.to_string())),
        }
    }
}

fn parse_body(text: &str) -> Result<Option<serde_json::Value>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| Error::Decode(format!("invalid JSON response: {e}")))
}

/// Pull the human-readable message out of an error body. The REST and auth
/// services use different field names.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| json.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Run a blocking client call off the async executor.
pub async fn send_blocking(
    client: &Arc<dyn RestClient>,
    request: RestRequest,
) -> Result<Option<serde_json::Value>> {
    let client = Arc::clone(client);
    tokio::task::spawn_blocking(move || client.send(request))
        .await
        .map_err(|e| Error::Transport(format!("request task failed: {e}")))?
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = RestRequest::new(Method::Patch, "/rest/v1/tasks")
            .query("id", "eq.1")
            .bearer(Some("tok".into()))
            .prefer("return=minimal")
            .body(serde_json::json!({ "status": "done" }));
        assert_eq!(req.method, Method::Patch);
        assert_eq!(req.query, vec![("id".to_string(), "eq.1".to_string())]);
        assert_eq!(req.bearer.as_deref(), Some("tok"));
        assert_eq!(req.prefer, Some("return=minimal"));
        assert_eq!(req.body.unwrap()["status"], "done");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body("").unwrap(), None);
        assert_eq!(parse_body("  \n").unwrap(), None);
        assert_eq!(
            parse_body(r#"[{"id":"1"}]"#).unwrap(),
            Some(serde_json::json!([{ "id": "1" }]))
        );
        assert!(matches!(parse_body("{nope"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_error_message_fields() {
        assert_eq!(error_message(r#"{"message":"permission denied"}"#), "permission denied");
        assert_eq!(error_message(r#"{"msg":"Invalid login"}"#), "Invalid login");
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"bad creds"}"#),
            "bad creds"
        );
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
        assert_eq!(error_message(r#"{"code":1}"#), r#"{"code":1}"#);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[tokio::test]
    async fn test_send_blocking_uses_client() {
        let mock = mock::MockRestClient::new(vec![Ok(Some(serde_json::json!([])))]);
        let client: Arc<dyn RestClient> = mock.clone();
        let out = send_blocking(&client, RestRequest::new(Method::Get, "/x"))
            .await
            .unwrap();
        assert_eq!(out, Some(serde_json::json!([])));
        assert_eq!(mock.requests().len(), 1);
    }
}
