//! Authentication-aware GraphQL client.
//!
//! Headers are computed per request from a token provider, so a login or
//! logout after the client is built takes effect on the next request.

use crate::client::auth::Auth;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing;

/// Supplies the current bearer token, if any.
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Error types for GraphQL requests.
#[derive(Debug, thiserror::Error)]
pub enum GraphQLError {
    /// The request failed or the body could not be read
    #[error("GraphQL request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status without a GraphQL error payload
    #[error("GraphQL endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The server reported GraphQL errors
    #[error("GraphQL errors: {}", join_messages(.0))]
    Response(Vec<GraphQLErrorMessage>),

    /// Neither data nor errors in the response
    #[error("GraphQL response contained no data")]
    MissingData,

    /// `data` does not match the requested type
    #[error("Failed to decode GraphQL data: {0}")]
    Decode(#[from] serde_json::Error),
}

fn join_messages(errors: &[GraphQLErrorMessage]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLErrorMessage {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
}

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Value>,
}

#[derive(Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQLErrorMessage>,
}

/// GraphQL client attaching `Authorization: Bearer <token>` when a token exists.
#[derive(Clone)]
pub struct GraphQLClient {
    http: reqwest::Client,
    url: String,
    token_provider: TokenProvider,
}

impl std::fmt::Debug for GraphQLClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Creates a GraphQL client for `url` using `token_provider` on every request.
pub fn create_client<F>(url: impl Into<String>, token_provider: F) -> GraphQLClient
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    GraphQLClient {
        http: reqwest::Client::new(),
        url: url.into(),
        token_provider: Arc::new(token_provider),
    }
}

impl GraphQLClient {
    /// Creates a client whose token comes from `auth`.
    pub fn for_auth(url: impl Into<String>, auth: &Auth) -> Self {
        let auth = auth.clone();
        create_client(url, move || auth.get_token())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Builds the headers for a request sent now.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        match (self.token_provider)() {
            Some(token) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                    tracing::trace!("Added Authorization header to GraphQL request");
                }
                Err(_) => tracing::warn!("Failed to create Authorization header from token"),
            },
            None => tracing::trace!("No token available - sending unauthenticated request"),
        }

        headers
    }

    /// Sends `query` with optional `variables` and decodes `data` into `T`.
    pub async fn request<T>(&self, query: &str, variables: Option<&Value>) -> Result<T, GraphQLError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(&self.url)
            .headers(self.headers())
            .json(&GraphQLRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let parsed = serde_json::from_str::<GraphQLResponse>(&body);
        match parsed {
            Ok(GraphQLResponse { errors, .. }) if !errors.is_empty() => {
                tracing::warn!("GraphQL request returned {} error(s)", errors.len());
                Err(GraphQLError::Response(errors))
            }
            _ if !status.is_success() => {
                tracing::error!("GraphQL endpoint returned {}", status);
                Err(GraphQLError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Ok(GraphQLResponse {
                data: Some(data), ..
            }) if !data.is_null() => Ok(serde_json::from_value(data)?),
            Ok(_) => Err(GraphQLError::MissingData),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use std::sync::Mutex;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Health {
        health: String,
    }

    #[test]
    fn headers_include_bearer_token() {
        let client = create_client("http://api", || Some("tok".to_string()));
        let headers = client.headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
    }

    #[test]
    fn headers_omit_authorization_without_token() {
        let client = create_client("http://api", || None);
        assert!(client.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn headers_skip_invalid_token() {
        let client = create_client("http://api", || Some("bad\ntoken".to_string()));
        assert!(client.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn headers_follow_provider_changes() {
        let token = Arc::new(Mutex::new(None::<String>));
        let source = token.clone();
        let client = create_client("http://api", move || source.lock().unwrap().clone());

        assert!(client.headers().get(AUTHORIZATION).is_none());
        *token.lock().unwrap() = Some("later".to_string());
        assert_eq!(client.headers().get(AUTHORIZATION).unwrap(), "Bearer later");
    }

    #[tokio::test]
    async fn request_sends_token_computed_at_send_time() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .and(header("authorization", "Bearer tok-2"))
            .and(body_json(json!({"query": "{ health }"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"health": "ok"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = Arc::new(Mutex::new(Some("tok-1".to_string())));
        let source = token.clone();
        let client = create_client(format!("{}/query", server.uri()), move || {
            source.lock().unwrap().clone()
        });
        *token.lock().unwrap() = Some("tok-2".to_string());

        let data: Health = client.request("{ health }", None).await.unwrap();
        assert_eq!(data, Health { health: "ok".to_string() });
    }

    #[tokio::test]
    async fn request_without_token_has_no_authorization() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"health": "ok"}
            })))
            .mount(&server)
            .await;

        let client = create_client(server.uri(), || None);
        let variables = json!({"id": 1});
        let _: Health = client.request("{ health }", Some(&variables)).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["variables"], json!({"id": 1}));
    }

    #[tokio::test]
    async fn request_surfaces_graphql_errors() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{"message": "unauthorized", "path": ["me"]}]
            })))
            .mount(&server)
            .await;

        let client = create_client(server.uri(), || None);
        let err = client.request::<Health>("{ me }", None).await.unwrap_err();

        match err {
            GraphQLError::Response(errors) => {
                assert_eq!(errors[0].message, "unauthorized");
                assert_eq!(errors[0].path, Some(vec![json!("me")]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_reports_http_status() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("missing token"))
            .mount(&server)
            .await;

        let client = create_client(server.uri(), || None);
        let err = client.request::<Health>("{ health }", None).await.unwrap_err();

        assert!(matches!(err, GraphQLError::Status { status: 401, ref body } if body == "missing token"));
    }

    #[tokio::test]
    async fn request_without_data_fails() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;

        let client = create_client(server.uri(), || None);
        let err = client.request::<Health>("{ health }", None).await.unwrap_err();

        assert!(matches!(err, GraphQLError::MissingData));
    }
}
