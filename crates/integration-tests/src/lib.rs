//! Integration test support for the virtual catalog.
//!
//! [`MockCatalogServer`] is an axum server on an ephemeral local port that
//! stands in for the commerce GraphQL endpoint. Responses are registered per
//! GraphQL operation name and every request is recorded.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p virtual-catalog-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::post;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use virtual_catalog::GraphqlConfig;

/// Canned HTTP response of the mock server.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    /// `200 OK` with `{"data": data}`.
    #[must_use]
    pub fn data(data: Value) -> Self {
        Self::json(StatusCode::OK, &json!({ "data": data }))
    }

    /// `200 OK` with a GraphQL `errors` array.
    #[must_use]
    pub fn errors(messages: &[&str]) -> Self {
        let errors: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "message": m, "path": ["products", 0], "locations": [{ "line": 2, "column": 3 }] }))
            .collect();
        Self::json(StatusCode::OK, &json!({ "data": null, "errors": errors }))
    }

    /// Any status with a JSON body.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    /// Any status with a raw body.
    #[must_use]
    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A request received by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub operation_name: String,
    pub query: String,
    pub variables: Value,
    pub store: Option<String>,
    pub authorization: Option<String>,
}

type Responder = Arc<dyn Fn(&Value) -> MockResponse + Send + Sync>;

#[derive(Default)]
struct MockState {
    responders: Mutex<HashMap<String, Responder>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Local GraphQL endpoint serving canned responses.
pub struct MockCatalogServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockCatalogServer {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/graphql", post(graphql))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// URL of the GraphQL endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}/graphql", self.addr)
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self, auth_token: Option<&str>) -> GraphqlConfig {
        GraphqlConfig {
            endpoint: self.endpoint(),
            auth_token: auth_token.map(|t| secrecy::SecretString::from(t.to_string())),
            timeout: Duration::from_secs(5),
        }
    }

    /// Answer every request for `operation` with `response`.
    pub fn respond(&self, operation: &str, response: MockResponse) {
        self.respond_with(operation, move |_| response.clone());
    }

    /// Answer requests for `operation` based on their variables.
    pub fn respond_with<F>(&self, operation: &str, responder: F)
    where
        F: Fn(&Value) -> MockResponse + Send + Sync + 'static,
    {
        self.state
            .responders
            .lock()
            .unwrap()
            .insert(operation.to_string(), Arc::new(responder));
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Number of requests received for `operation`.
    #[must_use]
    pub fn request_count(&self, operation: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation_name == operation)
            .count()
    }
}

impl Drop for MockCatalogServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn graphql(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let operation_name = body["operationName"].as_str().unwrap_or_default().to_string();
    let variables = body["variables"].clone();

    state.requests.lock().unwrap().push(RecordedRequest {
        operation_name: operation_name.clone(),
        query: body["query"].as_str().unwrap_or_default().to_string(),
        variables: variables.clone(),
        store: header("store"),
        authorization: header("authorization"),
    });

    let responder = state.responders.lock().unwrap().get(&operation_name).cloned();
    let response = match responder {
        Some(respond) => respond(&variables),
        None => {
            let message = format!("no mock for {operation_name}");
            MockResponse::errors(&[message.as_str()])
        }
    };

    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(response.body)).unwrap()
}

/// A product as the GraphQL backend returns it.
#[must_use]
pub fn product_json(sku: &str, name: &str) -> Value {
    json!({
        "__typename": "SimpleProduct",
        "id": 100,
        "sku": sku,
        "name": name,
        "url_key": sku,
        "updated_at": "2019-04-02 09:17:38",
        "description": { "html": format!("<p>{name}</p>") },
        "image": { "url": format!("https://img.example.com/{sku}.jpg") },
        "thumbnail": null,
        "price": { "regularPrice": { "amount": { "currency": "USD", "value": 29.5 } } }
    })
}

/// A category as the GraphQL backend returns it.
#[must_use]
pub fn category_json(id: i32, name: &str, url_path: &str, children: &[Value]) -> Value {
    json!({
        "id": id,
        "name": name,
        "url_key": url_path.rsplit('/').next().unwrap_or(url_path),
        "url_path": url_path,
        "product_count": 0,
        "children_count": children.len().to_string(),
        "children": children
    })
}
