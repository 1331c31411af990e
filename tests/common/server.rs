//! Local HTTP server answering with canned JSON bodies
//!
//! Exercises [`HttpApiClient`] over a real socket: routes are keyed by
//! `"METHOD /path?query"` and every request is recorded with the headers the
//! client sent. Unrouted requests get the API's 404 error body.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use tokio::net::TcpListener;

use rivestack_provider::{HttpApiClient, ProviderConfig};

pub const TEST_API_KEY: &str = "rsk_test";
pub const TEST_USER_AGENT: &str = "rivestack-provider/test";

/// A request as it arrived at the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
}

#[derive(Clone, Default)]
struct Routes {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct StubServer {
    base_url: String,
    routes: Routes,
}

impl StubServer {
    pub async fn start() -> Self {
        let routes = Routes::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new().fallback(answer).with_state(routes.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            routes,
        }
    }

    /// Answer `method uri` with `status` and a raw body
    pub fn respond(&self, method: &str, uri: &str, status: u16, body: &str) {
        self.route(method, uri, status, body, None);
    }

    /// Like [`respond`](Self::respond), but hold the response for `delay`
    pub fn respond_after(&self, method: &str, uri: &str, delay: Duration, body: &str) {
        self.route(method, uri, 200, body, Some(delay));
    }

    fn route(&self, method: &str, uri: &str, status: u16, body: &str, delay: Option<Duration>) {
        let reply = Reply {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            delay,
        };
        self.routes
            .replies
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, uri), reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.routes.requests.lock().unwrap().clone()
    }

    pub fn client(&self) -> HttpApiClient {
        HttpApiClient::new(&ProviderConfig {
            api_key: TEST_API_KEY.to_string(),
            base_url: self.base_url.clone(),
            user_agent: TEST_USER_AGENT.to_string(),
        })
        .unwrap()
    }
}

async fn answer(
    State(routes): State<Routes>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let target = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let key = format!("{} {}", method, target);
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    routes.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        uri: target.to_string(),
        authorization: header("authorization"),
        user_agent: header("user-agent"),
        content_type: header("content-type"),
        body,
    });

    let reply = routes.replies.lock().unwrap().get(&key).cloned();
    match reply {
        Some(reply) => {
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            (reply.status, reply.body)
        }
        None => (
            StatusCode::NOT_FOUND,
            r#"{"error":true,"code":404,"message":"not found"}"#.to_string(),
        ),
    }
}
