//! Integration tests for Souq.
//!
//! Each test starts its own server on an ephemeral port, backed by the
//! in-memory backend, and talks to it over HTTP with a cookie-aware
//! client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p souq-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use souq_admin::backend::{Backend, MemoryBackend};
use souq_admin::config::{AutosaveConfig, SouqConfig};
use souq_admin::state::AppState;
use souq_core::Phone;

/// Password used by every test account.
pub const PASSWORD: &str = "correct horse battery";

/// A running server plus a handle on its storage.
pub struct TestContext {
    pub base_url: String,
    pub state: AppState,
    /// What the autosave task has written so far.
    pub memory: MemoryBackend,
}

impl TestContext {
    /// Start a server with a short autosave debounce.
    pub async fn new() -> Self {
        Self::with_autosave(AutosaveConfig {
            debounce: Duration::from_millis(50),
            success_display: Duration::from_millis(50),
            error_display: Duration::from_millis(50),
        })
        .await
    }

    pub async fn with_autosave(autosave: AutosaveConfig) -> Self {
        let memory = MemoryBackend::new();
        let config = SouqConfig::for_testing(autosave);
        let (state, _task) = AppState::new(config, Backend::Memory(memory.clone()))
            .await
            .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = souq_admin::app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            memory,
        }
    }

    /// A fresh client with its own cookie jar (its own session).
    #[must_use]
    pub fn client(&self) -> Client {
        Client::builder().cookie_store(true).build().unwrap()
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, client: &Client, path: &str) -> Response {
        client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post(&self, client: &Client, path: &str, body: &Value) -> Response {
        client.post(self.url(path)).json(body).send().await.unwrap()
    }

    pub async fn put(&self, client: &Client, path: &str, body: &Value) -> Response {
        client.put(self.url(path)).json(body).send().await.unwrap()
    }

    pub async fn delete(&self, client: &Client, path: &str) -> Response {
        client.delete(self.url(path)).send().await.unwrap()
    }

    /// Sign up a user on a new client, which stays logged in.
    pub async fn signup(&self, name: &str, phone: &str) -> Client {
        let client = self.client();
        let resp = self
            .post(
                &client,
                "/api/auth/signup",
                &json!({ "name": name, "phone": phone, "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        client
    }

    /// Sign up a merchant and open a store; returns the client and store.
    pub async fn merchant(&self, phone: &str, store_name: &str) -> (Client, Value) {
        let client = self.signup("Merchant", phone).await;
        let resp = self
            .post(&client, "/api/stores", &json!({ "name": store_name }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let store = resp.json::<Value>().await.unwrap();
        (client, store)
    }

    /// Flip the platform admin flag; there is no HTTP route for it.
    pub async fn make_platform_admin(&self, phone: &str) {
        let phone = Phone::parse(phone).unwrap();
        self.state
            .update_global(|global| {
                global.user_mut(&phone).unwrap().is_admin = true;
                Ok::<_, souq_admin::error::AppError>(())
            })
            .await
            .unwrap();
    }
}

/// Read a JSON body, asserting the status first.
pub async fn json_body(resp: Response, status: StatusCode) -> Value {
    let actual = resp.status();
    let body = resp.text().await.unwrap();
    assert_eq!(actual, status, "unexpected status, body: {body}");
    serde_json::from_str(&body).unwrap_or(Value::Null)
}

/// Parse a decimal serialized as a string (or number).
#[must_use]
pub fn dec(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}
