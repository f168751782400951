//! Serverless script backend.
//!
//! Every call is a JSON `POST` to one URL:
//!
//! ```json
//! { "storeId": "store_1", "action": "getStoreData", "payload": null }
//! ```
//!
//! answered with `{ "success": true, "data": ... }` or
//! `{ "success": false, "error": "..." }`. `getStoreData` answers
//! `data: null` for a store that was never saved.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use souq_core::{GlobalData, StoreData, StoreId};

use super::BackendError;

const GET_GLOBAL_DATA: &str = "getGlobalData";
const SAVE_GLOBAL_DATA: &str = "saveGlobalData";
const GET_STORE_DATA: &str = "getStoreData";
const SAVE_STORE_DATA: &str = "saveStoreData";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptRequest<'a, T: Serialize> {
    store_id: Option<&'a StoreId>,
    action: &'static str,
    payload: Option<&'a T>,
}

#[derive(Deserialize)]
struct ScriptResponse {
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the script endpoint. Cheap to clone.
#[derive(Clone)]
pub struct ScriptBackend {
    inner: Arc<ScriptBackendInner>,
}

struct ScriptBackendInner {
    client: reqwest::Client,
    url: Url,
}

impl std::fmt::Debug for ScriptBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptBackend")
            .field("url", &self.inner.url.as_str())
            .finish_non_exhaustive()
    }
}

impl ScriptBackend {
    /// Create a client for `url`, sending `api_key` as a bearer token.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(url: Url, api_key: Option<SecretString>) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret())).map_err(
                |e| BackendError::Script {
                    action: "configure",
                    message: format!("invalid API key format: {e}"),
                },
            )?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ScriptBackendInner { client, url }),
        })
    }

    async fn call<T: Serialize + Sync, R: DeserializeOwned>(
        &self,
        action: &'static str,
        store_id: Option<&StoreId>,
        payload: Option<&T>,
    ) -> Result<Option<R>, BackendError> {
        let request = ScriptRequest {
            store_id,
            action,
            payload,
        };
        let response: ScriptResponse = self
            .inner
            .client
            .post(self.inner.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            return Err(BackendError::Script {
                action,
                message: response
                    .error
                    .unwrap_or_else(|| "no error message".to_string()),
            });
        }
        match response.data {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }

    pub(super) async fn get_global_data(&self) -> Result<GlobalData, BackendError> {
        Ok(self
            .call::<(), GlobalData>(GET_GLOBAL_DATA, None, None)
            .await?
            .unwrap_or_default())
    }

    pub(super) async fn save_global_data(&self, data: &GlobalData) -> Result<(), BackendError> {
        self.call::<_, serde_json::Value>(SAVE_GLOBAL_DATA, None, Some(data))
            .await?;
        Ok(())
    }

    pub(super) async fn get_store_data(&self, store: &StoreId) -> Result<Option<StoreData>, BackendError> {
        self.call::<(), StoreData>(GET_STORE_DATA, Some(store), None)
            .await
    }

    /// The endpoint does not check versions; the bumped version is sent
    /// along so the next load sees it.
    pub(super) async fn save_store_data(&self, store: &StoreId, data: &StoreData) -> Result<u64, BackendError> {
        let mut saved = data.clone();
        saved.version = data.version + 1;
        self.call::<_, serde_json::Value>(SAVE_STORE_DATA, Some(store), Some(&saved))
            .await?;
        Ok(saved.version)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
    use serde_json::{Value, json};

    use super::*;

    #[derive(Clone, Default)]
    struct FakeScript {
        documents: Arc<Mutex<HashMap<String, Value>>>,
    }

    async fn handle(
        State(fake): State<FakeScript>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some("Bearer k3y") {
            return Json(json!({ "success": false, "error": "unauthorized" }));
        }
        let key = body["storeId"].as_str().unwrap_or("global").to_string();
        let mut documents = fake.documents.lock().unwrap();
        match body["action"].as_str().unwrap() {
            "getGlobalData" | "getStoreData" => {
                Json(json!({ "success": true, "data": documents.get(&key) }))
            }
            "saveGlobalData" | "saveStoreData" => {
                documents.insert(key, body["payload"].clone());
                Json(json!({ "success": true }))
            }
            other => Json(json!({ "success": false, "error": format!("unknown action {other}") })),
        }
    }

    async fn serve() -> Url {
        let app = Router::new()
            .route("/exec", post(handle))
            .with_state(FakeScript::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Url::parse(&format!("http://{addr}/exec")).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_through_endpoint() {
        let url = serve().await;
        let backend = ScriptBackend::new(url, Some(SecretString::from("k3y"))).unwrap();
        let store = StoreId::new("store_1");

        assert_eq!(backend.get_global_data().await.unwrap(), GlobalData::default());
        assert!(backend.get_store_data(&store).await.unwrap().is_none());

        let version = backend
            .save_store_data(&store, &StoreData::default())
            .await
            .unwrap();
        assert_eq!(version, 1);
        let loaded = backend.get_store_data(&store).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_endpoint_error_is_reported() {
        let url = serve().await;
        let backend = ScriptBackend::new(url, None).unwrap();
        let err = backend.get_global_data().await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Script {
                action: "getGlobalData",
                ..
            }
        ));
        assert!(err.to_string().contains("unauthorized"));
    }
}
