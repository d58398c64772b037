//! In-process fakes for handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::cloudflare::{CloudflareError, CreateRuleRequest, EmailRoutingApi, EmailRule, Zone};
use crate::server::{build_router, AppState};
use crate::store::Store;

/// Records every call and answers from an in-memory zone table.
#[derive(Default)]
pub struct FakeCloudflare {
    zones: Mutex<HashMap<String, String>>,
    pub created: Mutex<Vec<(String, String, CreateRuleRequest)>>,
    pub deleted: Mutex<Vec<(String, String, String)>>,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub zone_lookups: AtomicUsize,
    next_rule: AtomicUsize,
}

impl FakeCloudflare {
    pub fn with_zone(zone_id: &str, name: &str) -> Self {
        let fake = Self::default();
        fake.zones
            .lock()
            .unwrap()
            .insert(zone_id.to_string(), name.to_string());
        fake
    }

    fn api_error(context: &'static str, status: u16, detail: &str) -> CloudflareError {
        CloudflareError::Api {
            context,
            status,
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl EmailRoutingApi for FakeCloudflare {
    async fn list_zones(&self, _api_token: &str) -> Result<Vec<Value>, CloudflareError> {
        let zones = self.zones.lock().unwrap();
        let mut listed: Vec<Value> = zones
            .iter()
            .map(|(id, name)| serde_json::json!({"id": id, "name": name, "status": "active"}))
            .collect();
        listed.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        Ok(listed)
    }

    async fn get_zone(&self, _api_token: &str, zone_id: &str) -> Result<Zone, CloudflareError> {
        self.zone_lookups.fetch_add(1, Ordering::SeqCst);
        let zones = self.zones.lock().unwrap();
        zones
            .get(zone_id)
            .map(|name| Zone {
                id: zone_id.to_string(),
                name: name.clone(),
            })
            .ok_or_else(|| Self::api_error("Failed to get zone details", 404, "404 Not Found"))
    }

    async fn create_rule(
        &self,
        api_token: &str,
        zone_id: &str,
        rule: &CreateRuleRequest,
    ) -> Result<EmailRule, CloudflareError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::api_error(
                "Failed to create routing rule",
                400,
                "Rule already exists",
            ));
        }
        self.created.lock().unwrap().push((
            api_token.to_string(),
            zone_id.to_string(),
            rule.clone(),
        ));
        let n = self.next_rule.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(EmailRule {
            id: format!("remote-rule-{}", n),
        })
    }

    async fn delete_rule(
        &self,
        api_token: &str,
        zone_id: &str,
        rule_id: &str,
    ) -> Result<(), CloudflareError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::api_error(
                "Failed to delete routing rule",
                500,
                "Internal Server Error",
            ));
        }
        self.deleted.lock().unwrap().push((
            api_token.to_string(),
            zone_id.to_string(),
            rule_id.to_string(),
        ));
        Ok(())
    }
}

pub struct TestApp {
    pub store: Store,
    pub cloudflare: Arc<FakeCloudflare>,
    router: Router,
}

impl TestApp {
    pub fn new(cloudflare: FakeCloudflare) -> Self {
        Self::with_max_configs(cloudflare, 4)
    }

    pub fn with_max_configs(cloudflare: FakeCloudflare, max_configs: usize) -> Self {
        let store = Store::in_memory().unwrap();
        let cloudflare = Arc::new(cloudflare);
        let router = build_router(AppState {
            store: store.clone(),
            cloudflare: cloudflare.clone(),
            max_configs,
        });
        Self {
            store,
            cloudflare,
            router,
        }
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.router, method, uri, body).await
    }

    /// Creates a configuration through the API and returns its id.
    pub async fn create_config(&self, name: &str) -> String {
        let (status, body) = self
            .send("POST", "/api/configs", Some(config_body(name)))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["config"]["id"].as_str().unwrap().to_string()
    }
}

/// Sends one request and returns the status with the decoded JSON body
/// (`Value::Null` for an empty or non-JSON body).
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn config_body(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "apiToken": format!("cf-token-{}-0123456789", name),
        "accountId": "account-abcdef",
        "d1Database": "d1-database-id",
        "workerApi": "https://worker.example.com",
        "kvStorage": "kv-namespace-id",
        "destinationEmails": ["me@example.com"]
    })
}
