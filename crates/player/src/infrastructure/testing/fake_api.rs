use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::ports::outbound::{ApiError, RawApiPort};

#[derive(Debug, Clone)]
pub(crate) struct FakeCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// Scripted `RawApiPort` that records calls and can hold them at a gate.
#[derive(Default)]
pub(crate) struct FakeApi {
    responses: Mutex<HashMap<(&'static str, String), Result<Value, ApiError>>>,
    calls: Mutex<Vec<FakeCall>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_get(&self, path: &str, response: Result<Value, ApiError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET", path.to_string()), response);
    }

    pub fn on_post(&self, path: &str, response: Result<Value, ApiError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(("POST", path.to_string()), response);
    }

    /// Hold every later call until the returned `Notify` is signalled once per call.
    pub fn close_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn open_gate(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_waiters();
        }
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.path == path)
            .and_then(|c| c.body.clone())
    }

    async fn respond(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(FakeCall {
            method,
            path: path.to_string(),
            body,
        });

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.responses
            .lock()
            .unwrap()
            .get(&(method, path.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Http {
                    status: 404,
                    message: format!("no fake route for {method} {path}"),
                })
            })
    }
}

#[async_trait]
impl RawApiPort for FakeApi {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.respond("GET", path, None).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.respond("POST", path, Some(body.clone())).await
    }
}
