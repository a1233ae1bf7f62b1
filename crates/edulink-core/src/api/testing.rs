//! In-memory `Transport` for tests: canned results per method, every request recorded.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::transport::{Transport, WireRequest, WireResponse};
use super::ApiError;

type Handler = Box<dyn Fn(&Value) -> Result<Value, ApiError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub auth_token: Option<String>,
    /// The full decoded envelope.
    pub body: Value,
}

impl RecordedCall {
    pub fn params(&self) -> &Value {
        &self.body["params"]
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    handlers: Mutex<HashMap<&'static str, Handler>>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// A successful `result` object for `method` with `extra` merged in.
pub fn ok_result(method: &str, extra: Value) -> Value {
    let mut result = json!({
        "method": method,
        "success": true,
        "metrics": {"be": "test", "sspt": 0.01, "sspt_us": 10000, "st": "", "unique_id": "t"}
    });
    if let (Some(target), Value::Object(fields)) = (result.as_object_mut(), extra) {
        target.extend(fields);
    }
    result
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` by calling `handler` with the request params.
    /// The handler returns the `result` object.
    pub fn on<F>(&self, method: &'static str, handler: F) -> &Self
    where
        F: Fn(&Value) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(method, Box::new(handler));
        self
    }

    /// Answer `method` with a fixed successful result.
    pub fn on_ok(&self, method: &'static str, extra: Value) -> &Self {
        let result = ok_result(method, extra);
        self.on(method, move |_| Ok(result.clone()))
    }

    /// Number of requests seen for `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn recorded(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: WireRequest) -> Result<WireResponse, ApiError> {
        let body: Value = serde_json::from_str(&request.body).map_err(|e| {
            ApiError::InvalidRequest {
                method: request.method.to_string(),
                message: e.to_string(),
            }
        })?;

        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.to_string(),
            auth_token: request.auth_token.clone(),
            body: body.clone(),
        });

        let handlers = self.handlers.lock().unwrap();
        let Some(handler) = handlers.get(request.method) else {
            return Err(ApiError::from_status(request.method, 404, "no scripted handler"));
        };
        let result = handler(&body["params"])?;

        Ok(WireResponse {
            status: 200,
            body: json!({"id": 1, "jsonrpc": "2.0", "result": result}).to_string(),
        })
    }
}
