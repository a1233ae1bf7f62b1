use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

pub const JSONRPC_VERSION: &str = "2.0";

/// Every call uses request id 1; the API does not correlate on it.
const REQUEST_ID: u32 = 1;

/// One EduLink API method: its wire name plus request and result shapes.
///
/// Implemented by zero-sized marker types in `methods`, so the cache-aside
/// and success checking in `RpcClient::call` are written once.
pub trait ApiMethod {
    const NAME: &'static str;
    type Params: Serialize + Send + Sync;
    type Output: ApiResult + Serialize + DeserializeOwned + Send;
}

/// Access to the status block every `result` payload embeds.
pub trait ApiResult {
    fn base(&self) -> &ResultBase;

    fn is_success(&self) -> bool {
        self.base().success
    }
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    pub id: u32,
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub uuid: String,
    pub params: &'a P,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authtoken: Option<&'a str>,
}

impl<'a, P: Serialize> RpcRequest<'a, P> {
    pub fn new(method: &'static str, params: &'a P, authtoken: Option<&'a str>) -> Self {
        Self {
            id: REQUEST_ID,
            jsonrpc: JSONRPC_VERSION,
            method,
            uuid: Uuid::new_v4().to_string(),
            params,
            // An empty token is the same as none
            authtoken: authtoken.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<R> {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub jsonrpc: String,
    pub result: R,
}

/// Status block shared by all results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultBase {
    pub method: String,
    pub success: bool,
    /// Human readable failure reason, present when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metrics: Metrics,
}

/// Server timing data; only logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub be: String,
    pub sspt: f64,
    pub sspt_us: i64,
    pub st: String,
    pub unique_id: String,
}

/// Parameters for methods that take none. Serialises as `{}`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoParams {}
