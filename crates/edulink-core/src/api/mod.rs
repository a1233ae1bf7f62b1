//! JSON-RPC client for the EduLink API.
//!
//! Every call is a POST of `{id, jsonrpc, method, uuid, params, authtoken?}` to
//! a single endpoint, with the method name repeated in the `x-api-method`
//! header. Every response wraps its payload in `result`, whose `success` flag
//! decides whether the call worked.
//!
//! A small allow-list of slow-changing methods is served from the cache for
//! 24 hours. Those cached responses are returned without a session token.

pub mod client;
pub mod error;
pub mod methods;
pub mod protocol;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::RpcClient;
pub use error::ApiError;
pub use methods::{
    AchievementCall, BehaviourCall, LearnerPhotosCall, LoginCall, LookupsCall, SchoolDetailsCall,
    TeacherPhotosCall,
};
pub use protocol::{ApiMethod, ApiResult, ResultBase};
pub use transport::{HttpTransport, Transport, WireRequest, WireResponse};
