use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::methods::{
    AchievementCall, AchievementResult, BehaviourCall, BehaviourResult, LearnerEventsParams,
    LearnerPhotosCall, LearnerPhotosParams, LearnerPhotosResult, LoginCall, LoginParams,
    LookupsCall, LookupsResult, SchoolDetailsCall, SchoolDetailsParams, SchoolDetailsResult,
    TeacherPhotosCall, TeacherPhotosParams, TeacherPhotosResult,
};
use super::protocol::{ApiMethod, ApiResult, NoParams, RpcRequest};
use super::transport::{HttpTransport, Transport, WireRequest};
use super::ApiError;
use crate::auth::Session;
use crate::cache::Cache;

/// How long allow-listed responses are served from the cache.
pub const CACHE_TTL_HOURS: i64 = 24;

/// Methods whose responses change slowly enough to cache. Keyed by method
/// name alone, so parameters must not vary between calls.
const CACHEABLE_METHODS: &[&str] = &[SchoolDetailsCall::NAME, LookupsCall::NAME];

/// Event list format understood by the Behaviour and Achievement methods.
const EVENT_FORMAT: u8 = 2;

pub fn is_cacheable(method: &str) -> bool {
    CACHEABLE_METHODS.contains(&method)
}

/// JSON-RPC client. Clone is cheap: the transport and cache are shared.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    cache: Cache,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>, cache: Cache) -> Self {
        Self { transport, cache }
    }

    /// Client posting to `endpoint` over HTTPS.
    pub fn http(endpoint: &str, cache: Cache) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(HttpTransport::new(endpoint)?), cache))
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// True when a call to `M` would be answered from the cache.
    pub fn is_cached<M: ApiMethod>(&self) -> bool {
        is_cacheable(M::NAME) && self.cache.exists(M::NAME)
    }

    /// Invoke `M`, serving allow-listed methods from the cache when possible.
    ///
    /// A cached answer needs no token. A fresh answer for an allow-listed
    /// method is written back; a failed write only logs.
    pub async fn call<M: ApiMethod>(
        &self,
        params: &M::Params,
        auth_token: Option<&str>,
    ) -> Result<M::Output, ApiError> {
        let cacheable = is_cacheable(M::NAME);

        if cacheable {
            if let Some(cached) = self.cached::<M>() {
                return Ok(cached);
            }
        }

        let output = self.send::<M>(params, auth_token).await?;

        if cacheable {
            if let Err(e) = self
                .cache
                .set(M::NAME, &output, Some(Duration::hours(CACHE_TTL_HOURS)))
            {
                warn!(method = M::NAME, error = %e, "Failed to cache API response");
            }
        }

        Ok(output)
    }

    fn cached<M: ApiMethod>(&self) -> Option<M::Output> {
        if !self.cache.exists(M::NAME) {
            debug!(method = M::NAME, "Cache miss");
            return None;
        }
        match self.cache.get::<M::Output>(M::NAME) {
            Ok(Some(output)) => {
                debug!(method = M::NAME, "Serving response from cache");
                Some(output)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(method = M::NAME, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    async fn send<M: ApiMethod>(
        &self,
        params: &M::Params,
        auth_token: Option<&str>,
    ) -> Result<M::Output, ApiError> {
        let request = RpcRequest::new(M::NAME, params, auth_token);
        let body = serde_json::to_string(&request).map_err(|e| ApiError::InvalidRequest {
            method: M::NAME.to_string(),
            message: e.to_string(),
        })?;

        let response = self
            .transport
            .post(WireRequest {
                method: M::NAME,
                body,
                auth_token: request.authtoken.map(str::to_string),
            })
            .await?;

        let invalid = |message: String| ApiError::InvalidResponse {
            method: M::NAME.to_string(),
            message,
        };

        let envelope: Value = serde_json::from_str(&response.body).map_err(|e| {
            error!(method = M::NAME, body = %ApiError::truncate_body(&response.body), "Response is not JSON");
            invalid(e.to_string())
        })?;
        let result = envelope
            .get("result")
            .cloned()
            .ok_or_else(|| invalid("missing result".to_string()))?;

        if result.get("success").and_then(Value::as_bool) != Some(true) {
            error!(
                method = M::NAME,
                body = %ApiError::truncate_body(&response.body),
                "API call failed, raw response"
            );
            error!(
                method = M::NAME,
                parsed = %serde_json::to_string_pretty(&result).unwrap_or_default(),
                api_error = result.get("error").and_then(|v| v.as_str()).unwrap_or(""),
                "API call failed, parsed result"
            );
            return Err(ApiError::CallFailed {
                method: M::NAME.to_string(),
            });
        }

        let output: M::Output =
            serde_json::from_value(result).map_err(|e| invalid(e.to_string()))?;
        debug!(
            method = M::NAME,
            server_ms = output.base().metrics.sspt * 1000.0,
            "API call succeeded"
        );
        Ok(output)
    }

    // ===== Typed helpers =====

    /// Log in. Never cached; every pass gets a fresh token.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        establishment_id: u32,
    ) -> Result<Session, ApiError> {
        let params = LoginParams {
            username: username.to_string(),
            password: password.to_string(),
            establishment_id,
        };
        let login = self.call::<LoginCall>(&params, None).await?;
        Ok(Session::from_login(username, login))
    }

    pub async fn school_details(
        &self,
        establishment_id: u32,
    ) -> Result<SchoolDetailsResult, ApiError> {
        self.call::<SchoolDetailsCall>(&SchoolDetailsParams { establishment_id }, None)
            .await
    }

    pub async fn lookups(&self, token: Option<&str>) -> Result<LookupsResult, ApiError> {
        self.call::<LookupsCall>(&NoParams {}, token).await
    }

    pub async fn learner_photos(
        &self,
        token: &str,
        learner_ids: Vec<String>,
        size: u32,
    ) -> Result<LearnerPhotosResult, ApiError> {
        let params = LearnerPhotosParams { learner_ids, size };
        self.call::<LearnerPhotosCall>(&params, Some(token)).await
    }

    pub async fn behaviour(
        &self,
        token: &str,
        learner_id: &str,
    ) -> Result<BehaviourResult, ApiError> {
        self.call::<BehaviourCall>(&Self::event_params(learner_id), Some(token))
            .await
    }

    pub async fn achievement(
        &self,
        token: &str,
        learner_id: &str,
    ) -> Result<AchievementResult, ApiError> {
        self.call::<AchievementCall>(&Self::event_params(learner_id), Some(token))
            .await
    }

    pub async fn teacher_photos(
        &self,
        token: &str,
        employee_ids: Vec<String>,
        size: u32,
    ) -> Result<TeacherPhotosResult, ApiError> {
        let params = TeacherPhotosParams { employee_ids, size };
        self.call::<TeacherPhotosCall>(&params, Some(token)).await
    }

    fn event_params(learner_id: &str) -> LearnerEventsParams {
        LearnerEventsParams {
            learner_id: learner_id.to_string(),
            format: EVENT_FORMAT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedTransport;
    use crate::cache::{CacheBackend, CacheError, CachedData, MemoryCache};
    use serde_json::json;

    fn client_with(transport: &Arc<ScriptedTransport>, memory: &Arc<MemoryCache>) -> RpcClient {
        RpcClient::new(transport.clone(), Cache::from_shared(memory.clone()))
    }

    fn school_transport() -> Arc<ScriptedTransport> {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on_ok(
            SchoolDetailsCall::NAME,
            json!({"establishment": {"name": "Roundwood Park School"}}),
        );
        transport
    }

    /// Backend that reads as empty and rejects every write.
    struct ReadOnlyCache;

    impl CacheBackend for ReadOnlyCache {
        fn initialise(&self) -> Result<(), CacheError> {
            Ok(())
        }
        fn exists(&self, _key: &str) -> bool {
            false
        }
        fn load(&self, _key: &str) -> Result<Option<CachedData<Value>>, CacheError> {
            Ok(None)
        }
        fn store(&self, _key: &str, _entry: CachedData<Value>) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("read only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_cacheable_call_hits_network_once_within_ttl() {
        let transport = school_transport();
        let memory = Arc::new(MemoryCache::new());
        let client = client_with(&transport, &memory);

        let first = client.school_details(2).await.unwrap();
        let second = client.school_details(2).await.unwrap();

        assert_eq!(transport.calls(SchoolDetailsCall::NAME), 1);
        assert_eq!(first.establishment.name, "Roundwood Park School");
        assert_eq!(second.establishment.name, "Roundwood Park School");
    }

    #[tokio::test]
    async fn test_cacheable_call_refetches_after_expiry() {
        let transport = school_transport();
        let memory = Arc::new(MemoryCache::new());
        let client = client_with(&transport, &memory);

        client.school_details(2).await.unwrap();
        memory.advance(Duration::hours(25));
        client.school_details(2).await.unwrap();

        assert_eq!(transport.calls(SchoolDetailsCall::NAME), 2);
    }

    #[tokio::test]
    async fn test_cached_lookups_need_no_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on_ok(
            LookupsCall::NAME,
            json!({"behaviour_types": [{"id": "12", "description": "Disruption"}]}),
        );
        let memory = Arc::new(MemoryCache::new());
        let client = client_with(&transport, &memory);

        client.lookups(Some("tok")).await.unwrap();
        assert!(client.is_cached::<LookupsCall>());

        let cached = client.lookups(None).await.unwrap();
        assert_eq!(cached.behaviour_types[0].description, "Disruption");
        assert_eq!(transport.calls(LookupsCall::NAME), 1);
    }

    #[tokio::test]
    async fn test_non_cacheable_call_always_hits_network() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on_ok(BehaviourCall::NAME, json!({"behaviour": [{"id": "B1"}]}));
        let memory = Arc::new(MemoryCache::new());
        let client = client_with(&transport, &memory);

        client.behaviour("tok", "1").await.unwrap();
        client.behaviour("tok", "1").await.unwrap();

        assert_eq!(transport.calls(BehaviourCall::NAME), 2);
        assert!(!client.cache().exists(BehaviourCall::NAME));
        assert!(!client.is_cached::<BehaviourCall>());
    }

    #[tokio::test]
    async fn test_token_sent_in_envelope_and_header() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on_ok(AchievementCall::NAME, json!({"achievement": []}));
        let client = client_with(&transport, &Arc::new(MemoryCache::new()));

        client.achievement("tok", "7").await.unwrap();

        let call = &transport.recorded(AchievementCall::NAME)[0];
        assert_eq!(call.auth_token.as_deref(), Some("tok"));
        assert_eq!(call.body["authtoken"], "tok");
        assert_eq!(call.body["jsonrpc"], "2.0");
        assert_eq!(call.params(), &json!({"learner_id": "7", "format": 2}));
    }

    #[tokio::test]
    async fn test_login_sends_no_token_and_is_never_cached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on_ok(
            LoginCall::NAME,
            json!({"authtoken": "fresh", "children": [{"id": "1", "forename": "Alex"}]}),
        );
        let memory = Arc::new(MemoryCache::new());
        let client = client_with(&transport, &memory);

        let session = client.authenticate("parent", "secret", 2).await.unwrap();
        client.authenticate("parent", "secret", 2).await.unwrap();

        assert_eq!(session.token(), Some("fresh"));
        assert_eq!(session.children[0].forename, "Alex");
        assert_eq!(transport.calls(LoginCall::NAME), 2);
        assert!(!client.cache().exists(LoginCall::NAME));

        let call = &transport.recorded(LoginCall::NAME)[0];
        assert_eq!(call.auth_token, None);
        assert!(call.body.get("authtoken").is_none());
        assert_eq!(call.params()["establishment_id"], 2);
    }

    #[tokio::test]
    async fn test_unsuccessful_result_is_call_failed_naming_method() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(BehaviourCall::NAME, |_| {
            Ok(json!({"method": "EduLink.Behaviour", "success": false, "error": "Session expired"}))
        });
        let client = client_with(&transport, &Arc::new(MemoryCache::new()));

        let err = client.behaviour("tok", "1").await.unwrap_err();
        assert!(matches!(err, ApiError::CallFailed { .. }));
        assert_eq!(err.method(), "EduLink.Behaviour");
    }

    #[tokio::test]
    async fn test_failed_cacheable_call_is_not_cached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(SchoolDetailsCall::NAME, |_| Ok(json!({"success": false})));
        let memory = Arc::new(MemoryCache::new());
        let client = client_with(&transport, &memory);

        assert!(client.school_details(2).await.is_err());
        assert!(!client.cache().exists(SchoolDetailsCall::NAME));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(TeacherPhotosCall::NAME, |_| {
            Err(ApiError::from_status(TeacherPhotosCall::NAME, 503, "down"))
        });
        let client = client_with(&transport, &Arc::new(MemoryCache::new()));

        let err = client
            .teacher_photos("tok", vec!["E1".to_string()], 256)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_is_a_miss() {
        let transport = school_transport();
        let memory = Arc::new(MemoryCache::new());
        let client = client_with(&transport, &memory);
        client
            .cache()
            .set(SchoolDetailsCall::NAME, "garbage", Some(Duration::hours(1)))
            .unwrap();

        let details = client.school_details(2).await.unwrap();
        assert_eq!(details.establishment.name, "Roundwood Park School");
        assert_eq!(transport.calls(SchoolDetailsCall::NAME), 1);
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_fail_call() {
        let transport = school_transport();
        let client = RpcClient::new(transport.clone(), Cache::new(ReadOnlyCache));

        let details = client.school_details(2).await.unwrap();
        assert_eq!(details.establishment.name, "Roundwood Park School");
    }

    #[test]
    fn test_allow_list() {
        assert!(is_cacheable("EduLink.SchoolDetails"));
        assert!(is_cacheable("EduLink.AchievementBehaviourLookups"));
        assert!(!is_cacheable("EduLink.Login"));
        assert!(!is_cacheable("EduLink.Behaviour"));
    }
}
