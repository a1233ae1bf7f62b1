//! Companion HTTP server.
//!
//! - `/` renders a preview of every child's report: the last month of events,
//!   including ones already reported. The dedup state is never touched, so the
//!   server can run next to scheduled passes.
//! - `/EduLink.SchoolDetails` and `/EduLink.AchievementBehaviourLookups` return
//!   the raw result of those calls as JSON, served from the cache when fresh.
//!
//! Every request is logged. The two method routes are cut off after
//! `METHOD_TIMEOUT`.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderName, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api::methods::LookupsResult;
use crate::api::{LookupsCall, RpcClient};
use crate::report::{Account, HtmlRenderer, PassOptions, Renderer, ReportAggregator};

/// Deadline for the per-method routes.
pub const METHOD_TIMEOUT: Duration = Duration::from_millis(1510);

const REPORT_COUNT_HEADER: &str = "x-edulink-numberofreports";

/// Shared by every handler.
#[derive(Clone)]
pub struct WebState {
    pub client: RpcClient,
    pub account: Account,
}

impl WebState {
    pub fn new(client: RpcClient, account: Account) -> Self {
        Self { client, account }
    }
}

/// Handler failure, shown to the caller as `502 Error: ...`.
struct WebError(anyhow::Error);

impl From<anyhow::Error> for WebError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!(error = %format!("{:#}", self.0), "Request failed");
        (StatusCode::BAD_GATEWAY, format!("Error: {:#}", self.0)).into_response()
    }
}

pub fn router(state: WebState) -> Router {
    let methods = Router::new()
        .route("/EduLink.SchoolDetails", get(school_details))
        .route("/EduLink.AchievementBehaviourLookups", get(lookups))
        .layer(from_fn(time_limit));

    Router::new()
        .route("/", get(preview))
        .merge(methods)
        .layer(from_fn(log_requests))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: WebState) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Serving report preview");
    }
    axum::serve(listener, router(state))
        .await
        .context("HTTP server stopped")
}

/// Lookups, logging in first only when the cache cannot answer.
pub async fn fetch_lookups(client: &RpcClient, account: &Account) -> Result<LookupsResult> {
    if client.is_cached::<LookupsCall>() {
        return Ok(client.lookups(None).await?);
    }
    let session = client
        .authenticate(&account.username, &account.password, account.establishment_id)
        .await
        .context("Failed to log in")?;
    Ok(client.lookups(session.token()).await?)
}

async fn preview(State(state): State<WebState>) -> Result<Response, WebError> {
    let aggregator = ReportAggregator::new(
        state.client.clone(),
        state.account.clone(),
        PassOptions::preview(),
    );
    let outcome = aggregator.run_pass().await?;

    let renderer = HtmlRenderer::new();
    let mut body: String = outcome
        .reports
        .iter()
        .map(|report| renderer.render(report, &outcome.lookups).html)
        .collect();
    if outcome.reports.is_empty() {
        body.push_str("<h1>No reports available</h1>");
    }
    for failure in &outcome.failures {
        warn!(child = %failure.child.id, error = %failure.error, "Child left out of preview");
    }

    let headers = [
        (CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
        (
            HeaderName::from_static(REPORT_COUNT_HEADER),
            outcome.reports.len().to_string(),
        ),
    ];
    Ok((headers, body).into_response())
}

async fn school_details(State(state): State<WebState>) -> Result<Json<Value>, WebError> {
    let details = state
        .client
        .school_details(state.account.establishment_id)
        .await
        .context("EduLink.SchoolDetails failed")?;
    Ok(Json(to_json(&details)?))
}

async fn lookups(State(state): State<WebState>) -> Result<Json<Value>, WebError> {
    let lookups = fetch_lookups(&state.client, &state.account).await?;
    Ok(Json(to_json(&lookups)?))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to encode response")
}

async fn log_requests(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let start = Instant::now();
    info!(%path, %agent, "Received request");

    let response = next.run(request).await;

    info!(
        %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Finished request"
    );
    response
}

async fn time_limit(request: Request, next: Next) -> Response {
    match tokio::time::timeout(METHOD_TIMEOUT, next.run(request)).await {
        Ok(response) => response,
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "Timeout").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use super::*;
    use crate::api::testing::ScriptedTransport;
    use crate::api::{
        AchievementCall, ApiMethod, BehaviourCall, LearnerPhotosCall, LoginCall,
        SchoolDetailsCall,
    };
    use crate::cache::{Cache, MemoryCache};
    use crate::dedup::{EventKind, SeenIds};
    use chrono::Utc;
    use serde_json::json;

    fn transport() -> Arc<ScriptedTransport> {
        let transport = Arc::new(ScriptedTransport::new());
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        transport
            .on_ok(
                SchoolDetailsCall::NAME,
                json!({"establishment": {"name": "Roundwood Park School"}}),
            )
            .on_ok(
                LoginCall::NAME,
                json!({"authtoken": "tok", "children": [{"id": "1", "forename": "Alex", "surname": "Smith"}]}),
            )
            .on_ok(
                LookupsCall::NAME,
                json!({"behaviour_types": [], "achievement_types": [{"id": "4", "description": "Excellent effort"}]}),
            )
            .on_ok(LearnerPhotosCall::NAME, json!({"learner_photos": []}))
            .on_ok(
                BehaviourCall::NAME,
                json!({"behaviour": [
                    {"id": "B1", "date": today, "comments": "Late to class"},
                    {"id": "OLD", "date": "2001-09-01", "comments": "Ancient history"}
                ]}),
            )
            .on_ok(AchievementCall::NAME, json!({"achievement": []}));
        transport
    }

    struct Server {
        addr: SocketAddr,
        transport: Arc<ScriptedTransport>,
        cache: Cache,
    }

    impl Server {
        async fn start(transport: Arc<ScriptedTransport>) -> Self {
            let cache = Cache::new(MemoryCache::new());
            let client = RpcClient::new(transport.clone(), cache.clone());
            let account = Account {
                username: "parent".to_string(),
                password: "secret".to_string(),
                establishment_id: 2,
            };
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("local addr");
            let state = WebState::new(client, account);
            tokio::spawn(async move { serve(listener, state).await.expect("serve") });
            Self {
                addr,
                transport,
                cache,
            }
        }

        async fn get(&self, path: &str) -> reqwest::Response {
            reqwest::get(format!("http://{}{}", self.addr, path))
                .await
                .expect("request")
        }
    }

    #[tokio::test]
    async fn test_preview_shows_recent_events_without_consuming_them() {
        let server = Server::start(transport()).await;
        let mut seen = SeenIds::new();
        seen.insert("B1");
        seen.store(&server.cache, EventKind::Behaviour).unwrap();

        let response = server.get("/").await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()[REPORT_COUNT_HEADER].to_str().unwrap(),
            "1"
        );
        let body = response.text().await.unwrap();
        assert!(body.contains("Alex Smith"));
        assert!(body.contains("Late to class"));
        assert!(!body.contains("Ancient history"));

        let seen = SeenIds::load(&server.cache, EventKind::Behaviour);
        assert_eq!(seen.as_slice(), ["B1"]);
        assert!(SeenIds::load(&server.cache, EventKind::Achievement).is_empty());
    }

    #[tokio::test]
    async fn test_preview_without_children() {
        let transport = transport();
        transport.on_ok(LoginCall::NAME, json!({"authtoken": "tok", "children": []}));
        let server = Server::start(transport).await;

        let response = server.get("/").await;
        assert_eq!(
            response.headers()[REPORT_COUNT_HEADER].to_str().unwrap(),
            "0"
        );
        assert!(response
            .text()
            .await
            .unwrap()
            .contains("No reports available"));
    }

    #[tokio::test]
    async fn test_preview_reports_login_failure() {
        let transport = transport();
        transport.on(LoginCall::NAME, |_| {
            Ok(json!({"method": LoginCall::NAME, "success": false}))
        });
        let server = Server::start(transport).await;

        let response = server.get("/").await;
        assert_eq!(response.status(), 502);
        assert!(response.text().await.unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_school_details_route_uses_cache() {
        let server = Server::start(transport()).await;

        for _ in 0..2 {
            let response = server.get("/EduLink.SchoolDetails").await;
            assert_eq!(response.status(), 200);
            let body: Value = response.json().await.unwrap();
            assert_eq!(body["establishment"]["name"], "Roundwood Park School");
        }
        assert_eq!(server.transport.calls(SchoolDetailsCall::NAME), 1);
    }

    #[tokio::test]
    async fn test_lookups_route_logs_in_only_on_cache_miss() {
        let server = Server::start(transport()).await;

        for _ in 0..2 {
            let body: Value = server
                .get("/EduLink.AchievementBehaviourLookups")
                .await
                .json()
                .await
                .unwrap();
            assert_eq!(body["achievement_types"][0]["description"], "Excellent effort");
        }
        assert_eq!(server.transport.calls(LoginCall::NAME), 1);
        assert_eq!(server.transport.calls(LookupsCall::NAME), 1);
        assert_eq!(
            server.transport.recorded(LookupsCall::NAME)[0].auth_token.as_deref(),
            Some("tok")
        );
    }

    #[tokio::test]
    async fn test_time_limit_cuts_off_slow_handlers() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(from_fn(time_limit));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });

        let response = reqwest::get(format!("http://{}/slow", addr)).await.unwrap();
        assert_eq!(response.status(), 503);
        assert_eq!(response.text().await.unwrap(), "Timeout");
    }
}
