pub mod client_ip;

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::api::upstream::UpstreamClient;
use crate::config::Config;
use crate::error::GatewayError;
use crate::models::cache::CacheStore;
use crate::services::leads_service::LeadsService;
use crate::utils::display::{DisplayFormatter, LeadsPage};
use client_ip::ClientIp;

/// Shared state handed to every handler.
pub struct AppState {
    pub leads: LeadsService,
    pub display: DisplayFormatter,
}

impl AppState {
    pub fn new(config: &Config, cache: Arc<dyn CacheStore>) -> Self {
        let api = UpstreamClient::new(&config.app_server_url, &config.token, cache.clone());
        Self {
            leads: LeadsService::new(api, cache),
            display: DisplayFormatter::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/task_get_streamer", get(task_get_streamer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub struct AppError(pub GatewayError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public) = if self.0.is_upstream() {
            (StatusCode::BAD_GATEWAY, "Upstream service unavailable\n")
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error\n")
        };
        error!(error = %self.0, status = %status, "request failed");
        (status, public).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        Self(e)
    }
}

struct RowView {
    cells: Vec<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    task_update_time: String,
    columns: Vec<String>,
    rows: Vec<RowView>,
}

impl IndexTemplate {
    fn from_page(display: &DisplayFormatter, page: LeadsPage) -> Self {
        let columns = display.columns(&page.results);
        let rows = page
            .results
            .iter()
            .map(|lead| RowView {
                cells: columns
                    .iter()
                    .map(|column| display.format_cell(lead.get(column)))
                    .collect(),
            })
            .collect();
        Self {
            task_update_time: page.task_update_time,
            columns,
            rows,
        }
    }
}

async fn index(
    State(state): State<Arc<AppState>>,
    client_ip: ClientIp,
) -> Result<Html<String>, AppError> {
    debug!("GET /: {}", client_ip.peer);
    let leads = state.leads.get_leads(&client_ip.forwarded).await?;
    let page = state.display.leads_page(&leads)?;
    let html = IndexTemplate::from_page(&state.display, page)
        .render()
        .map_err(GatewayError::from)?;
    Ok(Html(html))
}

async fn task_get_streamer(State(state): State<Arc<AppState>>, client_ip: ClientIp) -> &'static str {
    debug!("GET /task_get_streamer: {}", client_ip.peer);
    match state.leads.refresh(&client_ip.forwarded).await {
        Ok(envelope) if envelope.is_success() => info!("Leads cache refreshed"),
        Ok(envelope) => warn!("Upstream rejected leads refresh with code {}", envelope.code),
        Err(e) => warn!("Leads refresh failed: {}", e),
    }
    "ok\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::cache::MemoryCache;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> Config {
        Config {
            app_server_url: base_url,
            token: "secret-token".into(),
            host: "127.0.0.1".into(),
            port: 0,
            debug: false,
        }
    }

    fn test_app(server: &MockServer) -> Router {
        app_with_cache(server, Arc::new(MemoryCache::new()))
    }

    fn app_with_cache(server: &MockServer, cache: Arc<dyn CacheStore>) -> Router {
        router(Arc::new(AppState::new(&test_config(server.uri()), cache)))
    }

    /// Reads always miss and writes always fail.
    struct UnwritableCache;

    #[async_trait]
    impl CacheStore for UnwritableCache {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Option<std::time::Duration>) -> Result<()> {
            Err(GatewayError::Cache("write rejected".into()))
        }
    }

    async fn get(app: Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, String) {
        let mut request = Request::builder().uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn mount_streamer(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/streamer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn index_renders_formatted_times() {
        let server = MockServer::start().await;
        mount_streamer(
            &server,
            json!({"code": 200, "data": [{"user_create_time": "2024-01-02T03:04:05Z", "name": "A"}]}),
        )
        .await;

        let (status, body) = get(test_app(&server), "/", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("2024-01-02 03:04:05"));
        assert!(body.contains("2024-01-02 03:00"));
        assert!(body.contains("<td>A</td>"));
    }

    #[tokio::test]
    async fn index_escapes_upstream_html() {
        let server = MockServer::start().await;
        mount_streamer(
            &server,
            json!({"code": 200, "data": [{"user_create_time": "2024-01-02T03:04:05Z", "name": "<b>x</b>"}]}),
        )
        .await;

        let (_, body) = get(test_app(&server), "/", &[]).await;
        assert!(!body.contains("<b>x</b>"));
    }

    #[tokio::test]
    async fn index_forwards_resolved_client_ip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/streamer"))
            .and(header("forwarded-client-ip", "1.1.1.1"))
            .and(header("authorization", "secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"code": 200, "data": [{"user_create_time": "2024-01-02T03:04:05Z"}]}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let (status, _) = get(
            test_app(&server),
            "/",
            &[("x-forwarded-for", "1.1.1.1,2.2.2.2")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn index_rejected_upstream_is_bad_gateway() {
        let server = MockServer::start().await;
        mount_streamer(&server, json!({"code": 500, "data": null})).await;

        let (status, _) = get(test_app(&server), "/", &[]).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn index_empty_collection_is_server_error() {
        let server = MockServer::start().await;
        mount_streamer(&server, json!({"code": 200, "data": []})).await;

        let (status, _) = get(test_app(&server), "/", &[]).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn task_endpoint_always_ok() {
        for body in [
            json!({"code": 200, "data": []}),
            json!({"code": 500, "data": null}),
        ] {
            let server = MockServer::start().await;
            mount_streamer(&server, body).await;

            let (status, text) = get(test_app(&server), "/task_get_streamer", &[]).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(text, "ok\n");
        }
    }

    #[tokio::test]
    async fn task_endpoint_ok_when_upstream_unreachable() {
        let cache = Arc::new(MemoryCache::new());
        let state = AppState::new(&test_config("http://127.0.0.1:1".into()), cache);

        let (status, text) = get(router(Arc::new(state)), "/task_get_streamer", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "ok\n");
    }

    #[tokio::test]
    async fn index_failed_cache_write_is_server_error() {
        let server = MockServer::start().await;
        mount_streamer(
            &server,
            json!({"code": 200, "data": [{"user_create_time": "2024-01-02T03:04:05Z"}]}),
        )
        .await;

        let (status, _) = get(app_with_cache(&server, Arc::new(UnwritableCache)), "/", &[]).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn task_endpoint_ok_when_cache_write_fails() {
        let server = MockServer::start().await;
        mount_streamer(
            &server,
            json!({"code": 200, "data": [{"user_create_time": "2024-01-02T03:04:05Z"}]}),
        )
        .await;

        let app = app_with_cache(&server, Arc::new(UnwritableCache));
        let (status, text) = get(app, "/task_get_streamer", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "ok\n");
    }
}
