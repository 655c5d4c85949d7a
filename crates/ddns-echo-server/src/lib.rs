// # IP Echo Server
//
// The server half of the DDNS pair. A client POSTs to `/` and receives the
// address the request came from, which is what its DNS records should hold.
//
// ## Routes
//
// - `POST /`            → `{"ip": "<addr>"}`
// - `GET  /healthcheck` → `{"status": "ok"}`
//
// ## Address Resolution
//
// When `HEADER` is configured (e.g. `X-Real-IP` behind a reverse proxy) and
// the request carries it, its value is echoed. Otherwise the TCP peer address
// is used. The header is trusted as-is; only configure it behind a proxy that
// overwrites it.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ddns_core::config::ServerConfig;
use ddns_core::{Error, Result};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;

struct EchoState {
    /// Trusted header carrying the caller's address
    header: Option<HeaderName>,
}

#[derive(Debug, Serialize)]
struct IpResponse {
    ip: String,
}

/// Build the echo router
///
/// # Errors
///
/// `Error::Config` if the configured header is not a valid header name.
pub fn router(config: &ServerConfig) -> Result<Router> {
    let header = config
        .header
        .as_deref()
        .map(|name| {
            HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|_| Error::config(format!("HEADER '{name}' is not a valid header name")))
        })
        .transpose()?;

    let state = Arc::new(EchoState { header });

    Ok(Router::new()
        .route("/", post(echo_ip))
        .route("/healthcheck", get(health_check))
        .layer(middleware::from_fn(access_log))
        .with_state(state))
}

/// Bind `HOST:PORT` and serve until `shutdown` resolves
pub async fn serve<F>(config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(config)?;
    let listener = TcpListener::bind(config.bind_address()).await?;
    run(listener, app, shutdown).await
}

/// Serve `app` on an already bound listener
pub async fn run<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Echo server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("Echo server stopped");
    Ok(())
}

async fn echo_ip(
    State(state): State<Arc<EchoState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<IpResponse> {
    Json(IpResponse {
        ip: resolve_client_ip(state.header.as_ref(), &headers, remote),
    })
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Trusted header value if present and non-empty, else the peer address
fn resolve_client_ip(header: Option<&HeaderName>, headers: &HeaderMap, remote: SocketAddr) -> String {
    header
        .and_then(|name| headers.get(name))
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| remote.ip().to_string())
}

async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    info!(
        target: "access",
        "{} {} \"{}\" {} {} {:.3}ms",
        method,
        path,
        user_agent,
        peer,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::Value;

    async fn spawn(header: Option<&str>) -> SocketAddr {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            header: header.map(str::to_string),
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(&config).unwrap();
        tokio::spawn(run(listener, app, std::future::pending::<()>()));
        addr
    }

    #[tokio::test]
    async fn post_echoes_peer_address() {
        let addr = spawn(None).await;

        let body: Value = reqwest::Client::new()
            .post(format!("http://{addr}/"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body, serde_json::json!({ "ip": "127.0.0.1" }));
    }

    #[tokio::test]
    async fn trusted_header_wins_over_peer() {
        let addr = spawn(Some("X-Real-IP")).await;

        let body: Value = reqwest::Client::new()
            .post(format!("http://{addr}/"))
            .header("x-real-ip", "203.0.113.9")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["ip"], "203.0.113.9");
    }

    #[tokio::test]
    async fn missing_trusted_header_falls_back_to_peer() {
        let addr = spawn(Some("X-Real-IP")).await;

        let body: Value = reqwest::Client::new()
            .post(format!("http://{addr}/"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["ip"], "127.0.0.1");
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let addr = spawn(None).await;

        let response = reqwest::get(format!("http://{addr}/healthcheck")).await.unwrap();

        assert!(response.status().is_success());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn get_on_root_is_not_allowed() {
        let addr = spawn(None).await;

        let response = reqwest::get(format!("http://{addr}/")).await.unwrap();

        assert_eq!(response.status().as_u16(), 405);
    }

    #[tokio::test]
    async fn graceful_shutdown_returns_ok() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let app = router(&ServerConfig::default()).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(run(listener, app, async move {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();

        assert!(handle.await.unwrap().is_ok());
    }

    #[test]
    fn invalid_header_name_is_a_config_error() {
        let config = ServerConfig {
            header: Some("bad header".to_string()),
            ..ServerConfig::default()
        };
        assert!(matches!(router(&config), Err(Error::Config(_))));
    }

    #[test]
    fn blank_header_value_is_ignored() {
        let name = HeaderName::from_static("x-real-ip");
        let mut headers = HeaderMap::new();
        headers.insert(name.clone(), HeaderValue::from_static("  "));
        let remote: SocketAddr = "[2001:db8::5]:4000".parse().unwrap();

        assert_eq!(resolve_client_ip(Some(&name), &headers, remote), "2001:db8::5");
    }
}
