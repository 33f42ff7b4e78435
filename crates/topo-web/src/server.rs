//! HTTP server for topology reports

use crate::page::render_page;
use crate::{Result, ServerError};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use topo_core::ReportGenerator;
use tracing::{info, warn};

/// Server options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name or IP address to bind
    pub host: String,

    pub port: u16,

    /// Auto-refresh interval of the HTML page in seconds; 0 disables it
    pub refresh_secs: u32,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            refresh_secs: 5,
        }
    }

    /// `host:port` as configured, before resolution
    pub fn bind_target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_refresh(mut self, refresh_secs: u32) -> Self {
        self.refresh_secs = refresh_secs;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 5000)
    }
}

#[derive(Clone)]
struct AppState {
    generator: Arc<ReportGenerator>,
    refresh_secs: u32,
}

/// Serves the topology report over HTTP
#[derive(Debug)]
pub struct TopologyServer {
    config: ServerConfig,
    generator: Arc<ReportGenerator>,
    server_handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl TopologyServer {
    pub fn new(config: ServerConfig, generator: Arc<ReportGenerator>) -> Self {
        Self {
            config,
            generator,
            server_handle: None,
            local_addr: None,
        }
    }

    /// Build the router without binding
    pub fn router(&self) -> Router {
        create_app(AppState {
            generator: self.generator.clone(),
            refresh_secs: self.config.refresh_secs,
        })
    }

    /// Bind and serve in a background task, returning the bound address
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.server_handle.is_some() {
            return Err(ServerError::AlreadyStarted);
        }

        let listener = self.bind().await?;
        let local_addr = listener.local_addr()?;
        let app = self.router();

        info!("Starting topology server on {}", local_addr);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Topology server error: {}", e);
            }
        });

        self.server_handle = Some(handle);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Stop a server started with [`start`](Self::start)
    pub async fn stop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
            let _ = handle.await;
            info!("Topology server stopped");
        }
        self.local_addr = None;
    }

    /// Bind and serve in the foreground until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let listener = self.bind().await?;
        info!("Serving topology on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Topology server shut down");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Page URL of the running server
    pub fn url(&self) -> String {
        match self.local_addr {
            Some(addr) => format!("http://{}/", addr),
            None => format!("http://{}/", self.config.bind_target()),
        }
    }

    async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.bind_target(),
                source,
            })
    }
}

impl Drop for TopologyServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/api/gpu_data", get(data_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Handler for `/`
async fn page_handler(State(state): State<AppState>) -> Response {
    let text = match state.generator.generate().await {
        Ok(report) => report.render_text(),
        Err(e) => Err(e),
    };

    match text {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            render_page(&text, state.refresh_secs),
        )
            .into_response(),
        Err(e) => generation_failed(e),
    }
}

/// Handler for `/api/gpu_data`
async fn data_handler(State(state): State<AppState>) -> Response {
    let document = match state.generator.generate().await {
        Ok(report) => report.to_json_pretty(),
        Err(e) => Err(e),
    };

    match document {
        Ok(document) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            document,
        )
            .into_response(),
        Err(e) => generation_failed(e),
    }
}

/// Handler for `/health`
async fn health_handler() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
        .into_response()
}

fn generation_failed(err: topo_core::Error) -> Response {
    warn!("Report generation failed ({}): {}", err.category(), err);
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use topo_core::{DeviceDescriptor, GeneratorConfig, StaticDeviceTelemetry};
    use tower::ServiceExt;

    fn config_file(doc: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", doc).unwrap();
        file
    }

    fn generator(path: &std::path::Path, telemetry: StaticDeviceTelemetry) -> Arc<ReportGenerator> {
        Arc::new(ReportGenerator::new(GeneratorConfig::new(path, 4), Arc::new(telemetry)))
    }

    fn fleet() -> StaticDeviceTelemetry {
        StaticDeviceTelemetry::new(vec![
            DeviceDescriptor::new(0, "A100").with_memory(1024, 40960),
            DeviceDescriptor::new(1, "A100").with_memory(2048, 40960),
        ])
    }

    fn server(generator: Arc<ReportGenerator>, refresh: u32) -> TopologyServer {
        let config = ServerConfig::new("127.0.0.1", 0).with_refresh(refresh);
        TopologyServer::new(config, generator)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_page_route() {
        let file = config_file("pipe_parallel_size: 2\n");
        let app = server(generator(file.path(), fleet()), 5).router();

        let (status, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<meta http-equiv=\"refresh\" content=\"5\">"));
        assert!(body.contains("<pre>Parallel Settings:"));
        assert!(body.contains("Data Parallel Group 1:"));
        assert!(body.contains("GPU 0 (A100) | Mem: 1024MB/40960MB"));
        assert!(body.contains("GPU 3 (Placeholder)"));
    }

    #[tokio::test]
    async fn test_page_without_refresh() {
        let file = config_file("");
        let app = server(generator(file.path(), fleet()), 0).router();

        let (status, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("http-equiv"));
    }

    #[tokio::test]
    async fn test_data_route() {
        let file = config_file("model_parallel_size: 2\n");
        let app = server(generator(file.path(), fleet()), 5).router();

        let (status, body) = get(app, "/api/gpu_data").await;
        assert_eq!(status, StatusCode::OK);
        let document: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(document["parallel_settings"]["data_parallel_size"], 2);
        assert_eq!(document["topology"].as_array().unwrap().len(), 2);
        assert_eq!(document["configuration"]["model_parallel_size"], 2);
    }

    #[tokio::test]
    async fn test_health_route() {
        let file = config_file("");
        let app = server(generator(file.path(), fleet()), 5).router();

        let (status, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(health["status"], "healthy");
        assert!(health["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_generation_failure_is_500() {
        let file = config_file("");
        let app = server(generator(file.path(), StaticDeviceTelemetry::failing("NVML not found")), 5).router();

        let (status, body) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("NVML not found"));
        assert!(!body.contains("<pre>"));

        let (status, _) = get(app, "/api/gpu_data").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_config_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = server(generator(&dir.path().join("missing.yml"), fleet()), 5).router();

        let (status, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("missing.yml"));
    }

    #[tokio::test]
    async fn test_server_start_stop() {
        let file = config_file("");
        let mut server = server(generator(file.path(), fleet()), 5);
        assert!(!server.is_running());

        let addr = server.start().await.unwrap();
        assert!(server.is_running());
        assert_ne!(addr.port(), 0);
        assert_eq!(server.url(), format!("http://{}/", addr));
        assert!(matches!(server.start().await, Err(ServerError::AlreadyStarted)));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("healthy"));

        server.stop().await;
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn test_binds_host_name() {
        let file = config_file("");
        let config = ServerConfig::new("localhost", 0);
        assert_eq!(config.bind_target(), "localhost:0");

        let mut server = TopologyServer::new(config, generator(file.path(), fleet()));
        let addr = server.start().await.unwrap();
        assert!(addr.ip().is_loopback());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_bind_error() {
        let file = config_file("");
        let config = ServerConfig::new("no-such-host.invalid", 0);
        let mut server = TopologyServer::new(config, generator(file.path(), fleet()));

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { ref addr, .. } if addr == "no-such-host.invalid:0"));
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_independent_servers() {
        let file = config_file("");
        let mut first = server(generator(file.path(), fleet()), 5);
        let mut second = server(generator(file.path(), fleet()), 5);

        let a = first.start().await.unwrap();
        let b = second.start().await.unwrap();
        assert_ne!(a, b);

        first.stop().await;
        second.stop().await;
    }
}
