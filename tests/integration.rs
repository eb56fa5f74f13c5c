//! Integration tests for the remoteapp UI server

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use parking_lot::Mutex;
use remoteapp::config::Config;
use remoteapp::server::UiServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

const APPLICATIONS: &str = r#"[
    {
        "mapping_id": "m0",
        "image": {
            "name": "ubuntu",
            "ui_name": "Ubuntu Desktop",
            "icon_128": "",
            "policy": {
                "allow_home": true,
                "volume_source": "/data",
                "volume_target": "/mnt/data",
                "volume_mode": "ro"
            }
        },
        "container": {"url_id": "u0", "name": "/c0"}
    },
    {
        "mapping_id": "m1",
        "image": {"name": "octave", "ui_name": "Octave", "icon_128": ""},
        "container": null
    }
]"#;

const ACCOUNTING: &str = r#"[
    {"id": "17", "user": "alice", "image_name": "ubuntu"},
    {"id": "fail", "user": "bob", "image_name": "octave"}
]"#;

// ============================================================================
// Mock backend API
// ============================================================================

/// Records every request the UI server makes to the backend
#[derive(Default)]
struct MockBackend {
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn respond(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        self.calls.lock().push(format!("{} {}", method, path));

        let (status, body) = match (method, path) {
            (&Method::GET, "/api/applications") => (StatusCode::OK, APPLICATIONS),
            (&Method::GET, "/api/accounting") => (StatusCode::OK, ACCOUNTING),
            (&Method::DELETE, "/api/accounting/fail") => (StatusCode::INTERNAL_SERVER_ERROR, "{}"),
            (&Method::DELETE, p) if p.starts_with("/api/accounting/") => (StatusCode::NO_CONTENT, ""),
            (&Method::POST, "/api/containers") => (StatusCode::ACCEPTED, "{}"),
            (&Method::DELETE, p) if p.starts_with("/api/containers/") => (StatusCode::NO_CONTENT, ""),
            _ => (StatusCode::NOT_FOUND, "{}"),
        };

        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }
}

async fn start_mock_backend() -> (Arc<MockBackend>, SocketAddr) {
    let backend = Arc::new(MockBackend::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = Arc::clone(&backend);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let state = Arc::clone(&state);
                    async move {
                        Ok::<_, Infallible>(state.respond(req.method(), req.uri().path()))
                    }
                });
                let _ = AutoBuilder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (backend, addr)
}

// ============================================================================
// UI server harness
// ============================================================================

struct TestUi {
    port: u16,
    backend: Arc<MockBackend>,
    _shutdown_tx: watch::Sender<bool>,
}

async fn start_ui(base_url: &str) -> TestUi {
    let (backend, backend_addr) = start_mock_backend().await;

    let config = Config::from_toml(&format!(
        r#"
[server]
bind = "127.0.0.1"
port = 8000
base_url = "{base_url}"

[api]
url = "http://{backend_addr}/api"
request_timeout_secs = 5
"#
    ))
    .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = Arc::new(UiServer::from_config(config, shutdown_rx).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    TestUi {
        port,
        backend,
        _shutdown_tx: shutdown_tx,
    }
}

async fn http_request(
    port: u16,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).await?;

    let request = match body {
        Some(body) => format!(
            "{} {} HTTP/1.1\r\nHost: 127.0.0.1:{}\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            method,
            path,
            port,
            body.len(),
            body
        ),
        None => format!(
            "{} {} HTTP/1.1\r\nHost: 127.0.0.1:{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            method, path, port
        ),
    };
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response)).await??;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

async fn http_get(port: u16, path: &str) -> String {
    http_request(port, "GET", path, None).await.unwrap()
}

async fn http_post(port: u16, path: &str, body: Option<&str>) -> String {
    http_request(port, "POST", path, body).await.unwrap()
}

fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or("")
}

fn response_body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

fn json_body(response: &str) -> serde_json::Value {
    serde_json::from_str(response_body(response)).unwrap()
}

// ============================================================================
// Basic endpoints
// ============================================================================

#[tokio::test]
async fn test_health_and_version() {
    let ui = start_ui("/").await;

    let response = http_get(ui.port, "/health").await;
    assert!(status_line(&response).contains("200"));
    assert_eq!(response_body(&response), "ok");

    let response = http_get(ui.port, "/version").await;
    let version = json_body(&response);
    assert_eq!(version["name"], "remoteapp");
    assert!(version["version"].is_string());
}

#[tokio::test]
async fn test_static_assets() {
    let ui = start_ui("/").await;

    let css = http_get(ui.port, "/static/style.css").await;
    assert!(status_line(&css).contains("200"));
    assert!(css.to_lowercase().contains("content-type: text/css"));

    let js = http_get(ui.port, "/static/app.js").await;
    assert!(status_line(&js).contains("200"));

    let icon = http_get(ui.port, "/static/images/generic_appicon_128.png").await;
    assert!(status_line(&icon).contains("200"));
    assert!(icon.to_lowercase().contains("content-type: image/png"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let ui = start_ui("/").await;

    let response = http_get(ui.port, "/nope").await;
    assert!(status_line(&response).contains("404"));
    assert_eq!(json_body(&response)["code"], "NOT_FOUND");
}

// ============================================================================
// Application list
// ============================================================================

#[tokio::test]
async fn test_home_renders_application_list() {
    let ui = start_ui("/").await;

    let response = http_get(ui.port, "/").await;
    assert!(status_line(&response).contains("200"));

    let html = response_body(&response);
    assert!(html.contains(r#"id="applist""#));
    assert!(html.contains(r#"<button id="bnx_0" data-index="0" class="view-button btn-success btn bnx">"#));
    assert!(html.contains(r#"<button id="bnx_1" data-index="1" class="start-button btn-primary btn bnx">"#));
    assert!(html.contains(r#"class="stop-button btn btn-danger bny" style="visibility: hidden;""#));
    assert!(html.contains("<h4>Ubuntu Desktop</h4>"));
    assert!(html.contains("<li>Workspace</li>"));
    assert!(html.contains("<li>/data &#x2192; /mnt/data (ro)</li>"));
    assert!(html.contains(r#"src="/static/images/generic_appicon_128.png""#));

    assert_eq!(ui.backend.calls(), vec!["GET /api/applications".to_string()]);
}

#[tokio::test]
async fn test_home_under_base_url() {
    let ui = start_ui("/user/alice/").await;

    let response = http_get(ui.port, "/user/alice/").await;
    assert!(status_line(&response).contains("200"));
    assert!(response_body(&response)
        .contains(r#"src="/user/alice/static/images/generic_appicon_128.png""#));

    let outside = http_get(ui.port, "/").await;
    assert!(status_line(&outside).contains("404"));
}

#[tokio::test]
async fn test_stop_click_resets_entry_to_start() {
    let ui = start_ui("/").await;
    http_get(ui.port, "/").await;

    let response = http_post(ui.port, "/applist/bny_0", None).await;
    assert!(status_line(&response).contains("200"));

    let body = json_body(&response);
    assert_eq!(body["outcome"], "stopped");
    let applist = body["applist"].as_str().unwrap();
    assert!(applist.contains(r#"class="btn bnx start-button btn-primary""#));
    assert!(applist.contains(r#"class="stop-button btn btn-danger bny" style="display: none;""#));

    assert!(ui.backend.calls().contains(&"DELETE /api/containers/u0".to_string()));
}

#[tokio::test]
async fn test_start_after_stop_requests_new_container() {
    let ui = start_ui("/").await;
    http_get(ui.port, "/").await;

    let response = http_post(ui.port, "/applist/bny_0", None).await;
    assert_eq!(json_body(&response)["outcome"], "stopped");

    let response = http_post(ui.port, "/applist/bnx_0", None).await;
    let body = json_body(&response);
    assert_eq!(body["outcome"], "started");
    assert!(body.get("location").is_none());

    assert_eq!(
        ui.backend.calls()[..3],
        [
            "GET /api/applications".to_string(),
            "DELETE /api/containers/u0".to_string(),
            "POST /api/containers".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_view_click_navigates_to_container() {
    let ui = start_ui("/").await;
    http_get(ui.port, "/").await;

    let response = http_post(ui.port, "/applist/bnx_0", None).await;
    let body = json_body(&response);
    assert_eq!(body["outcome"], "navigate");
    assert_eq!(body["location"], "/containers/u0/");
}

#[tokio::test]
async fn test_start_click_refreshes_list() {
    let ui = start_ui("/").await;
    http_get(ui.port, "/").await;

    let response = http_post(ui.port, "/applist/bnx_1", None).await;
    let body = json_body(&response);
    assert_eq!(body["outcome"], "started");

    let calls = ui.backend.calls();
    assert_eq!(
        calls,
        vec![
            "GET /api/applications".to_string(),
            "POST /api/containers".to_string(),
            "GET /api/applications".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_click_on_unknown_element() {
    let ui = start_ui("/").await;
    http_get(ui.port, "/").await;

    let response = http_post(ui.port, "/applist/bnx_9", None).await;
    assert!(status_line(&response).contains("404"));
    assert!(response.to_lowercase().contains("x-ui-error: unknown_element"));
}

// ============================================================================
// Accounting admin
// ============================================================================

#[tokio::test]
async fn test_accounting_list() {
    let ui = start_ui("/").await;

    let response = http_get(ui.port, "/admin/accounting").await;
    assert!(status_line(&response).contains("200"));
    let html = response_body(&response);
    assert!(html.contains("alice"));
    assert!(html.contains(r#"<form method="get" action="/admin/accounting/remove">"#));
    assert!(html.contains(r#"name="id" value="17""#));
}

#[tokio::test]
async fn test_remove_dialog_is_displayed() {
    let ui = start_ui("/").await;

    let response = http_get(ui.port, "/admin/accounting/remove?id=17").await;
    assert!(status_line(&response).contains("200"));
    let html = response_body(&response);
    assert!(html.contains(r#"name="id" value="17""#));
    assert!(html.contains(r#"value="remove""#));
    assert!(html.contains(r#"value="close""#));
    assert!(ui.backend.calls().is_empty());
}

#[tokio::test]
async fn test_remove_accounting_redirects() {
    let ui = start_ui("/").await;

    let response = http_post(ui.port, "/admin/accounting/remove", Some("id=17&action=remove")).await;
    assert!(status_line(&response).contains("303"));
    assert!(response.to_lowercase().contains("location: /admin/accounting"));
    assert_eq!(ui.backend.calls(), vec!["DELETE /api/accounting/17".to_string()]);
}

#[tokio::test]
async fn test_remove_accounting_failure_shows_error() {
    let ui = start_ui("/").await;

    let response = http_post(ui.port, "/admin/accounting/remove", Some("id=fail&action=remove")).await;
    assert!(status_line(&response).contains("200"));
    assert!(response_body(&response).contains("The request could not be executed successfully"));
    assert_eq!(ui.backend.calls(), vec!["DELETE /api/accounting/fail".to_string()]);
}

#[tokio::test]
async fn test_remove_without_id_closes_without_request() {
    let ui = start_ui("/").await;

    let response = http_post(ui.port, "/admin/accounting/remove", Some("id=&action=remove")).await;
    assert!(status_line(&response).contains("303"));
    assert!(ui.backend.calls().is_empty());
}

#[tokio::test]
async fn test_close_dialog_redirects() {
    let ui = start_ui("/").await;

    let response = http_post(ui.port, "/admin/accounting/remove", Some("id=17&action=close")).await;
    assert!(status_line(&response).contains("303"));
    assert!(ui.backend.calls().is_empty());
}

#[tokio::test]
async fn test_duplicate_dialog_field_is_bad_request() {
    let ui = start_ui("/").await;

    let response = http_get(ui.port, "/admin/accounting/remove?id=1&id=2").await;
    assert!(status_line(&response).contains("400"));
    assert!(ui.backend.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_dialog_action_is_bad_request() {
    let ui = start_ui("/").await;

    let response = http_post(ui.port, "/admin/accounting/remove", Some("id=17&action=explode")).await;
    assert!(status_line(&response).contains("400"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_full_config_parsing() {
    let config = Config::from_toml(
        r#"
[server]
bind = "127.0.0.1"
port = 8080
base_url = "/user/alice/"

[api]
url = "https://api.example.com/api/v1"
token = "secret"
request_timeout_secs = 10
"#,
    )
    .unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.base_url, "/user/alice/");
    assert_eq!(config.api.token.as_deref(), Some("secret"));
    assert_eq!(config.api.request_timeout(), Duration::from_secs(10));
}

#[test]
fn test_config_requires_api_url() {
    assert!(Config::from_toml("[server]\nport = 8080\n").is_err());
    assert!(Config::from_toml("[api]\nurl = \"ftp://nope\"\n").is_err());
}
