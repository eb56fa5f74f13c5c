//! HTTP server hosting the application list and the accounting admin pages

use crate::config::Config;
use crate::dashboard;
use crate::dialog::RemoveAccountingDialog;
use crate::error::{json_error_response, UiErrorCode};
use crate::launcher::RemoteLauncher;
use crate::model::AccountingRecord;
use crate::resources::{AccountingResource, ApplicationResource, RestClient};
use crate::util::url_path_join;
use crate::views::{ApplicationListView, ButtonHandlers, ClickOutcome};
use anyhow::Result;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use parking_lot::Mutex;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// UI server
pub struct UiServer {
    config: Config,
    applications: Arc<dyn ApplicationResource>,
    accounting: Arc<dyn AccountingResource>,
    view: Mutex<ApplicationListView>,
    shutdown_rx: watch::Receiver<bool>,
}

impl UiServer {
    pub fn new(
        config: Config,
        applications: Arc<dyn ApplicationResource>,
        accounting: Arc<dyn AccountingResource>,
        handlers: Arc<dyn ButtonHandlers>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let view = ApplicationListView::new(Vec::new(), config.server.base_url.clone(), handlers);
        Self {
            config,
            applications,
            accounting,
            view: Mutex::new(view),
            shutdown_rx,
        }
    }

    /// Wire the server to the backend API named in the configuration
    pub fn from_config(config: Config, shutdown_rx: watch::Receiver<bool>) -> Result<Self> {
        let client = Arc::new(RestClient::new(
            config.api.url.clone(),
            config.api.token.clone(),
            config.api.request_timeout(),
        )?);
        let launcher = Arc::new(RemoteLauncher::new(
            client.clone(),
            config.server.base_url.clone(),
        ));

        Ok(Self::new(config, client.clone(), client, launcher, shutdown_rx))
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let addr = self.config.server.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!(addr = %addr, base_url = %self.config.server.base_url, "UI server listening");

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                if let Err(e) = server.serve_connection(stream, addr).await {
                                    debug!(addr = %addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("UI server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn serve_connection<S>(self: Arc<Self>, stream: S, _addr: SocketAddr) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| {
            let server = Arc::clone(&self);
            async move { server.handle_request(req).await }
        });

        AutoBuilder::new(TokioExecutor::new())
            .serve_connection(io, service)
            .await
            .map_err(|e| anyhow::anyhow!("Connection error: {}", e))?;

        Ok(())
    }

    async fn handle_request(
        self: Arc<Self>,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let full_path = req.uri().path().to_string();

        debug!(%method, path = %full_path, "UI request");

        let Some(path) = strip_base_url(&self.config.server.base_url, &full_path) else {
            return Ok(json_error_response(UiErrorCode::NotFound, "Not found"));
        };

        let response = match (method, path.as_str()) {
            (Method::GET, "/health") => Ok(text_response(StatusCode::OK, "ok")),
            (Method::GET, "/version") => {
                let version = serde_json::json!({
                    "name": PKG_NAME,
                    "version": VERSION,
                });
                Ok(json_response(StatusCode::OK, version.to_string()))
            }

            (Method::GET, "/static/style.css") => Ok(dashboard::serve_css()),
            (Method::GET, "/static/app.js") => Ok(dashboard::serve_js()),
            (Method::GET, "/static/images/generic_appicon_128.png") => {
                Ok(dashboard::serve_generic_icon())
            }

            (Method::GET, "/") => self.home().await,
            (Method::POST, path) if path.starts_with("/applist/") => {
                let element_id = path.strip_prefix("/applist/").unwrap_or("");
                self.click(element_id).await
            }

            (Method::GET, "/admin/accounting") => self.accounting_list().await,
            (Method::GET, "/admin/accounting/remove") => {
                match serde_urlencoded::from_str::<RemoveForm>(req.uri().query().unwrap_or("")) {
                    Ok(form) => Ok(self.remove_dialog(form.record())),
                    Err(e) => Ok(json_error_response(
                        UiErrorCode::BadRequest,
                        format!("Invalid query: {}", e),
                    )),
                }
            }
            (Method::POST, "/admin/accounting/remove") => self.submit_remove_dialog(req).await,

            _ => Ok(json_error_response(UiErrorCode::NotFound, "Not found")),
        };

        Ok(response.unwrap_or_else(|e| {
            error!(error = %e, "UI request failed");
            json_error_response(UiErrorCode::InternalError, format!("Internal error: {}", e))
        }))
    }

    fn url(&self, pieces: &[&str]) -> String {
        let mut all = vec![self.config.server.base_url.as_str()];
        all.extend_from_slice(pieces);
        url_path_join(&all)
    }

    fn backend_error_page(&self, message: &str) -> Response<Full<Bytes>> {
        dashboard::serve_html(
            StatusCode::BAD_GATEWAY,
            dashboard::error_page(&self.config.server.base_url, message),
        )
    }

    // ==================== Application list ====================

    /// Fetch a fresh snapshot and re-render the full list
    async fn refresh_applist(&self) -> Result<String, crate::error::ResourceError> {
        let entries = self.applications.list().await?;
        let mut view = self.view.lock();
        view.set_model(entries);
        view.render();
        Ok(view.document().to_html())
    }

    async fn home(&self) -> Result<Response<Full<Bytes>>> {
        match self.refresh_applist().await {
            Ok(applist) => Ok(dashboard::serve_html(
                StatusCode::OK,
                dashboard::home_page(&self.config.server.base_url, &applist),
            )),
            Err(e) => {
                warn!(error = %e, "Failed to load applications");
                Ok(self.backend_error_page("Unable to load the list of applications"))
            }
        }
    }

    async fn click(&self, element_id: &str) -> Result<Response<Full<Bytes>>> {
        // Resolve under the lock, fire without it
        let bound = self.view.lock().binding(element_id);
        let Some(bound) = bound else {
            return Ok(json_error_response(
                UiErrorCode::UnknownElement,
                format!("No handler registered for '{}'", element_id),
            ));
        };

        let (index, generation) = (bound.index, bound.generation);
        let outcome = bound.fire().await;
        debug!(element_id, index, outcome = outcome.as_str(), "Button clicked");

        let applist = match &outcome {
            ClickOutcome::Stopped => {
                let mut view = self.view.lock();
                view.mark_stopped(index, generation);
                view.document().to_html()
            }
            ClickOutcome::Started => match self.refresh_applist().await {
                Ok(applist) => applist,
                Err(e) => {
                    warn!(error = %e, "Failed to refresh applications after start");
                    self.view.lock().document().to_html()
                }
            },
            _ => self.view.lock().document().to_html(),
        };

        let mut body = serde_json::json!({
            "outcome": outcome.as_str(),
            "applist": applist,
        });
        match outcome {
            ClickOutcome::Navigate(location) => body["location"] = location.into(),
            ClickOutcome::Failed(message) => body["message"] = message.into(),
            _ => {}
        }

        Ok(json_response(StatusCode::OK, body.to_string()))
    }

    // ==================== Accounting ====================

    async fn accounting_list(&self) -> Result<Response<Full<Bytes>>> {
        match self.accounting.list().await {
            Ok(records) => Ok(dashboard::serve_html(
                StatusCode::OK,
                dashboard::accounting_page(&self.config.server.base_url, &records),
            )),
            Err(e) => {
                warn!(error = %e, "Failed to load accounting");
                Ok(self.backend_error_page("Unable to load the accounting records"))
            }
        }
    }

    fn dialog_response(&self, dialog: &RemoveAccountingDialog) -> Response<Full<Bytes>> {
        let form_action = self.url(&["admin", "accounting", "remove"]);
        dashboard::serve_html(
            StatusCode::OK,
            dashboard::dialog_page(&self.config.server.base_url, &dialog.render(&form_action)),
        )
    }

    fn remove_dialog(&self, record: AccountingRecord) -> Response<Full<Bytes>> {
        // Nobody listens to a dialog that is only being displayed
        let (events, _) = mpsc::unbounded_channel();
        let dialog = RemoveAccountingDialog::new(record, Arc::clone(&self.accounting), events);
        self.dialog_response(&dialog)
    }

    async fn submit_remove_dialog(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>> {
        let body = req.into_body().collect().await?.to_bytes();
        let form: RemoveForm = match serde_urlencoded::from_bytes(&body) {
            Ok(form) => form,
            Err(e) => {
                return Ok(json_error_response(
                    UiErrorCode::BadRequest,
                    format!("Invalid form: {}", e),
                ));
            }
        };
        let record = form.record();

        let (events, mut event_rx) = mpsc::unbounded_channel();
        let mut dialog = RemoveAccountingDialog::new(record, Arc::clone(&self.accounting), events);

        match form.action.as_deref() {
            Some("close") => dialog.close(),
            Some("remove") => dialog.remove_accounting().await,
            other => {
                return Ok(json_error_response(
                    UiErrorCode::BadRequest,
                    format!("Unknown dialog action: {:?}", other.unwrap_or("")),
                ));
            }
        }

        match event_rx.try_recv() {
            Ok(event) => {
                debug!(?event, "Remove accounting dialog finished");
                Ok(redirect(&self.url(&["admin", "accounting"])))
            }
            Err(_) => Ok(self.dialog_response(&dialog)),
        }
    }
}

// ==================== Helper Functions ====================

/// Path relative to `base_url`, always starting with `/`
fn strip_base_url(base_url: &str, path: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Fields posted by the remove-accounting dialog
#[derive(Debug, Default, Deserialize)]
struct RemoveForm {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    action: Option<String>,
}

impl RemoveForm {
    /// An empty or missing `id` field means the record has no id
    fn record(&self) -> AccountingRecord {
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => AccountingRecord::with_id(id),
            None => AccountingRecord::without_id(),
        }
    }
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .expect("valid response with StatusCode enum")
}

fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body.into()))
        .expect("valid response with StatusCode enum and static header")
}

fn redirect(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(LOCATION, location)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| json_error_response(UiErrorCode::InternalError, "invalid redirect"))
}
