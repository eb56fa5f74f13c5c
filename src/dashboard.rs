//! Page shells and embedded static assets
//!
//! Pages are assembled from already rendered fragments. The only script is a
//! small click forwarder that posts button ids back to the server and swaps
//! in the returned `#applist` contents.

use crate::model::AccountingRecord;
use crate::util::{escape_html, url_path_join};
use crate::views::APPLIST_ID;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode};

/// Serve an HTML page
pub fn serve_html(status: StatusCode, html: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(html)))
        .expect("valid response with StatusCode enum and static header")
}

/// Serve the stylesheet
pub fn serve_css() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/css")
        .body(Full::new(Bytes::from(UI_CSS)))
        .expect("valid response with static header")
}

/// Serve the click forwarding script
pub fn serve_js() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/javascript")
        .body(Full::new(Bytes::from(UI_JS)))
        .expect("valid response with static header")
}

/// Serve the icon used for images without their own
pub fn serve_generic_icon() -> Response<Full<Bytes>> {
    let png = STANDARD.decode(GENERIC_ICON_PNG).unwrap_or_default();
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "image/png")
        .header(CACHE_CONTROL, "max-age=86400")
        .body(Full::new(Bytes::from(png)))
        .expect("valid response with static headers")
}

fn layout(base_url: &str, title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="{css}">
</head>
<body data-base-url="{base}">
    <nav class="navbar">
        <div class="nav-brand"><h1>Remote Applications</h1></div>
        <div class="nav-links">
            <a href="{home}" class="nav-link">Applications</a>
            <a href="{accounting}" class="nav-link">Accounting</a>
        </div>
    </nav>
    <main class="container">
{content}
    </main>
    <div id="toast-container"></div>
    <script src="{js}"></script>
</body>
</html>
"#,
        title = escape_html(title),
        base = escape_html(base_url),
        css = url_path_join(&[base_url, "static", "style.css"]),
        js = url_path_join(&[base_url, "static", "app.js"]),
        home = url_path_join(&[base_url, "/"]),
        accounting = url_path_join(&[base_url, "admin", "accounting"]),
    )
}

/// Home page around a rendered application list
pub fn home_page(base_url: &str, applist_html: &str) -> String {
    let content = format!(
        r#"        <div class="view-header"><h2>Applications</h2></div>
        <div id="{APPLIST_ID}" class="applist">{applist_html}</div>"#
    );
    layout(base_url, "Applications", &content)
}

/// Accounting table with a remove form per record
pub fn accounting_page(base_url: &str, records: &[AccountingRecord]) -> String {
    let remove_url = url_path_join(&[base_url, "admin", "accounting", "remove"]);

    let rows: String = if records.is_empty() {
        r#"<tr><td colspan="4" class="empty-state">No accounting records</td></tr>"#.to_string()
    } else {
        records
            .iter()
            .map(|record| {
                let id = escape_html(record.id.as_deref().unwrap_or_default());
                format!(
                    r#"<tr><td>{id}</td><td>{user}</td><td>{image}</td><td><form method="get" action="{remove_url}"><input type="hidden" name="id" value="{id}"><button type="submit" class="btn btn-danger">Remove</button></form></td></tr>"#,
                    user = escape_html(record.user.as_deref().unwrap_or_default()),
                    image = escape_html(record.image_name.as_deref().unwrap_or_default()),
                )
            })
            .collect()
    };

    let content = format!(
        r#"        <div class="view-header"><h2>Accounting</h2></div>
        <table class="table">
            <thead><tr><th>ID</th><th>User</th><th>Image</th><th></th></tr></thead>
            <tbody>{rows}</tbody>
        </table>"#
    );
    layout(base_url, "Accounting", &content)
}

/// Page showing a modal dialog over the accounting section
pub fn dialog_page(base_url: &str, dialog_html: &str) -> String {
    let content = format!(
        r#"        <div class="view-header"><h2>Accounting</h2></div>
        {dialog_html}"#
    );
    layout(base_url, "Remove Accounting", &content)
}

/// Page for backend failures while loading a view
pub fn error_page(base_url: &str, message: &str) -> String {
    let content = format!(
        r#"        <div class="empty-state">
            <p class="alert alert-danger"><strong>Error:</strong> {}</p>
        </div>"#,
        escape_html(message)
    );
    layout(base_url, "Error", &content)
}

// 1x1 transparent PNG
const GENERIC_ICON_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

const UI_CSS: &str = r##"
:root {
    --primary: #337ab7;
    --success: #5cb85c;
    --danger: #d9534f;
    --gray-100: #f3f4f6;
    --gray-300: #d1d5db;
    --gray-700: #374151;
    --gray-900: #111827;
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: var(--gray-100);
    color: var(--gray-900);
    line-height: 1.5;
}

.navbar {
    background: var(--gray-900);
    color: white;
    padding: 0 1.5rem;
    height: 56px;
    display: flex;
    align-items: center;
    justify-content: space-between;
}

.nav-brand h1 { font-size: 1.2rem; font-weight: 600; }
.nav-links { display: flex; gap: 0.5rem; }
.nav-link { color: var(--gray-300); text-decoration: none; padding: 0.5rem 1rem; }
.nav-link:hover { color: white; }

.container { max-width: 1000px; margin: 0 auto; padding: 1.5rem; }
.view-header { margin-bottom: 1.5rem; }

.row {
    display: flex;
    align-items: center;
    gap: 1rem;
    background: white;
    border-radius: 0.5rem;
    padding: 0.75rem 1rem;
    margin-bottom: 0.75rem;
    box-shadow: 0 1px 3px rgba(0,0,0,0.1);
}

.va { vertical-align: middle; }
.col-sm-2 { width: 64px; height: 64px; }
.col-sm-7 { flex: 1; }
.col-sm-7 ul { list-style: none; color: var(--gray-700); font-size: 0.875rem; }

.btn {
    display: inline-flex;
    align-items: center;
    padding: 0.45rem 0.9rem;
    border: 1px solid transparent;
    border-radius: 0.3rem;
    font-size: 0.875rem;
    cursor: pointer;
    color: white;
}

.btn-primary { background: var(--primary); }
.btn-success { background: var(--success); }
.btn-danger { background: var(--danger); }
.btn-default { background: white; color: var(--gray-700); border-color: var(--gray-300); }

.table { width: 100%; border-collapse: collapse; background: white; }
.table th, .table td { padding: 0.6rem; border-bottom: 1px solid var(--gray-300); text-align: left; }

.modal {
    position: fixed;
    inset: 0;
    background: rgba(0,0,0,0.5);
    display: none;
    align-items: center;
    justify-content: center;
}

.modal.active { display: flex; }
.modal-content { background: white; border-radius: 0.5rem; width: 100%; max-width: 420px; }
.modal-header, .modal-body, .modal-footer { padding: 1rem 1.25rem; }
.text-right { text-align: right; }

.alert { padding: 0.75rem; border-radius: 0.3rem; margin-bottom: 0.75rem; text-align: left; }
.alert-danger { background: #f2dede; color: #a94442; }

.empty-state { text-align: center; padding: 3rem; color: var(--gray-700); }

#toast-container { position: fixed; bottom: 1rem; right: 1rem; }
.toast { background: var(--danger); color: white; padding: 0.75rem 1rem; border-radius: 0.3rem; margin-top: 0.5rem; }
"##;

const UI_JS: &str = r##"
const BASE_URL = document.body.dataset.baseUrl || '/';

function urlPathJoin(...pieces) {
    const joined = pieces.map(p => p.replace(/^\/+|\/+$/g, '')).filter(p => p).join('/');
    return '/' + joined;
}

function showToast(message) {
    const container = document.getElementById('toast-container');
    const toast = document.createElement('div');
    toast.className = 'toast';
    toast.textContent = message;
    container.appendChild(toast);
    setTimeout(() => toast.remove(), 3000);
}

async function forwardClick(button) {
    const spinner = button.querySelector('i.fa-spinner');
    if (spinner) {
        spinner.style.display = 'inline-block';
    }

    try {
        const response = await fetch(urlPathJoin(BASE_URL, 'applist', button.id), { method: 'POST' });
        const data = await response.json();

        if (!response.ok) {
            showToast(data.message || 'Request failed');
            return;
        }
        if (data.outcome === 'failed') {
            showToast(data.message);
        }
        if (data.location) {
            window.location = data.location;
            return;
        }
        document.getElementById('applist').innerHTML = data.applist;
    } catch (err) {
        showToast(err.message);
    } finally {
        if (spinner) {
            spinner.style.display = 'none';
        }
    }
}

document.addEventListener('DOMContentLoaded', () => {
    const applist = document.getElementById('applist');
    if (!applist) {
        return;
    }
    applist.addEventListener('click', (e) => {
        const button = e.target.closest('button.bnx, button.bny');
        if (button) {
            e.preventDefault();
            forwardClick(button);
        }
    });
});
"##;
