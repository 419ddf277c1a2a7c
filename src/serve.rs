//! HTTP server for the interactive map
//!
//! `soundmap serve` → loads the store, starts server, opens browser.
//! The page posts every control change to `/api/view` and every map click
//! to `/api/inspect`; the server answers with ready-to-draw figures.

use crate::audio::{AudioKey, AudioStore};
use crate::catalog::Category;
use crate::error::AudioError;
use crate::inspect::{self, ClickOutcome};
use crate::model::{ClusterInfo, DataContext};
use crate::view::{self, Selection, Trigger, ViewOutput};
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self { ok: false, data: None, error: Some(message) }
    }
}

/// What `/api/catalog` returns: everything the page needs to build its controls.
#[derive(Serialize)]
pub struct CatalogInfo<'a> {
    pub categories: &'a [Category],
    pub initial: Vec<String>,
    pub select_all: bool,
    pub names: Vec<&'a str>,
    pub clusters: Vec<&'a ClusterInfo>,
}

/// Body of `POST /api/view`.
#[derive(Deserialize, Debug)]
pub struct ViewParams {
    #[serde(default = "initial_trigger")]
    pub trigger: Trigger,
    #[serde(flatten)]
    pub selection: Selection,
}

/// Query of `GET /api/view`; lists don't fit in a query string.
#[derive(Deserialize, Debug, Default)]
struct ViewQuery {
    trigger: Option<Trigger>,
    select_all: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
struct InspectQuery {
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct AudioQuery {
    group: String,
    name: String,
}

fn initial_trigger() -> Trigger {
    Trigger::Initial
}

/// A response before it is bound to a request.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self { status, content_type: "application/json", body },
            Err(e) => Self::text(500, &format!("Serialization failed: {}", e)),
        }
    }

    fn ok<T: Serialize>(data: T) -> Self {
        Self::json(200, &ApiResponse::success(data))
    }

    fn error(status: u16, message: String) -> Self {
        Self::json(status, &ApiResponse::failure(message))
    }

    fn text(status: u16, message: &str) -> Self {
        Self { status, content_type: "text/plain", body: message.as_bytes().to_vec() }
    }

    fn not_found() -> Self {
        Self::text(404, "Not found")
    }
}

/// Read-only state behind every request.
pub struct App {
    ctx: DataContext,
    store: AudioStore,
}

impl App {
    pub fn new(ctx: DataContext, store: AudioStore) -> Self {
        Self { ctx, store }
    }

    pub fn context(&self) -> &DataContext {
        &self.ctx
    }

    /// Control values before any interaction.
    fn initial_selection(&self) -> Selection {
        Selection {
            categories: Vec::new(),
            select_all: self.ctx.catalog.select_all_on_load,
            search: Vec::new(),
        }
    }

    fn catalog_info(&self) -> CatalogInfo<'_> {
        let initial = self.initial_selection().reconcile(Trigger::Initial, &self.ctx.catalog);
        CatalogInfo {
            categories: &self.ctx.catalog.categories,
            initial: initial.categories,
            select_all: initial.select_all,
            names: self.ctx.searchable_names(),
            clusters: self.ctx.clusters().collect(),
        }
    }

    fn view_from_query(&self, query: &str) -> ViewOutput {
        let q: ViewQuery = serde_urlencoded::from_str(query).unwrap_or_default();
        let mut selection = self.initial_selection();
        if let Some(all) = q.select_all {
            selection.select_all = all;
        }
        view::update(&self.ctx, selection, q.trigger.unwrap_or(Trigger::Initial))
    }

    fn inspect(&self, query: &str) -> ClickOutcome {
        let q: InspectQuery = serde_urlencoded::from_str(query).unwrap_or_default();
        inspect::click(&self.ctx, &self.store, q.name.as_deref())
    }

    fn audio(&self, query: &str) -> Reply {
        let Ok(q) = serde_urlencoded::from_str::<AudioQuery>(query) else {
            return Reply::text(400, "group and name are required");
        };
        match self.store.read(&AudioKey::new(&q.group, &q.name)) {
            Ok(bytes) => Reply { status: 200, content_type: "audio/wav", body: bytes },
            Err(AudioError::InvalidKey(key)) => Reply::text(400, &format!("Invalid audio key: {}", key)),
            Err(AudioError::Missing(_)) => Reply::not_found(),
            Err(e) => {
                log::warn!("Audio request failed: {}", e);
                Reply::text(500, &e.to_string())
            }
        }
    }

    /// Route one request. `url` includes the query string.
    pub fn dispatch(&self, method: &Method, url: &str, body: &str) -> Reply {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));

        match (method, path) {
            // Serve embedded UI
            (&Method::Get, "/") => Reply {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: UI_HTML.as_bytes().to_vec(),
            },

            (&Method::Get, "/api/catalog") => Reply::ok(self.catalog_info()),

            (&Method::Get, "/api/view") => Reply::ok(self.view_from_query(query)),

            (&Method::Post, "/api/view") => match serde_json::from_str::<ViewParams>(body) {
                Ok(params) => Reply::ok(view::update(&self.ctx, params.selection, params.trigger)),
                Err(e) => Reply::error(400, format!("Invalid view request: {}", e)),
            },

            (&Method::Get, "/api/inspect") => Reply::ok(self.inspect(query)),

            (&Method::Get, "/audio") => self.audio(query),

            // 404
            _ => Reply::not_found(),
        }
    }
}

/// Start server, open browser, serve until killed
pub fn start(port: u16, app: App, open_browser: bool) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| std::io::Error::other(e.to_string()))?;

    let url = format!("http://localhost:{}", port);
    log::info!(
        "Serving {} points from {} at {}",
        app.context().points().len(),
        app.store.root().display(),
        url
    );
    eprintln!("\n\x1b[1;32mSound Map\x1b[0m");
    eprintln!("   {}\n", url);

    if open_browser {
        if let Err(e) = open::that(&url) {
            log::warn!("Could not open browser: {}", e);
        }
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(&app, request) {
            log::error!("Request failed: {}", e);
        }
    }

    Ok(())
}

fn handle_request(app: &App, mut request: Request) -> std::io::Result<()> {
    let method = request.method().clone();
    let url = request.url().to_string();

    let mut body = String::new();
    if method == Method::Post {
        request.as_reader().read_to_string(&mut body)?;
    }

    let reply = app.dispatch(&method, &url, &body);
    log::debug!("{} {} -> {}", method, url, reply.status);

    let header = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        .map_err(|_| std::io::Error::other("invalid content type"))?;
    let response = Response::from_data(reply.body)
        .with_status_code(reply.status)
        .with_header(header);
    request.respond(response)
}
