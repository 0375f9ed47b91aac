use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::TableApi;
use crate::auth::TokenStore;
use crate::axis_store::Selection;
use crate::config::Config;
use crate::downloader;
use crate::error::Error;
use crate::graph::{self, GraphOptions};
use crate::http::HttpApi;
use crate::model::{AxisConfig, SemiAxis, TableData};
use crate::projector::PlotView;
use crate::saving;
use crate::workbench::Workbench;

pub struct AppState {
    bench: Mutex<Workbench<HttpApi>>,
    /// Wakes the flush task whenever the debounce deadline moves.
    flush: Notify,
}

type Shared = Arc<AppState>;

#[derive(Deserialize)]
struct SlotUpdate {
    slot: String,
    column: String,
}

#[derive(Deserialize)]
struct PngQuery {
    full: Option<bool>,
}

#[derive(Deserialize)]
struct IndexQuery {
    tab: Option<String>,
}

#[derive(Serialize)]
struct AxesResponse {
    configs: Vec<AxisConfig>,
    selected: String,
}

#[derive(Serialize)]
struct PlotResponse {
    #[serde(flatten)]
    view: PlotView,
    dirty: bool,
    diagnostics: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error returned by handlers: a status plus the message shown to the user.
struct AppError(StatusCode, String);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::ImportFormat(_) | Error::ImportParse(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::UnknownAxis(_) => StatusCode::NOT_FOUND,
            Error::Server { .. } | Error::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError(status, err.user_message())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

/// Runs `f` against the workbench on the blocking pool; every backend call is
/// a synchronous HTTP round trip.
async fn with_bench<T, F>(state: &Shared, f: F) -> Result<T, AppError>
where
    F: FnOnce(&mut Workbench<HttpApi>) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        let mut bench = state
            .bench
            .lock()
            .map_err(|_| AppError(StatusCode::INTERNAL_SERVER_ERROR, "state poisoned".into()))?;
        f(&mut bench).map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
}

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/refresh", post(refresh))
        .route("/api/table", get(get_table))
        .route("/api/axes", get(get_axes))
        .route("/api/axes/:id/slot", put(queue_slot))
        .route("/api/plot/:id", get(get_plot))
        .route("/plot/:id/svg", get(plot_svg))
        .route("/plot/:id/png", get(plot_png))
        .route("/export", get(export_snapshot))
        .route("/table.csv", get(table_csv))
        .route("/table.xlsx", get(table_xlsx))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let token = TokenStore::new(config.token_path.clone()).load();
    let api = HttpApi::new(&config, token);
    let addr = config.viewer_addr.clone();

    let bench = tokio::task::spawn_blocking(move || {
        let mut bench = Workbench::new(config, api);
        if let Err(e) = bench.refresh_all() {
            warn!("initial load failed: {}", e);
        }
        bench
    })
    .await?;

    let app_state = Arc::new(AppState {
        bench: Mutex::new(bench),
        flush: Notify::new(),
    });
    tokio::spawn(flush_loop(app_state.clone()));

    let app = router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// None when the lock is poisoned.
fn current_deadline(state: &AppState) -> Option<Option<Instant>> {
    state.bench.lock().ok().map(|bench| bench.flush_deadline())
}

/// Owns the single-shot debounce timer. Sleeps until the current deadline,
/// or until a new change moves it, then flushes everything queued.
async fn flush_loop(state: Shared) {
    loop {
        let Some(deadline) = current_deadline(&state) else {
            error!("workbench lock poisoned; stopping flush task");
            return;
        };
        let Some(deadline) = deadline else {
            state.flush.notified().await;
            continue;
        };
        tokio::select! {
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                match with_bench(&state, |bench| bench.flush_due(Instant::now())).await {
                    Ok(0) => {}
                    Ok(n) => info!("saved {} plot change(s)", n),
                    Err(AppError(_, message)) => error!("Error saving plot changes: {}", message),
                }
            }
            _ = state.flush.notified() => {}
        }
    }
}

async fn refresh(State(state): State<Shared>) -> Result<impl IntoResponse, AppError> {
    with_bench(&state, |bench| bench.refresh_all()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_table(State(state): State<Shared>) -> Result<Json<TableData>, AppError> {
    let table = with_bench(&state, |bench| Ok(bench.table().clone())).await?;
    Ok(Json(table))
}

async fn get_axes(State(state): State<Shared>) -> Result<Json<AxesResponse>, AppError> {
    let response = with_bench(&state, |bench| {
        Ok(AxesResponse {
            configs: bench.axes().configs().to_vec(),
            selected: bench.axes().selection().key(),
        })
    })
    .await?;
    Ok(Json(response))
}

fn plot_response<A: TableApi>(bench: &Workbench<A>, id: i64) -> crate::error::Result<PlotResponse> {
    let view = bench.plot(id)?;
    let diagnostics = view.diagnostics();
    Ok(PlotResponse {
        dirty: bench.is_dirty(id),
        diagnostics,
        view,
    })
}

async fn get_plot(
    Path(id): Path<i64>,
    State(state): State<Shared>,
) -> Result<Json<PlotResponse>, AppError> {
    let response = with_bench(&state, move |bench| plot_response(bench, id)).await?;
    Ok(Json(response))
}

/// Inline semi-axis change: previewed immediately, saved by the flush task
/// once no further change arrives for the quiet period.
async fn queue_slot(
    Path(id): Path<i64>,
    State(state): State<Shared>,
    Json(payload): Json<SlotUpdate>,
) -> Result<Json<PlotResponse>, AppError> {
    let slot: SemiAxis = payload
        .slot
        .parse()
        .map_err(|e: String| AppError(StatusCode::BAD_REQUEST, e))?;
    let response = with_bench(&state, move |bench| {
        bench.queue_axis_slot(id, slot, &payload.column, Instant::now())?;
        plot_response(bench, id)
    })
    .await?;
    state.flush.notify_one();
    Ok(Json(response))
}

async fn plot_svg(Path(id): Path<i64>, State(state): State<Shared>) -> Result<Response, AppError> {
    let svg = with_bench(&state, move |bench| {
        graph::render_svg(&bench.plot(id)?, &GraphOptions::default())
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn plot_png(
    Path(id): Path<i64>,
    Query(params): Query<PngQuery>,
    State(state): State<Shared>,
) -> Result<Response, AppError> {
    let options = if params.full.unwrap_or(false) {
        GraphOptions::magnified()
    } else {
        GraphOptions::default()
    };
    let png = with_bench(&state, move |bench| graph::render_png(&bench.plot(id)?, &options)).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

fn attachment(content_type: &str, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn export_snapshot(State(state): State<Shared>) -> Result<Response, AppError> {
    let snapshot = with_bench(&state, |bench| bench.export_snapshot()).await?;
    let body = serde_json::to_vec_pretty(&snapshot).map_err(Error::from)?;
    Ok(attachment(
        "application/json",
        &saving::default_export_name(),
        body,
    ))
}

async fn table_csv(State(state): State<Shared>) -> Result<Response, AppError> {
    let csv = with_bench(&state, |bench| Ok(downloader::to_csv(bench.table()))).await?;
    Ok(attachment("text/csv", "table.csv", csv.into_bytes()))
}

async fn table_xlsx(State(state): State<Shared>) -> Result<Response, AppError> {
    let xlsx = with_bench(&state, |bench| downloader::to_xlsx(bench.table())).await?;
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "table.xlsx",
        xlsx,
    ))
}

async fn serve_index(
    Query(params): Query<IndexQuery>,
    State(state): State<Shared>,
) -> Result<Html<String>, AppError> {
    let page = with_bench(&state, move |bench| {
        if let Some(selection) = params.tab.as_deref().and_then(Selection::from_key) {
            bench.select(selection)?;
        }
        Ok(render_index(bench))
    })
    .await?;
    Ok(Html(page))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const SCRIPT: &str = r#"
function setSlot(id, slot, column) {
  fetch(`/api/axes/${id}/slot`, {
    method: 'PUT',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({slot, column}),
  }).then(r => r.json()).then(body => {
    if (body.error) { alert(body.error); return; }
    const img = document.getElementById(`plot-${id}`);
    img.src = `/plot/${id}/svg?t=${Date.now()}`;
  });
}
"#;

fn render_index<A: TableApi>(bench: &Workbench<A>) -> String {
    let table = bench.table();
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Cartesian plots</title>\
         <script>{SCRIPT}</script></head><body><h1>{}</h1>",
        escape_html(&bench.greeting())
    );
    if let Some(message) = bench.table_store().last_error() {
        let _ = write!(html, "<p class=\"error\">{}</p>", escape_html(message));
    }

    html.push_str("<table border=\"1\"><tr><th>name</th>");
    for d in &table.dimensions {
        let _ = write!(html, "<th>{}</th>", escape_html(&d.name));
    }
    html.push_str("<th>annotation</th></tr>");
    for row in &table.data_points {
        let _ = write!(html, "<tr><td>{}</td>", escape_html(&row.name));
        for d in &table.dimensions {
            let _ = write!(html, "<td>{}</td>", row.display_value(&d.name));
        }
        let _ = write!(html, "<td>{}</td></tr>", escape_html(&row.annotation));
    }
    html.push_str("</table><p><a href=\"/table.csv\">CSV</a> | <a href=\"/table.xlsx\">XLSX</a> | <a href=\"/export\">Export</a></p>");

    let configs = bench.axes().configs();
    if configs.is_empty() {
        html.push_str("<p>No plots yet. Create one from the command line client.</p>");
    }
    html.push_str("<nav>");
    for axis in configs {
        let key = Selection::Axis(axis.id).key();
        let _ = write!(html, "<a href=\"/?tab={}\">{}</a> ", key, escape_html(&axis.name));
    }
    html.push_str("</nav>");

    if let Some(view) = bench.selected_plot() {
        let _ = write!(
            html,
            "<section><h2>{}{}</h2><a href=\"/plot/{id}/png?full=true\">\
             <img id=\"plot-{id}\" src=\"/plot/{id}/svg\"></a><div>",
            escape_html(&view.name),
            if bench.is_dirty(view.id) { " *" } else { "" },
            id = view.id,
        );
        for axis in SemiAxis::ALL {
            let current = &view.settings.slot(axis).name;
            let _ = write!(
                html,
                "<label>{axis} <select onchange=\"setSlot({}, '{axis}', this.value)\">",
                view.id
            );
            for d in &table.dimensions {
                let selected = if &d.name == current { " selected" } else { "" };
                let name = escape_html(&d.name);
                let _ = write!(html, "<option value=\"{name}\"{selected}>{name}</option>");
            }
            html.push_str("</select></label> ");
        }
        html.push_str("</div>");
        let diagnostics = view.diagnostics();
        if !diagnostics.is_empty() {
            html.push_str("<h3>Invalid points</h3><ul>");
            for line in diagnostics {
                let _ = write!(html, "<li>{}</li>", escape_html(&line));
            }
            html.push_str("</ul>");
        }
        html.push_str("</section>");
    }
    html.push_str("</body></html>");
    html
}
