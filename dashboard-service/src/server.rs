//! HTTP adapter between the browser page and the view pipeline.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    pipeline::{render_view, DataContext, ViewOptions, ViewRequest, ViewResponse},
    transform::Click,
};

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
pub struct AppState {
    ctx: Arc<DataContext>,
    stylesheet: Arc<str>,
    view_defaults: ViewOptions,
}

impl AppState {
    pub fn new(ctx: Arc<DataContext>, stylesheet: String, view_defaults: ViewOptions) -> Self {
        Self {
            ctx,
            stylesheet: stylesheet.into(),
            view_defaults,
        }
    }
}

/// Query string of `/api/view`. Absent `lat`/`lng` means nothing has been
/// clicked yet; absent controls fall back to the configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Comma-separated, e.g. `2021,2022`. Empty selects no year.
    pub years: Option<String>,
    pub temperature: Option<bool>,
    pub duration: Option<bool>,
}

impl ViewQuery {
    pub fn into_request(self, defaults: &ViewOptions) -> ViewRequest {
        let click = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Click { lat, lng }),
            _ => None,
        };
        let years = match self.years {
            Some(list) => list
                .split(',')
                .filter_map(|y| y.trim().parse().ok())
                .collect(),
            None => defaults.years.clone(),
        };

        ViewRequest {
            click,
            options: ViewOptions {
                years,
                temperature: self.temperature.unwrap_or(defaults.temperature),
                duration_curve: self.duration.unwrap_or(defaults.duration_curve),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Controls {
    year_options: Vec<i32>,
    default_years: Vec<i32>,
    temperature: bool,
    duration_curve: bool,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    fingerprint: String,
    hourly_rows: usize,
    stations: usize,
    buildings: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/main.css", get(stylesheet))
        .route("/api/controls", get(controls))
        .route("/api/map", get(map))
        .route("/api/view", get(view))
        .route("/healthz", get(healthz))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard listening");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn stylesheet(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        state.stylesheet.to_string(),
    )
}

async fn controls(State(state): State<AppState>) -> Json<Controls> {
    Json(Controls {
        year_options: state.ctx.year_options().iter().copied().collect(),
        default_years: state.view_defaults.years.iter().copied().collect(),
        temperature: state.view_defaults.temperature,
        duration_curve: state.view_defaults.duration_curve,
    })
}

// The dataset never changes while the process runs, so its fingerprint is a
// valid entity tag for the map.
async fn map(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let etag = format!("\"{}\"", state.ctx.dataset().fingerprint);
    let fresh = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);
    if fresh {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    ([(header::ETAG, etag)], Json(state.ctx.map())).into_response()
}

async fn view(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Json<ViewResponse> {
    metrics::counter!("dashboard_view_requests_total").increment(1);
    let request = query.into_request(&state.view_defaults);
    Json(ViewResponse::from(render_view(&state.ctx, &request)))
}

async fn healthz(State(state): State<AppState>) -> Json<Health> {
    let ds = state.ctx.dataset();
    Json(Health {
        status: "ok",
        fingerprint: ds.fingerprint.clone(),
        hourly_rows: ds.hourly.len(),
        stations: ds.stations.len(),
        buildings: ds.buildings.len(),
    })
}
