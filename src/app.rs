use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

use crate::charts::{self, ChartKind};
use crate::config::DashboardConfig;
use crate::dashboard::build_dashboard;
use crate::downloader::{self, ExportFormat};
use crate::error::{DashboardError, Result};
use crate::loader::load_workbook_bytes;
use crate::report::ReportRenderer;
use crate::table::Workbook;

/// Cookie holding the session id
pub const SESSION_COOKIE: &str = "session";
/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "workbook";

/// An uploaded workbook and the time it stops being served
struct Session {
    workbook: Arc<Workbook>,
    expires_at: Instant,
}

/// Shared server state: configuration, templates and one workbook per session
pub struct AppState {
    config: DashboardConfig,
    renderer: ReportRenderer,
    sessions: RwLock<HashMap<String, Session>>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        Ok(AppState {
            config,
            renderer: ReportRenderer::new()?,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.session_ttl_secs)
    }

    /// Workbook of the session in `jar`, extending its lifetime
    ///
    /// The lock is released on return.
    fn workbook(&self, jar: &CookieJar) -> Option<Arc<Workbook>> {
        let cookie = jar.get(SESSION_COOKIE)?;
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(cookie.value()).filter(|s| s.expires_at > now)?;
        session.expires_at = now + self.ttl();
        Some(session.workbook.clone())
    }

    /// Replaces the session's workbook
    ///
    /// Expired sessions are dropped first; when the store is still full the
    /// session closest to expiry makes room.
    fn store(&self, id: String, workbook: Workbook) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, s| s.expires_at > now);

        while !sessions.contains_key(&id) && sessions.len() >= self.config.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.expires_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            log::info!("Session {}: evicted", oldest);
            sessions.remove(&oldest);
        }

        sessions.insert(
            id,
            Session {
                workbook: Arc::new(workbook),
                expires_at: now + self.ttl(),
            },
        );
    }

    /// Number of workbooks currently held
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Error response: status code and plain-text message
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl From<DashboardError> for AppError {
    fn from(e: DashboardError) -> Self {
        let status = if e.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            log::error!("Request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        AppError {
            status,
            message: e.to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

type HandlerResult<T> = std::result::Result<T, AppError>;

#[derive(Deserialize)]
struct SheetQuery {
    sheet: Option<String>,
}

#[derive(Deserialize)]
struct ExportQuery {
    sheet: Option<String>,
    format: Option<String>,
}

#[derive(Serialize)]
struct ChartsResponse {
    sheets: Vec<String>,
    selected: String,
    charts: Vec<ChartKind>,
}

/// Routes of the dashboard
pub fn router(state: Arc<AppState>) -> Router {
    let limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/api/charts", get(charts_api))
        .route("/export", get(export_sheet))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .with_state(state)
}

pub async fn run(config: DashboardConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn index(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<SheetQuery>,
) -> HandlerResult<Html<String>> {
    let Some(workbook) = state.workbook(&jar) else {
        return Ok(Html(state.renderer.render_upload(None)?));
    };
    let dashboard = build_dashboard(&workbook, params.sheet.as_deref(), &state.config)?;
    Ok(Html(state.renderer.render_dashboard(&dashboard)?))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> HandlerResult<Response> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            upload = Some((file_name, bytes.to_vec()));
        }
    }

    let Some((file_name, bytes)) = upload.filter(|(_, bytes)| !bytes.is_empty()) else {
        let page = state.renderer.render_upload(Some("No file data received"))?;
        return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
    };

    let workbook = match load_workbook_bytes(&file_name, bytes) {
        Ok(workbook) => workbook,
        Err(e) if e.is_input_error() => {
            log::warn!("Rejected upload {:?}: {}", file_name, e);
            let message = format!("Failed to load {}: {}", file_name, e);
            let page = state.renderer.render_upload(Some(&message))?;
            return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let id = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    log::info!(
        "Session {}: stored {} ({} sheet(s))",
        id,
        file_name,
        workbook.sheets().len()
    );
    state.store(id.clone(), workbook);

    let cookie = Cookie::build((SESSION_COOKIE, id)).path("/").http_only(true);
    Ok((jar.add(cookie), Redirect::to("/")).into_response())
}

/// Sheet named in the query, or the first one
fn selected_sheet(workbook: &Workbook, sheet: Option<String>) -> Result<String> {
    match sheet {
        Some(name) if workbook.sheet(&name).is_some() => Ok(name),
        Some(name) => Err(DashboardError::SheetNotFound(name)),
        None => workbook
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::SheetNotFound("(workbook has no sheets)".into())),
    }
}

fn no_workbook() -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        message: "No workbook uploaded".to_string(),
    }
}

async fn charts_api(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<SheetQuery>,
) -> HandlerResult<Json<ChartsResponse>> {
    let workbook = state.workbook(&jar).ok_or_else(no_workbook)?;
    let selected = selected_sheet(&workbook, params.sheet)?;
    let charts = charts::classify(&workbook, &selected, &state.config);

    Ok(Json(ChartsResponse {
        sheets: workbook.sheet_names(),
        selected,
        charts,
    }))
}

async fn export_sheet(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<ExportQuery>,
) -> HandlerResult<Response> {
    let workbook = state.workbook(&jar).ok_or_else(no_workbook)?;
    let format: ExportFormat = params.format.as_deref().unwrap_or("csv").parse()?;
    let selected = selected_sheet(&workbook, params.sheet)?;
    let bytes = downloader::export(&workbook, &selected, format, &state.config)?;

    let stem: String = selected
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{}_long.{}\"",
        stem,
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
