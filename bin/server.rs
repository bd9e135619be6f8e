// Eyewear Inventory Dashboard - Web Server
// REST API over the same session handlers the TUI uses

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use eyewear_inventory::{
    answerer_from_config, init_tracing, shared_table, AssistantError, Config, InventoryRecord,
    InventoryTable, Interaction, Outcome, QuestionAnswerer, Secret, SessionContext, SessionError,
    SessionState, SortOption,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const MAX_SESSIONS: usize = 1024;

// ============================================================================
// Session Store
// ============================================================================

struct StoredSession {
    state: SessionState,
    last_seen: Instant,
}

/// In-memory sessions with idle expiry and a hard cap
struct SessionStore {
    sessions: HashMap<Uuid, StoredSession>,
    idle_timeout: Duration,
    capacity: usize,
}

impl SessionStore {
    fn new(idle_timeout: Duration, capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn is_expired(&self, session: &StoredSession, now: Instant) -> bool {
        now.saturating_duration_since(session.last_seen) > self.idle_timeout
    }

    /// Drop every idle session; returns how many went
    fn evict_idle(&mut self, now: Instant) -> usize {
        let before = self.sessions.len();
        let idle_timeout = self.idle_timeout;
        self.sessions
            .retain(|_, s| now.saturating_duration_since(s.last_seen) <= idle_timeout);
        before - self.sessions.len()
    }

    /// None when the store is full of live sessions
    fn create(&mut self, state: SessionState, now: Instant) -> Option<Uuid> {
        let evicted = self.evict_idle(now);
        if evicted > 0 {
            info!(evicted, "expired idle sessions");
        }
        if self.sessions.len() >= self.capacity {
            return None;
        }

        let id = Uuid::new_v4();
        self.sessions.insert(id, StoredSession { state, last_seen: now });
        Some(id)
    }

    /// Live session by id, marked as used at `now`. Expired ones are removed.
    fn touch(&mut self, id: &Uuid, now: Instant) -> Option<&mut SessionState> {
        let expired = self.is_expired(self.sessions.get(id)?, now);
        if expired {
            self.sessions.remove(id);
            info!(%id, "session expired");
            return None;
        }

        let stored = self.sessions.get_mut(id)?;
        stored.last_seen = now;
        Some(&mut stored.state)
    }

    fn remove(&mut self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    table: &'static InventoryTable,
    answerer: Option<Arc<QuestionAnswerer>>,
    secret: Arc<Secret>,
    default_brand: Arc<str>,
    sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    fn sessions(&self) -> MutexGuard<'_, SessionStore> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one interaction against a stored session
    fn dispatch(&self, id: Uuid, interaction: Interaction) -> Response {
        let mut sessions = self.sessions();
        let Some(session) = sessions.touch(&id, Instant::now()) else {
            return not_found(id);
        };

        let ctx = SessionContext {
            table: self.table,
            answerer: self.answerer.as_deref(),
        };

        match session.dispatch(&ctx, interaction) {
            Ok(outcome) => outcome_response(outcome),
            Err(e) => session_error_response(e),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    unlocked: bool,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

#[derive(Deserialize)]
struct UnlockRequest {
    password: String,
}

#[derive(Deserialize)]
struct SortRequest {
    option: SortOption,
}

#[derive(Deserialize)]
struct BrandsRequest {
    brands: BTreeSet<String>,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

fn not_found(id: Uuid) -> Response {
    failure(StatusCode::NOT_FOUND, format!("unknown session {}", id))
}

fn outcome_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Unlocked => (StatusCode::OK, Json(ApiResponse::ok("unlocked"))).into_response(),
        Outcome::CredentialRejected => failure(StatusCode::UNAUTHORIZED, "Incorrect password"),
        Outcome::Dashboard(view) => (StatusCode::OK, Json(ApiResponse::ok(*view))).into_response(),
        Outcome::Answer(answer) => {
            (StatusCode::OK, Json(ApiResponse::ok(AnswerResponse { answer }))).into_response()
        }
    }
}

fn session_error_response(e: SessionError) -> Response {
    let status = match &e {
        SessionError::Locked => StatusCode::FORBIDDEN,
        SessionError::AssistantUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Assistant(AssistantError::EmptyQuestion) => StatusCode::BAD_REQUEST,
        SessionError::Assistant(AssistantError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        SessionError::Assistant(AssistantError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        SessionError::Assistant(AssistantError::Serialization(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        SessionError::Assistant(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        warn!("request failed: {}", e);
    }
    failure(status, e.to_string())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/sessions - Start a new locked session
async fn create_session(State(state): State<AppState>) -> Response {
    let session = SessionState::new(state.secret.clone(), &state.default_brand);
    let mut sessions = state.sessions();
    let Some(id) = sessions.create(session, Instant::now()) else {
        warn!(active = sessions.len(), "session limit reached");
        return failure(StatusCode::SERVICE_UNAVAILABLE, "too many active sessions");
    };

    info!(%id, active = sessions.len(), "session created");
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(SessionResponse {
            session_id: id,
            unlocked: false,
        })),
    )
        .into_response()
}

/// DELETE /api/sessions/:id - End a session
async fn end_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    if !state.sessions().remove(&id) {
        return not_found(id);
    }

    info!(%id, "session ended");
    (StatusCode::OK, Json(ApiResponse::ok("ended"))).into_response()
}

/// POST /api/sessions/:id/unlock - Submit the password
async fn unlock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UnlockRequest>,
) -> Response {
    state.dispatch(id, Interaction::SubmitCredential(request.password))
}

/// GET /api/sessions/:id/dashboard - Charts + statistics
async fn dashboard(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    state.dispatch(id, Interaction::View)
}

/// PUT /api/sessions/:id/sort - Choose a sort option
async fn select_sort(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SortRequest>,
) -> Response {
    state.dispatch(id, Interaction::SelectSort(request.option))
}

/// PUT /api/sessions/:id/brands - Replace the brand filter
async fn select_brands(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BrandsRequest>,
) -> Response {
    state.dispatch(id, Interaction::SelectBrands(request.brands))
}

/// GET /api/sessions/:id/records - Raw data
async fn records(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions().touch(&id, Instant::now()) {
        None => not_found(id),
        Some(session) if !session.is_unlocked() => session_error_response(SessionError::Locked),
        Some(_) => {
            let records: &[InventoryRecord] = state.table.records();
            (StatusCode::OK, Json(ApiResponse::ok(records))).into_response()
        }
    }
}

/// POST /api/sessions/:id/ask - Forward a question to the text service
async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AskRequest>,
) -> Response {
    // The upstream call blocks; don't hold the session map across it
    let session = state.sessions().touch(&id, Instant::now()).cloned();
    let Some(mut session) = session else {
        return not_found(id);
    };

    let table = state.table;
    let answerer = state.answerer.clone();

    let result = tokio::task::spawn_blocking(move || {
        let ctx = SessionContext {
            table,
            answerer: answerer.as_deref(),
        };
        session.dispatch(&ctx, Interaction::Ask(request.question))
    })
    .await;

    match result {
        Ok(Ok(outcome)) => outcome_response(outcome),
        Ok(Err(e)) => session_error_response(e),
        Err(e) => {
            error!("question task failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "question task failed")
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", delete(end_session))
        .route("/sessions/:id/unlock", post(unlock))
        .route("/sessions/:id/dashboard", get(dashboard))
        .route("/sessions/:id/sort", put(select_sort))
        .route("/sessions/:id/brands", put(select_brands))
        .route("/sessions/:id/records", get(records))
        .route("/sessions/:id/ask", post(ask))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

fn main() -> Result<()> {
    init_tracing();
    info!("🌐 Eyewear Inventory Dashboard - Web Server");

    let config = Config::from_env().context("Invalid configuration")?;
    let table = shared_table(&config.csv_path)?;

    // Blocking HTTP client must be built (and dropped) outside the runtime
    let answerer = answerer_from_config(&config)?.map(Arc::new);
    if answerer.is_none() {
        warn!("LLM_API_KEY not set - /ask is disabled");
    }

    let state = AppState {
        table,
        answerer: answerer.clone(),
        secret: config.password.clone(),
        default_brand: Arc::from(config.default_brand.as_str()),
        sessions: Arc::new(Mutex::new(SessionStore::new(SESSION_IDLE_TIMEOUT, MAX_SESSIONS))),
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&config.server_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

        info!(addr = %config.server_addr, "🚀 server running");
        axum::serve(listener, router(state))
            .await
            .context("Server error")
    })?;

    drop(answerer);
    Ok(())
}
