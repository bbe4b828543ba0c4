use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use idlespin_core::{
    GameRules, MachineCatalog, MachineConfig, PlayerSession, SessionContext, SessionRegistry,
    SpinError, ThreadRandom,
};
use idlespin_shared::{
    ApiError, ClaimAchievementRequest, ClaimResponse, ErrorBody, OfflineReport, PlayerRequest,
    PlayerResponse, PrestigeOutcome, SpinRequest, SpinResponse,
};

mod store;

use store::ChannelSink;

const MAX_PLAYER_ID_LEN: usize = 64;
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct ServerConfig {
    database_url: String,
    api_key: String,
    bind: String,
    machines_path: Option<String>,
    rules_path: Option<String>,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://idlespin.db?mode=rwc".to_string()),
            api_key: std::env::var("API_KEY").unwrap_or_else(|_| "dev-key".into()),
            bind: std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            machines_path: std::env::var("MACHINES_PATH").ok(),
            rules_path: std::env::var("RULES_PATH").ok(),
        }
    }

    /// Configuration errors surface here, at startup, never mid-spin.
    fn load_catalog(&self) -> anyhow::Result<MachineCatalog> {
        match &self.machines_path {
            Some(path) => Ok(MachineCatalog::from_json(&std::fs::read_to_string(path)?)?),
            None => Ok(MachineCatalog::builtin()),
        }
    }

    fn load_rules(&self) -> anyhow::Result<GameRules> {
        match &self.rules_path {
            Some(path) => Ok(GameRules::from_json(&std::fs::read_to_string(path)?)?),
            None => Ok(GameRules::default()),
        }
    }
}

struct AppState {
    db: SqlitePool,
    api_key: String,
    rules: GameRules,
    catalog: RwLock<MachineCatalog>,
    sessions: SessionRegistry,
    sink: ChannelSink,
}

impl AppState {
    fn machine(&self, id: &str) -> Option<MachineConfig> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

struct ApiFailure(ApiError);

impl<E: Into<ApiError>> From<E> for ApiFailure {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResponse<T> = Result<Json<T>, ApiFailure>;

/// Loads the player into the registry on first sight: stored state if any,
/// otherwise a fresh player.
async fn ensure_session(state: &AppState, player_id: &str) -> Result<(), ApiFailure> {
    if player_id.is_empty() || player_id.len() > MAX_PLAYER_ID_LEN {
        return Err(ApiError::Invalid("player_id must be 1-64 characters".into()).into());
    }
    if state.sessions.contains(player_id) {
        return Ok(());
    }
    let stored = store::load_player(&state.db, player_id).await.map_err(|e| {
        error!("loading player {player_id}: {e:#}");
        ApiError::Internal
    })?;
    let session_state = match stored {
        Some(s) => s,
        None => PlayerSession::fresh(player_id, &state.rules).into_state(),
    };
    state.sessions.insert_if_absent(player_id, session_state);
    Ok(())
}

async fn route_machines(State(state): State<Arc<AppState>>) -> Json<MachineCatalog> {
    Json(
        state
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone(),
    )
}

async fn route_player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> ApiResponse<PlayerResponse> {
    ensure_session(&state, &player_id).await?;
    let resp = state.sessions.with_session(&player_id, |session| PlayerResponse {
        player_id: player_id.clone(),
        state: session.state().clone(),
        prestige: session.prestige_state(&state.rules),
    })?;
    Ok(Json(resp))
}

async fn route_spin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpinRequest>,
) -> ApiResponse<SpinResponse> {
    ensure_session(&state, &req.player_id).await?;
    let machine = state
        .machine(&req.machine_id)
        .ok_or_else(|| SpinError::UnknownMachine(req.machine_id.clone()))?;
    let report = state.sessions.with_session(&req.player_id, |session| {
        let mut rng = ThreadRandom::from_entropy();
        let mut ctx = SessionContext {
            rng: &mut rng,
            sink: &state.sink,
            now: Utc::now(),
        };
        session.spin(&machine, req.bet, &state.rules, &mut ctx)
    })??;
    Ok(Json(report))
}

async fn route_claim_achievement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClaimAchievementRequest>,
) -> ApiResponse<ClaimResponse> {
    ensure_session(&state, &req.player_id).await?;
    let resp = state.sessions.with_session(&req.player_id, |session| {
        let mut rng = ThreadRandom::from_entropy();
        let mut ctx = SessionContext {
            rng: &mut rng,
            sink: &state.sink,
            now: Utc::now(),
        };
        session
            .claim_achievement(&req.achievement_id, &mut ctx)
            .map(|reward| ClaimResponse {
                reward,
                coins: session.state().coins,
            })
    })??;
    Ok(Json(resp))
}

async fn route_claim_daily(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlayerRequest>,
) -> ApiResponse<ClaimResponse> {
    ensure_session(&state, &req.player_id).await?;
    let resp = state.sessions.with_session(&req.player_id, |session| {
        let mut rng = ThreadRandom::from_entropy();
        let mut ctx = SessionContext {
            rng: &mut rng,
            sink: &state.sink,
            now: Utc::now(),
        };
        session.claim_daily(&mut ctx).map(|reward| ClaimResponse {
            reward,
            coins: session.state().coins,
        })
    })??;
    Ok(Json(resp))
}

async fn route_prestige(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlayerRequest>,
) -> ApiResponse<PrestigeOutcome> {
    ensure_session(&state, &req.player_id).await?;
    let outcome = state.sessions.with_session(&req.player_id, |session| {
        let mut rng = ThreadRandom::from_entropy();
        let mut ctx = SessionContext {
            rng: &mut rng,
            sink: &state.sink,
            now: Utc::now(),
        };
        session.prestige(&state.rules, &mut ctx)
    })??;
    info!(player = %req.player_id, points = outcome.total_points, "prestiged");
    Ok(Json(outcome))
}

async fn route_offline(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlayerRequest>,
) -> ApiResponse<OfflineReport> {
    ensure_session(&state, &req.player_id).await?;
    let report = state.sessions.with_session(&req.player_id, |session| {
        let mut rng = ThreadRandom::from_entropy();
        let mut ctx = SessionContext {
            rng: &mut rng,
            sink: &state.sink,
            now: Utc::now(),
        };
        session.collect_offline(&state.rules, &mut ctx)
    })?;
    Ok(Json(report))
}

async fn route_admin_set_machines(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): TypedHeader<
        axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
    >,
    Json(req): Json<Vec<MachineConfig>>,
) -> Result<StatusCode, ApiFailure> {
    if bearer.token() != state.api_key {
        return Err(ApiError::Unauthorized.into());
    }
    let catalog = MachineCatalog::new(req)?;
    let count = catalog.machines().len();
    *state.catalog.write().unwrap_or_else(PoisonError::into_inner) = catalog;
    info!(machines = count, "machine catalog replaced");
    Ok(StatusCode::NO_CONTENT)
}

/// Evicted players reload from the store on their next request.
fn spawn_session_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            let evicted = state.sessions.evict_idle(SESSION_IDLE_TIMEOUT);
            if evicted > 0 {
                info!(evicted, live = state.sessions.len(), "idle sessions evicted");
            }
        }
    });
}

async fn init_db(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/machines", get(route_machines))
        .route("/player/:id", get(route_player))
        .route("/spin", post(route_spin))
        .route("/claim/achievement", post(route_claim_achievement))
        .route("/claim/daily", post(route_claim_daily))
        .route("/prestige", post(route_prestige))
        .route("/offline", post(route_offline))
        .route("/admin/machines", post(route_admin_set_machines))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let catalog = config.load_catalog()?;
    let rules = config.load_rules()?;

    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    init_db(&db).await?;

    let state = Arc::new(AppState {
        sink: ChannelSink::spawn(db.clone()),
        db,
        api_key: config.api_key,
        rules,
        catalog: RwLock::new(catalog),
        sessions: SessionRegistry::new(),
    });

    spawn_session_sweeper(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
