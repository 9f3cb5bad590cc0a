//! HTTP route handlers for the turn API.

use axum::Router;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use serde::Serialize;
use turn_runner::core::reconcile::{CharacterState, WorldSnapshot};
use turn_runner::io::run_state::RunState;
use turn_runner::turn::{TurnRequest, TurnResult};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/run-state", get(get_run_state))
        .route("/turns", post(run_turns))
        .route("/reset", post(reset))
        .route("/world", get(get_world))
        .route("/characters/{id}", get(get_character))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct RunStateResponse {
    state: RunState,
}

/// GET /api/run-state
async fn get_run_state(State(state): State<AppState>) -> Json<RunStateResponse> {
    Json(RunStateResponse {
        state: state.orchestrator.run_state(),
    })
}

/// POST /api/turns - run the simulation and return the parsed result.
async fn run_turns(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResult>, ApiError> {
    if request.turns == 0 {
        return Err(ApiError::bad_request("turns must be at least 1"));
    }
    let result = state
        .run_blocking(move |orchestrator, on_event| orchestrator.run_turns(&request, on_event))
        .await?;
    Ok(Json(result))
}

/// POST /api/reset - reset the simulation to its initial world.
async fn reset(State(state): State<AppState>) -> Result<Json<TurnResult>, ApiError> {
    let result = state
        .run_blocking(|orchestrator, on_event| orchestrator.reset(on_event))
        .await?;
    Ok(Json(result))
}

/// GET /api/world - reconciled state without running anything.
async fn get_world(State(state): State<AppState>) -> Result<Json<WorldSnapshot>, ApiError> {
    let orchestrator = state.orchestrator.clone();
    let snapshot = tokio::task::spawn_blocking(move || orchestrator.snapshot())
        .await
        .map_err(|_| ApiError::internal("snapshot task failed"))??;
    Ok(Json(snapshot))
}

/// GET /api/characters/{id}
async fn get_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CharacterState>, ApiError> {
    let orchestrator = state.orchestrator.clone();
    let lookup_id = id.clone();
    let character = tokio::task::spawn_blocking(move || orchestrator.character(&lookup_id))
        .await
        .map_err(|_| ApiError::internal("character task failed"))??;
    character
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no character {id}")))
}
