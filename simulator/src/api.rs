use crate::Simulator;
use axum::{
    extract::{Path, Query, State as AxumState},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jalwa_types::api::{ApiResponse, Page, PageQuery};
use jalwa_types::{Bet, BetRequest, GameMode, Round};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Simple health response for basic liveness checks.
#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

/// HTTP surface of the simulator, matching the contract the client SDK
/// consumes.
pub struct Api {
    simulator: Arc<Simulator>,
}

impl Api {
    pub fn new(simulator: Arc<Simulator>) -> Self {
        Self { simulator }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .route("/api/:game_code/rounds/current", get(current_round))
            .route("/api/:game_code/rounds", get(round_history))
            .route("/api/:game_code/bets/my", get(my_bets))
            .route("/api/bets", post(place_bet))
            .with_state(self.simulator)
    }
}

async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

fn parse_mode(game_code: &str) -> Result<GameMode, Response> {
    GameMode::from_code(game_code).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<Round>::rejected(format!(
                "unknown game mode: {game_code}"
            ))),
        )
            .into_response()
    })
}

/// Bearer token identifies the account. Token issuance and storage are
/// outside this service.
fn bearer_account(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<Bet>::rejected("missing bearer token")),
            )
                .into_response()
        })
}

async fn current_round(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(game_code): Path<String>,
) -> Response {
    let mode = match parse_mode(&game_code) {
        Ok(mode) => mode,
        Err(response) => return response,
    };
    Json(ApiResponse::ok(simulator.current_round(mode))).into_response()
}

async fn round_history(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(game_code): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let mode = match parse_mode(&game_code) {
        Ok(mode) => mode,
        Err(response) => return response,
    };
    let page: Page<Round> = simulator.round_history(mode, query.page, query.page_size);
    Json(ApiResponse::ok(page)).into_response()
}

async fn my_bets(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(game_code): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    let mode = match parse_mode(&game_code) {
        Ok(mode) => mode,
        Err(response) => return response,
    };
    let account = match bearer_account(&headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let page: Page<Bet> = simulator.account_bets(&account, mode, query.page, query.page_size);
    Json(ApiResponse::ok(page)).into_response()
}

async fn place_bet(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    headers: HeaderMap,
    Json(request): Json<BetRequest>,
) -> Response {
    let account = match bearer_account(&headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    match simulator.place_bet(&account, &request) {
        Ok(bet) => Json(ApiResponse::ok(bet)).into_response(),
        Err(err) => {
            debug!(%account, round = request.round_id, %err, "bet rejected");
            Json(ApiResponse::<Bet>::rejected(err.to_string())).into_response()
        }
    }
}
