use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            HealthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest,
            TokenResponse,
        },
        error::AuthError,
        extractors::BearerToken,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/health", get(health))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    state
        .auth
        .register(
            &payload.name,
            &payload.email,
            &payload.password,
            &payload.confirm_password,
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "User registered successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(token))
}

#[instrument(skip(state, token))]
pub async fn get_me(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state.auth.who_am_i(&token).await?;
    Ok(Json(user))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Auth server is running",
    })
}
