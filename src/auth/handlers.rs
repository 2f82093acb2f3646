use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UpdateAccountRequest},
        extractors::AuthUser,
    },
    error::AppError,
    state::AppState,
    users::PublicAccount,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", get(list_accounts))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me).delete(delete_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(payload) = payload?;
    let res = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(state.auth.login(payload).await?))
}

/// Sanitized account listing; password hashes never leave the service.
#[instrument(skip(state))]
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicAccount>>, AppError> {
    Ok(Json(state.auth.list_accounts().await?))
}

#[instrument(skip(state, claims))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicAccount>, AppError> {
    Ok(Json(state.auth.account(claims.sub).await?))
}

#[instrument(skip(state, claims, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<Json<PublicAccount>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(state.auth.update_account(claims.sub, payload).await?))
}

#[instrument(skip(state, claims))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<StatusCode, AppError> {
    state.auth.remove_account(claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
