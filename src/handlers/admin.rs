// src/handlers/admin.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    common::error::AppError,
    config::AppState,
    models::subscription::{Subscription, SweepResult},
};

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i32>,
}

// POST /api/admin/sweep
//
// Disparo manual da varredura que o timer roda sozinho. Útil em operação
// (vencimento em massa após migração) e nos testes de ponta a ponta.
#[utoipa::path(
    post,
    path = "/api/admin/sweep",
    tag = "Admin",
    responses(
        (status = 200, description = "Contadores da passada: examinadas, em carência, expiradas, falhas", body = SweepResult)
    )
)]
pub async fn run_sweep(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let result = app_state.sweeper_service.run(Utc::now()).await?;
    Ok((StatusCode::OK, Json(result)))
}

// GET /api/admin/subscriptions/expiring?days=7
#[utoipa::path(
    get,
    path = "/api/admin/subscriptions/expiring",
    tag = "Admin",
    params(
        ("days" = Option<i32>, Query, description = "Janela em dias (padrão 7)")
    ),
    responses(
        (status = 200, description = "Assinaturas acessíveis vencendo dentro da janela", body = Vec<Subscription>)
    )
)]
pub async fn list_expiring_subscriptions(
    State(app_state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> Result<impl IntoResponse, AppError> {
    let days = query.days.unwrap_or(7).max(0);
    let subscriptions = app_state.subscription_service.list_expiring(days).await?;
    Ok((StatusCode::OK, Json(subscriptions)))
}
