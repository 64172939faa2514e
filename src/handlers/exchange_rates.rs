// src/handlers/exchange_rates.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    models::exchange_rate::{ConvertedAmount, CurrentRateView, ExchangeRate},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetExchangeRatePayload {
    #[schema(example = "4100.0")]
    pub usd_to_base_rate: Decimal,

    #[schema(example = "Ajuste semanal do câmbio")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: Decimal,
}

// GET /api/exchange-rate
#[utoipa::path(
    get,
    path = "/api/exchange-rate",
    tag = "ExchangeRate",
    responses(
        (status = 200, description = "Cotação vigente (a padrão de configuração, se nenhuma foi cadastrada)", body = CurrentRateView)
    )
)]
pub async fn get_current_rate(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rate = app_state.exchange_rate_service.current_rate().await?;
    Ok((StatusCode::OK, Json(rate)))
}

// POST /api/exchange-rate
#[utoipa::path(
    post,
    path = "/api/exchange-rate",
    tag = "ExchangeRate",
    request_body = SetExchangeRatePayload,
    responses(
        (status = 201, description = "Nova cotação vigente; a anterior vira histórico", body = ExchangeRate),
        (status = 422, description = "Cotação não positiva")
    )
)]
pub async fn set_rate(
    State(app_state): State<AppState>,
    Json(payload): Json<SetExchangeRatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let rate = app_state
        .exchange_rate_service
        .set_rate(
            &app_state.db_pool,
            payload.usd_to_base_rate,
            payload.notes.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(rate)))
}

// GET /api/exchange-rate/history
#[utoipa::path(
    get,
    path = "/api/exchange-rate/history",
    tag = "ExchangeRate",
    responses(
        (status = 200, description = "Todas as cotações já cadastradas, da mais recente para a mais antiga", body = Vec<ExchangeRate>)
    )
)]
pub async fn get_rate_history(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let history = app_state.exchange_rate_service.history().await?;
    Ok((StatusCode::OK, Json(history)))
}

// GET /api/exchange-rate/convert?amount=29.99
#[utoipa::path(
    get,
    path = "/api/exchange-rate/convert",
    tag = "ExchangeRate",
    params(
        ("amount" = Decimal, Query, description = "Valor em USD a converter")
    ),
    responses(
        (status = 200, description = "Valor convertido para exibição na moeda secundária", body = ConvertedAmount),
        (status = 422, description = "Valor negativo")
    )
)]
pub async fn convert_amount(
    State(app_state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Result<impl IntoResponse, AppError> {
    let converted = app_state.exchange_rate_service.convert(query.amount).await?;
    Ok((StatusCode::OK, Json(converted)))
}
