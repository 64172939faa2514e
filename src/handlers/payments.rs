// src/handlers/payments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::payment::{Payment, PaymentInput, PaymentMethod, PaymentStatus},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentPayload {
    pub subscription_id: Uuid,

    #[schema(example = "29.99")]
    pub amount: Decimal,

    pub method: PaymentMethod,

    // Ausente = PENDING. Um pagamento já COMPLETED ativa assinatura pendente.
    #[serde(default)]
    pub status: Option<PaymentStatus>,

    // Referência explícita do coletor externo; ausente = gerada.
    #[validate(length(min = 1, message = "A referência não pode ser vazia."))]
    #[schema(example = "PAY-20250801120000-A1B2")]
    pub reference_number: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusPayload {
    #[schema(example = "COMPLETED")]
    pub status: PaymentStatus,
}

// POST /api/payments
#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payments",
    request_body = RecordPaymentPayload,
    responses(
        (status = 201, description = "Pagamento lançado no razão", body = Payment),
        (status = 404, description = "Assinatura não encontrada"),
        (status = 409, description = "Referência já usada"),
        (status = 422, description = "Valor negativo")
    )
)]
pub async fn record_payment(
    State(app_state): State<AppState>,
    Json(payload): Json<RecordPaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let input = PaymentInput {
        amount: payload.amount,
        method: payload.method,
        status: payload.status,
        reference_number: payload.reference_number,
        notes: payload.notes,
    };

    let payment = app_state
        .payment_service
        .record(&app_state.db_pool, payload.subscription_id, input)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

// GET /api/payments/{id}
#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    tag = "Payments",
    params(
        ("id" = Uuid, Path, description = "ID do pagamento")
    ),
    responses(
        (status = 200, description = "Pagamento encontrado", body = Payment),
        (status = 404, description = "Pagamento não encontrado")
    )
)]
pub async fn get_payment(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state
        .payment_service
        .get(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(payment)))
}

// POST /api/payments/{id}/status
#[utoipa::path(
    post,
    path = "/api/payments/{id}/status",
    tag = "Payments",
    request_body = UpdatePaymentStatusPayload,
    params(
        ("id" = Uuid, Path, description = "ID do pagamento")
    ),
    responses(
        (status = 200, description = "Status atualizado e totais recalculados", body = Payment),
        (status = 404, description = "Pagamento não encontrado"),
        (status = 409, description = "Transição ilegal (status já terminal)")
    )
)]
pub async fn update_payment_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state
        .payment_service
        .update_status(&app_state.db_pool, id, payload.status)
        .await?;
    Ok((StatusCode::OK, Json(payment)))
}
