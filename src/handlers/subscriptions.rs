// src/handlers/subscriptions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        payment::{Payment, PaymentInput},
        subscription::{CancellationResult, Subscription, UsageSnapshot},
    },
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionPayload {
    pub business_id: Uuid,
    pub plan_id: Uuid,

    // Ausente = agora. Aceita datas passadas (contratos retroativos).
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    #[schema(example = false)]
    pub auto_renew: bool,

    // Pagamento inicial opcional, lançado na mesma transação. Se já vier
    // COMPLETED, a assinatura nasce ACTIVE em vez de PENDING.
    pub payment: Option<PaymentInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenewSubscriptionPayload {
    // Troca de plano na renovação, sujeita aos limites contra o uso corrente.
    pub new_plan_id: Option<Uuid>,

    #[validate(range(min = 1, message = "A duração customizada deve ser de pelo menos 1 dia."))]
    #[schema(example = 365)]
    pub custom_duration_days: Option<i32>,

    pub payment: Option<PaymentInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionPayload {
    #[validate(length(min = 1, message = "O motivo do cancelamento é obrigatório."))]
    #[schema(example = "Encerramento das atividades do restaurante")]
    pub reason: String,

    // Reembolso opcional, limitado ao total pago da assinatura.
    #[schema(example = "10.00")]
    pub refund_amount: Option<Decimal>,
}

// =============================================================================
//  CICLO DE VIDA
// =============================================================================

// POST /api/subscriptions
#[utoipa::path(
    post,
    path = "/api/subscriptions",
    tag = "Subscriptions",
    request_body = CreateSubscriptionPayload,
    responses(
        (status = 201, description = "Assinatura criada", body = Subscription),
        (status = 404, description = "Plano não encontrado"),
        (status = 409, description = "O negócio já possui uma assinatura em aberto")
    )
)]
pub async fn create_subscription(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = app_state
        .subscription_service
        .create(
            &app_state.db_pool,
            payload.business_id,
            payload.plan_id,
            payload.start_date,
            payload.auto_renew,
            payload.payment,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

// POST /api/subscriptions/{id}/renew
#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/renew",
    tag = "Subscriptions",
    request_body = RenewSubscriptionPayload,
    params(
        ("id" = Uuid, Path, description = "ID da assinatura")
    ),
    responses(
        (status = 200, description = "Assinatura renovada (tempo restante preservado)", body = Subscription),
        (status = 404, description = "Assinatura ou plano não encontrado"),
        (status = 409, description = "Status atual não permite renovação"),
        (status = 422, description = "O novo plano não acomoda o uso corrente")
    )
)]
pub async fn renew_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenewSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let subscription = app_state
        .subscription_service
        .renew(
            &app_state.db_pool,
            id,
            payload.new_plan_id,
            payload.custom_duration_days,
            payload.payment,
        )
        .await?;

    Ok((StatusCode::OK, Json(subscription)))
}

// POST /api/subscriptions/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/cancel",
    tag = "Subscriptions",
    request_body = CancelSubscriptionPayload,
    params(
        ("id" = Uuid, Path, description = "ID da assinatura")
    ),
    responses(
        (status = 200, description = "Assinatura cancelada, com o reembolso quando houver", body = CancellationResult),
        (status = 404, description = "Assinatura não encontrada"),
        (status = 409, description = "Assinatura já em estado terminal"),
        (status = 422, description = "Reembolso inválido")
    )
)]
pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state
        .subscription_service
        .cancel(&app_state.db_pool, id, &payload.reason, payload.refund_amount)
        .await?;

    Ok((StatusCode::OK, Json(result)))
}

// =============================================================================
//  LEITURAS
// =============================================================================

// GET /api/subscriptions/{id}
#[utoipa::path(
    get,
    path = "/api/subscriptions/{id}",
    tag = "Subscriptions",
    params(
        ("id" = Uuid, Path, description = "ID da assinatura")
    ),
    responses(
        (status = 200, description = "Assinatura encontrada", body = Subscription),
        (status = 404, description = "Assinatura não encontrada")
    )
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = app_state
        .subscription_service
        .get(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(subscription)))
}

// GET /api/subscriptions/{id}/usage
#[utoipa::path(
    get,
    path = "/api/subscriptions/{id}/usage",
    tag = "Subscriptions",
    params(
        ("id" = Uuid, Path, description = "ID da assinatura")
    ),
    responses(
        (status = 200, description = "Dias restantes e vencimento pelo relógio, sem esperar a varredura", body = UsageSnapshot),
        (status = 404, description = "Assinatura não encontrada")
    )
)]
pub async fn get_usage_snapshot(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state
        .subscription_service
        .usage_snapshot(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(snapshot)))
}

// GET /api/subscriptions/{id}/payments
#[utoipa::path(
    get,
    path = "/api/subscriptions/{id}/payments",
    tag = "Subscriptions",
    params(
        ("id" = Uuid, Path, description = "ID da assinatura")
    ),
    responses(
        (status = 200, description = "Razão de pagamentos da assinatura, em ordem de lançamento", body = Vec<Payment>),
        (status = 404, description = "Assinatura não encontrada")
    )
)]
pub async fn list_subscription_payments(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Confirma a existência antes de listar: razão vazio é 200, id errado é 404.
    app_state
        .subscription_service
        .get(&app_state.db_pool, id)
        .await?;

    let payments = app_state
        .payment_service
        .list_for_subscription(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(payments)))
}

// GET /api/businesses/{business_id}/subscriptions
#[utoipa::path(
    get,
    path = "/api/businesses/{business_id}/subscriptions",
    tag = "Subscriptions",
    params(
        ("business_id" = Uuid, Path, description = "ID do negócio")
    ),
    responses(
        (status = 200, description = "Histórico de assinaturas do negócio, da mais recente para a mais antiga", body = Vec<Subscription>)
    )
)]
pub async fn list_business_subscriptions(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let subscriptions = app_state
        .subscription_service
        .list_for_business(business_id)
        .await?;
    Ok((StatusCode::OK, Json(subscriptions)))
}

// GET /api/businesses/{business_id}/subscription
#[utoipa::path(
    get,
    path = "/api/businesses/{business_id}/subscription",
    tag = "Subscriptions",
    params(
        ("business_id" = Uuid, Path, description = "ID do negócio")
    ),
    responses(
        (status = 200, description = "A assinatura em aberto do negócio", body = Subscription),
        (status = 404, description = "O negócio não possui assinatura em aberto")
    )
)]
pub async fn get_current_subscription(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = app_state
        .subscription_service
        .find_current_for_business(&app_state.db_pool, business_id)
        .await?;
    Ok((StatusCode::OK, Json(subscription)))
}
