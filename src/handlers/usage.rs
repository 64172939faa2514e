// src/handlers/usage.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{common::error::AppError, config::AppState, models::plan::ResourceKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanAddQuery {
    pub kind: ResourceKind,
    pub current_count: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanAddResponse {
    pub allowed: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportUsagePayload {
    pub kind: ResourceKind,

    #[validate(range(min = 0, message = "A contagem de uso não pode ser negativa."))]
    #[schema(example = 4)]
    pub count: i32,
}

// GET /api/usage/{business_id}/can-add?kind=STAFF&currentCount=4
#[utoipa::path(
    get,
    path = "/api/usage/{business_id}/can-add",
    tag = "Usage",
    params(
        ("business_id" = Uuid, Path, description = "ID do negócio"),
        ("kind" = ResourceKind, Query, description = "Recurso a adicionar"),
        ("currentCount" = i32, Query, description = "Contagem atual do recurso no módulo chamador")
    ),
    responses(
        (status = 200, description = "Veredito do gate: nunca erro, negativa é um `false`", body = CanAddResponse)
    )
)]
pub async fn can_add(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<CanAddQuery>,
) -> Result<impl IntoResponse, AppError> {
    let allowed = app_state
        .usage_gate
        .can_add(business_id, query.kind, query.current_count)
        .await;
    Ok((StatusCode::OK, Json(CanAddResponse { allowed })))
}

// PUT /api/usage/{business_id}
#[utoipa::path(
    put,
    path = "/api/usage/{business_id}",
    tag = "Usage",
    request_body = ReportUsagePayload,
    params(
        ("business_id" = Uuid, Path, description = "ID do negócio")
    ),
    responses(
        (status = 204, description = "Contagem registrada na assinatura em aberto"),
        (status = 404, description = "O negócio não possui assinatura em aberto")
    )
)]
pub async fn report_usage(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<ReportUsagePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state
        .subscription_service
        .report_usage(&app_state.db_pool, business_id, payload.kind, payload.count)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
