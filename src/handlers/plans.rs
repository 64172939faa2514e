// src/handlers/plans.rs

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
    models::plan::{FeatureLimit, Plan},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanPayload {
    #[validate(length(min = 1, message = "O nome do plano é obrigatório."))]
    #[schema(example = "BASIC")]
    pub name: String,

    #[schema(example = "Até 5 funcionários e 100 itens de cardápio")]
    pub description: Option<String>,

    #[schema(example = "29.99")]
    pub price: Decimal,

    #[serde(default = "default_currency")]
    #[schema(example = "USD")]
    pub currency: String,

    #[validate(range(min = 1, message = "A duração deve ser de pelo menos 1 dia."))]
    #[schema(example = 365)]
    pub duration_days: i32,

    // Limite ausente (null) = ilimitado.
    #[validate(range(min = 0, message = "O limite de funcionários não pode ser negativo."))]
    #[schema(example = 5)]
    pub max_staff: Option<i32>,

    #[validate(range(min = 0, message = "O limite de itens de cardápio não pode ser negativo."))]
    #[schema(example = 100)]
    pub max_menu_items: Option<i32>,

    #[validate(range(min = 0, message = "O limite de mesas não pode ser negativo."))]
    #[schema(example = 10)]
    pub max_tables: Option<i32>,

    #[serde(default)]
    #[schema(example = 1)]
    pub display_order: i32,
}

fn default_currency() -> String {
    "USD".to_string()
}

// POST /api/plans
#[utoipa::path(
    post,
    path = "/api/plans",
    tag = "Plans",
    request_body = CreatePlanPayload,
    responses(
        (status = 201, description = "Plano criado", body = Plan),
        (status = 400, description = "Payload inválido")
    )
)]
pub async fn create_plan(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePlanPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let plan = app_state
        .plan_service
        .create(
            &app_state.db_pool,
            &payload.name,
            payload.description.as_deref(),
            payload.price,
            &payload.currency,
            payload.duration_days,
            FeatureLimit::from(payload.max_staff),
            FeatureLimit::from(payload.max_menu_items),
            FeatureLimit::from(payload.max_tables),
            payload.display_order,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

// GET /api/plans
#[utoipa::path(
    get,
    path = "/api/plans",
    tag = "Plans",
    responses(
        (status = 200, description = "Catálogo de planos ativos, em ordem de exibição", body = Vec<Plan>)
    )
)]
pub async fn list_plans(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let plans = app_state.plan_service.list_active().await?;
    Ok((StatusCode::OK, Json(plans)))
}

// GET /api/plans/{id}
#[utoipa::path(
    get,
    path = "/api/plans/{id}",
    tag = "Plans",
    params(
        ("id" = Uuid, Path, description = "ID do plano")
    ),
    responses(
        (status = 200, description = "Plano encontrado", body = Plan),
        (status = 404, description = "Plano não encontrado")
    )
)]
pub async fn get_plan(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let plan = app_state.plan_service.get(&app_state.db_pool, id).await?;
    Ok((StatusCode::OK, Json(plan)))
}

// POST /api/plans/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/plans/{id}/deactivate",
    tag = "Plans",
    params(
        ("id" = Uuid, Path, description = "ID do plano")
    ),
    responses(
        (status = 200, description = "Plano aposentado para novas assinaturas", body = Plan),
        (status = 404, description = "Plano não encontrado")
    )
)]
pub async fn deactivate_plan(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let plan = app_state
        .plan_service
        .deactivate(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(plan)))
}
