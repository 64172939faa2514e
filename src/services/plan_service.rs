// src/services/plan_service.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PlanRepository,
    models::plan::{FeatureLimit, Plan},
};

#[derive(Clone)]
pub struct PlanService {
    plan_repo: PlanRepository,
}

impl PlanService {
    pub fn new(plan_repo: PlanRepository) -> Self {
        Self { plan_repo }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        currency: &str,
        duration_days: i32,
        max_staff: FeatureLimit,
        max_menu_items: FeatureLimit,
        max_tables: FeatureLimit,
        display_order: i32,
    ) -> Result<Plan, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Preço zero é legítimo (plano gratuito vira período de teste);
        // negativo não existe.
        if price < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "O preço do plano não pode ser negativo.".to_string(),
            ));
        }

        self.plan_repo
            .create(
                executor,
                name,
                description,
                price,
                currency,
                duration_days,
                max_staff,
                max_menu_items,
                max_tables,
                display_order,
            )
            .await
    }

    pub async fn get<'e, E>(&self, executor: E, plan_id: Uuid) -> Result<Plan, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.plan_repo
            .get_by_id(executor, plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Plano não encontrado.".to_string()))
    }

    pub async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        self.plan_repo.list_active().await
    }

    // Aposentar não apaga: assinaturas existentes seguem referenciando o
    // plano, que só some do catálogo de novas contratações.
    pub async fn deactivate<'e, E>(&self, executor: E, plan_id: Uuid) -> Result<Plan, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.plan_repo
            .deactivate(executor, plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Plano não encontrado.".to_string()))
    }
}
