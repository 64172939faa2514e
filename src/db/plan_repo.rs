// src/db/plan_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::plan::{FeatureLimit, Plan},
};

#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
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
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO subscription_plans (
                name, description, price, currency, duration_days,
                max_staff, max_menu_items, max_tables, display_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(currency)
        .bind(duration_days)
        .bind(Option::<i32>::from(max_staff))
        .bind(Option::<i32>::from(max_menu_items))
        .bind(Option::<i32>::from(max_tables))
        .bind(display_order)
        .fetch_one(executor)
        .await?;

        Ok(plan)
    }

    pub async fn get_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM subscription_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(plan)
    }

    // Catálogo visível: só planos ativos, em ordem estável de exibição.
    pub async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>(
            r#"
            SELECT * FROM subscription_plans
            WHERE is_active = TRUE
            ORDER BY display_order ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    // Aposenta o plano para novas assinaturas; quem já o referencia segue válido.
    pub async fn deactivate<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            UPDATE subscription_plans
            SET is_active = FALSE, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(plan)
    }
}
