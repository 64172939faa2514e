// src/db/exchange_rate_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{common::error::AppError, models::exchange_rate::ExchangeRate};

#[derive(Clone)]
pub struct ExchangeRateRepository {
    pool: PgPool,
}

impl ExchangeRateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Buscada sob demanda a cada uso, nunca guardada em estado global.
    pub async fn find_active(&self) -> Result<Option<ExchangeRate>, AppError> {
        let rate = sqlx::query_as::<_, ExchangeRate>(
            "SELECT * FROM exchange_rates WHERE is_active = TRUE",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }

    pub async fn list_history(&self) -> Result<Vec<ExchangeRate>, AppError> {
        let rates = sqlx::query_as::<_, ExchangeRate>(
            "SELECT * FROM exchange_rates ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }

    pub async fn deactivate_all<'e, E>(&self, executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE exchange_rates SET is_active = FALSE, updated_at = now() WHERE is_active",
        )
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn insert_active<'e, E>(
        &self,
        executor: E,
        usd_to_base_rate: Decimal,
        notes: Option<&str>,
    ) -> Result<ExchangeRate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rate = sqlx::query_as::<_, ExchangeRate>(
            r#"
            INSERT INTO exchange_rates (usd_to_base_rate, is_active, notes)
            VALUES ($1, TRUE, $2)
            RETURNING *
            "#,
        )
        .bind(usd_to_base_rate)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(rate)
    }
}
