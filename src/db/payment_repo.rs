// src/db/payment_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::payment::{Payment, PaymentMethod, PaymentStatus},
};

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // O razão é append-only: só há INSERT e transição de status. Valor e
    // vínculo nunca mudam depois de criados.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        amount: Decimal,
        method: PaymentMethod,
        status: PaymentStatus,
        reference_number: &str,
        notes: Option<&str>,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                subscription_id, amount, method, status,
                reference_number, notes, paid_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(amount)
        .bind(method)
        .bind(status)
        .bind(reference_number)
        .bind(notes)
        .bind(paid_at)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    pub async fn get_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(payment)
    }

    pub async fn list_by_subscription<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE subscription_id = $1 ORDER BY created_at ASC",
        )
        .bind(subscription_id)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    pub async fn reference_exists<'e, E>(
        &self,
        executor: E,
        reference_number: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM payments WHERE reference_number = $1)",
        )
        .bind(reference_number)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    // Transição de status com a regra "só para frente" também no SQL:
    // um pagamento que já saiu de PENDING não é tocado (zero linhas).
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        new_status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                paid_at = COALESCE($3, paid_at),
                updated_at = now()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(new_status)
        .bind(paid_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
