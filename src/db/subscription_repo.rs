// src/db/subscription_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::payment::LedgerTotals,
    models::plan::ResourceKind,
    models::subscription::{Subscription, SubscriptionStatus},
};

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn get_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(subscription)
    }

    // A assinatura não-terminal do negócio, se houver (no máximo uma, por índice).
    pub async fn find_open_by_business<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
    ) -> Result<Option<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE business_id = $1
              AND status IN ('PENDING', 'TRIAL', 'ACTIVE', 'GRACE_PERIOD')
            "#,
        )
        .bind(business_id)
        .fetch_optional(executor)
        .await?;

        Ok(subscription)
    }

    // Caminho quente do gate: só estados com direito de uso.
    pub async fn find_accessible_by_business(
        &self,
        business_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE business_id = $1
              AND status IN ('TRIAL', 'ACTIVE', 'GRACE_PERIOD')
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    // Histórico completo do negócio, mais recente primeiro.
    pub async fn list_by_business(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<Subscription>, AppError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE business_id = $1 ORDER BY created_at DESC",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    // Candidatas da varredura: vencidas em estado ACTIVE/TRIAL, ou em
    // carência com a janela estourada. Linhas já transicionadas ficam de
    // fora pelo próprio predicado; re-executar não reaplica nada.
    pub async fn list_due_for_sweep<'e, E>(
        &self,
        executor: E,
        now: DateTime<Utc>,
        grace_days: i32,
    ) -> Result<Vec<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE (status IN ('ACTIVE', 'TRIAL') AND end_date <= $1)
               OR (status = 'GRACE_PERIOD' AND end_date + ($2 * INTERVAL '1 day') <= $1)
            ORDER BY end_date ASC
            "#,
        )
        .bind(now)
        .bind(grace_days)
        .fetch_all(executor)
        .await?;

        Ok(subscriptions)
    }

    // Assinaturas acessíveis vencendo nos próximos `days` dias (aviso prévio).
    pub async fn list_expiring_within(
        &self,
        now: DateTime<Utc>,
        days: i32,
    ) -> Result<Vec<Subscription>, AppError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE status IN ('TRIAL', 'ACTIVE', 'GRACE_PERIOD')
              AND end_date > $1
              AND end_date <= $1 + ($2 * INTERVAL '1 day')
            ORDER BY end_date ASC
            "#,
        )
        .bind(now)
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    // =========================================================================
    //  ESCRITAS
    // =========================================================================

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        plan_id: Uuid,
        status: SubscriptionStatus,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        auto_renew: bool,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (business_id, plan_id, status, start_date, end_date, auto_renew)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(plan_id)
        .bind(status)
        .bind(start_date)
        .bind(end_date)
        .bind(auto_renew)
        .fetch_one(executor)
        .await?;

        Ok(subscription)
    }

    // As escritas de ciclo de vida abaixo são todas versionadas: o UPDATE só
    // pega se ninguém escreveu depois da nossa leitura. Zero linhas afetadas
    // significa que outra operação venceu a corrida.

    pub async fn apply_renewal<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected_version: i64,
        plan_id: Uuid,
        new_end_date: DateTime<Utc>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'ACTIVE',
                plan_id = $3,
                end_date = $4,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(plan_id)
        .bind(new_end_date)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn apply_cancellation<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected_version: i64,
        cancelled_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'CANCELLED',
                auto_renew = FALSE,
                cancelled_at = $3,
                cancellation_reason = $4,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(cancelled_at)
        .bind(reason)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // Ativação por confirmação de pagamento (PENDING -> ACTIVE).
    pub async fn apply_activation<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected_version: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'ACTIVE',
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn apply_sweep_transition<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected_version: i64,
        from_status: SubscriptionStatus,
        to_status: SubscriptionStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $4,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2 AND status = $3
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(from_status)
        .bind(to_status)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // Totais são dados derivados do razão: recomputáveis a qualquer momento,
    // por isso não participam do controle de versão.
    pub async fn update_totals<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        totals: &LedgerTotals,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET total_paid_amount = $2,
                completed_payment_count = $3,
                pending_payment_count = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(totals.total_paid)
        .bind(totals.completed_count)
        .bind(totals.pending_count)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // Contagem absoluta reportada pelo módulo dono do recurso.
    pub async fn set_usage_count<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        kind: ResourceKind,
        count: i32,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let column = match kind {
            ResourceKind::Staff => "current_staff_count",
            ResourceKind::MenuItem => "current_menu_item_count",
            ResourceKind::Table => "current_table_count",
        };
        let sql = format!(
            r#"
            UPDATE subscriptions
            SET {column} = $2, updated_at = now()
            WHERE business_id = $1
              AND status IN ('PENDING', 'TRIAL', 'ACTIVE', 'GRACE_PERIOD')
            "#
        );

        let result = sqlx::query(&sql)
            .bind(business_id)
            .bind(count)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
