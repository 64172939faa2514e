// src/services/subscription_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PlanRepository, SubscriptionRepository},
    models::payment::{PaymentInput, PaymentStatus},
    models::plan::{FeatureLimit, Plan, ResourceKind},
    models::subscription::{CancellationResult, Subscription, SubscriptionStatus, UsageSnapshot},
    services::payment_service::PaymentService,
    services::usage_gate::UsageGate,
};

// A troca de plano precisa acomodar o uso corrente inteiro de cada recurso;
// o erro nomeia o recurso que estourou.
fn check_plan_fits_usage(plan: &Plan, subscription: &Subscription) -> Result<(), AppError> {
    for kind in [ResourceKind::Staff, ResourceKind::MenuItem, ResourceKind::Table] {
        let current = subscription.current_count_for(kind);
        let limit = plan.limit_for(kind);
        if !limit.accommodates(current) {
            if let FeatureLimit::Limited(max) = limit {
                return Err(AppError::LimitViolation(format!(
                    "A troca de plano excede o limite de {}: uso atual {}, novo limite {}.",
                    kind.label(),
                    current,
                    max
                )));
            }
        }
    }
    Ok(())
}

// Reembolso zero é ausência de reembolso; negativo não existe; e nunca se
// devolve mais do que entrou no razão.
fn validate_refund(
    refund_amount: Option<Decimal>,
    total_paid: Decimal,
) -> Result<Option<Decimal>, AppError> {
    let Some(amount) = refund_amount else {
        return Ok(None);
    };
    if amount < Decimal::ZERO {
        return Err(AppError::InvalidAmount(
            "O valor do reembolso não pode ser negativo.".to_string(),
        ));
    }
    if amount.is_zero() {
        return Ok(None);
    }
    if amount > total_paid {
        return Err(AppError::InvalidAmount(format!(
            "Reembolso de {} excede o total pago de {}.",
            amount, total_paid
        )));
    }
    Ok(Some(amount))
}

#[derive(Clone)]
pub struct SubscriptionService {
    subscription_repo: SubscriptionRepository,
    plan_repo: PlanRepository,
    payment_service: PaymentService,
    usage_gate: UsageGate,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: SubscriptionRepository,
        plan_repo: PlanRepository,
        payment_service: PaymentService,
        usage_gate: UsageGate,
    ) -> Self {
        Self {
            subscription_repo,
            plan_repo,
            payment_service,
            usage_gate,
        }
    }

    // =========================================================================
    //  CICLO DE VIDA
    // =========================================================================

    pub async fn create<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        plan_id: Uuid,
        start_date: Option<DateTime<Utc>>,
        auto_renew: bool,
        payment: Option<PaymentInput>,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let now = Utc::now();
        let mut tx = executor.begin().await?;

        // 1. O plano precisa existir e estar aberto a novas assinaturas.
        let plan = self
            .plan_repo
            .get_by_id(&mut *tx, plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Plano não encontrado.".to_string()))?;
        if !plan.is_active {
            return Err(AppError::Conflict(
                "O plano não está mais disponível para novas assinaturas.".to_string(),
            ));
        }

        // 2. Uma assinatura em aberto por negócio. O índice parcial no banco
        // segura a corrida entre duas criações simultâneas.
        if let Some(existing) = self
            .subscription_repo
            .find_open_by_business(&mut *tx, business_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "O negócio já possui uma assinatura em aberto (status {}).",
                existing.status.as_str()
            )));
        }

        // 3. Período contratado.
        let start_date = start_date.unwrap_or(now);
        let end_date = Subscription::period_end(start_date, plan.duration_days);

        // 4. Status inicial: teste para plano gratuito; ativa se o pagamento
        // já chegou confirmado; senão pendente.
        let has_completed_payment = payment
            .as_ref()
            .map(|p| p.status_or_default() == PaymentStatus::Completed)
            .unwrap_or(false);
        let initial_status = if plan.is_free() {
            SubscriptionStatus::Trial
        } else if has_completed_payment {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Pending
        };

        // 5. Insere e, se veio pagamento junto, lança na mesma transação.
        let subscription = self
            .subscription_repo
            .insert(
                &mut *tx,
                business_id,
                plan.id,
                initial_status,
                start_date,
                end_date,
                auto_renew,
            )
            .await?;
        if let Some(ref input) = payment {
            self.payment_service
                .append_in_tx(&mut tx, subscription.id, input, now)
                .await?;
        }

        // 6. Devolve o estado fresco, com os totais já recalculados.
        let subscription = self.reload(&mut tx, subscription.id).await?;

        tx.commit().await?;
        self.usage_gate.invalidate(business_id).await;

        Ok(subscription)
    }

    pub async fn renew<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        new_plan_id: Option<Uuid>,
        custom_duration_days: Option<i32>,
        payment: Option<PaymentInput>,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let now = Utc::now();
        let mut tx = executor.begin().await?;

        // 1. Estado atual e legalidade da renovação.
        let subscription = self.reload(&mut tx, subscription_id).await?;
        if !subscription.status.can_renew() {
            return Err(AppError::InvalidTransition(format!(
                "Assinatura em {} não pode ser renovada.",
                subscription.status.as_str()
            )));
        }

        // 2. Plano alvo: o mesmo, ou o novo em caso de troca.
        let target_plan_id = new_plan_id.unwrap_or(subscription.plan_id);
        let plan = self
            .plan_repo
            .get_by_id(&mut *tx, target_plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Plano não encontrado.".to_string()))?;

        // 3. Troca de plano: o novo precisa estar disponível e acomodar o uso
        // corrente. Renovar no mesmo plano segue valendo mesmo que ele tenha
        // sido aposentado para novas assinaturas.
        if plan.id != subscription.plan_id {
            if !plan.is_active {
                return Err(AppError::Conflict(
                    "O plano não está mais disponível para novas assinaturas.".to_string(),
                ));
            }
            check_plan_fits_usage(&plan, &subscription)?;
        }

        // 4. Estende preservando o tempo restante; vencida reativa de agora.
        let duration_days = custom_duration_days.unwrap_or(plan.duration_days);
        let new_end_date = subscription.renewed_end_date(now, duration_days);

        let rows = self
            .subscription_repo
            .apply_renewal(
                &mut *tx,
                subscription_id,
                subscription.version,
                plan.id,
                new_end_date,
            )
            .await?;
        if rows == 0 {
            return Err(AppError::ConcurrentModification);
        }

        // 5. Pagamento da renovação entra na mesma transação.
        if let Some(ref input) = payment {
            self.payment_service
                .append_in_tx(&mut tx, subscription_id, input, now)
                .await?;
        }

        let subscription = self.reload(&mut tx, subscription_id).await?;

        tx.commit().await?;
        self.usage_gate.invalidate(subscription.business_id).await;

        Ok(subscription)
    }

    pub async fn cancel<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        reason: &str,
        refund_amount: Option<Decimal>,
    ) -> Result<CancellationResult, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let now = Utc::now();
        let mut tx = executor.begin().await?;

        // 1. Estado atual e legalidade. O cancelamento tem precedência sobre a
        // carência: GRACE_PERIOD cai direto para CANCELLED.
        let subscription = self.reload(&mut tx, subscription_id).await?;
        if !subscription.status.can_cancel() {
            return Err(AppError::InvalidTransition(format!(
                "Assinatura em {} não pode ser cancelada.",
                subscription.status.as_str()
            )));
        }

        // 2. Reembolso validado antes de qualquer escrita.
        let refund = validate_refund(refund_amount, subscription.total_paid_amount)?;

        // 3. Revoga o acesso imediatamente, sem esperar o fim do período.
        let rows = self
            .subscription_repo
            .apply_cancellation(&mut *tx, subscription_id, subscription.version, now, reason)
            .await?;
        if rows == 0 {
            return Err(AppError::ConcurrentModification);
        }

        // 4. Lançamento compensatório na mesma transação: ou o cancelamento e
        // o reembolso entram juntos, ou nenhum dos dois entra.
        let refund_payment = match refund {
            Some(amount) => Some(
                self.payment_service
                    .append_refund_in_tx(&mut tx, subscription_id, amount, reason, now)
                    .await?,
            ),
            None => None,
        };

        let subscription = self.reload(&mut tx, subscription_id).await?;

        tx.commit().await?;
        self.usage_gate.invalidate(subscription.business_id).await;

        Ok(CancellationResult {
            subscription,
            refund: refund_payment,
        })
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn get<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.subscription_repo
            .get_by_id(executor, subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Assinatura não encontrada.".to_string()))
    }

    /// Leitura derivada, sem efeito colateral: o vencimento sai do relógio,
    /// sem esperar a varredura passar.
    pub async fn usage_snapshot<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<UsageSnapshot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = self.get(executor, subscription_id).await?;
        Ok(subscription.usage_snapshot(Utc::now()))
    }

    pub async fn find_current_for_business<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.subscription_repo
            .find_open_by_business(executor, business_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("O negócio não possui assinatura em aberto.".to_string())
            })
    }

    pub async fn list_for_business(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<Subscription>, AppError> {
        self.subscription_repo.list_by_business(business_id).await
    }

    // Vencimentos próximos, para o colaborador externo de avisos.
    pub async fn list_expiring(&self, days: i32) -> Result<Vec<Subscription>, AppError> {
        self.subscription_repo
            .list_expiring_within(Utc::now(), days)
            .await
    }

    // Contagem absoluta reportada pelo módulo dono do recurso. Não mexe no
    // gate: o cache guarda limites e status, não contagens.
    pub async fn report_usage<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        kind: ResourceKind,
        count: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = self
            .subscription_repo
            .set_usage_count(executor, business_id, kind, count)
            .await?;
        if rows == 0 {
            return Err(AppError::NotFound(
                "O negócio não possui assinatura em aberto.".to_string(),
            ));
        }
        Ok(())
    }

    async fn reload(
        &self,
        conn: &mut PgConnection,
        subscription_id: Uuid,
    ) -> Result<Subscription, AppError> {
        self.subscription_repo
            .get_by_id(&mut *conn, subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Assinatura não encontrada.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan(max_staff: FeatureLimit, max_menu_items: FeatureLimit, max_tables: FeatureLimit) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "PRO".to_string(),
            description: None,
            price: dec!(59.99),
            currency: "USD".to_string(),
            duration_days: 365,
            max_staff,
            max_menu_items,
            max_tables,
            display_order: 2,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn subscription_with_usage(staff: i32, menu_items: i32, tables: i32) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status: SubscriptionStatus::Active,
            start_date: Utc::now(),
            end_date: Utc::now() + chrono::Duration::days(30),
            auto_renew: false,
            total_paid_amount: Decimal::ZERO,
            completed_payment_count: 0,
            pending_payment_count: 0,
            current_staff_count: staff,
            current_menu_item_count: menu_items,
            current_table_count: tables,
            cancelled_at: None,
            cancellation_reason: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn plan_swap_rejects_usage_above_the_new_limit() {
        let plan = plan(
            FeatureLimit::Limited(5),
            FeatureLimit::Unlimited,
            FeatureLimit::Limited(10),
        );
        let subscription = subscription_with_usage(7, 500, 3);

        let err = check_plan_fits_usage(&plan, &subscription).unwrap_err();
        match err {
            AppError::LimitViolation(msg) => {
                // O erro nomeia o recurso que estourou.
                assert!(msg.contains("funcionários"), "mensagem: {msg}");
                assert!(msg.contains('7') && msg.contains('5'), "mensagem: {msg}");
            }
            other => panic!("esperava LimitViolation, veio {other:?}"),
        }
    }

    #[test]
    fn plan_swap_accepts_usage_at_or_below_the_limit() {
        let plan = plan(
            FeatureLimit::Limited(5),
            FeatureLimit::Limited(100),
            FeatureLimit::Unlimited,
        );
        let subscription = subscription_with_usage(5, 100, 99_999);
        assert!(check_plan_fits_usage(&plan, &subscription).is_ok());
    }

    #[test]
    fn refund_must_be_positive_and_within_total_paid() {
        assert_eq!(validate_refund(None, dec!(100)).unwrap(), None);
        assert_eq!(validate_refund(Some(dec!(0)), dec!(100)).unwrap(), None);
        assert_eq!(
            validate_refund(Some(dec!(40)), dec!(100)).unwrap(),
            Some(dec!(40))
        );
        assert_eq!(
            validate_refund(Some(dec!(100)), dec!(100)).unwrap(),
            Some(dec!(100))
        );

        assert!(matches!(
            validate_refund(Some(dec!(-1)), dec!(100)),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_refund(Some(dec!(100.01)), dec!(100)),
            Err(AppError::InvalidAmount(_))
        ));
    }
}
