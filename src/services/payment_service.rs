// src/services/payment_service.rs

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PaymentRepository, SubscriptionRepository},
    models::payment::{LedgerTotals, Payment, PaymentInput, PaymentMethod, PaymentStatus},
    models::subscription::SubscriptionStatus,
    services::usage_gate::UsageGate,
};

const MAX_REFERENCE_ATTEMPTS: u32 = 5;

// Gera "PAY-<yyyyMMddHHmmss>-<4 hex>". A unicidade real vem da checagem no
// razão (com novas tentativas) e do índice único como última barreira.
fn build_reference_number(now: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "PAY-{}-{}",
        now.format("%Y%m%d%H%M%S"),
        entropy[..4].to_uppercase()
    )
}

#[derive(Clone)]
pub struct PaymentService {
    payment_repo: PaymentRepository,
    subscription_repo: SubscriptionRepository,
    usage_gate: UsageGate,
}

impl PaymentService {
    pub fn new(
        payment_repo: PaymentRepository,
        subscription_repo: SubscriptionRepository,
        usage_gate: UsageGate,
    ) -> Self {
        Self {
            payment_repo,
            subscription_repo,
            usage_gate,
        }
    }

    // =========================================================================
    //  OPERAÇÕES PÚBLICAS (cada uma na sua transação)
    // =========================================================================

    // Registro avulso: é por aqui que o coletor externo de pagamentos entrega
    // confirmações. Um pagamento já COMPLETED ativa assinatura pendente.
    pub async fn record<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        input: PaymentInput,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let now = Utc::now();
        let mut tx = executor.begin().await?;

        // 1. O razão não aceita lançamento órfão.
        let subscription = self
            .subscription_repo
            .get_by_id(&mut *tx, subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Assinatura não encontrada.".to_string()))?;

        // 2. Valor negativo só existe como reembolso, e reembolso entra pelo
        // cancelamento, nunca por registro direto.
        if input.amount < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "O valor do pagamento não pode ser negativo.".to_string(),
            ));
        }

        // 3. Insere com referência resolvida e recalcula os totais.
        let payment = self
            .append_payment(&mut tx, subscription_id, &input, now)
            .await?;
        self.recompute_totals(&mut tx, subscription_id).await?;

        // 4. Pagamento confirmado ativa assinatura pendente.
        let mut activated = false;
        if payment.status == PaymentStatus::Completed
            && subscription.status == SubscriptionStatus::Pending
        {
            let rows = self
                .subscription_repo
                .apply_activation(&mut *tx, subscription_id, subscription.version)
                .await?;
            if rows == 0 {
                return Err(AppError::ConcurrentModification);
            }
            activated = true;
        }

        tx.commit().await?;

        if activated {
            self.usage_gate.invalidate(subscription.business_id).await;
        }

        Ok(payment)
    }

    // Única via de mutação de um pagamento: transição de status, só para frente.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        payment_id: Uuid,
        new_status: PaymentStatus,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let now = Utc::now();
        let mut tx = executor.begin().await?;

        // 1. Estado atual do pagamento.
        let payment = self
            .payment_repo
            .get_by_id(&mut *tx, payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pagamento não encontrado.".to_string()))?;

        // 2. PENDING -> COMPLETED | FAILED | CANCELLED; terminal não reabre.
        if !payment.status.can_transition_to(new_status) {
            return Err(AppError::InvalidTransition(format!(
                "Pagamento em {} não pode ir para {}.",
                payment.status.as_str(),
                new_status.as_str()
            )));
        }

        // 3. Aplica a transição; zero linhas = corrida com outra transição.
        let paid_at = (new_status == PaymentStatus::Completed).then_some(now);
        let rows = self
            .payment_repo
            .update_status(&mut *tx, payment_id, new_status, paid_at)
            .await?;
        if rows == 0 {
            return Err(AppError::ConcurrentModification);
        }

        // 4. Totais sempre recomputados do razão inteiro.
        self.recompute_totals(&mut tx, payment.subscription_id)
            .await?;

        // 5. Confirmação ativa assinatura pendente.
        let mut activated_business = None;
        if new_status == PaymentStatus::Completed {
            let subscription = self
                .subscription_repo
                .get_by_id(&mut *tx, payment.subscription_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound("Assinatura do pagamento não encontrada.".to_string())
                })?;
            if subscription.status == SubscriptionStatus::Pending {
                let rows = self
                    .subscription_repo
                    .apply_activation(&mut *tx, subscription.id, subscription.version)
                    .await?;
                if rows == 0 {
                    return Err(AppError::ConcurrentModification);
                }
                activated_business = Some(subscription.business_id);
            }
        }

        // 6. Devolve o estado final e fecha.
        let updated = self
            .payment_repo
            .get_by_id(&mut *tx, payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pagamento não encontrado.".to_string()))?;

        tx.commit().await?;

        if let Some(business_id) = activated_business {
            self.usage_gate.invalidate(business_id).await;
        }

        Ok(updated)
    }

    pub async fn get<'e, E>(&self, executor: E, payment_id: Uuid) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.payment_repo
            .get_by_id(executor, payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pagamento não encontrado.".to_string()))
    }

    pub async fn list_for_subscription<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.payment_repo
            .list_by_subscription(executor, subscription_id)
            .await
    }

    // =========================================================================
    //  PASSOS REUTILIZADOS DENTRO DAS TRANSAÇÕES DE CICLO DE VIDA
    // =========================================================================

    /// Lançamento acompanhando uma criação/renovação, dentro da transação do
    /// chamador. Valida o sinal, insere e recalcula os totais.
    pub async fn append_in_tx(
        &self,
        conn: &mut PgConnection,
        subscription_id: Uuid,
        input: &PaymentInput,
        now: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        if input.amount < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "O valor do pagamento não pode ser negativo.".to_string(),
            ));
        }
        let payment = self
            .append_payment(conn, subscription_id, input, now)
            .await?;
        self.recompute_totals(conn, subscription_id).await?;
        Ok(payment)
    }

    /// Lançamento compensatório de reembolso (valor negativo, já COMPLETED),
    /// dentro da transação de cancelamento. `refund_amount` chega positivo.
    pub async fn append_refund_in_tx(
        &self,
        conn: &mut PgConnection,
        subscription_id: Uuid,
        refund_amount: Decimal,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let reference = self.resolve_reference(conn, None, now).await?;
        let notes = format!("Reembolso: {}", reason);
        let payment = self
            .payment_repo
            .insert(
                &mut *conn,
                subscription_id,
                -refund_amount,
                PaymentMethod::Other,
                PaymentStatus::Completed,
                &reference,
                Some(&notes),
                Some(now),
            )
            .await?;
        self.recompute_totals(conn, subscription_id).await?;
        Ok(payment)
    }

    // Recalcula e persiste os totais da assinatura a partir do razão completo.
    async fn recompute_totals(
        &self,
        conn: &mut PgConnection,
        subscription_id: Uuid,
    ) -> Result<LedgerTotals, AppError> {
        let ledger = self
            .payment_repo
            .list_by_subscription(&mut *conn, subscription_id)
            .await?;
        let totals = LedgerTotals::from_ledger(&ledger);
        self.subscription_repo
            .update_totals(&mut *conn, subscription_id, &totals)
            .await?;
        Ok(totals)
    }

    async fn append_payment(
        &self,
        conn: &mut PgConnection,
        subscription_id: Uuid,
        input: &PaymentInput,
        now: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let status = input.status_or_default();
        let reference = self
            .resolve_reference(conn, input.reference_number.as_deref(), now)
            .await?;
        let paid_at = (status == PaymentStatus::Completed).then_some(now);
        self.payment_repo
            .insert(
                &mut *conn,
                subscription_id,
                input.amount,
                input.method,
                status,
                &reference,
                input.notes.as_deref(),
                paid_at,
            )
            .await
    }

    // Referência explícita duplicada é conflito; gerada colide -> tenta de novo.
    async fn resolve_reference(
        &self,
        conn: &mut PgConnection,
        explicit: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        if let Some(reference) = explicit {
            if self.payment_repo.reference_exists(&mut *conn, reference).await? {
                return Err(AppError::Conflict(format!(
                    "A referência de pagamento '{}' já está em uso.",
                    reference
                )));
            }
            return Ok(reference.to_string());
        }

        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let candidate = build_reference_number(now);
            if !self
                .payment_repo
                .reference_exists(&mut *conn, &candidate)
                .await?
            {
                return Ok(candidate);
            }
        }

        Err(AppError::InternalServerError(anyhow!(
            "Não foi possível gerar uma referência de pagamento única após {} tentativas.",
            MAX_REFERENCE_ATTEMPTS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reference_number_carries_timestamp_and_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let reference = build_reference_number(now);

        assert!(reference.starts_with("PAY-20240101120000-"));
        assert_eq!(reference.len(), "PAY-20240101120000-".len() + 4);

        let suffix = reference.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn reference_numbers_vary_between_calls() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut distinct = std::collections::HashSet::new();
        for _ in 0..20 {
            distinct.insert(build_reference_number(now));
        }
        // 20 sorteios de 4 dígitos hex: ao menos dois diferentes, na prática.
        assert!(distinct.len() > 1);
    }
}
