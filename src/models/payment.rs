// src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,   // Registrado, aguardando confirmação
    Completed, // Confirmado (conta nos totais)
    Failed,    // Falhou na captura
    Cancelled, // Cancelado antes da captura
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    // Transições só para frente: PENDING -> COMPLETED | FAILED | CANCELLED.
    // Nenhum estado terminal reabre.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(self, PaymentStatus::Pending) && next != PaymentStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    MobilePayment,
    Other,
}

// --- Structs ---

/// Lançamento do razão de pagamentos de uma assinatura. O razão é
/// append-only: o valor é imutável após a criação e correções entram como
/// um novo lançamento compensatório (reembolso = valor negativo).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    pub subscription_id: Uuid,

    #[schema(example = "29.99")]
    pub amount: Decimal,

    pub method: PaymentMethod,
    pub status: PaymentStatus,

    #[schema(example = "PAY-20240101120000-A3F1")]
    pub reference_number: String,

    pub notes: Option<String>,

    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Dados de pagamento vindos de fora: acompanhando uma criação/renovação ou
/// registrados avulsos pelo coletor externo de pagamentos.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    #[schema(example = "29.99")]
    pub amount: Decimal,

    pub method: PaymentMethod,

    // Ausente = PENDING (aguardando confirmação).
    #[serde(default)]
    pub status: Option<PaymentStatus>,

    // Referência externa explícita; ausente = gerada com checagem de colisão.
    pub reference_number: Option<String>,

    pub notes: Option<String>,
}

impl PaymentInput {
    pub fn status_or_default(&self) -> PaymentStatus {
        self.status.unwrap_or(PaymentStatus::Pending)
    }
}

/// Totais de uma assinatura, sempre recomputados do razão inteiro em vez de
/// incrementados, para resistir a atualizações repetidas ou fora de ordem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTotals {
    pub total_paid: Decimal,
    pub completed_count: i32,
    pub pending_count: i32,
}

impl LedgerTotals {
    pub fn from_ledger(payments: &[Payment]) -> Self {
        let mut totals = LedgerTotals {
            total_paid: Decimal::ZERO,
            completed_count: 0,
            pending_count: 0,
        };
        for payment in payments {
            match payment.status {
                PaymentStatus::Completed => {
                    totals.total_paid += payment.amount;
                    totals.completed_count += 1;
                }
                PaymentStatus::Pending => totals.pending_count += 1,
                PaymentStatus::Failed | PaymentStatus::Cancelled => {}
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment(amount: Decimal, status: PaymentStatus) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            subscription_id: Uuid::new_v4(),
            amount,
            method: PaymentMethod::BankTransfer,
            status,
            reference_number: format!("PAY-TEST-{}", Uuid::new_v4().simple()),
            notes: None,
            paid_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn only_pending_payments_can_transition() {
        use PaymentStatus::*;
        for next in [Completed, Failed, Cancelled] {
            assert!(Pending.can_transition_to(next));
        }
        assert!(!Pending.can_transition_to(Pending));
        for terminal in [Completed, Failed, Cancelled] {
            for next in [Pending, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn totals_count_only_completed_amounts() {
        // 29.99 registrado PENDING não conta; depois de COMPLETED conta.
        let pending_only = vec![payment(dec!(29.99), PaymentStatus::Pending)];
        let totals = LedgerTotals::from_ledger(&pending_only);
        assert_eq!(totals.total_paid, Decimal::ZERO);
        assert_eq!(totals.completed_count, 0);
        assert_eq!(totals.pending_count, 1);

        let completed = vec![payment(dec!(29.99), PaymentStatus::Completed)];
        let totals = LedgerTotals::from_ledger(&completed);
        assert_eq!(totals.total_paid, dec!(29.99));
        assert_eq!(totals.completed_count, 1);
        assert_eq!(totals.pending_count, 0);
    }

    #[test]
    fn totals_ignore_failed_and_cancelled() {
        let ledger = vec![
            payment(dec!(10.00), PaymentStatus::Completed),
            payment(dec!(99.00), PaymentStatus::Failed),
            payment(dec!(55.00), PaymentStatus::Cancelled),
            payment(dec!(5.50), PaymentStatus::Pending),
        ];
        let totals = LedgerTotals::from_ledger(&ledger);
        assert_eq!(totals.total_paid, dec!(10.00));
        assert_eq!(totals.completed_count, 1);
        assert_eq!(totals.pending_count, 1);
    }

    #[test]
    fn refunds_enter_as_negative_completed_amounts() {
        let ledger = vec![
            payment(dec!(100.00), PaymentStatus::Completed),
            payment(dec!(-30.00), PaymentStatus::Completed),
        ];
        let totals = LedgerTotals::from_ledger(&ledger);
        assert_eq!(totals.total_paid, dec!(70.00));
        assert_eq!(totals.completed_count, 2);
    }

    #[test]
    fn recompute_is_stable_under_reordering() {
        let a = payment(dec!(20.00), PaymentStatus::Completed);
        let b = payment(dec!(15.00), PaymentStatus::Completed);
        let c = payment(dec!(7.77), PaymentStatus::Pending);
        let forward = LedgerTotals::from_ledger(&[a.clone(), b.clone(), c.clone()]);
        let backward = LedgerTotals::from_ledger(&[c, b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward.total_paid, dec!(35.00));
    }
}
