// src/models/subscription.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::payment::Payment;
use crate::models::plan::ResourceKind;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Pending,     // Criada, aguardando pagamento
    Trial,       // Período de teste (plano gratuito)
    Active,      // Paga e dentro do período
    GracePeriod, // Vencida, dentro da janela de carência
    Expired,     // Vencida de vez (reativável por renovação)
    Cancelled,   // Cancelada (estado absorvente)
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "PENDING",
            SubscriptionStatus::Trial => "TRIAL",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::GracePeriod => "GRACE_PERIOD",
            SubscriptionStatus::Expired => "EXPIRED",
            SubscriptionStatus::Cancelled => "CANCELLED",
        }
    }

    // Estados terminais: não bloqueiam a criação de uma nova assinatura.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Expired | SubscriptionStatus::Cancelled)
    }

    // Estados em que o negócio ainda pode usar os recursos do plano.
    pub fn is_accessible(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active
                | SubscriptionStatus::Trial
                | SubscriptionStatus::GracePeriod
        )
    }

    // Renovar só é legal a partir de ACTIVE, EXPIRED ou GRACE_PERIOD.
    // EXPIRED reativa a mesma linha, preservando o histórico de pagamentos.
    pub fn can_renew(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active
                | SubscriptionStatus::Expired
                | SubscriptionStatus::GracePeriod
        )
    }

    // Cancelar é legal em qualquer estado não-terminal. O cancelamento tem
    // precedência sobre a carência: uma assinatura em GRACE_PERIOD cai
    // direto para CANCELLED.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }
}

// Transição devida a uma assinatura durante a varredura de expiração.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTransition {
    ToGracePeriod,
    ToExpired,
}

impl SweepTransition {
    pub fn target(&self) -> SubscriptionStatus {
        match self {
            SweepTransition::ToGracePeriod => SubscriptionStatus::GracePeriod,
            SweepTransition::ToExpired => SubscriptionStatus::Expired,
        }
    }
}

// --- Structs ---

/// Assinatura de um negócio: exatamente um plano por vez, trocável na
/// renovação. Os totais são recomputados do razão de pagamentos, nunca
/// incrementados. A coluna `version` protege contra escritas concorrentes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    pub business_id: Uuid,
    pub plan_id: Uuid,

    pub status: SubscriptionStatus,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    pub auto_renew: bool,

    #[schema(example = "29.99")]
    pub total_paid_amount: Decimal,
    pub completed_payment_count: i32,
    pub pending_payment_count: i32,

    // Uso corrente reportado pelos módulos donos de cada recurso.
    pub current_staff_count: i32,
    pub current_menu_item_count: i32,
    pub current_table_count: i32,

    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,

    #[schema(ignore)]
    pub version: i64,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Leitura derivada, sem efeitos colaterais. `is_expired` sai do relógio,
/// não do status persistido: a resposta não espera a varredura passar.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    #[schema(example = 12)]
    pub days_remaining: i64,
    pub is_expired: bool,
    pub is_active: bool,
}

/// Resultado do cancelamento: a assinatura já cancelada e o lançamento de
/// reembolso, quando houve. Os dois saem da mesma transação.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResult {
    pub subscription: Subscription,
    pub refund: Option<Payment>,
}

/// Contadores de uma passada da varredura de vencimentos.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    #[schema(example = 3)]
    pub examined: u32,
    pub to_grace_period: u32,
    pub expired: u32,
    pub failed: u32,
}

impl Subscription {
    // Fim do período a partir da data de início e da duração contratada.
    pub fn period_end(start_date: DateTime<Utc>, duration_days: i32) -> DateTime<Utc> {
        start_date + Duration::days(i64::from(duration_days))
    }

    /// Novo fim de período após renovação: o tempo restante é preservado
    /// (estende do fim atual), e uma assinatura vencida reativa a partir
    /// de agora; nunca recomeça do zero com dias sobrando.
    pub fn renewed_end_date(&self, now: DateTime<Utc>, duration_days: i32) -> DateTime<Utc> {
        Self::period_end(now.max(self.end_date), duration_days)
    }

    pub fn is_expired_by(&self, now: DateTime<Utc>) -> bool {
        self.end_date <= now
    }

    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.end_date - now).num_days().max(0)
    }

    pub fn usage_snapshot(&self, now: DateTime<Utc>) -> UsageSnapshot {
        UsageSnapshot {
            days_remaining: self.days_remaining(now),
            is_expired: self.is_expired_by(now),
            is_active: self.status.is_accessible() && !self.is_expired_by(now),
        }
    }

    pub fn current_count_for(&self, kind: ResourceKind) -> i32 {
        match kind {
            ResourceKind::Staff => self.current_staff_count,
            ResourceKind::MenuItem => self.current_menu_item_count,
            ResourceKind::Table => self.current_table_count,
        }
    }

    /// Decide a transição de varredura devida neste instante, se houver.
    /// A decisão é pura: a mesma linha no mesmo instante decide sempre o
    /// mesmo, e uma linha já transicionada não decide nada (idempotência).
    pub fn due_sweep_transition(
        &self,
        now: DateTime<Utc>,
        grace_days: i32,
    ) -> Option<SweepTransition> {
        let grace_boundary = self.end_date + Duration::days(i64::from(grace_days));
        match self.status {
            SubscriptionStatus::Active if self.end_date <= now => {
                // Carência só cabe enquanto a janela ainda não esgotou: uma
                // varredura atrasada além dela expira a assinatura de uma vez,
                // sem parar em GRACE_PERIOD.
                if grace_days > 0 && now < grace_boundary {
                    Some(SweepTransition::ToGracePeriod)
                } else {
                    Some(SweepTransition::ToExpired)
                }
            }
            // Teste gratuito expira direto, sem carência.
            SubscriptionStatus::Trial if self.end_date <= now => Some(SweepTransition::ToExpired),
            SubscriptionStatus::GracePeriod if grace_boundary <= now => {
                Some(SweepTransition::ToExpired)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn subscription(
        status: SubscriptionStatus,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status,
            start_date,
            end_date,
            auto_renew: false,
            total_paid_amount: Decimal::ZERO,
            completed_payment_count: 0,
            pending_payment_count: 0,
            current_staff_count: 0,
            current_menu_item_count: 0,
            current_table_count: 0,
            cancelled_at: None,
            cancellation_reason: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn period_end_comes_after_start_for_positive_durations() {
        let start = date(2023, 1, 1);
        for duration_days in [1, 30, 365] {
            assert!(Subscription::period_end(start, duration_days) > start);
        }
        // Aritmética de dias, não de calendário: 365 dias a partir de um ano
        // comum fecham o ano; a partir de um bissexto param um dia antes.
        assert_eq!(Subscription::period_end(start, 365), date(2024, 1, 1));
        assert_eq!(
            Subscription::period_end(date(2024, 1, 1), 365),
            date(2024, 12, 31)
        );
    }

    #[test]
    fn renewal_preserves_remaining_time() {
        // Plano BASIC de 365 dias vencendo em 2025-01-01. Renovado em
        // 2024-12-20 (12 dias restantes): o novo fim estende do fim atual,
        // 2025-01-01 + 365 = 2026-01-01, e não 2024-12-20 + 365.
        let sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2025, 1, 1));
        let renewed = sub.renewed_end_date(date(2024, 12, 20), 365);
        assert_eq!(renewed, date(2026, 1, 1));
        assert!(renewed > sub.end_date);
    }

    #[test]
    fn renewal_of_expired_subscription_restarts_from_now() {
        let sub = subscription(SubscriptionStatus::Expired, date(2023, 1, 1), date(2024, 1, 1));
        let now = date(2024, 6, 15);
        assert_eq!(sub.renewed_end_date(now, 30), date(2024, 7, 15));
    }

    #[test]
    fn days_remaining_never_goes_negative() {
        let sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2024, 2, 1));
        assert_eq!(sub.days_remaining(date(2024, 1, 20)), 12);
        assert_eq!(sub.days_remaining(date(2024, 3, 1)), 0);
    }

    #[test]
    fn snapshot_reports_expiry_from_the_clock_not_the_status() {
        // Vencida ontem mas ainda não varrida: o status persistido diz ACTIVE,
        // a leitura diz vencida mesmo assim.
        let sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2024, 6, 1));
        let snapshot = sub.usage_snapshot(date(2024, 6, 2));
        assert!(snapshot.is_expired);
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.days_remaining, 0);

        let before = sub.usage_snapshot(date(2024, 5, 20));
        assert!(!before.is_expired);
        assert!(before.is_active);
        assert_eq!(before.days_remaining, 12);
    }

    #[test]
    fn terminal_and_accessible_status_sets() {
        use SubscriptionStatus::*;
        for status in [Pending, Trial, Active, GracePeriod] {
            assert!(!status.is_terminal(), "{} não é terminal", status.as_str());
        }
        for status in [Expired, Cancelled] {
            assert!(status.is_terminal(), "{} é terminal", status.as_str());
        }
        for status in [Trial, Active, GracePeriod] {
            assert!(status.is_accessible());
        }
        for status in [Pending, Expired, Cancelled] {
            assert!(!status.is_accessible());
        }
    }

    #[test]
    fn renewal_legality_is_exactly_active_expired_grace() {
        use SubscriptionStatus::*;
        for status in [Active, Expired, GracePeriod] {
            assert!(status.can_renew());
        }
        for status in [Pending, Trial, Cancelled] {
            assert!(!status.can_renew());
        }
    }

    #[test]
    fn cancellation_is_legal_from_any_non_terminal_status() {
        use SubscriptionStatus::*;
        for status in [Pending, Trial, Active, GracePeriod] {
            assert!(status.can_cancel());
        }
        for status in [Expired, Cancelled] {
            assert!(!status.can_cancel());
        }
    }

    #[test]
    fn sweep_sends_overdue_active_to_grace_when_configured() {
        let sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2024, 6, 1));
        assert_eq!(
            sub.due_sweep_transition(date(2024, 6, 2), 7),
            Some(SweepTransition::ToGracePeriod)
        );
        // Sem janela de carência configurada, expira direto.
        assert_eq!(
            sub.due_sweep_transition(date(2024, 6, 2), 0),
            Some(SweepTransition::ToExpired)
        );
        // Dentro do período nada acontece.
        assert_eq!(sub.due_sweep_transition(date(2024, 5, 31), 7), None);
    }

    #[test]
    fn delayed_sweep_expires_active_past_the_whole_grace_window() {
        // Varredura parada por mais tempo que a carência (vencimento em
        // 2024-06-01, carência de 7 dias, varrida só em 2024-06-20): a
        // janela inteira já passou e a assinatura expira de uma vez.
        let sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2024, 6, 1));
        assert_eq!(
            sub.due_sweep_transition(date(2024, 6, 20), 7),
            Some(SweepTransition::ToExpired)
        );

        // Um instante antes do fim da janela ainda cabe carência; no limite
        // exato, não (mesma fronteira que expira uma GRACE_PERIOD).
        assert_eq!(
            sub.due_sweep_transition(date(2024, 6, 7), 7),
            Some(SweepTransition::ToGracePeriod)
        );
        assert_eq!(
            sub.due_sweep_transition(date(2024, 6, 8), 7),
            Some(SweepTransition::ToExpired)
        );
    }

    #[test]
    fn sweep_expires_grace_only_past_the_grace_boundary() {
        let sub = subscription(
            SubscriptionStatus::GracePeriod,
            date(2024, 1, 1),
            date(2024, 6, 1),
        );
        assert_eq!(sub.due_sweep_transition(date(2024, 6, 5), 7), None);
        assert_eq!(
            sub.due_sweep_transition(date(2024, 6, 8), 7),
            Some(SweepTransition::ToExpired)
        );
    }

    #[test]
    fn sweep_expires_overdue_trials_without_grace() {
        let sub = subscription(SubscriptionStatus::Trial, date(2024, 1, 1), date(2024, 2, 1));
        assert_eq!(
            sub.due_sweep_transition(date(2024, 2, 2), 7),
            Some(SweepTransition::ToExpired)
        );
    }

    #[test]
    fn sweep_decision_is_idempotent_after_application() {
        let now = date(2024, 6, 2);

        // ACTIVE vencida com carência: decide GRACE_PERIOD; aplicada a
        // transição, a mesma linha no mesmo instante não decide mais nada.
        let mut sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2024, 6, 1));
        let transition = sub.due_sweep_transition(now, 7).unwrap();
        sub.status = transition.target();
        assert_eq!(sub.status, SubscriptionStatus::GracePeriod);
        assert_eq!(sub.due_sweep_transition(now, 7), None);

        // Sem carência: decide EXPIRED e idem.
        let mut sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2024, 6, 1));
        let transition = sub.due_sweep_transition(now, 0).unwrap();
        sub.status = transition.target();
        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert_eq!(sub.due_sweep_transition(now, 0), None);

        // Varredura atrasada além da carência inteira: decide EXPIRED de uma
        // vez, e a re-execução no mesmo instante também não decide nada.
        let mut sub = subscription(SubscriptionStatus::Active, date(2024, 1, 1), date(2024, 6, 1));
        let late = date(2024, 6, 20);
        let transition = sub.due_sweep_transition(late, 7).unwrap();
        sub.status = transition.target();
        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert_eq!(sub.due_sweep_transition(late, 7), None);
    }

    #[test]
    fn sweep_ignores_pending_and_terminal_statuses() {
        use SubscriptionStatus::*;
        let long_past = date(2024, 6, 30);
        for status in [Pending, Expired, Cancelled] {
            let sub = subscription(status, date(2024, 1, 1), date(2024, 2, 1));
            assert_eq!(sub.due_sweep_transition(long_past, 7), None);
        }
    }
}
