// src/services/sweeper_service.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::SubscriptionRepository,
    models::subscription::{SweepResult, SweepTransition},
    services::usage_gate::UsageGate,
};

/// Varredura de vencimentos. Roda em lote, no relógio que recebe: assinaturas
/// ativas vencidas caem em carência (ou expiram direto, se a carência está
/// desligada ou a janela inteira já passou), períodos de teste vencidos
/// expiram, e carências esgotadas expiram. Nunca toca no razão de pagamentos.
#[derive(Clone)]
pub struct SweeperService {
    pool: PgPool,
    subscription_repo: SubscriptionRepository,
    usage_gate: UsageGate,
    grace_period_days: i32,
}

impl SweeperService {
    pub fn new(
        pool: PgPool,
        subscription_repo: SubscriptionRepository,
        usage_gate: UsageGate,
        grace_period_days: i32,
    ) -> Self {
        Self {
            pool,
            subscription_repo,
            usage_gate,
            grace_period_days,
        }
    }

    /// Uma passada completa. O `now` entra por parâmetro para a rotina ser
    /// repetível: rodar duas vezes com o mesmo relógio não transiciona
    /// ninguém duas vezes, porque a seleção só enxerga status que ainda
    /// devem transição.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepResult, AppError> {
        let due = self
            .subscription_repo
            .list_due_for_sweep(&self.pool, now, self.grace_period_days)
            .await?;

        let mut result = SweepResult {
            examined: due.len() as u32,
            ..Default::default()
        };

        for subscription in due {
            let Some(transition) = subscription.due_sweep_transition(now, self.grace_period_days)
            else {
                continue;
            };

            match self
                .subscription_repo
                .apply_sweep_transition(
                    &self.pool,
                    subscription.id,
                    subscription.version,
                    subscription.status,
                    transition.target(),
                )
                .await
            {
                // Alguém mexeu na linha entre a seleção e a escrita
                // (renovação, cancelamento, outra varredura). Pula sem contar.
                Ok(0) => continue,
                Ok(_) => {
                    match transition {
                        SweepTransition::ToGracePeriod => result.to_grace_period += 1,
                        SweepTransition::ToExpired => result.expired += 1,
                    }
                    self.usage_gate.invalidate(subscription.business_id).await;
                }
                Err(e) => {
                    // Falha pontual não derruba o lote.
                    tracing::warn!(
                        "Varredura falhou para a assinatura {}: {}",
                        subscription.id,
                        e
                    );
                    result.failed += 1;
                }
            }
        }

        tracing::info!(
            "🧹 Varredura concluída: {} examinadas, {} em carência, {} expiradas, {} falhas",
            result.examined,
            result.to_grace_period,
            result.expired,
            result.failed
        );

        Ok(result)
    }
}
