// src/services/usage_gate.rs

use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PlanRepository, SubscriptionRepository},
    models::plan::{FeatureLimit, ResourceKind},
};

// Entitlement de um negócio, como o gate enxerga: ou não há assinatura com
// direito de uso, ou há, com os limites do plano dela.
#[derive(Clone)]
enum GateEntry {
    Inaccessible,
    Accessible {
        max_staff: FeatureLimit,
        max_menu_items: FeatureLimit,
        max_tables: FeatureLimit,
    },
}

impl GateEntry {
    fn allows(&self, kind: ResourceKind, current_count: i32) -> bool {
        match self {
            // Sem assinatura acessível nega tudo, não importa o histórico.
            GateEntry::Inaccessible => false,
            GateEntry::Accessible {
                max_staff,
                max_menu_items,
                max_tables,
            } => {
                let limit = match kind {
                    ResourceKind::Staff => *max_staff,
                    ResourceKind::MenuItem => *max_menu_items,
                    ResourceKind::Table => *max_tables,
                };
                limit.allows_adding(current_count)
            }
        }
    }
}

/// Responde "o negócio X pode criar mais um <recurso> agora?". É consultado
/// em todo caminho de criação de recurso do resto do sistema, então a
/// resposta sai de um cache curto por negócio; qualquer transição que mude o
/// direito de uso derruba a entrada.
#[derive(Clone)]
pub struct UsageGate {
    pool: PgPool,
    subscription_repo: SubscriptionRepository,
    plan_repo: PlanRepository,
    cache: Cache<Uuid, GateEntry>,
}

impl UsageGate {
    pub fn new(
        pool: PgPool,
        subscription_repo: SubscriptionRepository,
        plan_repo: PlanRepository,
        ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();
        Self {
            pool,
            subscription_repo,
            plan_repo,
            cache,
        }
    }

    /// Nunca retorna erro: sem resposta confiável (banco fora do ar), nega.
    /// Ausência de direito é um `false`, não uma exceção.
    pub async fn can_add(
        &self,
        business_id: Uuid,
        kind: ResourceKind,
        current_count: i32,
    ) -> bool {
        let loaded = self
            .cache
            .try_get_with(business_id, self.load_entry(business_id))
            .await;

        match loaded {
            Ok(entry) => entry.allows(kind, current_count),
            Err(err) => {
                tracing::warn!(
                    "Gate de limites indisponível para o negócio {}: {}",
                    business_id,
                    err
                );
                false
            }
        }
    }

    /// Derruba a entrada do negócio. Chamado em toda transição que muda o
    /// direito de uso: criação, renovação, cancelamento, ativação e varredura.
    pub async fn invalidate(&self, business_id: Uuid) {
        self.cache.invalidate(&business_id).await;
    }

    async fn load_entry(&self, business_id: Uuid) -> Result<GateEntry, AppError> {
        let Some(subscription) = self
            .subscription_repo
            .find_accessible_by_business(business_id)
            .await?
        else {
            return Ok(GateEntry::Inaccessible);
        };

        let Some(plan) = self
            .plan_repo
            .get_by_id(&self.pool, subscription.plan_id)
            .await?
        else {
            tracing::warn!(
                "Assinatura {} referencia plano inexistente {}",
                subscription.id,
                subscription.plan_id
            );
            return Ok(GateEntry::Inaccessible);
        };

        Ok(GateEntry::Accessible {
            max_staff: plan.max_staff,
            max_menu_items: plan.max_menu_items,
            max_tables: plan.max_tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inaccessible_business_is_denied_every_kind() {
        let entry = GateEntry::Inaccessible;
        for kind in [ResourceKind::Staff, ResourceKind::MenuItem, ResourceKind::Table] {
            assert!(!entry.allows(kind, 0));
        }
    }

    #[test]
    fn accessible_business_is_checked_against_the_plan_limit() {
        let entry = GateEntry::Accessible {
            max_staff: FeatureLimit::Limited(5),
            max_menu_items: FeatureLimit::Unlimited,
            max_tables: FeatureLimit::Limited(0),
        };
        assert!(entry.allows(ResourceKind::Staff, 4));
        assert!(!entry.allows(ResourceKind::Staff, 5));
        assert!(entry.allows(ResourceKind::MenuItem, 999_999));
        assert!(!entry.allows(ResourceKind::Table, 0));
    }
}
