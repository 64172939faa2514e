// src/models/plan.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

// Tipos de recurso cujo volume é limitado pelo plano contratado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Staff,
    MenuItem,
    Table,
}

impl ResourceKind {
    // Nome do recurso para mensagens de erro voltadas ao usuário.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Staff => "funcionários",
            ResourceKind::MenuItem => "itens de cardápio",
            ResourceKind::Table => "mesas",
        }
    }
}

/// Limite de um recurso dentro de um plano. `Unlimited` é a sentinela
/// explícita (persistida como NULL), nunca um número mágico como -1.
/// No JSON e no schema a sentinela aparece como inteiro opcional, por isso
/// os campos que a usam declaram `value_type = Option<i32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<i32>", into = "Option<i32>")]
pub enum FeatureLimit {
    Unlimited,
    Limited(i32),
}

impl FeatureLimit {
    // Cabe mais um, dado o total atual?
    pub fn allows_adding(&self, current_count: i32) -> bool {
        match self {
            FeatureLimit::Unlimited => true,
            FeatureLimit::Limited(max) => current_count < *max,
        }
    }

    // O uso atual inteiro cabe dentro do limite? (checagem de troca de plano)
    pub fn accommodates(&self, current_count: i32) -> bool {
        match self {
            FeatureLimit::Unlimited => true,
            FeatureLimit::Limited(max) => current_count <= *max,
        }
    }
}

impl From<Option<i32>> for FeatureLimit {
    fn from(value: Option<i32>) -> Self {
        match value {
            Some(max) => FeatureLimit::Limited(max),
            None => FeatureLimit::Unlimited,
        }
    }
}

impl From<FeatureLimit> for Option<i32> {
    fn from(limit: FeatureLimit) -> Self {
        match limit {
            FeatureLimit::Unlimited => None,
            FeatureLimit::Limited(max) => Some(max),
        }
    }
}

// --- Structs ---

/// Plano de assinatura. Imutável depois de referenciado por uma assinatura:
/// mudanças de preço/limite entram como uma nova linha, nunca como update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "BASIC")]
    pub name: String,

    pub description: Option<String>,

    #[schema(example = "29.99")]
    pub price: Decimal,

    #[schema(example = "USD")]
    pub currency: String,

    #[schema(example = 365)]
    pub duration_days: i32,

    #[schema(value_type = Option<i32>, example = 5)]
    pub max_staff: FeatureLimit,

    #[schema(value_type = Option<i32>, example = 100)]
    pub max_menu_items: FeatureLimit,

    #[schema(value_type = Option<i32>, example = 10)]
    pub max_tables: FeatureLimit,

    // Ordem estável do catálogo, independente da data de criação.
    pub display_order: i32,

    pub is_active: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// FromRow manual: as colunas de limite são INT NULL e viram a sentinela.
impl FromRow<'_, PgRow> for Plan {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            currency: row.try_get("currency")?,
            duration_days: row.try_get("duration_days")?,
            max_staff: FeatureLimit::from(row.try_get::<Option<i32>, _>("max_staff")?),
            max_menu_items: FeatureLimit::from(row.try_get::<Option<i32>, _>("max_menu_items")?),
            max_tables: FeatureLimit::from(row.try_get::<Option<i32>, _>("max_tables")?),
            display_order: row.try_get("display_order")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl Plan {
    pub fn limit_for(&self, kind: ResourceKind) -> FeatureLimit {
        match kind {
            ResourceKind::Staff => self.max_staff,
            ResourceKind::MenuItem => self.max_menu_items,
            ResourceKind::Table => self.max_tables,
        }
    }

    // Plano gratuito entra como período de teste, não como assinatura paga.
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan_with_limits(
        max_staff: FeatureLimit,
        max_menu_items: FeatureLimit,
        max_tables: FeatureLimit,
    ) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "BASIC".to_string(),
            description: None,
            price: dec!(29.99),
            currency: "USD".to_string(),
            duration_days: 365,
            max_staff,
            max_menu_items,
            max_tables,
            display_order: 1,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn limited_allows_adding_below_max_only() {
        let limit = FeatureLimit::Limited(5);
        assert!(limit.allows_adding(0));
        assert!(limit.allows_adding(4));
        assert!(!limit.allows_adding(5));
        assert!(!limit.allows_adding(6));
    }

    #[test]
    fn unlimited_always_allows_adding() {
        let limit = FeatureLimit::Unlimited;
        assert!(limit.allows_adding(0));
        assert!(limit.allows_adding(1_000_000));
    }

    #[test]
    fn accommodates_accepts_usage_at_the_limit() {
        let limit = FeatureLimit::Limited(10);
        assert!(limit.accommodates(9));
        assert!(limit.accommodates(10));
        assert!(!limit.accommodates(11));
        assert!(FeatureLimit::Unlimited.accommodates(i32::MAX));
    }

    #[test]
    fn sentinel_round_trips_through_nullable_column() {
        assert_eq!(FeatureLimit::from(None), FeatureLimit::Unlimited);
        assert_eq!(FeatureLimit::from(Some(7)), FeatureLimit::Limited(7));
        assert_eq!(Option::<i32>::from(FeatureLimit::Unlimited), None);
        assert_eq!(Option::<i32>::from(FeatureLimit::Limited(7)), Some(7));
    }

    #[test]
    fn limit_for_maps_each_resource_kind() {
        let plan = plan_with_limits(
            FeatureLimit::Limited(5),
            FeatureLimit::Limited(50),
            FeatureLimit::Unlimited,
        );
        assert_eq!(plan.limit_for(ResourceKind::Staff), FeatureLimit::Limited(5));
        assert_eq!(plan.limit_for(ResourceKind::MenuItem), FeatureLimit::Limited(50));
        assert_eq!(plan.limit_for(ResourceKind::Table), FeatureLimit::Unlimited);
    }

    #[test]
    fn zero_price_is_a_free_plan() {
        let mut plan = plan_with_limits(
            FeatureLimit::Limited(1),
            FeatureLimit::Limited(1),
            FeatureLimit::Limited(1),
        );
        assert!(!plan.is_free());
        plan.price = dec!(0.00);
        assert!(plan.is_free());
    }
}
