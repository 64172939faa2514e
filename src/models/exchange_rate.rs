// src/models/exchange_rate.rs

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Taxa de câmbio historizada para exibição em moeda secundária. Exatamente
/// uma taxa ativa por vez; os pagamentos continuam registrados em USD e a
/// conversão é só de exibição, nunca a moeda de registro.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "4000.0")]
    pub usd_to_base_rate: Decimal,

    pub is_active: bool,

    pub notes: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A cotação vigente: a linha ativa do banco, ou a cotação padrão de
/// configuração quando ninguém cadastrou nenhuma ainda.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentRateView {
    #[schema(example = "4100.0")]
    pub usd_to_base_rate: Decimal,

    /// `true` quando o valor veio da configuração, não do banco.
    pub is_default: bool,

    pub as_of: Option<DateTime<Utc>>,
}

/// Resultado da conversão de exibição para a moeda secundária.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedAmount {
    #[schema(example = "29.99")]
    pub amount_usd: Decimal,

    pub usd_to_base_rate: Decimal,

    #[schema(example = "122959.00")]
    pub amount_base: Decimal,

    pub is_default_rate: bool,
}

impl CurrentRateView {
    pub fn from_stored(rate: &ExchangeRate) -> Self {
        Self {
            usd_to_base_rate: rate.usd_to_base_rate,
            is_default: false,
            as_of: rate.updated_at.or(rate.created_at),
        }
    }

    pub fn fallback(default_rate: Decimal) -> Self {
        Self {
            usd_to_base_rate: default_rate,
            is_default: true,
            as_of: None,
        }
    }

    // Conversão de exibição: duas casas, arredondamento comercial.
    pub fn convert_from_usd(&self, amount_usd: Decimal) -> ConvertedAmount {
        let amount_base = (amount_usd * self.usd_to_base_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        ConvertedAmount {
            amount_usd,
            usd_to_base_rate: self.usd_to_base_rate,
            amount_base,
            is_default_rate: self.is_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_with_two_decimal_places() {
        let rate = CurrentRateView::fallback(dec!(4000));
        assert_eq!(rate.convert_from_usd(dec!(29.99)).amount_base, dec!(119960.00));
        assert_eq!(rate.convert_from_usd(dec!(0.001)).amount_base, dec!(4.00));
    }

    #[test]
    fn rounds_midpoints_away_from_zero() {
        let rate = CurrentRateView::fallback(dec!(1.005));
        assert_eq!(rate.convert_from_usd(dec!(1)).amount_base, dec!(1.01));
    }

    #[test]
    fn stored_rate_wins_over_the_default() {
        let stored = ExchangeRate {
            id: Uuid::new_v4(),
            usd_to_base_rate: dec!(4100),
            is_active: true,
            notes: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        let view = CurrentRateView::from_stored(&stored);
        assert!(!view.is_default);
        assert_eq!(view.usd_to_base_rate, dec!(4100));
        assert!(view.as_of.is_some());

        let fallback = CurrentRateView::fallback(dec!(4000));
        assert!(fallback.is_default);
        assert!(fallback.as_of.is_none());
    }
}
