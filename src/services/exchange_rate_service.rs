// src/services/exchange_rate_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};

use crate::{
    common::error::AppError,
    db::ExchangeRateRepository,
    models::exchange_rate::{ConvertedAmount, CurrentRateView, ExchangeRate},
};

#[derive(Clone)]
pub struct ExchangeRateService {
    exchange_rate_repo: ExchangeRateRepository,
    default_rate: Decimal,
}

impl ExchangeRateService {
    pub fn new(exchange_rate_repo: ExchangeRateRepository, default_rate: Decimal) -> Self {
        Self {
            exchange_rate_repo,
            default_rate,
        }
    }

    /// Cotação vigente: a linha ativa, ou a padrão de configuração quando
    /// ninguém cadastrou nenhuma ainda. Consultada a cada uso, sem ficar
    /// pendurada em estado global.
    pub async fn current_rate(&self) -> Result<CurrentRateView, AppError> {
        match self.exchange_rate_repo.find_active().await? {
            Some(rate) => Ok(CurrentRateView::from_stored(&rate)),
            None => Ok(CurrentRateView::fallback(self.default_rate)),
        }
    }

    pub async fn convert(&self, amount_usd: Decimal) -> Result<ConvertedAmount, AppError> {
        if amount_usd < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "O valor a converter não pode ser negativo.".to_string(),
            ));
        }
        let rate = self.current_rate().await?;
        Ok(rate.convert_from_usd(amount_usd))
    }

    pub async fn set_rate<'e, E>(
        &self,
        executor: E,
        usd_to_base_rate: Decimal,
        notes: Option<&str>,
    ) -> Result<ExchangeRate, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if usd_to_base_rate <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "A cotação precisa ser maior que zero.".to_string(),
            ));
        }

        let mut tx = executor.begin().await?;

        // 1. Só uma cotação ativa por vez: desativa as anteriores.
        self.exchange_rate_repo.deactivate_all(&mut *tx).await?;

        // 2. Grava a nova como vigente, preservando o histórico.
        let rate = self
            .exchange_rate_repo
            .insert_active(&mut *tx, usd_to_base_rate, notes)
            .await?;

        tx.commit().await?;

        Ok(rate)
    }

    pub async fn history(&self) -> Result<Vec<ExchangeRate>, AppError> {
        self.exchange_rate_repo.list_history().await
    }
}
