// src/config.rs

use crate::{
    db::{ExchangeRateRepository, PaymentRepository, PlanRepository, SubscriptionRepository},
    services::{
        ExchangeRateService, PaymentService, PlanService, SubscriptionService, SweeperService,
        UsageGate,
    },
};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, time::Duration};

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

// Parâmetros de cobrança vindos do ambiente, com padrões de produção.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Dias de carência após o vencimento. Zero desliga a carência e a
    /// varredura expira direto.
    pub grace_period_days: i32,
    pub sweep_interval_secs: u64,
    /// Cotação de exibição usada enquanto nenhuma foi cadastrada.
    pub default_exchange_rate: Decimal,
    pub usage_gate_ttl_secs: u64,
}

impl BillingConfig {
    pub fn from_env() -> Self {
        Self {
            grace_period_days: env_or("GRACE_PERIOD_DAYS", 7_i32).max(0),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", 86_400_u64),
            default_exchange_rate: env_or("DEFAULT_EXCHANGE_RATE", Decimal::from(4_000)),
            usage_gate_ttl_secs: env_or("USAGE_GATE_TTL_SECS", 60_u64),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub billing: BillingConfig,
    pub plan_service: PlanService,
    pub subscription_service: SubscriptionService,
    pub payment_service: PaymentService,
    pub exchange_rate_service: ExchangeRateService,
    pub sweeper_service: SweeperService,
    pub usage_gate: UsageGate,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let billing = BillingConfig::from_env();

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let plan_repo = PlanRepository::new(db_pool.clone());
        let subscription_repo = SubscriptionRepository::new(db_pool.clone());
        let payment_repo = PaymentRepository::new(db_pool.clone());
        let exchange_rate_repo = ExchangeRateRepository::new(db_pool.clone());

        let usage_gate = UsageGate::new(
            db_pool.clone(),
            subscription_repo.clone(),
            plan_repo.clone(),
            Duration::from_secs(billing.usage_gate_ttl_secs),
        );
        let payment_service = PaymentService::new(
            payment_repo,
            subscription_repo.clone(),
            usage_gate.clone(),
        );
        let subscription_service = SubscriptionService::new(
            subscription_repo.clone(),
            plan_repo.clone(),
            payment_service.clone(),
            usage_gate.clone(),
        );
        let plan_service = PlanService::new(plan_repo);
        let exchange_rate_service =
            ExchangeRateService::new(exchange_rate_repo, billing.default_exchange_rate);
        let sweeper_service = SweeperService::new(
            db_pool.clone(),
            subscription_repo,
            usage_gate.clone(),
            billing.grace_period_days,
        );

        Ok(Self {
            db_pool,
            billing,
            plan_service,
            subscription_service,
            payment_service,
            exchange_rate_service,
            sweeper_service,
            usage_gate,
        })
    }
}
