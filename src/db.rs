pub mod plan_repo;
pub use plan_repo::PlanRepository;
pub mod subscription_repo;
pub use subscription_repo::SubscriptionRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod exchange_rate_repo;

pub use exchange_rate_repo::ExchangeRateRepository;
