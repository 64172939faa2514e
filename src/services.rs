pub mod plan_service;
pub use plan_service::PlanService;
pub mod subscription_service;
pub use subscription_service::SubscriptionService;
pub mod payment_service;
pub use payment_service::PaymentService;
pub mod exchange_rate_service;
pub use exchange_rate_service::ExchangeRateService;
pub mod sweeper_service;
pub mod usage_gate;

pub use sweeper_service::SweeperService;
pub use usage_gate::UsageGate;
