pub mod plan;
pub mod subscription;
pub mod payment;
pub mod exchange_rate;
