// src/docs.rs

use crate::handlers;
use crate::models;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Plans ---
        handlers::plans::create_plan,
        handlers::plans::list_plans,
        handlers::plans::get_plan,
        handlers::plans::deactivate_plan,

        // --- Subscriptions ---
        handlers::subscriptions::create_subscription,
        handlers::subscriptions::get_subscription,
        handlers::subscriptions::get_usage_snapshot,
        handlers::subscriptions::renew_subscription,
        handlers::subscriptions::cancel_subscription,
        handlers::subscriptions::list_subscription_payments,
        handlers::subscriptions::list_business_subscriptions,
        handlers::subscriptions::get_current_subscription,

        // --- Payments ---
        handlers::payments::record_payment,
        handlers::payments::get_payment,
        handlers::payments::update_payment_status,

        // --- Exchange Rate ---
        handlers::exchange_rates::get_current_rate,
        handlers::exchange_rates::set_rate,
        handlers::exchange_rates::get_rate_history,
        handlers::exchange_rates::convert_amount,

        // --- Usage ---
        handlers::usage::can_add,
        handlers::usage::report_usage,

        // --- Admin ---
        handlers::admin::run_sweep,
        handlers::admin::list_expiring_subscriptions,
    ),
    components(
        schemas(
            // --- Plans ---
            models::plan::ResourceKind,
            models::plan::Plan,

            // --- Subscriptions ---
            models::subscription::SubscriptionStatus,
            models::subscription::Subscription,
            models::subscription::UsageSnapshot,
            models::subscription::CancellationResult,
            models::subscription::SweepResult,

            // --- Payments ---
            models::payment::PaymentStatus,
            models::payment::PaymentMethod,
            models::payment::Payment,
            models::payment::PaymentInput,

            // --- Exchange Rate ---
            models::exchange_rate::ExchangeRate,
            models::exchange_rate::CurrentRateView,
            models::exchange_rate::ConvertedAmount,

            // --- Payloads ---
            handlers::plans::CreatePlanPayload,
            handlers::subscriptions::CreateSubscriptionPayload,
            handlers::subscriptions::RenewSubscriptionPayload,
            handlers::subscriptions::CancelSubscriptionPayload,
            handlers::payments::RecordPaymentPayload,
            handlers::payments::UpdatePaymentStatusPayload,
            handlers::exchange_rates::SetExchangeRatePayload,
            handlers::usage::ReportUsagePayload,
            handlers::usage::CanAddResponse,
        )
    ),
    tags(
        (name = "Plans", description = "Catálogo de planos de assinatura"),
        (name = "Subscriptions", description = "Ciclo de vida das assinaturas (criação, renovação, cancelamento)"),
        (name = "Payments", description = "Razão de pagamentos das assinaturas"),
        (name = "ExchangeRate", description = "Cotação de exibição em moeda secundária"),
        (name = "Usage", description = "Gate de limites de uso por plano"),
        (name = "Admin", description = "Varredura de vencimentos e relatórios operacionais")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds_with_every_route_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/plans",
            "/api/subscriptions/{id}/renew",
            "/api/payments/{id}/status",
            "/api/exchange-rate/convert",
            "/api/usage/{business_id}/can-add",
            "/api/admin/sweep",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota ausente: {path}");
        }
    }

    #[test]
    fn plan_limits_surface_as_nullable_integers() {
        // A sentinela de limite aparece no schema como o inteiro opcional do
        // seu formato serializado, sem referenciar um schema próprio.
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let max_staff = &doc["components"]["schemas"]["Plan"]["properties"]["maxStaff"];
        assert!(!max_staff.is_null(), "Plan.maxStaff ausente do schema");
        assert!(max_staff.get("$ref").is_none(), "maxStaff: {max_staff}");
        assert!(max_staff.to_string().contains("integer"), "maxStaff: {max_staff}");
    }
}
