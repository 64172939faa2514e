//src/main.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use std::time::Duration;
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Varredura periódica em segundo plano. O primeiro tick dispara já na
    // subida, colocando em dia o que venceu com o serviço parado; a rota
    // /api/admin/sweep continua disponível para disparo manual.
    let sweeper = app_state.sweeper_service.clone();
    let sweep_interval = Duration::from_secs(app_state.billing.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.run(Utc::now()).await {
                tracing::error!("🔥 Varredura periódica falhou: {}", e);
            }
        }
    });

    // Catálogo de planos
    let plan_routes = Router::new()
        .route(
            "/",
            post(handlers::plans::create_plan).get(handlers::plans::list_plans),
        )
        .route("/{id}", get(handlers::plans::get_plan))
        .route("/{id}/deactivate", post(handlers::plans::deactivate_plan));

    // Ciclo de vida das assinaturas
    let subscription_routes = Router::new()
        .route("/", post(handlers::subscriptions::create_subscription))
        .route("/{id}", get(handlers::subscriptions::get_subscription))
        .route("/{id}/usage", get(handlers::subscriptions::get_usage_snapshot))
        .route("/{id}/renew", post(handlers::subscriptions::renew_subscription))
        .route("/{id}/cancel", post(handlers::subscriptions::cancel_subscription))
        .route(
            "/{id}/payments",
            get(handlers::subscriptions::list_subscription_payments),
        );

    // Visão por negócio (histórico e assinatura corrente)
    let business_routes = Router::new()
        .route(
            "/{business_id}/subscriptions",
            get(handlers::subscriptions::list_business_subscriptions),
        )
        .route(
            "/{business_id}/subscription",
            get(handlers::subscriptions::get_current_subscription),
        );

    // Razão de pagamentos
    let payment_routes = Router::new()
        .route("/", post(handlers::payments::record_payment))
        .route("/{id}", get(handlers::payments::get_payment))
        .route("/{id}/status", post(handlers::payments::update_payment_status));

    // Cotação de exibição
    let exchange_rate_routes = Router::new()
        .route(
            "/",
            get(handlers::exchange_rates::get_current_rate)
                .post(handlers::exchange_rates::set_rate),
        )
        .route("/history", get(handlers::exchange_rates::get_rate_history))
        .route("/convert", get(handlers::exchange_rates::convert_amount));

    // Gate de limites de uso
    let usage_routes = Router::new()
        .route("/{business_id}/can-add", get(handlers::usage::can_add))
        .route("/{business_id}", put(handlers::usage::report_usage));

    // Operação
    let admin_routes = Router::new()
        .route("/sweep", post(handlers::admin::run_sweep))
        .route(
            "/subscriptions/expiring",
            get(handlers::admin::list_expiring_subscriptions),
        );

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/plans", plan_routes)
        .nest("/api/subscriptions", subscription_routes)
        .nest("/api/businesses", business_routes)
        .nest("/api/payments", payment_routes)
        .nest("/api/exchange-rate", exchange_rate_routes)
        .nest("/api/usage", usage_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
