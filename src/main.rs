use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use storefront_payments::adapters::auth::JwtSessionValidator;
use storefront_payments::adapters::http::{payments_router, HttpOptions, PaymentsAppState};
use storefront_payments::adapters::postgres::{PostgresOrderRepository, PostgresPaymentRepository};
use storefront_payments::application::{NotificationDispatcher, PaymentTransitions};
use storefront_payments::config::AppConfig;
use storefront_payments::startup;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }

    config.validate().context("validating configuration")?;

    let pool = config
        .database
        .connect()
        .await
        .context("connecting to database")?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        tracing::info!("Migrations applied");
    }

    let payments = Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let orders = Arc::new(PostgresOrderRepository::new(pool));
    let dispatcher = NotificationDispatcher::new(startup::notifier(&config.notification)?);

    let state = PaymentsAppState {
        orders: orders.clone(),
        payments: payments.clone(),
        gateways: startup::gateway_registry(&config.payment)?,
        transitions: PaymentTransitions::new(payments, orders, dispatcher),
        verifiers: Arc::new(startup::webhook_verifiers(&config.payment)),
    };
    if state.gateways.providers().is_empty() {
        tracing::warn!("No payment gateway configured, charges will be rejected");
    }

    let validator = Arc::new(JwtSessionValidator::new(
        &config.auth.jwt_secret,
        config.auth.jwt_issuer.as_deref(),
    ));
    let options = HttpOptions {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let app = payments_router(state, validator, options);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await.context("binding listener")?;
    tracing::info!(%addr, environment = ?config.server.environment, "Payments service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    tracing::info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
