use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use configs::AppConfig;
use service::auth::service::AuthConfig;
use service::payment::gateway::mock::MockGateway;
use service::payment::{EbillingClient, PaymentGateway};

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// `config.toml` (or `CONFIG_PATH`) when present, otherwise environment variables.
fn load_config() -> Result<AppConfig, StartupError> {
    match AppConfig::load_and_validate() {
        Ok(cfg) => Ok(cfg),
        Err(file_err) => {
            warn!(error = %file_err, "config file unusable, falling back to environment");
            AppConfig::from_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))
        }
    }
}

/// Real EBILLING client when merchant credentials are configured. Without
/// them bills are simulated and never reported paid, so no callback settles.
fn build_gateway(cfg: &configs::EbillingConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    if cfg.username.trim().is_empty() || cfg.shared_key.trim().is_empty() {
        warn!("ebilling credentials missing; bills are simulated in memory and callbacks will be rejected");
        return Ok(Arc::new(MockGateway::default()));
    }
    let client = EbillingClient::new(cfg)?;
    info!(server_url = %cfg.server_url, "ebilling client ready");
    Ok(Arc::new(client))
}

/// Assemble state and router from a validated config. Migrations are applied first.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;

    let gateway = build_gateway(&cfg.ebilling)?;
    let state = ServerState::new(db, AuthConfig::from(&cfg.auth), gateway, cfg.ebilling.expiry_period_minutes);
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = load_config()?;
    let app = build_app(&cfg).await?;

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "storefront api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::payment::BillRequest;

    #[tokio::test]
    async fn simulated_gateway_never_reports_paid() -> anyhow::Result<()> {
        let mut cfg = AppConfig::default().ebilling;
        cfg.username.clear();
        let gateway = build_gateway(&cfg)?;
        let req = BillRequest {
            payer_email: "buyer@shop.test".into(),
            payer_msisdn: "074000000".into(),
            payer_name: "Buyer".into(),
            amount: 1_000,
            short_description: "Order".into(),
            external_reference: "ref".into(),
            expiry_period: 60,
        };
        let bill = gateway.create_bill(&req).await?;
        assert!(!gateway.fetch_bill(&bill.bill_id).await?.is_paid());
        Ok(())
    }
}
