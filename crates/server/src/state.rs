use std::sync::Arc;

use sea_orm::DatabaseConnection;

use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::AuthConfig;
use service::auth::AuthService;
use service::payment::{PaymentGateway, PaymentService};

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub jwt_secret: Arc<str>,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub payments: PaymentService,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, auth_cfg: AuthConfig, gateway: Arc<dyn PaymentGateway>, payment_expiry_minutes: i64) -> Self {
        let jwt_secret: Arc<str> = Arc::from(auth_cfg.jwt_secret.clone().unwrap_or_default());
        let repo = Arc::new(SeaOrmAuthRepository { db: db.clone() });
        Self {
            auth: Arc::new(AuthService::new(repo, auth_cfg)),
            payments: PaymentService::new(db.clone(), gateway, payment_expiry_minutes),
            db,
            jwt_secret,
        }
    }
}
