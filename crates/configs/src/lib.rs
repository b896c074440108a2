use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ebilling: EbillingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Token issuing and platform-admin settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Users registering with one of these emails become platform admins.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new(), token_ttl_hours: default_token_ttl_hours(), admin_emails: Vec::new() }
    }
}

fn default_token_ttl_hours() -> i64 { 12 }

/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// EBILLING merchant API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EbillingConfig {
    #[serde(default = "default_ebilling_server_url")]
    pub server_url: String,
    #[serde(default = "default_ebilling_post_url")]
    pub post_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub shared_key: String,
    /// Where the EBILLING portal sends the payer back once they are done.
    #[serde(default)]
    pub redirect_url: String,
    #[serde(default = "default_expiry_period")]
    pub expiry_period_minutes: i64,
    #[serde(default = "default_ebilling_timeout")]
    pub timeout_secs: u64,
}

impl Default for EbillingConfig {
    fn default() -> Self {
        Self {
            server_url: default_ebilling_server_url(),
            post_url: default_ebilling_post_url(),
            username: String::new(),
            shared_key: String::new(),
            redirect_url: String::new(),
            expiry_period_minutes: default_expiry_period(),
            timeout_secs: default_ebilling_timeout(),
        }
    }
}

fn default_ebilling_server_url() -> String { "https://lab.billing-easy.net/api/v1/merchant".into() }
fn default_ebilling_post_url() -> String { "https://test.billing-easy.net".into() }
fn default_expiry_period() -> i64 { 60 }
fn default_ebilling_timeout() -> u64 { 15 }

/// Thirty days.
pub const MAX_EXPIRY_PERIOD_MINUTES: i64 = 60 * 24 * 30;

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Config assembled purely from environment variables, used when no file exists.
    pub fn from_env() -> Result<Self> {
        let mut cfg = AppConfig::default();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.auth.validate()?;
        self.ebilling.normalize_from_env();
        self.ebilling.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.trim().is_empty() {
                self.jwt_secret = secret;
            }
        }
        for email in self.admin_emails.iter_mut() {
            *email = email.trim().to_lowercase();
        }
        if self.token_ttl_hours <= 0 {
            self.token_ttl_hours = default_token_ttl_hours();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET"));
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.token_ttl_hours) {
            return Err(anyhow!("auth.token_ttl_hours must be within 1..={MAX_TOKEN_TTL_HOURS}"));
        }
        Ok(())
    }
}

impl EbillingConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(u) = std::env::var("EBILLING_USERNAME") {
            self.username = u;
        }
        if let Ok(k) = std::env::var("EBILLING_SHARED_KEY") {
            self.shared_key = k;
        }
        while self.server_url.ends_with('/') {
            self.server_url.pop();
        }
        if self.expiry_period_minutes <= 0 {
            self.expiry_period_minutes = default_expiry_period();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_ebilling_timeout();
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("ebilling.server_url", &self.server_url), ("ebilling.post_url", &self.post_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("{name} must start with http(s)"));
            }
        }
        if !(1..=MAX_EXPIRY_PERIOD_MINUTES).contains(&self.expiry_period_minutes) {
            return Err(anyhow!("ebilling.expiry_period_minutes must be within 1..={MAX_EXPIRY_PERIOD_MINUTES}"));
        }
        Ok(())
    }
}
