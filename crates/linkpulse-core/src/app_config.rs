use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub audit_user_agent: String,
    /// Timeout for per-link detector requests (redirect hops, stock,
    /// fingerprint fetches).
    pub audit_request_timeout_secs: u64,
    /// Timeout for tracked-page crawl fetches.
    pub audit_crawl_timeout_secs: u64,
    /// Number of links audited concurrently within one batch.
    pub audit_batch_size: usize,
    pub audit_max_redirect_hops: usize,
    /// Fingerprint similarity below this flags destination drift.
    pub audit_drift_threshold: f64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("audit_user_agent", &self.audit_user_agent)
            .field(
                "audit_request_timeout_secs",
                &self.audit_request_timeout_secs,
            )
            .field("audit_crawl_timeout_secs", &self.audit_crawl_timeout_secs)
            .field("audit_batch_size", &self.audit_batch_size)
            .field("audit_max_redirect_hops", &self.audit_max_redirect_hops)
            .field("audit_drift_threshold", &self.audit_drift_threshold)
            .finish()
    }
}
