use std::net::SocketAddr;
use std::path::PathBuf;

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

/// Upstream proxy used by browser sessions. Credentials are optional.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("url", &self.url)
            .field("username", &self.username.as_ref().map(|_| "[redacted]"))
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
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

    /// Base URL of the headless rendering service (browserless-style).
    pub render_url: String,
    pub render_token: Option<String>,
    pub proxy: Option<ProxyConfig>,
    pub user_agents: Vec<String>,
    pub screenshot_dir: PathBuf,

    pub scrape_delay_min_ms: u64,
    pub scrape_delay_max_ms: u64,
    pub max_concurrent_scrapes: usize,
    pub retry_attempts: u32,
    pub backoff_base_secs: u64,
    pub nav_timeout_secs: u64,
    pub nav_attempts: u32,

    pub full_sweep_cron: String,
    pub priority_sweep_cron: String,
    pub health_sweep_cron: String,
    pub priority_sweep_limit: i64,
    pub stale_after_days: i64,
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
            .field("render_url", &self.render_url)
            .field(
                "render_token",
                &self.render_token.as_ref().map(|_| "[redacted]"),
            )
            .field("proxy", &self.proxy)
            .field("user_agents", &self.user_agents.len())
            .field("screenshot_dir", &self.screenshot_dir)
            .field("scrape_delay_min_ms", &self.scrape_delay_min_ms)
            .field("scrape_delay_max_ms", &self.scrape_delay_max_ms)
            .field("max_concurrent_scrapes", &self.max_concurrent_scrapes)
            .field("retry_attempts", &self.retry_attempts)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .field("nav_timeout_secs", &self.nav_timeout_secs)
            .field("nav_attempts", &self.nav_attempts)
            .field("full_sweep_cron", &self.full_sweep_cron)
            .field("priority_sweep_cron", &self.priority_sweep_cron)
            .field("health_sweep_cron", &self.health_sweep_cron)
            .field("priority_sweep_limit", &self.priority_sweep_limit)
            .field("stale_after_days", &self.stale_after_days)
            .finish()
    }
}
