//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `APP_ENV`: `production` drops the localhost origin from the CORS allow-list
//! - `CORS_ALLOWED_ORIGINS`: Comma-separated list of allowed origins
//! - `MAX_BODY_SIZE`: Largest `content-length` the request gate accepts without a violation
//! - `BLOCKED_USER_AGENTS`: Comma-separated, case-insensitive user-agent substrings
//! - `TRUSTED_PROXIES`: CIDR ranges whose forwarding headers are honoured
//!
//! # AI Provider
//!
//! - `GEMINI_API_KEY`: Provider key. When unset the server still starts, but AI routes
//!   answer with `503 CONFIG_ERROR`
//! - `AI_BASE_URL`, `AI_MODEL`, `AI_TIMEOUT_SECS`
//!
//! # Rate Limits
//!
//! - `ANALYSIS_RATE_LIMIT_PER_HOUR`: Budget for analysis routes (default: 4)
//! - `GENERATION_RATE_LIMIT_PER_HOUR`: Budget for generation routes (default: 10)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Origin added to the allow-list outside production.
pub const LOCAL_DEV_ORIGIN: &str = "http://localhost:3000";

/// Default production origins of the marketing site.
const DEFAULT_ALLOWED_ORIGINS: &str = "https://www.example.com,https://example.com";

/// Default automation signatures rejected by the user-agent check.
pub const DEFAULT_BLOCKED_USER_AGENTS: [&str; 17] = [
    "bot",
    "crawler",
    "spider",
    "scraper",
    "curl",
    "wget",
    "python-requests",
    "python-urllib",
    "aiohttp",
    "axios",
    "node-fetch",
    "go-http-client",
    "okhttp",
    "libwww-perl",
    "httpie",
    "postman",
    "insomnia",
];

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" | "staging" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Deployment environment (default: development)
    pub environment: Environment,

    /// Hard cap on request bodies enforced by the HTTP stack (default: 1 MiB).
    /// Independent of the gate's `content-length` check.
    pub transport_body_limit: usize,

    // =========================================================================
    // Request Gate Configuration
    // =========================================================================
    /// Allowed CORS origins, localhost already appended outside production
    pub cors_allowed_origins: Vec<String>,

    /// Largest `content-length` accepted without an `oversized-body` violation (default: 50,000)
    pub max_body_size: u64,

    /// Whether state-changing requests must carry `origin` or `referer` (default: true)
    pub require_csrf: bool,

    /// Case-insensitive user-agent substrings treated as automation
    pub blocked_user_agents: Vec<String>,

    /// Trusted proxy CIDR ranges for client address resolution.
    ///
    /// Format: Comma-separated CIDR notation (e.g., "10.0.0.0/8,172.16.0.0/12")
    /// Default: Empty (forwarding headers are always honoured)
    pub trusted_proxies: Vec<String>,

    /// Violation count above which an address is blocked (default: 10)
    pub block_threshold: u32,

    /// Age after which suspicion records and logged violations are pruned (default: 24h)
    pub suspicion_ttl: Duration,

    /// Upper bound on the in-memory violation log (default: 10,000)
    pub violation_log_capacity: usize,

    /// Interval of the background pruning task (default: 1h)
    pub security_cleanup_interval: Duration,

    // =========================================================================
    // AI Provider Configuration
    // =========================================================================
    /// Provider API key (optional at startup, required by AI routes)
    pub ai_api_key: Option<String>,

    /// Provider base URL
    pub ai_base_url: String,

    /// Model name
    pub ai_model: String,

    /// Client-side timeout for a single generation call (default: 30s)
    pub ai_timeout: Duration,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Requests per hour per client on analysis routes (default: 4)
    pub analysis_rate_limit_per_hour: u32,

    /// Requests per hour per client on generation routes (default: 10)
    pub generation_rate_limit_per_hour: u32,

    /// Tier name reported in rate limit responses (default: "free")
    pub rate_limit_tier: String,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Log line format
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,

    /// Serve `GET /security/metrics` on the public port (default: off in
    /// production, on elsewhere)
    pub security_metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if any value is malformed or inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment: Environment = Self::parse_env("APP_ENV", Environment::Development)?;

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            environment,
            transport_body_limit: Self::parse_env("TRANSPORT_BODY_LIMIT", 1024 * 1024)?,

            cors_allowed_origins: Self::parse_cors_origins(environment),
            max_body_size: Self::parse_env("MAX_BODY_SIZE", 50_000)?,
            require_csrf: Self::parse_env("REQUIRE_CSRF", true)?,
            blocked_user_agents: Self::parse_blocked_user_agents(),
            trusted_proxies: Self::parse_list("TRUSTED_PROXIES"),
            block_threshold: Self::parse_env("BLOCK_THRESHOLD", 10)?,
            suspicion_ttl: Duration::from_secs(Self::parse_env("SUSPICION_TTL_SECS", 86_400)?),
            violation_log_capacity: Self::parse_env("VIOLATION_LOG_CAPACITY", 10_000)?,
            security_cleanup_interval: Duration::from_secs(Self::parse_env(
                "SECURITY_CLEANUP_INTERVAL_SECS",
                3_600,
            )?),

            ai_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            ai_base_url: env::var("AI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            ai_timeout: Duration::from_secs(Self::parse_env("AI_TIMEOUT_SECS", 30)?),

            analysis_rate_limit_per_hour: Self::parse_env("ANALYSIS_RATE_LIMIT_PER_HOUR", 4)?,
            generation_rate_limit_per_hour: Self::parse_env("GENERATION_RATE_LIMIT_PER_HOUR", 10)?,
            rate_limit_tier: env::var("RATE_LIMIT_TIER").unwrap_or_else(|_| "free".to_string()),

            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
            security_metrics_enabled: Self::parse_env(
                "SECURITY_METRICS_ENABLED",
                !environment.is_production(),
            )?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.cors_allowed_origins.is_empty() {
            return Err(AppError::Config(
                "CORS_ALLOWED_ORIGINS must contain at least one origin".to_string(),
            ));
        }

        if self.max_body_size == 0 {
            return Err(AppError::Config(
                "MAX_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.transport_body_limit == 0 {
            return Err(AppError::Config(
                "TRANSPORT_BODY_LIMIT must be greater than 0".to_string(),
            ));
        }

        if self.block_threshold == 0 {
            return Err(AppError::Config(
                "BLOCK_THRESHOLD must be greater than 0".to_string(),
            ));
        }

        if self.analysis_rate_limit_per_hour == 0 || self.generation_rate_limit_per_hour == 0 {
            return Err(AppError::Config(
                "Route rate limits must be greater than 0".to_string(),
            ));
        }

        if self.ai_timeout.is_zero() {
            return Err(AppError::Config(
                "AI_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.security_cleanup_interval.is_zero() {
            return Err(AppError::Config(
                "SECURITY_CLEANUP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        url::Url::parse(&self.ai_base_url)
            .map_err(|e| AppError::Config(format!("Invalid AI_BASE_URL: {e}")))?;

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if an AI provider key is configured.
    pub fn ai_configured(&self) -> bool {
        self.ai_api_key.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address, `None` when disabled.
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    fn parse_list(name: &str) -> Vec<String> {
        env::var(name)
            .map(|s| split_list(&s))
            .unwrap_or_default()
    }

    /// Parse CORS origins and append the local development origin outside production.
    fn parse_cors_origins(environment: Environment) -> Vec<String> {
        let raw = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());
        with_dev_origin(split_list(&raw), environment)
    }

    fn parse_blocked_user_agents() -> Vec<String> {
        match env::var("BLOCKED_USER_AGENTS") {
            Ok(raw) => split_list(&raw)
                .into_iter()
                .map(|ua| ua.to_ascii_lowercase())
                .collect(),
            Err(_) => default_blocked_user_agents(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn with_dev_origin(mut origins: Vec<String>, environment: Environment) -> Vec<String> {
    if !environment.is_production() && !origins.iter().any(|o| o == LOCAL_DEV_ORIGIN) {
        origins.push(LOCAL_DEV_ORIGIN.to_string());
    }
    origins
}

pub fn default_blocked_user_agents() -> Vec<String> {
    DEFAULT_BLOCKED_USER_AGENTS
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            transport_body_limit: 1024 * 1024,
            cors_allowed_origins: with_dev_origin(
                split_list(DEFAULT_ALLOWED_ORIGINS),
                Environment::Development,
            ),
            max_body_size: 50_000,
            require_csrf: true,
            blocked_user_agents: default_blocked_user_agents(),
            trusted_proxies: vec![],
            block_threshold: 10,
            suspicion_ttl: Duration::from_secs(86_400),
            violation_log_capacity: 10_000,
            security_cleanup_interval: Duration::from_secs(3_600),
            ai_api_key: None,
            ai_base_url: "https://generativelanguage.googleapis.com".to_string(),
            ai_model: "gemini-1.5-flash".to_string(),
            ai_timeout: Duration::from_secs(30),
            analysis_rate_limit_per_hour: 4,
            generation_rate_limit_per_hour: 10,
            rate_limit_tier: "free".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9090,
            security_metrics_enabled: true,
        }
    }
}
