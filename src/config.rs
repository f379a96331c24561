use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Carebridge";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Address the portal listens on when nothing else is configured.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Connections kept open against the database file.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Lifetime of a bearer session issued by `issue-session`.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// Longest session lifetime accepted from the environment.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Days of access log kept when the server starts.
pub const ACCESS_LOG_RETENTION_DAYS: u32 = 90;

/// Get the application data directory
/// ~/Carebridge/ on all platforms, falling back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default SQLite file
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("carebridge.db")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "carebridge=debug,tower_http=info,info"
    } else {
        "carebridge=info,warn"
    }
}

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Stripe settings. Billing routes are disabled when this is absent.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub price_id: String,
}

/// Runtime configuration, read from the environment and overridden by
/// command-line flags.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub pool_size: usize,
    pub session_ttl_hours: i64,
    /// Origin used for checkout and billing-portal return URLs.
    pub public_url: String,
    pub stripe: Option<StripeConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset and empty values take the
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = get("CAREBRIDGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);
        let bind = parse_or("CAREBRIDGE_BIND", get("CAREBRIDGE_BIND"), || {
            SocketAddr::from(([127, 0, 0, 1], 8080))
        })?;
        let pool_size = parse_or("CAREBRIDGE_DB_POOL_SIZE", get("CAREBRIDGE_DB_POOL_SIZE"), || {
            DEFAULT_POOL_SIZE
        })?;
        let session_ttl_hours = parse_or(
            "CAREBRIDGE_SESSION_TTL_HOURS",
            get("CAREBRIDGE_SESSION_TTL_HOURS"),
            || DEFAULT_SESSION_TTL_HOURS,
        )?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(ConfigError::InvalidValue {
                key: "CAREBRIDGE_SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }
        let public_url = get("CAREBRIDGE_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://{DEFAULT_BIND}"))
            .trim_end_matches('/')
            .to_string();
        let stripe = match (get("STRIPE_SECRET_KEY"), get("STRIPE_PRICE_ID")) {
            (Some(secret_key), Some(price_id)) => Some(StripeConfig {
                secret_key,
                price_id,
            }),
            (Some(_), None) => {
                tracing::warn!("STRIPE_SECRET_KEY set without STRIPE_PRICE_ID; billing disabled");
                None
            }
            _ => None,
        };

        Ok(Self {
            db_path,
            bind,
            pool_size,
            session_ttl_hours,
            public_url,
            stripe,
        })
    }
}

fn parse_or<T, D>(key: &'static str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    D: FnOnce() -> T,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default()),
    }
}
