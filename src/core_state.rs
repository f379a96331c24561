//! Application state shared by every request handler.

use std::sync::Arc;

use crate::billing::{Billing, StripeClient};
use crate::config::AppConfig;
use crate::db::{self, DbPool, PooledConn};

/// Process-wide state: the connection pool, configuration and billing
/// (absent when no payment processor is configured).
pub struct CoreState {
    db: DbPool,
    pub config: AppConfig,
    billing: Option<Billing>,
}

impl CoreState {
    pub fn new(db: DbPool, config: AppConfig, billing: Option<Billing>) -> Self {
        Self {
            db,
            config,
            billing,
        }
    }

    /// Open the configured database and, when Stripe keys are present,
    /// a Stripe client. Must run outside the async runtime: the blocking
    /// HTTP client cannot be built on a runtime thread.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Io(e.to_string()))?;
        }
        let pool = DbPool::open(&config.db_path, config.pool_size)?;
        let billing = match &config.stripe {
            Some(stripe) => Some(Billing {
                processor: Arc::new(
                    StripeClient::new(&stripe.secret_key)
                        .map_err(|e| CoreError::Billing(e.to_string()))?,
                ),
                price_id: stripe.price_id.clone(),
            }),
            None => {
                tracing::warn!("Stripe keys not configured; billing routes disabled");
                None
            }
        };
        Ok(Self::new(pool, config, billing))
    }

    /// Check out a pooled connection. Drop it before awaiting.
    pub fn open_db(&self) -> Result<PooledConn, CoreError> {
        Ok(self.db.get()?)
    }

    pub fn billing(&self) -> Option<Billing> {
        self.billing.clone()
    }

    /// Drop expired sessions and old access-log entries.
    pub fn prune(&self, retention_days: u32) -> Result<(), CoreError> {
        let conn = self.open_db()?;
        let sessions = db::prune_expired_sessions(&conn, chrono::Utc::now().timestamp())?;
        let entries = db::prune_access_log(&conn, retention_days)?;
        tracing::info!(sessions, entries, "Pruned expired sessions and access log");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Billing setup failed: {0}")]
    Billing(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn test_config() -> AppConfig {
        AppConfig::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn in_memory_state_has_no_billing() {
        let state = CoreState::new(DbPool::in_memory().unwrap(), test_config(), None);
        assert!(state.billing().is_none());
        let conn = state.open_db().unwrap();
        assert_eq!(db::get_current_version(&conn), 4);
    }

    #[test]
    fn from_config_creates_database_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.db_path = tmp.path().join("nested").join("portal.db");
        config.pool_size = 2;
        let state = CoreState::from_config(config).unwrap();
        assert!(tmp.path().join("nested").join("portal.db").exists());
        state.prune(30).unwrap();
    }
}
