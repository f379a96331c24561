pub mod api;
pub mod billing;
pub mod cli;
pub mod config;
pub mod core_state;
pub mod db;
pub mod identity;
pub mod models;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::config::AppConfig;
use crate::core_state::CoreState;
use crate::models::NewUser;

pub fn run() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    args.apply(&mut config);

    tracing::info!(
        "{} starting v{} ({})",
        config::APP_NAME,
        config::APP_VERSION,
        config.db_path.display()
    );

    // Built before the runtime exists: the blocking payment client must be
    // created and dropped off the async threads.
    let core = Arc::new(CoreState::from_config(config)?);

    match args.command() {
        Command::Migrate => {
            let conn = core.open_db()?;
            tracing::info!(version = db::get_current_version(&conn), "Schema up to date");
            Ok(())
        }
        Command::IssueSession { email, name } => {
            let conn = core.open_db()?;
            let ttl = chrono::Duration::hours(core.config.session_ttl_hours);
            let issued = identity::issue_session(
                &conn,
                &NewUser {
                    email,
                    name,
                    image: None,
                },
                ttl,
            )?;
            tracing::info!(user_id = %issued.user.id, expires_at = issued.expires_at, "Session issued");
            println!("{}", issued.token);
            Ok(())
        }
        Command::RevokeSession { token } => {
            let conn = core.open_db()?;
            if identity::revoke_session(&conn, &token)? {
                tracing::info!("Session revoked");
            } else {
                tracing::warn!("No such session");
            }
            Ok(())
        }
        Command::Serve => serve(core),
    }
}

fn serve(core: Arc<CoreState>) -> Result<(), Box<dyn Error>> {
    if let Err(e) = core.prune(config::ACCESS_LOG_RETENTION_DAYS) {
        tracing::warn!("Startup pruning failed: {e}");
    }

    let bind = core.config.bind;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(api::serve_until_interrupted(core.clone(), bind))?;
    drop(runtime);

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
