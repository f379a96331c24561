//! CLI argument definitions.
//!
//! Flags given here win over the `CAREBRIDGE_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the SQLite database file
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Address the HTTP server listens on
    #[arg(long, global = true)]
    pub bind: Option<SocketAddr>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the portal HTTP server (default)
    Serve,

    /// Create or upgrade the database schema, then exit
    Migrate,

    /// Sign a user in (creating the account if needed) and print a bearer token
    IssueSession {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Revoke a bearer token
    RevokeSession {
        #[arg(long)]
        token: String,
    },
}

impl Args {
    /// Overlay command-line flags on the environment configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.db_path {
            config.db_path = path.clone();
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn no_subcommand_means_serve() {
        let args = Args::try_parse_from(["carebridge"]).unwrap();
        assert_eq!(args.command(), Command::Serve);
    }

    #[test]
    fn global_flags_override_config() {
        let args = Args::try_parse_from([
            "carebridge",
            "migrate",
            "--db-path",
            "/tmp/portal.db",
            "--bind",
            "0.0.0.0:9000",
        ])
        .unwrap();
        let mut config = base_config();
        args.apply(&mut config);

        assert_eq!(args.command(), Command::Migrate);
        assert_eq!(config.db_path, PathBuf::from("/tmp/portal.db"));
        assert_eq!(config.bind.port(), 9000);
    }

    #[test]
    fn absent_flags_keep_config() {
        let args = Args::try_parse_from(["carebridge", "serve"]).unwrap();
        let mut config = base_config();
        let before = config.db_path.clone();
        args.apply(&mut config);
        assert_eq!(config.db_path, before);
    }

    #[test]
    fn issue_session_requires_email() {
        assert!(Args::try_parse_from(["carebridge", "issue-session"]).is_err());

        let args = Args::try_parse_from([
            "carebridge",
            "issue-session",
            "--email",
            "ada@example.com",
        ])
        .unwrap();
        assert_eq!(
            args.command(),
            Command::IssueSession {
                email: "ada@example.com".into(),
                name: None,
            }
        );
    }

    #[test]
    fn bad_bind_address_rejected() {
        assert!(Args::try_parse_from(["carebridge", "--bind", "localhost"]).is_err());
    }
}
