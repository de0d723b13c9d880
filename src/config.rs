//! Configuration for kiosk
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// kiosk - edge API gateway for the Skiff desktop-app distribution platform
#[derive(Parser, Debug, Clone)]
#[command(name = "kiosk")]
#[command(about = "Edge API for Skiff downloads, catalog, and form forwarding")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (relaxes moderator auth, MongoDB optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "kiosk")]
    pub mongodb_db: String,

    /// GitHub repository owner for release proxying
    #[arg(long, env = "GITHUB_OWNER", default_value = "skiff-app")]
    pub github_owner: String,

    /// GitHub repository name for release proxying
    #[arg(long, env = "GITHUB_REPO", default_value = "skiff")]
    pub github_repo: String,

    /// GitHub API token for the releases endpoint (optional; raises rate limits)
    #[arg(long, env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// API key for moderation endpoints (required in production)
    #[arg(long, env = "MODERATOR_KEY")]
    pub moderator_key: Option<String>,

    /// Webhook sink URL for catalog review notifications
    #[arg(long, env = "WEBHOOK_SCRIPTS_REVIEW")]
    pub webhook_scripts_review: Option<String>,

    /// Webhook sink URL for beta-signup form submissions
    #[arg(long, env = "WEBHOOK_BETA_SIGNUP")]
    pub webhook_beta_signup: Option<String>,

    /// Webhook sink URL for featured-tool form submissions
    #[arg(long, env = "WEBHOOK_FEATURED_TOOL")]
    pub webhook_featured_tool: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Outbound request timeout in milliseconds (GitHub, webhooks)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

impl Args {
    /// Check an API key against the configured moderator key.
    /// Dev mode accepts any caller.
    pub fn is_moderator_key(&self, presented: Option<&str>) -> bool {
        if self.dev_mode {
            return true;
        }
        match (&self.moderator_key, presented) {
            (Some(expected), Some(key)) => expected == key,
            _ => false,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.moderator_key.is_none() {
            return Err("MODERATOR_KEY is required in production mode".to_string());
        }

        if self.github_owner.trim().is_empty() || self.github_repo.trim().is_empty() {
            return Err("GITHUB_OWNER and GITHUB_REPO must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args(dev_mode: bool) -> Args {
        Args {
            node_id: Uuid::new_v4(),
            listen: "127.0.0.1:8080".parse().unwrap(),
            dev_mode,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "kiosk".to_string(),
            github_owner: "skiff-app".to_string(),
            github_repo: "skiff".to_string(),
            github_token: None,
            moderator_key: None,
            webhook_scripts_review: None,
            webhook_beta_signup: None,
            webhook_featured_tool: None,
            log_level: "info".to_string(),
            request_timeout_ms: 30000,
        }
    }

    #[test]
    fn production_requires_moderator_key() {
        let args = base_args(false);
        assert!(args.validate().is_err());

        let mut args = base_args(false);
        args.moderator_key = Some("secret".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn dev_mode_skips_moderator_key() {
        let args = base_args(true);
        assert!(args.validate().is_ok());
        assert!(args.is_moderator_key(None));
    }

    #[test]
    fn moderator_key_exact_match() {
        let mut args = base_args(false);
        args.moderator_key = Some("secret".to_string());
        assert!(args.is_moderator_key(Some("secret")));
        assert!(!args.is_moderator_key(Some("wrong")));
        assert!(!args.is_moderator_key(None));
    }
}
