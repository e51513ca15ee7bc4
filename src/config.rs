//! Configuration
//!
//! CLI arguments with environment variable fallbacks via clap.

use clap::Parser;
use std::net::SocketAddr;

use crate::token::DEFAULT_TOKEN_TTL_SECS;

/// Rollcall - attendance sign-up backend
#[derive(Parser, Debug, Clone)]
#[command(name = "rollcall")]
#[command(about = "Group/activity/task attendance sign-up backend")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "rollcall")]
    pub mongodb_db: String,

    /// Token lifetime in seconds (sliding window)
    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub token_ttl_secs: u64,

    /// Directory served by /asset/get.do
    #[arg(long, env = "ASSET_DIR", default_value = "assets")]
    pub asset_dir: String,

    /// WeChat mini-program app id (enables wxcode login)
    #[arg(long, env = "WX_APP_ID")]
    pub wx_app_id: Option<String>,

    /// WeChat mini-program app secret
    #[arg(long, env = "WX_SECRET")]
    pub wx_secret: Option<String>,

    /// Enable development mode (runs without MongoDB, in-memory store)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Both wx credentials present.
    pub fn wx_configured(&self) -> bool {
        self.wx_app_id.is_some() && self.wx_secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["rollcall"]);
        assert_eq!(args.mongodb_db, "rollcall");
        assert_eq!(args.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert!(!args.dev_mode);
        assert!(!args.wx_configured());
    }

    #[test]
    fn test_wx_needs_both_halves() {
        let args = Args::parse_from(["rollcall", "--wx-app-id", "id"]);
        assert!(!args.wx_configured());
        let args = Args::parse_from(["rollcall", "--wx-app-id", "id", "--wx-secret", "s"]);
        assert!(args.wx_configured());
    }
}
