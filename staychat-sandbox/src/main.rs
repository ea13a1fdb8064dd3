//! `Staychat` sandbox backend -- in-memory marketplace messaging API.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:9900
//! cargo run --bin staychat-sandbox
//!
//! # Run on a custom address with a required credential
//! cargo run --bin staychat-sandbox -- --bind 127.0.0.1:8080 --auth-token secret
//! ```

use std::sync::Arc;

use clap::Parser;
use staychat_sandbox::config::{SandboxCliArgs, SandboxConfig};
use staychat_sandbox::state::SandboxState;

#[tokio::main]
async fn main() {
    let cli = SandboxCliArgs::parse();

    let config = match SandboxConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting staychat sandbox");

    let state = Arc::new(SandboxState::new(config.auth_token.clone()));

    match staychat_sandbox::start_server(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "sandbox listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "sandbox server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start sandbox server");
            std::process::exit(1);
        }
    }
}
