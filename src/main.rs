//! gcore-dns01 - ACME DNS-01 challenge solver for the G-Core DNS API
//!
//! `serve` runs the webhook HTTP surface; `present` and `cleanup` run one
//! challenge operation from the command line and retry transient failures.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gcore_dns01::challenge::{ChallengeRequest, ChallengeSolver};
use gcore_dns01::config::{Config, ProviderType};
use gcore_dns01::gcore::GcoreClient;
use gcore_dns01::provider::memory::MemoryProvider;
use gcore_dns01::provider::DnsProvider;
use gcore_dns01::retry::RetryPolicy;
use gcore_dns01::server::{self, ServerState};

//==============================================================================
// Main
//==============================================================================

#[derive(Debug, Parser)]
#[command(name = "gcore-dns01")]
#[command(version)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the webhook HTTP server
    Serve,
    /// Add a challenge token to the TXT record set
    Present(ChallengeArgs),
    /// Remove a challenge token from the TXT record set
    Cleanup(ChallengeArgs),
}

#[derive(Debug, ClapArgs)]
struct ChallengeArgs {
    /// Challenge record name, e.g. _acme-challenge.example.com.
    #[arg(long)]
    fqdn: String,
    /// TXT value
    #[arg(long)]
    key: String,
    #[arg(long, default_value = "")]
    namespace: String,
}

impl ChallengeArgs {
    fn into_request(self) -> ChallengeRequest {
        let mut request = ChallengeRequest::new(self.fqdn, self.key);
        request.resource_namespace = self.namespace;
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config).context("Config load failed")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if config.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let provider = build_provider(&config)?;
    let solver = ChallengeSolver::new(provider, config.ttl);

    match args.command {
        Command::Serve => {
            let state = Arc::new(ServerState::new(solver, config.api_token.as_str()));
            server::serve(config.listen_addr, state).await?;
        }
        Command::Present(challenge) => {
            let request = challenge.into_request();
            let outcome = RetryPolicy::new(config.max_attempts)
                .run("present", || solver.present(&request))
                .await
                .map_err(|e| anyhow::anyhow!(config.redact(&e.to_string())))?;
            info!("present: {}", outcome);
        }
        Command::Cleanup(challenge) => {
            let request = challenge.into_request();
            let outcome = RetryPolicy::new(config.max_attempts)
                .run("cleanup", || solver.cleanup(&request))
                .await
                .map_err(|e| anyhow::anyhow!(config.redact(&e.to_string())))?;
            info!("cleanup: {}", outcome);
        }
    }

    Ok(())
}

fn build_provider(config: &Config) -> Result<Arc<dyn DnsProvider>> {
    match config.provider_type {
        ProviderType::Gcore => {
            let client =
                GcoreClient::new(&config.api_url, config.api_token.as_str(), config.timeout)
                    .context("G-Core client failed")?;
            Ok(Arc::new(client))
        }
        ProviderType::Memory => {
            info!(
                "Using in-memory provider with zones: {:?}",
                config.memory_zones
            );
            Ok(Arc::new(MemoryProvider::with_zones(&config.memory_zones)))
        }
    }
}
