//! Startup endpoint checks
//!
//! Before serving, the relay confirms that the configured endpoints answer
//! and belong to the expected chains:
//!
//! - EVM JSON-RPC: `eth_chainId` must equal `EVM_CHAIN_ID`. URLs are tried in
//!   order; the first that answers decides.
//! - Tendermint RPC: `/status` network must equal `COSMOS_CHAIN_ID`.
//!
//! Skipped with `SKIP_PREFLIGHT=true`.

use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::http::{Client, Http};
use eyre::{eyre, Result, WrapErr};
use tendermint_rpc::{Client as _, HttpClient, Url};
use tracing::{info, warn};

use crate::config::Config;

/// Create alloy HTTP providers for each RPC URL.
pub fn create_providers(urls: &[String]) -> Result<Vec<RootProvider<Http<Client>>>> {
    if urls.is_empty() {
        return Err(eyre!("At least one RPC URL is required"));
    }
    urls.iter()
        .map(|url| {
            let parsed = url
                .parse()
                .wrap_err_with(|| format!("Invalid RPC URL: {}", url))?;
            Ok(ProviderBuilder::new().on_http(parsed))
        })
        .collect()
}

/// Query each URL for its chain id until one answers, then compare.
pub async fn verify_evm_chain_id(urls: &[String], expected: u64, timeout: Duration) -> Result<()> {
    let providers = create_providers(urls)?;

    for (url, provider) in urls.iter().zip(providers.iter()) {
        match tokio::time::timeout(timeout, provider.get_chain_id()).await {
            Ok(Ok(chain_id)) => {
                if chain_id != expected {
                    return Err(eyre!(
                        "EVM chain id mismatch at {}: expected {}, got {}",
                        url,
                        expected,
                        chain_id
                    ));
                }
                info!(url = %url, chain_id, "EVM endpoint verified");
                return Ok(());
            }
            Ok(Err(e)) => warn!(url = %url, error = %e, "EVM RPC unavailable, trying next"),
            Err(_) => warn!(url = %url, "EVM RPC timed out, trying next"),
        }
    }

    Err(eyre!("No EVM RPC endpoint answered ({} tried)", urls.len()))
}

/// Compare the Tendermint node's network with the configured chain id
pub async fn verify_cosmos_chain_id(rpc_url: &str, expected: &str, timeout: Duration) -> Result<()> {
    let url: Url = rpc_url.parse().wrap_err("Failed to parse RPC URL")?;
    let client = HttpClient::new(url).wrap_err("Failed to create RPC client")?;

    let status = tokio::time::timeout(timeout, client.status())
        .await
        .map_err(|_| eyre!("Tendermint RPC {} timed out", rpc_url))?
        .wrap_err_with(|| format!("Tendermint RPC {} unavailable", rpc_url))?;

    let network = status.node_info.network.to_string();
    if network != expected {
        return Err(eyre!(
            "Cosmos chain id mismatch at {}: expected {}, got {}",
            rpc_url,
            expected,
            network
        ));
    }

    info!(
        url = %rpc_url,
        chain_id = %network,
        height = %status.sync_info.latest_block_height,
        "Cosmos endpoint verified"
    );
    Ok(())
}

/// Run every check
pub async fn run(config: &Config) -> Result<()> {
    let timeout = config.http_timeout();
    verify_evm_chain_id(&config.evm.all_rpc_urls(), config.evm.chain_id, timeout).await?;
    verify_cosmos_chain_id(&config.cosmos.rpc_url, &config.cosmos.chain_id, timeout).await?;
    Ok(())
}
