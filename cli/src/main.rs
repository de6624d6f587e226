//! chainpulse CLI — probe BSC endpoints and snapshot liquidity pools from the terminal.
//!
//! Usage:
//! ```bash
//! # Probe every configured endpoint
//! chainpulse probe
//!
//! # Combined SWF pool snapshot as JSON
//! chainpulse snapshot --config chainpulse.yaml
//!
//! # LP positions of a wallet
//! chainpulse position --wallet 0x…
//! ```

mod config;
mod logging;

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use serde::Serialize;

use chainpulse_core::{ChainConnector, EndpointStatus};
use chainpulse_http::{CoinGeckoFeed, HttpTransportFactory};
use chainpulse_pools::PoolAggregator;

use crate::config::AppConfig;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];
    let result = match command {
        "probe" | "status" | "providers" | "snapshot" | "position" => run(command, rest).await,
        "version" | "--version" | "-V" => {
            println!("chainpulse {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("chainpulse {}", env!("CARGO_PKG_VERSION"));
    println!("Health-ranked BSC RPC access and liquidity pool snapshots\n");
    println!("USAGE:");
    println!("    chainpulse <COMMAND> [--config <PATH>]\n");
    println!("COMMANDS:");
    println!("    probe      Probe every endpoint and print its health");
    println!("    status     Print connection status as JSON");
    println!("    providers  List working endpoints, best first");
    println!("    snapshot   Print the combined pool snapshot as JSON");
    println!("    position   Print LP positions of a wallet as JSON");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --config <PATH>   YAML config file");
    println!("    --wallet <ADDR>   Wallet address  [position]\n");
    println!("ENVIRONMENT:");
    println!("    {}   Comma-separated endpoint list", config::ENV_RPC_URLS);
    println!("    {}        Log level (RUST_LOG takes precedence)", config::ENV_LOG);
}

async fn run(command: &str, args: &[String]) -> anyhow::Result<()> {
    let config_path = parse_flag(args, "--config").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    logging::init_tracing(&config.log);

    let factory = HttpTransportFactory::with_timeout(config.connector.request_timeout)
        .context("building HTTP client")?;
    let connector = Arc::new(ChainConnector::new(
        config.connector.clone(),
        Arc::new(factory),
    ));
    let connected = connector.initialize().await;

    match command {
        "probe" => {
            cmd_probe(&connector);
            Ok(())
        }
        "status" => print_json(&connector.connection_status()),
        "providers" => cmd_providers(&connector, connected),
        "snapshot" => {
            require_connection(connected)?;
            let aggregator = aggregator(&config, connector)?;
            let snapshot = aggregator.snapshot().await?;
            print_json(&snapshot)
        }
        "position" => {
            let wallet = parse_flag(args, "--wallet").ok_or_else(|| anyhow!("--wallet is required"))?;
            require_connection(connected)?;
            let aggregator = aggregator(&config, connector)?;
            let positions = aggregator
                .lp_positions(&wallet, config.pools.timeout, config.pools.retries)
                .await?;
            print_json(&positions)
        }
        other => bail!("unknown command {other}"),
    }
}

fn aggregator(config: &AppConfig, connector: Arc<ChainConnector>) -> anyhow::Result<PoolAggregator> {
    let feed = CoinGeckoFeed::new(config.prices.clone()).context("building price client")?;
    Ok(PoolAggregator::new(connector, Arc::new(feed), config.pools.clone())?)
}

fn require_connection(connected: bool) -> anyhow::Result<()> {
    if !connected {
        bail!("no working RPC endpoint; run `chainpulse probe` for details");
    }
    Ok(())
}

fn cmd_probe(connector: &ChainConnector) {
    let records = connector.registry().records();
    let online = records.iter().filter(|r| r.is_online()).count();
    println!("Probed {} endpoints, {online} online\n", records.len());
    for rec in records {
        let marker = match rec.status {
            EndpointStatus::Online => "✓",
            EndpointStatus::Offline => "✗",
            EndpointStatus::Unknown => "?",
        };
        println!("  {marker} {}", rec.url);
        match rec.status {
            EndpointStatus::Online => {
                println!(
                    "      latency {}ms, block {}",
                    rec.latency_ms.unwrap_or_default(),
                    rec.block_number.unwrap_or_default()
                );
            }
            _ => {
                if let Some(err) = &rec.last_error {
                    println!("      {err}");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ProviderRow {
    url: String,
    latency_ms: Option<u64>,
    score: f64,
}

fn cmd_providers(connector: &ChainConnector, connected: bool) -> anyhow::Result<()> {
    if !connected {
        println!("No working providers.");
        return Ok(());
    }
    let rows: Vec<ProviderRow> = connector
        .working_providers()
        .into_iter()
        .map(|p| ProviderRow {
            url: p.url,
            latency_ms: p.latency_ms,
            score: (p.score * 10.0).round() / 10.0,
        })
        .collect();
    print_json(&rows)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_are_found_anywhere() {
        let a = args(&["--config", "c.yaml", "--wallet", "0xabc"]);
        assert_eq!(parse_flag(&a, "--wallet").as_deref(), Some("0xabc"));
        assert_eq!(parse_flag(&a, "--config").as_deref(), Some("c.yaml"));
    }

    #[test]
    fn dangling_flag_has_no_value() {
        let a = args(&["--wallet"]);
        assert_eq!(parse_flag(&a, "--wallet"), None);
        assert_eq!(parse_flag(&a, "--config"), None);
    }
}
