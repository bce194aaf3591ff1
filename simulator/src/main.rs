use anyhow::{Context, Result};
use clap::Parser;
use jalwa_simulator::{Api, Simulator, SimulatorConfig};
use jalwa_types::{PayoutRatio, PayoutTable};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Jalwa backend simulator")]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Milliseconds before a round ends during which bets are refused.
    #[arg(long, default_value = "5000")]
    lock_buffer_ms: u64,

    #[arg(long, default_value = "100000")]
    starting_balance: u64,

    /// Payout ratios in hundredths of the wagered total.
    #[arg(long, default_value = "900")]
    payout_number: u32,

    #[arg(long, default_value = "200")]
    payout_color: u32,

    #[arg(long, default_value = "200")]
    payout_big_small: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let mut config = SimulatorConfig::new(PayoutTable {
        number: PayoutRatio(args.payout_number),
        color: PayoutRatio(args.payout_color),
        big_small: PayoutRatio(args.payout_big_small),
    });
    config.seed = args.seed;
    config.lock_buffer_ms = args.lock_buffer_ms;
    config.starting_balance = args.starting_balance;

    let simulator = Arc::new(Simulator::new(config));
    let router = Api::new(simulator).router();

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    info!(addr = %args.addr, "simulator listening");
    axum::serve(listener, router)
        .await
        .context("server exited")?;
    Ok(())
}
