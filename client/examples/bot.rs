//! Minimal betting bot: follows one game mode against a running backend,
//! wagering a fixed stake on red every time a fresh round opens.
//!
//! Start the simulator first, then:
//!
//! ```text
//! cargo run -p jalwa-client --example bot -- --base-url http://127.0.0.1:8080
//! ```

use anyhow::Result;
use clap::Parser;
use jalwa_client::{Client, Controller, ControllerConfig, Event};
use jalwa_types::{Color, GameMode, Multiplier, PayoutRatio, PayoutTable, Selection};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    #[arg(long, default_value = "alice")]
    account: String,

    #[arg(long, default_value = "wingo-1m")]
    game: String,

    /// Stake per bet in minor units.
    #[arg(long, default_value_t = 100)]
    stake: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let args = Args::parse();

    let mode = GameMode::from_code(&args.game)
        .ok_or_else(|| anyhow::anyhow!("unknown game code: {}", args.game))?;
    let client = Client::new(&args.base_url)?.with_auth_token(&args.account);

    // Ratios matching the simulator defaults.
    let payouts = PayoutTable {
        number: PayoutRatio(900),
        color: PayoutRatio(200),
        big_small: PayoutRatio(200),
    };
    let mut config = ControllerConfig::new(payouts);
    config.poll_interval = Duration::from_millis(500);

    let (handle, mut events, task) = Controller::spawn(client, config);
    handle.switch_mode(Some(mode)).await?;
    info!(game = mode.game_code(), "following rounds");

    let mut bet_round = None;
    while let Some(event) = events.recv().await {
        match event {
            Event::RoundUpdated { round, locked } => {
                if locked || bet_round == Some(round.id) {
                    continue;
                }
                match handle
                    .place_bet(Selection::Color(Color::Red), args.stake, Multiplier::X1)
                    .await
                {
                    Ok(bet) => {
                        bet_round = Some(round.id);
                        info!(bet = bet.id, round = round.id, total = bet.total_amount, "bet placed");
                    }
                    Err(err) => warn!(round = round.id, error = %err, "bet rejected"),
                }
            }
            Event::BetConfirmed { .. } => {}
            Event::BetSettled { bet, outcome } => {
                info!(bet = bet.id, outcome, result = ?bet.settlement, "settled");
            }
            Event::PollFailed { error } => warn!(error, "poll failed"),
        }
    }

    let _ = task.await;
    Ok(())
}
