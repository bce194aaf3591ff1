mod api;
mod state;

pub use api::Api;
pub use state::{PlaceBetError, SimulatorConfig, State};

use jalwa_types::api::Page;
use jalwa_types::{Amount, Bet, BetRequest, GameMode, Round};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Thread-safe wrapper around [`State`], driven by wall-clock time. This is
/// the authoritative backend the client SDK talks to.
pub struct Simulator {
    state: Mutex<State>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            state: Mutex::new(State::new(config, now_ms())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // Lock poisoning only happens if a holder panicked; the state itself
        // is still consistent for reads and writes.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current_round(&self, mode: GameMode) -> Round {
        self.lock().current_round(mode, now_ms())
    }

    pub fn round_history(&self, mode: GameMode, page: u32, page_size: u32) -> Page<Round> {
        self.lock().round_history(mode, page, page_size, now_ms())
    }

    pub fn account_bets(
        &self,
        account: &str,
        mode: GameMode,
        page: u32,
        page_size: u32,
    ) -> Page<Bet> {
        self.lock().account_bets(account, mode, page, page_size, now_ms())
    }

    pub fn place_bet(&self, account: &str, request: &BetRequest) -> Result<Bet, PlaceBetError> {
        self.lock().place_bet(account, request, now_ms())
    }

    pub fn balance(&self, account: &str) -> Amount {
        self.lock().balance(account)
    }
}
