use jalwa_types::api::{Page, Pagination};
use jalwa_types::{
    classify, normalize, Amount, Bet, BetError, BetRequest, GameMode, PayoutTable, Round, RoundId,
    RoundStatus, SettlementState,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Simulator configuration. The payout table is the backend's business rule
/// and must be supplied explicitly.
#[derive(Clone, Copy, Debug)]
pub struct SimulatorConfig {
    pub seed: u64,
    pub lock_buffer_ms: u64,
    pub payouts: PayoutTable,
    pub starting_balance: Amount,
    pub history_limit: usize,
}

impl SimulatorConfig {
    pub fn new(payouts: PayoutTable) -> Self {
        Self {
            seed: 42,
            lock_buffer_ms: 5_000,
            payouts,
            starting_balance: 100_000,
            history_limit: 100,
        }
    }
}

/// Rejection reasons for bet placement. These surface to clients as
/// `success = false` plus message, not as transport errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaceBetError {
    #[error("round not found")]
    RoundNotFound,
    #[error("betting is closed for this round")]
    BettingClosed,
    #[error("selection does not match bet type")]
    SelectionMismatch,
    #[error("{0}")]
    Invalid(#[from] BetError),
    #[error("insufficient balance")]
    InsufficientBalance,
}

#[derive(Clone, Debug)]
struct StoredBet {
    account: String,
    mode: GameMode,
    bet: Bet,
}

#[derive(Clone, Debug)]
struct ModeState {
    current: Round,
    /// Settled rounds, oldest first.
    settled: Vec<Round>,
}

/// Authoritative backend state: round scheduler, bets, and wallets.
///
/// All methods take an explicit `now_ms` so tests can drive time by hand;
/// rounds are advanced lazily to `now_ms` before every operation.
pub struct State {
    config: SimulatorConfig,
    rng: StdRng,
    next_round_id: RoundId,
    next_bet_id: u64,
    sequences: HashMap<GameMode, u64>,
    modes: HashMap<GameMode, ModeState>,
    bets: Vec<StoredBet>,
    balances: HashMap<String, Amount>,
}

impl State {
    pub fn new(config: SimulatorConfig, now_ms: u64) -> Self {
        let mut state = Self {
            config,
            rng: StdRng::seed_from_u64(config.seed),
            next_round_id: 1,
            next_bet_id: 1,
            sequences: HashMap::new(),
            modes: HashMap::new(),
            bets: Vec::new(),
            balances: HashMap::new(),
        };
        for mode in GameMode::ALL {
            let current = state.new_round(mode, now_ms);
            state.modes.insert(
                mode,
                ModeState {
                    current,
                    settled: Vec::new(),
                },
            );
        }
        state
    }

    fn new_round(&mut self, mode: GameMode, starts_at: u64) -> Round {
        let id = self.next_round_id;
        self.next_round_id += 1;
        let sequence = self.sequences.entry(mode).or_insert(0);
        *sequence += 1;
        let date = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(starts_at as i64)
            .map(|dt| dt.format("%Y%m%d").to_string())
            .unwrap_or_default();
        Round {
            id,
            period: format!("{date}-{sequence:06}"),
            game_mode: mode,
            starts_at,
            ends_at: starts_at + mode.duration_ms(),
            status: RoundStatus::Open,
            outcome: None,
        }
    }

    /// Advance every mode to `now_ms`: settle elapsed rounds (one new round
    /// begins the instant the previous window ends) and apply the server-side
    /// lock buffer.
    pub fn advance(&mut self, now_ms: u64) {
        for mode in GameMode::ALL {
            let Some(mut mode_state) = self.modes.remove(&mode) else {
                continue;
            };
            while now_ms >= mode_state.current.ends_at {
                let outcome = self.rng.gen_range(0..=9u8);
                mode_state.current.status = RoundStatus::Settled;
                mode_state.current.outcome = Some(outcome);
                self.resolve_bets(&mode_state.current);
                info!(
                    round = mode_state.current.id,
                    period = %mode_state.current.period,
                    outcome,
                    "round settled"
                );
                let next_start = mode_state.current.ends_at;
                mode_state.settled.push(mode_state.current.clone());
                if mode_state.settled.len() > self.config.history_limit {
                    mode_state.settled.remove(0);
                }
                mode_state.current = self.new_round(mode, next_start);
            }
            if mode_state.current.status == RoundStatus::Open
                && now_ms + self.config.lock_buffer_ms >= mode_state.current.ends_at
            {
                mode_state.current.status = RoundStatus::Locked;
            }
            self.modes.insert(mode, mode_state);
        }
    }

    fn resolve_bets(&mut self, round: &Round) {
        let Some(number) = round.outcome else {
            return;
        };
        let Ok(outcome) = classify(number) else {
            return;
        };
        for stored in self
            .bets
            .iter_mut()
            .filter(|stored| stored.bet.round_id == round.id)
        {
            stored.bet.settle(&outcome, &self.config.payouts);
            if let SettlementState::Won { payout } = stored.bet.settlement {
                let balance = self
                    .balances
                    .entry(stored.account.clone())
                    .or_insert(self.config.starting_balance);
                *balance = balance.saturating_add(payout);
                debug!(
                    account = %stored.account,
                    bet = stored.bet.id,
                    payout,
                    "bet won"
                );
            }
        }
    }

    pub fn place_bet(
        &mut self,
        account: &str,
        request: &BetRequest,
        now_ms: u64,
    ) -> Result<Bet, PlaceBetError> {
        self.advance(now_ms);

        let mode = self
            .modes
            .iter()
            .find(|(_, mode_state)| mode_state.current.id == request.round_id)
            .map(|(mode, _)| *mode);
        let Some(mode) = mode else {
            // A known past round is closed, anything else is unknown.
            let is_past = self
                .modes
                .values()
                .any(|m| m.settled.iter().any(|r| r.id == request.round_id));
            return Err(if is_past {
                PlaceBetError::BettingClosed
            } else {
                PlaceBetError::RoundNotFound
            });
        };

        let current = &self.modes[&mode].current;
        if current.status != RoundStatus::Open {
            return Err(PlaceBetError::BettingClosed);
        }
        if request.bet_type != request.selection.bet_type() {
            return Err(PlaceBetError::SelectionMismatch);
        }

        // Recompute the authoritative total; the client-supplied value is
        // advisory only.
        let normalized = normalize(
            request.selection,
            request.stake,
            request.multiplier,
            request.round_id,
        )?;

        let balance = self
            .balances
            .entry(account.to_string())
            .or_insert(self.config.starting_balance);
        if *balance < normalized.total_amount {
            return Err(PlaceBetError::InsufficientBalance);
        }
        *balance -= normalized.total_amount;

        let bet = Bet {
            id: self.next_bet_id,
            round_id: normalized.round_id,
            bet_type: normalized.bet_type,
            selection: normalized.selection,
            stake: normalized.stake,
            multiplier: normalized.multiplier,
            total_amount: normalized.total_amount,
            settlement: SettlementState::Pending,
        };
        self.next_bet_id += 1;
        self.bets.push(StoredBet {
            account: account.to_string(),
            mode,
            bet: bet.clone(),
        });
        info!(
            account,
            bet = bet.id,
            round = bet.round_id,
            total = bet.total_amount,
            "bet placed"
        );
        Ok(bet)
    }

    pub fn current_round(&mut self, mode: GameMode, now_ms: u64) -> Round {
        self.advance(now_ms);
        self.modes[&mode].current.clone()
    }

    pub fn round_history(
        &mut self,
        mode: GameMode,
        page: u32,
        page_size: u32,
        now_ms: u64,
    ) -> Page<Round> {
        self.advance(now_ms);
        let mut rounds: Vec<Round> = self.modes[&mode].settled.clone();
        rounds.reverse();
        paginate(rounds, page, page_size)
    }

    pub fn account_bets(
        &mut self,
        account: &str,
        mode: GameMode,
        page: u32,
        page_size: u32,
        now_ms: u64,
    ) -> Page<Bet> {
        self.advance(now_ms);
        let mut bets: Vec<Bet> = self
            .bets
            .iter()
            .filter(|stored| stored.account == account && stored.mode == mode)
            .map(|stored| stored.bet.clone())
            .collect();
        bets.reverse();
        paginate(bets, page, page_size)
    }

    pub fn balance(&self, account: &str) -> Amount {
        self.balances
            .get(account)
            .copied()
            .unwrap_or(self.config.starting_balance)
    }
}

fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, 100);
    let total = items.len() as u64;
    let start = ((page - 1) as usize).saturating_mul(page_size as usize);
    let items = items
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();
    Page {
        items,
        pagination: Pagination {
            page,
            page_size,
            total,
        },
    }
}
