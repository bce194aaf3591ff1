use crate::client::Client;
use crate::clock::RoundClock;
use crate::{Error, Result};
use jalwa_types::{
    classify, normalize, Amount, Bet, GameMode, Multiplier, PayoutTable, Round, RoundId,
    RoundStatus, Selection,
};
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Lifecycle states of the controller for one game mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No game mode selected.
    Idle,
    /// Mode selected, waiting for a fresh round from the backend.
    Polling,
    /// Current round is open and outside the lock window.
    AcceptingBets,
    /// Current round is locked but not yet settled.
    Waiting,
    /// Reconciling pending bets against a settled outcome.
    Settling,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Polling => "polling",
            Phase::AcceptingBets => "accepting_bets",
            Phase::Waiting => "waiting",
            Phase::Settling => "settling",
        }
    }
}

/// Controller configuration. The payout table is required external
/// configuration; there are no default ratios.
#[derive(Clone, Copy, Debug)]
pub struct ControllerConfig {
    /// Cadence of the current-round poll.
    pub poll_interval: Duration,
    /// Client-side pre-lock window, see [`RoundClock`].
    pub lock_buffer: Duration,
    pub payouts: PayoutTable,
}

impl ControllerConfig {
    pub fn new(payouts: PayoutTable) -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            lock_buffer: crate::clock::DEFAULT_LOCK_BUFFER,
            payouts,
        }
    }
}

/// Notifications emitted as the controller observes the backend.
#[derive(Clone, Debug)]
pub enum Event {
    RoundUpdated { round: Round, locked: bool },
    BetConfirmed { bet: Bet },
    BetSettled { bet: Bet, outcome: u8 },
    /// Polling failed; the last known round stays visible until a fresh
    /// response arrives.
    PollFailed { error: String },
}

/// Commands accepted by [`Controller::run`].
#[derive(Debug)]
pub enum Command {
    SwitchMode(Option<GameMode>),
    PlaceBet {
        selection: Selection,
        stake: Amount,
        multiplier: Multiplier,
        respond: oneshot::Sender<Result<Bet>>,
    },
    Shutdown,
}

/// Round/bet lifecycle controller for a single game mode at a time.
///
/// Owns its round clock and pending-bet set exclusively; nothing is shared
/// across modes. All transitions happen on one task: polls and submissions
/// are serialized, so at most one of each is in flight.
pub struct Controller {
    client: Client,
    config: ControllerConfig,
    clock: RoundClock,
    events: mpsc::Sender<Event>,
    mode: Option<GameMode>,
    phase: Phase,
    round: Option<Round>,
    pending: Vec<Bet>,
    generation: u64,
}

impl Controller {
    pub fn new(client: Client, config: ControllerConfig, events: mpsc::Sender<Event>) -> Self {
        Self {
            client,
            clock: RoundClock::new(config.lock_buffer),
            config,
            events,
            mode: None,
            phase: Phase::Idle,
            round: None,
            pending: Vec::new(),
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn pending_bets(&self) -> &[Bet] {
        self.pending.as_slice()
    }

    /// Select a mode (or none). The previous context is abandoned: local
    /// state is cleared and any in-flight response for it is discarded via
    /// the generation counter.
    pub fn switch_mode(&mut self, mode: Option<GameMode>) {
        self.generation += 1;
        self.mode = mode;
        self.round = None;
        self.pending.clear();
        self.phase = match mode {
            Some(_) => Phase::Polling,
            None => Phase::Idle,
        };
        if let Some(mode) = mode {
            info!(
                mode = mode.game_code(),
                phase = self.phase.as_str(),
                "game mode selected"
            );
        }
    }

    /// One cooperative step: refresh the local lock state, then poll the
    /// current round and apply whatever it reveals.
    pub async fn tick(&mut self) {
        self.tick_at(now_ms()).await;
    }

    pub async fn tick_at(&mut self, now_ms: u64) {
        let Some(mode) = self.mode else {
            return;
        };
        self.refresh_lock_state(now_ms);

        let generation = self.generation;
        match self.client.current_round(mode).await {
            Ok(Some(round)) => {
                if generation != self.generation {
                    debug!(round = round.id, "dropping response for abandoned mode");
                    return;
                }
                self.apply_round(round, now_ms).await;
            }
            Ok(None) => {
                debug!(mode = mode.game_code(), "no active round");
            }
            Err(err) => {
                // Stale-but-available: keep the last known round and retry
                // on the next tick.
                warn!(error = %err, "poll failed");
                self.emit(Event::PollFailed {
                    error: err.to_string(),
                });
            }
        }
    }

    fn refresh_lock_state(&mut self, now_ms: u64) {
        if self.phase != Phase::AcceptingBets {
            return;
        }
        if let Some(round) = &self.round {
            if self.clock.is_locked(round, now_ms) {
                self.phase = Phase::Waiting;
                debug!(
                    round = round.id,
                    phase = self.phase.as_str(),
                    "betting window closed locally"
                );
            }
        }
    }

    async fn apply_round(&mut self, round: Round, now_ms: u64) {
        if let Err(err) = round.validate() {
            warn!(error = %err, "ignoring invalid round from backend");
            return;
        }
        let Some(mode) = self.mode else {
            return;
        };

        if round.status == RoundStatus::Settled {
            self.settle_against(&round);
        }

        // Pending bets that reference neither the current round nor a round
        // we saw settle missed their settlement snapshot between polls;
        // recover the outcomes from history.
        let stale: BTreeSet<RoundId> = self
            .pending
            .iter()
            .map(|bet| bet.round_id)
            .filter(|id| *id != round.id)
            .collect();
        for round_id in stale {
            self.reconcile_from_history(mode, round_id).await;
        }

        let locked = self.clock.is_locked(&round, now_ms);
        self.phase = match round.status {
            RoundStatus::Settled => Phase::Polling,
            _ if locked => Phase::Waiting,
            _ => Phase::AcceptingBets,
        };
        debug!(
            round = round.id,
            phase = self.phase.as_str(),
            locked,
            "round applied"
        );
        let changed = self.round.as_ref() != Some(&round);
        self.round = Some(round.clone());
        if changed {
            self.emit(Event::RoundUpdated { round, locked });
        }
    }

    /// Cross-reference pending bets against a settled round, classifying
    /// each as win or loss and computing the payout from the configured
    /// ratio table. Wallet credit is the backend's job.
    fn settle_against(&mut self, round: &Round) {
        let Some(number) = round.outcome else {
            return;
        };
        let outcome = match classify(number) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(round = round.id, error = %err, "unclassifiable outcome");
                return;
            }
        };
        if !self.pending.iter().any(|bet| bet.round_id == round.id) {
            return;
        }

        self.phase = Phase::Settling;
        let (matching, remaining): (Vec<Bet>, Vec<Bet>) = self
            .pending
            .drain(..)
            .partition(|bet| bet.round_id == round.id);
        self.pending = remaining;
        for mut bet in matching {
            bet.settle(&outcome, &self.config.payouts);
            info!(
                bet = bet.id,
                round = round.id,
                result = ?bet.settlement,
                "bet settled"
            );
            self.emit(Event::BetSettled {
                bet,
                outcome: number,
            });
        }
        // Back to polling to pick up the next round.
        self.phase = Phase::Polling;
    }

    async fn reconcile_from_history(&mut self, mode: GameMode, round_id: RoundId) {
        match self.client.round_history(mode, 1, 20).await {
            Ok(page) => {
                if let Some(settled) = page.items.into_iter().find(|round| round.id == round_id) {
                    self.settle_against(&settled);
                } else {
                    debug!(round = round_id, "settled round not yet in history");
                }
            }
            Err(err) => {
                // Leave the bets pending; the next poll retries.
                warn!(round = round_id, error = %err, "history reconciliation failed");
            }
        }
    }

    /// Submit a bet against the current round. Fails fast with
    /// [`Error::RoundLocked`] before any transport call when the betting
    /// window is closed; pending state mutates only on confirmed success.
    pub async fn place_bet(
        &mut self,
        selection: Selection,
        stake: Amount,
        multiplier: Multiplier,
    ) -> Result<Bet> {
        self.place_bet_at(selection, stake, multiplier, now_ms()).await
    }

    pub async fn place_bet_at(
        &mut self,
        selection: Selection,
        stake: Amount,
        multiplier: Multiplier,
        now_ms: u64,
    ) -> Result<Bet> {
        if self.mode.is_none() {
            return Err(Error::NoModeSelected);
        }
        self.refresh_lock_state(now_ms);
        let round = match (&self.phase, &self.round) {
            (Phase::AcceptingBets, Some(round)) if !self.clock.is_locked(round, now_ms) => {
                round.clone()
            }
            _ => return Err(Error::RoundLocked),
        };

        let request = normalize(selection, stake, multiplier, round.id)?;
        let bet = self.client.place_bet(&request).await?;
        self.pending.push(bet.clone());
        info!(
            bet = bet.id,
            round = round.id,
            total = bet.total_amount,
            "bet confirmed"
        );
        self.emit(Event::BetConfirmed { bet: bet.clone() });
        Ok(bet)
    }

    // Events are advisory; a slow consumer drops them rather than stalling
    // the lifecycle loop.
    fn emit(&self, event: Event) {
        if let Err(err) = self.events.try_send(event) {
            debug!(error = %err, "event dropped");
        }
    }

    /// Drive the controller: poll on a fixed interval and serve commands.
    /// Everything runs on this one task, so polls never overlap and bet
    /// submissions are serialized.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                command = commands.recv() => match command {
                    Some(Command::SwitchMode(mode)) => {
                        self.switch_mode(mode);
                        if mode.is_some() {
                            self.tick().await;
                        }
                    }
                    Some(Command::PlaceBet { selection, stake, multiplier, respond }) => {
                        let result = self.place_bet(selection, stake, multiplier).await;
                        let _ = respond.send(result);
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }
    }

    /// Spawn the run loop, returning a command handle and the event stream.
    pub fn spawn(
        client: Client,
        config: ControllerConfig,
    ) -> (Handle, mpsc::Receiver<Event>, tokio::task::JoinHandle<()>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (command_tx, command_rx) = mpsc::channel(16);
        let controller = Controller::new(client, config, event_tx);
        let task = tokio::spawn(controller.run(command_rx));
        (Handle { commands: command_tx }, event_rx, task)
    }
}

/// Cheap cloneable handle to a running controller task.
#[derive(Clone)]
pub struct Handle {
    commands: mpsc::Sender<Command>,
}

impl Handle {
    pub async fn switch_mode(&self, mode: Option<GameMode>) -> Result<()> {
        self.commands
            .send(Command::SwitchMode(mode))
            .await
            .map_err(|_| Error::ControllerStopped)
    }

    pub async fn place_bet(
        &self,
        selection: Selection,
        stake: Amount,
        multiplier: Multiplier,
    ) -> Result<Bet> {
        let (respond, response) = oneshot::channel();
        self.commands
            .send(Command::PlaceBet {
                selection,
                stake,
                multiplier,
                respond,
            })
            .await
            .map_err(|_| Error::ControllerStopped)?;
        response.await.map_err(|_| Error::ControllerStopped)?
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetryPolicy;
    use axum::{
        extract::State as AxumState,
        http::StatusCode as AxumStatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use jalwa_types::api::{ApiResponse, Page, Pagination};
    use jalwa_types::{BetType, PayoutRatio, SettlementState};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, Duration};

    fn payouts() -> PayoutTable {
        PayoutTable {
            number: PayoutRatio(900),
            color: PayoutRatio(200),
            big_small: PayoutRatio(200),
        }
    }

    fn open_round(id: u64, ends_in_ms: u64) -> Round {
        let now = now_ms();
        let ends_at = now + ends_in_ms;
        Round {
            id,
            period: format!("20250826-{id:06}"),
            game_mode: GameMode::OneMin,
            starts_at: ends_at - 60_000,
            ends_at,
            status: RoundStatus::Open,
            outcome: None,
        }
    }

    struct Backend {
        round: Mutex<Round>,
        history: Mutex<Vec<Round>>,
        poll_failures: AtomicUsize,
        bet_calls: AtomicUsize,
        next_bet_id: AtomicUsize,
    }

    impl Backend {
        fn new(round: Round) -> Arc<Self> {
            Arc::new(Self {
                round: Mutex::new(round),
                history: Mutex::new(Vec::new()),
                poll_failures: AtomicUsize::new(0),
                bet_calls: AtomicUsize::new(0),
                next_bet_id: AtomicUsize::new(1),
            })
        }

        fn set_round(&self, round: Round) {
            *self.round.lock().unwrap() = round;
        }

        fn settle_current(&self, outcome: u8) {
            let mut round = self.round.lock().unwrap();
            round.status = RoundStatus::Settled;
            round.outcome = Some(outcome);
        }

        /// Replace the current round and move the old one, settled, into
        /// history only.
        fn roll_over(&self, outcome: u8, next: Round) {
            let mut round = self.round.lock().unwrap();
            let mut settled = round.clone();
            settled.status = RoundStatus::Settled;
            settled.outcome = Some(outcome);
            self.history.lock().unwrap().push(settled);
            *round = next;
        }
    }

    fn router(backend: Arc<Backend>) -> Router {
        Router::new()
            .route(
                "/api/wingo-1m/rounds/current",
                get(|AxumState(backend): AxumState<Arc<Backend>>| async move {
                    if backend.poll_failures.load(Ordering::SeqCst) > 0 {
                        backend.poll_failures.fetch_sub(1, Ordering::SeqCst);
                        return AxumStatusCode::SERVICE_UNAVAILABLE.into_response();
                    }
                    let round = backend.round.lock().unwrap().clone();
                    Json(ApiResponse::ok(round)).into_response()
                }),
            )
            .route(
                "/api/wingo-1m/rounds",
                get(|AxumState(backend): AxumState<Arc<Backend>>| async move {
                    let mut items = backend.history.lock().unwrap().clone();
                    items.reverse();
                    let total = items.len() as u64;
                    Json(ApiResponse::ok(Page {
                        items,
                        pagination: Pagination {
                            page: 1,
                            page_size: 20,
                            total,
                        },
                    }))
                    .into_response()
                }),
            )
            .route(
                "/api/bets",
                post(
                    |AxumState(backend): AxumState<Arc<Backend>>,
                     Json(request): Json<jalwa_types::BetRequest>| async move {
                        backend.bet_calls.fetch_add(1, Ordering::SeqCst);
                        let id = backend.next_bet_id.fetch_add(1, Ordering::SeqCst) as u64;
                        Json(ApiResponse::ok(Bet {
                            id,
                            round_id: request.round_id,
                            bet_type: request.bet_type,
                            selection: request.selection,
                            stake: request.stake,
                            multiplier: request.multiplier,
                            total_amount: request.total_amount,
                            settlement: SettlementState::Pending,
                        }))
                        .into_response()
                    },
                ),
            )
            .with_state(backend)
    }

    async fn serve(backend: Arc<Backend>) -> (String, tokio::task::JoinHandle<()>) {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, router(backend).into_make_service())
                .await
                .unwrap();
        });
        sleep(Duration::from_millis(50)).await;
        (base_url, handle)
    }

    fn controller_for(base_url: &str) -> (Controller, mpsc::Receiver<Event>) {
        let client = Client::new(base_url).unwrap().with_auth_token("alice");
        let (event_tx, event_rx) = mpsc::channel(64);
        let controller = Controller::new(client, ControllerConfig::new(payouts()), event_tx);
        (controller, event_rx)
    }

    fn drain(events: &mut mpsc::Receiver<Event>) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    #[test]
    fn test_phase_labels() {
        // Labels show up in log output; keep them stable.
        let labeled = [
            (Phase::Idle, "idle"),
            (Phase::Polling, "polling"),
            (Phase::AcceptingBets, "accepting_bets"),
            (Phase::Waiting, "waiting"),
            (Phase::Settling, "settling"),
        ];
        for (phase, label) in labeled {
            assert_eq!(phase.as_str(), label);
        }
    }

    #[tokio::test]
    async fn test_bet_lifecycle() {
        let backend = Backend::new(open_round(1, 30_000));
        let (base_url, server) = serve(backend.clone()).await;
        let (mut controller, mut events) = controller_for(&base_url);

        assert_eq!(controller.phase(), Phase::Idle);
        controller.switch_mode(Some(GameMode::OneMin));
        assert_eq!(controller.phase(), Phase::Polling);

        controller.tick().await;
        assert_eq!(controller.phase(), Phase::AcceptingBets);
        assert!(matches!(
            drain(&mut events).as_slice(),
            [Event::RoundUpdated { locked: false, .. }]
        ));

        // Exactly one pending bet after a confirmed submission.
        let bet = controller
            .place_bet(Selection::Number(7), 10, Multiplier::X5)
            .await
            .unwrap();
        assert_eq!(bet.total_amount, 50);
        assert_eq!(controller.pending_bets().len(), 1);
        assert!(matches!(
            drain(&mut events).as_slice(),
            [Event::BetConfirmed { .. }]
        ));

        // Polling the same open round again settles nothing.
        controller.tick().await;
        assert_eq!(controller.pending_bets().len(), 1);
        assert!(matches!(
            controller.pending_bets()[0].settlement,
            SettlementState::Pending
        ));

        // Round settles on 7: the number bet wins 50 * 9.00.
        backend.settle_current(7);
        controller.tick().await;
        assert_eq!(controller.phase(), Phase::Polling);
        assert!(controller.pending_bets().is_empty());
        let drained = drain(&mut events);
        let settled = drained
            .iter()
            .find_map(|event| match event {
                Event::BetSettled { bet, outcome } => Some((bet.clone(), *outcome)),
                _ => None,
            })
            .expect("settlement event");
        assert_eq!(settled.1, 7);
        assert_eq!(settled.0.settlement, SettlementState::Won { payout: 450 });

        server.abort();
    }

    #[tokio::test]
    async fn test_locked_round_rejected_without_transport_call() {
        // Ends within the default 5s lock buffer.
        let backend = Backend::new(open_round(1, 2_000));
        let (base_url, server) = serve(backend.clone()).await;
        let (mut controller, _events) = controller_for(&base_url);

        controller.switch_mode(Some(GameMode::OneMin));
        controller.tick().await;
        assert_eq!(controller.phase(), Phase::Waiting);

        let err = controller
            .place_bet(Selection::Number(7), 10, Multiplier::X5)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RoundLocked));
        assert_eq!(backend.bet_calls.load(Ordering::SeqCst), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_expired_open_round_is_waiting() {
        // Backend still says Open but the window has passed; the clock's
        // conservative default wins.
        let mut round = open_round(1, 30_000);
        round.starts_at -= 31_000;
        round.ends_at -= 31_000;
        let backend = Backend::new(round);
        let (base_url, server) = serve(backend.clone()).await;
        let (mut controller, _events) = controller_for(&base_url);

        controller.switch_mode(Some(GameMode::OneMin));
        controller.tick().await;
        assert_eq!(controller.phase(), Phase::Waiting);
        assert!(matches!(
            controller
                .place_bet(Selection::Number(7), 10, Multiplier::X5)
                .await,
            Err(Error::RoundLocked)
        ));
        assert_eq!(backend.bet_calls.load(Ordering::SeqCst), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_last_round() {
        let backend = Backend::new(open_round(1, 30_000));
        let (base_url, server) = serve(backend.clone()).await;
        let client = Client::new(&base_url).unwrap().with_retry_policy(RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            retry_non_idempotent: false,
        });
        let (event_tx, mut events) = mpsc::channel(64);
        let mut controller =
            Controller::new(client, ControllerConfig::new(payouts()), event_tx);

        controller.switch_mode(Some(GameMode::OneMin));
        controller.tick().await;
        assert_eq!(controller.round().map(|round| round.id), Some(1));
        drain(&mut events);

        backend.poll_failures.store(1, Ordering::SeqCst);
        controller.tick().await;
        // Stale-but-available: round and phase unchanged, failure surfaced.
        assert_eq!(controller.round().map(|round| round.id), Some(1));
        assert_eq!(controller.phase(), Phase::AcceptingBets);
        assert!(matches!(
            drain(&mut events).as_slice(),
            [Event::PollFailed { .. }]
        ));

        server.abort();
    }

    #[tokio::test]
    async fn test_missed_settlement_recovered_from_history() {
        let backend = Backend::new(open_round(1, 30_000));
        let (base_url, server) = serve(backend.clone()).await;
        let (mut controller, mut events) = controller_for(&base_url);

        controller.switch_mode(Some(GameMode::OneMin));
        controller.tick().await;
        controller
            .place_bet(Selection::Color(jalwa_types::Color::Violet), 10, Multiplier::X1)
            .await
            .unwrap();
        drain(&mut events);

        // The settled snapshot of round 1 is never polled; round 2 replaces
        // it directly and the outcome lands in history.
        backend.roll_over(5, open_round(2, 30_000));
        controller.tick().await;

        assert!(controller.pending_bets().is_empty());
        let drained = drain(&mut events);
        let settled = drained
            .iter()
            .find_map(|event| match event {
                Event::BetSettled { bet, outcome } => Some((bet.clone(), *outcome)),
                _ => None,
            })
            .expect("settlement recovered from history");
        // Violet wins on 5 at 2.00x.
        assert_eq!(settled.1, 5);
        assert_eq!(settled.0.settlement, SettlementState::Won { payout: 20 });
        assert_eq!(controller.round().map(|round| round.id), Some(2));

        server.abort();
    }

    #[tokio::test]
    async fn test_switch_mode_clears_state() {
        let backend = Backend::new(open_round(1, 30_000));
        let (base_url, server) = serve(backend.clone()).await;
        let (mut controller, _events) = controller_for(&base_url);

        controller.switch_mode(Some(GameMode::OneMin));
        controller.tick().await;
        controller
            .place_bet(Selection::Size(jalwa_types::Size::Big), 10, Multiplier::X1)
            .await
            .unwrap();
        assert_eq!(controller.pending_bets().len(), 1);

        controller.switch_mode(None);
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.round().is_none());
        assert!(controller.pending_bets().is_empty());
        assert!(matches!(
            controller
                .place_bet(Selection::Number(1), 10, Multiplier::X1)
                .await,
            Err(Error::NoModeSelected)
        ));

        server.abort();
    }

    #[tokio::test]
    async fn test_run_loop_against_simulator() {
        use jalwa_simulator::{Api, Simulator, SimulatorConfig};

        let simulator = Arc::new(Simulator::new(SimulatorConfig::new(payouts())));
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                Api::new(simulator).router().into_make_service(),
            )
            .await
            .unwrap();
        });
        sleep(Duration::from_millis(50)).await;

        let client = Client::new(&base_url).unwrap().with_auth_token("alice");
        let mut config = ControllerConfig::new(payouts());
        config.poll_interval = Duration::from_millis(100);
        let (handle, mut events, task) = Controller::spawn(client, config);

        // A fresh five-minute round has its whole window ahead, so betting
        // is open as soon as the first poll lands.
        handle.switch_mode(Some(GameMode::FiveMin)).await.unwrap();
        let bet = handle
            .place_bet(Selection::Number(3), 10, Multiplier::X10)
            .await
            .unwrap();
        assert_eq!(bet.total_amount, 100);
        assert_eq!(bet.settlement, SettlementState::Pending);
        assert_eq!(bet.bet_type, BetType::Number);

        let mut saw_round = false;
        let mut saw_confirmation = false;
        while let Ok(event) = events.try_recv() {
            match event {
                Event::RoundUpdated { .. } => saw_round = true,
                Event::BetConfirmed { .. } => saw_confirmation = true,
                _ => {}
            }
        }
        assert!(saw_round);
        assert!(saw_confirmation);

        handle.shutdown().await;
        let _ = task.await;
        server.abort();
    }
}
