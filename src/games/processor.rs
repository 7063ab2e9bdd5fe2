//! Engine facade: starts rounds, routes player actions and settles
//!
//! Every request is validated completely before the ledger is touched, so a
//! rejection never changes the balance, a session or the history.

use crate::common::traits::{RandomSource, StateStore};
use crate::common::types::lock;
use crate::config::EngineConfig;
use crate::errors::{ActionError, WagerError, WagerResult};
use crate::games::crash::GrowthCurve;
use crate::games::live::{self, DriverPlan, LiveCrashHandle, LiveDecision, LiveRounds};
use crate::games::mines::MinesOdds;
use crate::games::rng::StdRandom;
use crate::games::session::{BetSession, RoundState};
use crate::games::types::{
    GameInput, GameParams, GameType, RoundResult, SessionId, SessionState, SessionStatus,
};
use crate::ledger::{HistoryEntry, Ledger};
use crate::metrics::EngineMetrics;
use crate::storage::JsonFileStore;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Settled sessions kept around for `get_state`
const RETAINED_SETTLED: usize = 256;

#[derive(Default)]
struct SessionTable {
    sessions: HashMap<SessionId, BetSession>,
    /// At most one active session per game
    active: HashMap<GameType, SessionId>,
    settled: VecDeque<SessionId>,
}

impl SessionTable {
    fn get_mut(&mut self, session_id: SessionId) -> Result<&mut BetSession, ActionError> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(ActionError::SessionNotFound(session_id))
    }

    fn retire(&mut self, session_id: SessionId, game: GameType) {
        if self.active.get(&game) == Some(&session_id) {
            self.active.remove(&game);
        }
        self.settled.push_back(session_id);
        while self.settled.len() > RETAINED_SETTLED {
            if let Some(old) = self.settled.pop_front() {
                self.sessions.remove(&old);
            }
        }
    }
}

/// The wagering engine
#[derive(Clone)]
pub struct GameProcessor {
    config: Arc<EngineConfig>,
    odds: Arc<MinesOdds>,
    ledger: Arc<Ledger>,
    rng: Arc<Mutex<Box<dyn RandomSource>>>,
    table: Arc<Mutex<SessionTable>>,
    live: LiveRounds,
    metrics: Arc<EngineMetrics>,
    store: Option<Arc<dyn StateStore>>,
}

impl GameProcessor {
    /// In-memory engine with an entropy-seeded generator
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRandom::new())
    }

    pub fn with_rng<R: RandomSource + 'static>(config: EngineConfig, rng: R) -> Self {
        let ledger = Ledger::new(config.ledger.clone());
        Self::assemble(config, Box::new(rng), ledger, None)
    }

    /// Engine backed by `store`; saved balance and history are restored
    pub fn with_store<R: RandomSource + 'static>(
        config: EngineConfig,
        rng: R,
        store: Arc<dyn StateStore>,
    ) -> WagerResult<Self> {
        let ledger = match store.load()? {
            Some(state) => Ledger::from_state(config.ledger.clone(), state),
            None => Ledger::new(config.ledger.clone()),
        };
        Ok(Self::assemble(config, Box::new(rng), ledger, Some(store)))
    }

    /// Engine wired from configuration: JSON file persistence when enabled
    pub fn from_config(config: EngineConfig) -> WagerResult<Self> {
        if config.storage.persist {
            let store = Arc::new(JsonFileStore::new(&config.storage.state_path));
            Self::with_store(config, StdRandom::new(), store)
        } else {
            Ok(Self::new(config))
        }
    }

    fn assemble(
        config: EngineConfig,
        rng: Box<dyn RandomSource>,
        ledger: Ledger,
        store: Option<Arc<dyn StateStore>>,
    ) -> Self {
        if let Some(target) = config.crash.overpaying_target() {
            warn!(
                "Crash bands pay more than the house edge allows at {:.2}x",
                target
            );
        }
        Self {
            odds: Arc::new(MinesOdds::new(&config.mines)),
            config: Arc::new(config),
            ledger: Arc::new(ledger),
            rng: Arc::new(Mutex::new(rng)),
            table: Arc::new(Mutex::new(SessionTable::default())),
            live: LiveRounds::new(),
            metrics: Arc::new(EngineMetrics::new()),
            store,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn odds(&self) -> &MinesOdds {
        &self.odds
    }

    /// Commit a stake and the hidden outcome for a new round
    ///
    /// Instant games (limbo, dice, plinko) are settled before this returns.
    /// Crash rounds need a tokio runtime for their driver.
    pub fn start_round(&self, params: GameParams, stake: f64) -> WagerResult<SessionId> {
        self.begin(params, stake).map(|(session_id, _)| session_id)
    }

    /// Start a live crash round and return its handle
    pub fn start_live_crash(&self, stake: f64) -> WagerResult<LiveCrashHandle> {
        let (session_id, handle) = self.begin(GameParams::Crash, stake)?;
        handle.ok_or_else(|| ActionError::SessionNotFound(session_id).into())
    }

    fn begin(
        &self,
        params: GameParams,
        stake: f64,
    ) -> WagerResult<(SessionId, Option<LiveCrashHandle>)> {
        let game = params.game_type();
        let (session_id, handle) = {
            let mut table = lock(&self.table);

            if table.active.contains_key(&game) {
                return self.reject(ActionError::RoundInProgress(game));
            }
            if let Err(e) = RoundState::validate(&params, &self.config, &self.odds) {
                return self.reject(e);
            }
            let runtime = if game == GameType::Crash {
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => Some(runtime),
                    Err(_) => return self.reject(ActionError::NoRuntime),
                }
            } else {
                None
            };
            if let Err(e) = self.ledger.place_stake(stake) {
                return self.reject(e);
            }

            let started = {
                let mut rng = lock(&self.rng);
                RoundState::start(params, &self.config, &self.odds, &mut **rng)
            };
            let (round, result) = match started {
                Ok(started) => started,
                Err(e) => {
                    // Parameters were validated above; give the stake back regardless
                    self.ledger.apply_delta(stake);
                    return self.reject(e);
                }
            };

            let crash_point = match &round {
                RoundState::Crash(crash) => Some(crash.crash_point()),
                _ => None,
            };
            let mut session = BetSession::new(stake, round);
            session.apply(result);
            let session_id = session.id();
            self.metrics.record_start(game, stake);
            info!(
                "Round {} started: {} stake {:.2}",
                session_id, game, stake
            );

            let settled = session.status().is_terminal();
            table.sessions.insert(session_id, session);
            if settled {
                self.finalize(&mut table, session_id);
            } else {
                table.active.insert(game, session_id);
            }

            let handle = match (runtime, crash_point) {
                (Some(runtime), Some(crash_point)) => {
                    let plan = DriverPlan {
                        session_id,
                        crash_point,
                        curve: GrowthCurve::new(&self.config.crash),
                        tick: self.config.tick_interval(),
                    };
                    let handle = live::spawn(self.clone(), plan, &runtime);
                    self.live.insert(handle.clone());
                    Some(handle)
                }
                _ => None,
            };

            (session_id, handle)
        };

        // The debit is durable even while the round is still open
        self.persist();
        Ok((session_id, handle))
    }

    /// Handle of a live round that is still running
    pub fn live_handle(&self, session_id: SessionId) -> Option<LiveCrashHandle> {
        self.live.get(&session_id)
    }

    pub fn live_rounds(&self) -> usize {
        self.live.len()
    }

    /// Apply a reveal or door pick
    ///
    /// On a settled session this is a no-op returning the settled state.
    pub fn act(&self, session_id: SessionId, input: GameInput) -> WagerResult<SessionState> {
        self.transition(session_id, |session| {
            debug!("Round {} input {:?}", session_id, input);
            session.act(input)
        })
    }

    /// Settle an interactive round at its current multiplier
    ///
    /// On a settled session this is a no-op returning the settled state.
    /// Live crash rounds are cashed out through their [`LiveCrashHandle`].
    pub fn cash_out(&self, session_id: SessionId) -> WagerResult<SessionState> {
        if self.live.contains(&session_id) {
            return self.reject(ActionError::LiveRoundDriven(session_id));
        }
        self.transition(session_id, |session| session.cash_out())
    }

    fn transition<F>(&self, session_id: SessionId, apply: F) -> WagerResult<SessionState>
    where
        F: FnOnce(&mut BetSession) -> Result<RoundResult, ActionError>,
    {
        let (state, settled) = {
            let mut table = lock(&self.table);
            let session = match table.get_mut(session_id) {
                Ok(session) => session,
                Err(e) => return self.reject(e),
            };
            if session.status().is_terminal() {
                return Ok(session.snapshot());
            }

            if let Err(e) = apply(session) {
                return self.reject(e);
            }

            let settled = session.status().is_terminal();
            if settled {
                self.finalize(&mut table, session_id);
            }
            let state = table.get_mut(session_id).map(|s| s.snapshot())?;
            (state, settled)
        };

        if settled {
            self.persist();
        }
        Ok(state)
    }

    /// Settle a live round as decided by its driver; repeat calls are no-ops
    pub(crate) fn settle_live(
        &self,
        session_id: SessionId,
        decision: LiveDecision,
    ) -> WagerResult<SessionState> {
        let state = {
            let mut table = lock(&self.table);
            self.live.remove(&session_id);
            let session = table.get_mut(session_id)?;
            if session.status().is_terminal() {
                return Ok(session.snapshot());
            }

            let result = match session.round_mut().as_crash_mut() {
                Some(round) => match decision {
                    LiveDecision::CashOut { at } => round.resolve_cash_out(at),
                    LiveDecision::Bust => round.resolve_bust(),
                },
                None => return Err(ActionError::SessionNotFound(session_id).into()),
            };
            session.apply(result);

            self.finalize(&mut table, session_id);
            table.get_mut(session_id).map(|s| s.snapshot())?
        };

        self.persist();
        Ok(state)
    }

    /// Credit the payout, append history and retire the session
    fn finalize(&self, table: &mut SessionTable, session_id: SessionId) {
        let Some(session) = table.sessions.get(&session_id) else {
            return;
        };
        let game = session.game();
        let entry = HistoryEntry::new(session_id, game, session.stake(), session.multiplier());
        let payout = entry.payout;
        let won = session.status() == SessionStatus::Won;

        let balance = self.ledger.settle(entry);
        self.metrics.record_settlement(game, payout, won);
        info!(
            "Round {} settled: {} {} payout {:.2}, balance {:.2}",
            session_id,
            game,
            session.status(),
            payout,
            balance
        );

        table.retire(session_id, game);
    }

    /// Read-only snapshot of a session
    pub fn get_state(&self, session_id: SessionId) -> WagerResult<SessionState> {
        let mut table = lock(&self.table);
        Ok(table.get_mut(session_id)?.snapshot())
    }

    /// Active session of `game`, if any
    pub fn active_session(&self, game: GameType) -> Option<SessionId> {
        lock(&self.table).active.get(&game).copied()
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance()
    }

    /// Up to `limit` settlements, newest first
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.ledger.recent(limit)
    }

    /// Restore the starting balance and clear history
    ///
    /// Refused while any round is active so no stake is lost in flight.
    pub fn reset(&self) -> WagerResult<f64> {
        let balance = {
            let table = lock(&self.table);
            if let Some(game) = table.active.keys().next() {
                return self.reject(ActionError::RoundInProgress(*game));
            }
            self.ledger.reset()
        };

        info!("Ledger reset to {:.2}", balance);
        self.save_state()?;
        Ok(balance)
    }

    /// Write balance and history to the store, if one is attached
    pub fn save_state(&self) -> WagerResult<()> {
        match &self.store {
            Some(store) => store.save(&self.ledger.snapshot()),
            None => Ok(()),
        }
    }

    fn persist(&self) {
        if let Err(e) = self.save_state() {
            warn!("Failed to persist state: {}", e);
        }
    }

    fn reject<T, E: Into<WagerError>>(&self, error: E) -> WagerResult<T> {
        let error = error.into();
        self.metrics.record_rejection();
        warn!("Rejected: {}", error);
        Err(error)
    }
}
