//! Generic bet session over the per-game round state
//!
//! Each game supplies a [`Round`]: its committed outcome, its odds and its
//! legal transitions. [`BetSession`] owns one round plus the money side
//! (stake, status, payout) and is identical for every game.

use crate::config::EngineConfig;
use crate::common::traits::RandomSource;
use crate::common::types::now;
use crate::errors::{ActionError, ParameterError};
use crate::games::crash::{CrashRound, LimboRound};
use crate::games::dice::DiceRound;
use crate::games::mines::{MinesOdds, MinesRound};
use crate::games::plinko::PlinkoRound;
use crate::games::tower::TowerRound;
use crate::games::types::{
    GameInput, GameParams, GameType, HiddenOutcome, RoundResult, RoundView, SessionId,
    SessionState, SessionStatus,
};
use chrono::{DateTime, Utc};

/// Capabilities every game round provides
pub trait Round {
    const GAME: GameType;

    /// Apply a player input to an active round
    fn act(&mut self, _input: GameInput) -> Result<RoundResult, ActionError> {
        Err(ActionError::UnexpectedInput {
            game: Self::GAME,
            expected: "no input",
        })
    }

    /// Settle an active round at its current multiplier
    fn cash_out(&mut self) -> Result<RoundResult, ActionError> {
        Err(ActionError::CashOutUnsupported(Self::GAME))
    }

    /// Multiplier the round would pay right now
    fn multiplier(&self) -> f64;

    /// Public progress; `settled` exposes the hidden outcome
    fn view(&self, settled: bool) -> RoundView;

    fn hidden_outcome(&self) -> HiddenOutcome;
}

/// Per-game round state
#[derive(Debug, Clone)]
pub enum RoundState {
    Mines(MinesRound),
    Tower(TowerRound),
    Crash(CrashRound),
    Limbo(LimboRound),
    Dice(DiceRound),
    Plinko(PlinkoRound),
}

macro_rules! dispatch {
    ($self:expr, $round:ident => $body:expr) => {
        match $self {
            RoundState::Mines($round) => $body,
            RoundState::Tower($round) => $body,
            RoundState::Crash($round) => $body,
            RoundState::Limbo($round) => $body,
            RoundState::Dice($round) => $body,
            RoundState::Plinko($round) => $body,
        }
    };
}

impl RoundState {
    /// Commit the hidden outcome for a new round
    ///
    /// Instant games resolve immediately and return their settlement.
    pub fn start(
        params: GameParams,
        config: &EngineConfig,
        odds: &MinesOdds,
        rng: &mut dyn RandomSource,
    ) -> Result<(Self, RoundResult), ParameterError> {
        let started = match params {
            GameParams::Mines { mines } => {
                let round = MinesRound::start(mines, odds, rng)?;
                (RoundState::Mines(round), RoundResult::Continue)
            }
            GameParams::Tower { difficulty } => {
                let round = TowerRound::start(difficulty, &config.tower, rng);
                (RoundState::Tower(round), RoundResult::Continue)
            }
            GameParams::Crash => {
                let round = CrashRound::start(&config.crash, rng);
                (RoundState::Crash(round), RoundResult::Continue)
            }
            GameParams::Limbo { target } => {
                let round = LimboRound::start(target, &config.crash, rng)?;
                let result = round.resolve();
                (RoundState::Limbo(round), result)
            }
            GameParams::Dice {
                threshold,
                direction,
            } => {
                let round = DiceRound::start(threshold, direction, &config.dice, rng)?;
                let result = round.resolve();
                (RoundState::Dice(round), result)
            }
            GameParams::Plinko { rows, risk } => {
                let round = PlinkoRound::start(rows, risk, &config.plinko, rng)?;
                let result = round.resolve();
                (RoundState::Plinko(round), result)
            }
        };

        Ok(started)
    }

    /// Check parameters without drawing anything
    pub fn validate(
        params: &GameParams,
        config: &EngineConfig,
        odds: &MinesOdds,
    ) -> Result<(), ParameterError> {
        match *params {
            GameParams::Mines { mines } => odds.row(mines).map(|_| ()).ok_or(
                ParameterError::MineCount {
                    count: mines,
                    max: odds.max_mines(),
                },
            ),
            GameParams::Limbo { target } => LimboRound::validate_target(target, &config.crash),
            GameParams::Dice { threshold, .. } => crate::games::dice::validate_threshold(threshold),
            GameParams::Plinko { rows, risk } => {
                if config.plinko.allowed_rows.contains(&rows)
                    && crate::games::plinko::table(risk, rows).is_some()
                {
                    Ok(())
                } else {
                    Err(ParameterError::PlinkoRows(rows))
                }
            }
            GameParams::Tower { .. } | GameParams::Crash => Ok(()),
        }
    }

    pub fn game_type(&self) -> GameType {
        match self {
            RoundState::Mines(_) => GameType::Mines,
            RoundState::Tower(_) => GameType::Tower,
            RoundState::Crash(_) => GameType::Crash,
            RoundState::Limbo(_) => GameType::Limbo,
            RoundState::Dice(_) => GameType::Dice,
            RoundState::Plinko(_) => GameType::Plinko,
        }
    }

    pub fn act(&mut self, input: GameInput) -> Result<RoundResult, ActionError> {
        dispatch!(self, round => round.act(input))
    }

    pub fn cash_out(&mut self) -> Result<RoundResult, ActionError> {
        dispatch!(self, round => round.cash_out())
    }

    pub fn multiplier(&self) -> f64 {
        dispatch!(self, round => round.multiplier())
    }

    pub fn view(&self, settled: bool) -> RoundView {
        dispatch!(self, round => round.view(settled))
    }

    pub fn hidden_outcome(&self) -> HiddenOutcome {
        dispatch!(self, round => round.hidden_outcome())
    }

    pub fn as_crash_mut(&mut self) -> Option<&mut CrashRound> {
        match self {
            RoundState::Crash(round) => Some(round),
            _ => None,
        }
    }
}

/// One round of one game, from stake commitment to settlement
#[derive(Debug, Clone)]
pub struct BetSession {
    id: SessionId,
    stake: f64,
    status: SessionStatus,
    round: RoundState,
    multiplier: f64,
    payout: f64,
    started_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl BetSession {
    /// Wrap a freshly started round; the stake has already been debited
    pub fn new(stake: f64, round: RoundState) -> Self {
        Self {
            id: SessionId::new(),
            stake,
            status: SessionStatus::Active,
            multiplier: round.multiplier().max(1.0),
            round,
            payout: 0.0,
            started_at: now(),
            settled_at: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn game(&self) -> GameType {
        self.round.game_type()
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn payout(&self) -> f64 {
        self.payout
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn round_mut(&mut self) -> &mut RoundState {
        &mut self.round
    }

    /// Drive the round; the returned result tells the caller what to settle
    pub fn act(&mut self, input: GameInput) -> Result<RoundResult, ActionError> {
        self.ensure_active()?;
        let result = self.round.act(input)?;
        self.apply(result);
        Ok(result)
    }

    pub fn cash_out(&mut self) -> Result<RoundResult, ActionError> {
        self.ensure_active()?;
        let result = self.round.cash_out()?;
        self.apply(result);
        Ok(result)
    }

    /// Record a transition. Terminal transitions fix the payout; applying a
    /// second terminal result is ignored.
    pub fn apply(&mut self, result: RoundResult) {
        if self.status.is_terminal() {
            return;
        }
        match result {
            RoundResult::Continue => {
                self.multiplier = self.round.multiplier();
            }
            RoundResult::Win { multiplier } => {
                self.multiplier = multiplier;
                self.payout = self.stake * multiplier;
                self.status = SessionStatus::Won;
                self.settled_at = Some(now());
            }
            RoundResult::Loss => {
                self.multiplier = 0.0;
                self.payout = 0.0;
                self.status = SessionStatus::Lost;
                self.settled_at = Some(now());
            }
        }
    }

    fn ensure_active(&self) -> Result<(), ActionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ActionError::NotActive(self.status))
        }
    }

    pub fn snapshot(&self) -> SessionState {
        SessionState {
            session_id: self.id,
            game: self.game(),
            stake: self.stake,
            status: self.status,
            multiplier: self.multiplier,
            payout: self.payout,
            round: self.round.view(self.status.is_terminal()),
            started_at: self.started_at,
            settled_at: self.settled_at,
        }
    }
}
