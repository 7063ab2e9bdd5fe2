//! Live crash rounds
//!
//! Each live round is owned by one driver task. The task races the player's
//! cash-out requests against the bust deadline in a single `select!`, so the
//! first event to be processed is the one that settles the round. The rising
//! multiplier is published on a watch channel for display only.

use crate::common::types::floor_hundredths;
use crate::errors::{ActionError, WagerError, WagerResult};
use crate::games::crash::GrowthCurve;
use crate::games::processor::GameProcessor;
use crate::games::types::{SessionId, SessionState};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// How the cash-out/bust race was decided
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiveDecision {
    /// Cash-out processed while the curve showed `at`
    CashOut { at: f64 },
    /// The curve reached the crash point first
    Bust,
}

/// Requests accepted by a round driver
#[derive(Debug)]
pub enum LiveCommand {
    CashOut {
        reply: oneshot::Sender<WagerResult<SessionState>>,
    },
}

/// Player-side handle to a live round
#[derive(Debug, Clone)]
pub struct LiveCrashHandle {
    session_id: SessionId,
    commands: mpsc::Sender<LiveCommand>,
    multiplier: watch::Receiver<f64>,
    outcome: watch::Receiver<Option<SessionState>>,
}

impl LiveCrashHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Last multiplier published by the driver
    pub fn current_multiplier(&self) -> f64 {
        *self.multiplier.borrow()
    }

    /// Stream of displayed multipliers
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.multiplier.clone()
    }

    /// Ask the driver to cash out
    ///
    /// If the round already settled this returns the settled state unchanged.
    pub async fn cash_out(&self) -> WagerResult<SessionState> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(LiveCommand::CashOut { reply }).await.is_err() {
            return self.finished().await;
        }
        match response.await {
            Ok(result) => result,
            Err(_) => self.finished().await,
        }
    }

    /// Wait for the round to settle
    pub async fn finished(&self) -> WagerResult<SessionState> {
        let mut outcome = self.outcome.clone();
        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .map_err(|_| WagerError::from(ActionError::SessionNotFound(self.session_id)))?;

        settled
            .clone()
            .ok_or_else(|| ActionError::SessionNotFound(self.session_id).into())
    }
}

/// Registry of rounds that still have a running driver
#[derive(Debug, Clone, Default)]
pub struct LiveRounds {
    rounds: Arc<DashMap<SessionId, LiveCrashHandle>>,
}

impl LiveRounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: LiveCrashHandle) {
        self.rounds.insert(handle.session_id, handle);
    }

    pub fn get(&self, session_id: &SessionId) -> Option<LiveCrashHandle> {
        self.rounds.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, session_id: &SessionId) -> bool {
        self.rounds.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.rounds.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

/// Timing inputs for one driver
#[derive(Debug, Clone, Copy)]
pub(crate) struct DriverPlan {
    pub session_id: SessionId,
    pub crash_point: f64,
    pub curve: GrowthCurve,
    pub tick: Duration,
}

/// Build the handle and spawn the driver on `runtime`
pub(crate) fn spawn(
    processor: GameProcessor,
    plan: DriverPlan,
    runtime: &tokio::runtime::Handle,
) -> LiveCrashHandle {
    let (commands_tx, commands_rx) = mpsc::channel(8);
    let (multiplier_tx, multiplier_rx) = watch::channel(1.0);
    let (outcome_tx, outcome_rx) = watch::channel(None);

    let handle = LiveCrashHandle {
        session_id: plan.session_id,
        commands: commands_tx,
        multiplier: multiplier_rx,
        outcome: outcome_rx,
    };

    runtime.spawn(drive(processor, plan, commands_rx, multiplier_tx, outcome_tx));
    handle
}

async fn drive(
    processor: GameProcessor,
    plan: DriverPlan,
    mut commands: mpsc::Receiver<LiveCommand>,
    multiplier: watch::Sender<f64>,
    outcome: watch::Sender<Option<SessionState>>,
) {
    let started = Instant::now();
    let bust_at = started + plan.curve.time_to_reach(plan.crash_point);

    let mut ticker = interval(plan.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let bust = sleep_until(bust_at);
    tokio::pin!(bust);
    let mut commands_open = true;

    debug!(
        "Live round {} running, bust in {:?}",
        plan.session_id,
        bust_at - started
    );

    let (decision, reply) = loop {
        tokio::select! {
            biased;

            _ = &mut bust => break (LiveDecision::Bust, None),

            command = commands.recv(), if commands_open => match command {
                Some(LiveCommand::CashOut { reply }) => {
                    let now = Instant::now();
                    let decision = if now < bust_at {
                        LiveDecision::CashOut {
                            at: plan.curve.multiplier_at(now - started),
                        }
                    } else {
                        LiveDecision::Bust
                    };
                    break (decision, Some(reply));
                }
                None => commands_open = false,
            },

            _ = ticker.tick() => {
                let current = plan.curve.multiplier_at(started.elapsed()).min(plan.crash_point);
                let _ = multiplier.send(floor_hundredths(current));
            }
        }
    };

    let shown = match decision {
        LiveDecision::CashOut { at } => floor_hundredths(at),
        LiveDecision::Bust => plan.crash_point,
    };
    let _ = multiplier.send(shown);

    let result = processor.settle_live(plan.session_id, decision);
    match &result {
        Ok(state) => {
            info!(
                "Live round {} settled {} at {:.2}x",
                plan.session_id, state.status, state.multiplier
            );
            let _ = outcome.send(Some(state.clone()));
        }
        Err(e) => warn!("Live round {} failed to settle: {}", plan.session_id, e),
    }

    if let Some(reply) = reply {
        let _ = reply.send(result);
    }
}
