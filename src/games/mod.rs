pub mod types;
pub mod rng;
pub mod session;
pub mod mines;
pub mod tower;
pub mod crash;
pub mod dice;
pub mod plinko;
pub mod live;
pub mod processor;
pub mod simulation;

pub use types::*;
pub use rng::{ReplayRandom, StdRandom};
pub use session::{BetSession, Round, RoundState};
pub use live::{LiveCrashHandle, LiveDecision, LiveRounds};
pub use processor::GameProcessor;
pub use simulation::{SimulationReport, Simulator, Strategy};
