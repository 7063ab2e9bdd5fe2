use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// Grid-reveal: 25 cells, k mines
    Mines,
    /// Tower-climb: floors of doors hiding eggs
    Tower,
    /// Live ascending multiplier with manual cash-out
    Crash,
    /// Instant ascending multiplier with a pre-committed target
    Limbo,
    /// Threshold roll
    Dice,
    /// Multi-row ball drop
    Plinko,
}

impl GameType {
    pub const ALL: [GameType; 6] = [
        GameType::Mines,
        GameType::Tower,
        GameType::Crash,
        GameType::Limbo,
        GameType::Dice,
        GameType::Plinko,
    ];

    /// Stable index, used for per-game counters
    pub fn index(&self) -> usize {
        match self {
            GameType::Mines => 0,
            GameType::Tower => 1,
            GameType::Crash => 2,
            GameType::Limbo => 3,
            GameType::Dice => 4,
            GameType::Plinko => 5,
        }
    }

    /// Whether the player can settle the round before it ends on its own
    pub fn supports_cash_out(&self) -> bool {
        matches!(self, GameType::Mines | GameType::Tower | GameType::Crash)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Mines => write!(f, "mines"),
            GameType::Tower => write!(f, "tower"),
            GameType::Crash => write!(f, "crash"),
            GameType::Limbo => write!(f, "limbo"),
            GameType::Dice => write!(f, "dice"),
            GameType::Plinko => write!(f, "plinko"),
        }
    }
}

/// Unique round identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tower difficulty
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Plinko risk tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Dice direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Over,
    Under,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "over"),
            Direction::Under => write!(f, "under"),
        }
    }
}

/// Round parameters chosen before the stake is committed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameParams {
    Mines { mines: u8 },
    Tower { difficulty: Difficulty },
    Crash,
    Limbo { target: f64 },
    Dice { threshold: f64, direction: Direction },
    Plinko { rows: u8, risk: RiskLevel },
}

impl GameParams {
    pub fn game_type(&self) -> GameType {
        match self {
            GameParams::Mines { .. } => GameType::Mines,
            GameParams::Tower { .. } => GameType::Tower,
            GameParams::Crash => GameType::Crash,
            GameParams::Limbo { .. } => GameType::Limbo,
            GameParams::Dice { .. } => GameType::Dice,
            GameParams::Plinko { .. } => GameType::Plinko,
        }
    }
}

/// Player input for an active round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", content = "index", rename_all = "lowercase")]
pub enum GameInput {
    /// Reveal a grid cell
    Reveal(u8),
    /// Open a door on the current tower floor
    Door(u8),
}

/// Round status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Active,
    Won,
    Lost,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Won | SessionStatus::Lost)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Won => write!(f, "won"),
            SessionStatus::Lost => write!(f, "lost"),
        }
    }
}

/// Result of a round transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundResult {
    /// Round stays active
    Continue,
    /// Round settles, paying `stake * multiplier`
    Win { multiplier: f64 },
    /// Round settles with no payout
    Loss,
}

/// Outcome committed at round start and never regenerated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HiddenOutcome {
    Mines { positions: Vec<u8> },
    Tower { eggs: Vec<Vec<u8>> },
    Crash { crash_point: f64 },
    Dice { roll: f64 },
    /// `true` is a bounce to the right
    Plinko { bounces: Vec<bool> },
}

/// Public progress of a round; hidden outcome fields are `None` until settled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum RoundView {
    Mines {
        mines: u8,
        revealed: Vec<u8>,
        safe_reveals: u8,
        next_multiplier: Option<f64>,
        mine_positions: Option<Vec<u8>>,
    },
    Tower {
        difficulty: Difficulty,
        floors: u8,
        current_floor: u8,
        picks: Vec<u8>,
        /// Egg doors per floor, visible for floors already passed or lost on
        eggs: Vec<Option<Vec<u8>>>,
    },
    Crash {
        cashed_out_at: Option<f64>,
        crash_point: Option<f64>,
    },
    Limbo {
        target: f64,
        crash_point: f64,
    },
    Dice {
        threshold: f64,
        direction: Direction,
        win_chance: f64,
        roll: f64,
    },
    Plinko {
        rows: u8,
        risk: RiskLevel,
        path: Vec<bool>,
        bucket: usize,
    },
}

/// Read-only snapshot of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    pub session_id: SessionId,
    pub game: GameType,
    pub stake: f64,
    pub status: SessionStatus,
    pub multiplier: f64,
    /// Gross return credited at settlement, 0 while active or on loss
    pub payout: f64,
    pub round: RoundView,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// `payout - stake` once settled
    pub fn profit(&self) -> Option<f64> {
        self.status
            .is_terminal()
            .then(|| self.payout - self.stake)
    }
}
