//! 游戏层：状态机、抢牌仲裁、计台与结算、命令处理

pub mod claim;
pub mod command;
pub mod engine;
pub mod event;
pub mod meld;
pub mod player;
pub mod rules;
pub mod scoring;
pub mod settlement;
pub mod state;

pub use claim::{ClaimIntent, ClaimKind, ClaimResolver, ClaimWindow, Resolution};
pub use command::{Command, CommandError, CommandKind, CommandProcessor};
pub use engine::{EngineError, GameEngine};
pub use event::{Event, EventEnvelope};
pub use meld::{Meld, MeldKind};
pub use player::PlayerState;
pub use rules::RuleConfig;
pub use scoring::{Pattern, Score, ScoreContext, ScoringEngine};
pub use settlement::{Payment, Settlement};
pub use state::{EndReason, GameSnapshot, GameState, Phase, PlayerSnapshot};
