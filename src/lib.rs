/// 台湾十六张麻将权威游戏引擎
///
/// 服务端为唯一事实来源：胡牌判定、台数计算、抢牌仲裁、
/// 房间状态机、命令幂等与断线重连补发协议

pub mod clock;
pub mod game;
pub mod net;
pub mod room;
pub mod storage;
pub mod tile;

// 重新导出常用类型
pub use clock::{Clock, SystemClock, VirtualClock};
pub use game::{
    ClaimIntent, ClaimKind, ClaimResolver, Command, CommandError, CommandKind, CommandProcessor,
    EndReason, EngineError, Event, EventEnvelope, GameEngine, GameSnapshot, GameState, Meld,
    MeldKind, Pattern, Phase, PlayerState, RuleConfig, Score, ScoreContext, ScoringEngine,
    Settlement,
};
pub use net::{ConnState, Session, SessionMessage};
pub use room::{RoomHandle, RoomMessage, RoomOutput, RoomRegistry};
pub use storage::{GameCache, GameStore, MemoryCache, MemoryStore, RetryPolicy, StorageError};
pub use tile::{Hand, Tile, Wall, Wind, WinChecker};
