use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::game::claim::ClaimKind;
use crate::game::engine::{EngineError, GameEngine};
use crate::game::event::{Event, EventEnvelope};
use crate::game::state::GameSnapshot;
use crate::storage::{GameCache, GameStore, RetryPolicy};
use crate::tile::Tile;

/// 事件日志保留上限；更早的游标只能走全量快照
const EVENT_LOG_CAPACITY: usize = 128;

/// 客户端命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// 客户端生成的幂等 ID
    pub command_id: String,
    pub game_id: String,
    pub seat: u8,
    #[serde(flatten)]
    pub kind: CommandKind,
    /// 客户端时间戳（仅记录，超时判定一律用服务端时钟）
    pub client_ts: u64,
}

/// 命令种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum CommandKind {
    Draw,
    Discard { tile: Tile },
    /// 吃（start 为顺子最小张）
    ClaimChow { start: Tile },
    ClaimPung,
    /// 窗口内为直杠；自己回合带 tile 为暗杠/加杠
    ClaimKong { tile: Option<Tile> },
    /// 窗口内为荣和/抢杠；自己回合为自摸
    DeclareWin,
    Pass,
}

/// 命令处理错误（对外错误码）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// 规则校验失败
    Engine(EngineError),
    /// 命令的 game_id 与本房间不符
    WrongGame,
    /// 持久化不可用，命令未生效
    StorageUnavailable,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Engine(err) => write!(f, "{}", err),
            CommandError::WrongGame => write!(f, "command addressed to a different game"),
            CommandError::StorageUnavailable => {
                write!(f, "storage unavailable, command was not applied")
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl From<EngineError> for CommandError {
    fn from(err: EngineError) -> Self {
        CommandError::Engine(err)
    }
}

/// 命令处理器：房间内游戏状态的唯一变更入口
///
/// 三条纪律：
/// - 全量校验先于任何变更（引擎在克隆上执行，失败即整体丢弃）
/// - 先写后回执：快照落库成功前不提交、不发事件
/// - 幂等账本：重复 command_id 重发原回执，不重复执行
pub struct CommandProcessor<S: GameStore, C: GameCache> {
    engine: GameEngine,
    store: S,
    cache: C,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    /// command_id -> 已发回执（幂等重发）
    processed: HashMap<String, Vec<EventEnvelope>>,
    /// 事件日志（resync 游标源）
    event_log: Vec<EventEnvelope>,
    next_event_id: u64,
}

impl<S: GameStore, C: GameCache> CommandProcessor<S, C> {
    pub fn new(
        engine: GameEngine,
        store: S,
        cache: C,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            store,
            cache,
            retry,
            clock,
            processed: HashMap::new(),
            event_log: Vec::new(),
            next_event_id: 1,
        }
    }

    /// 开局（房间线程在满员后调用一次）
    pub fn start(&mut self) -> Result<Vec<EventEnvelope>, CommandError> {
        let now = self.clock.now_ms();
        let mut next = self.engine.clone();
        let events = next.start(now)?;
        self.commit(next, events, None)
    }

    /// 处理一条命令
    pub fn process(&mut self, command: &Command) -> Result<Vec<EventEnvelope>, CommandError> {
        if command.game_id != self.engine.state.game_id {
            return Err(CommandError::WrongGame);
        }
        // 幂等：重复命令重发原回执
        if let Some(acked) = self.processed.get(&command.command_id) {
            log::debug!(
                "[COMMAND] duplicate {} from seat {}, re-acking",
                command.command_id,
                command.seat
            );
            return Ok(acked.clone());
        }

        let now = self.clock.now_ms();
        let seat = command.seat;
        // 校验与变更都在克隆上执行；任何失败整体丢弃
        let mut next = self.engine.clone();
        let events = match command.kind {
            CommandKind::Draw => next.handle_draw(seat, now)?,
            CommandKind::Discard { tile } => next.handle_discard(seat, tile, now)?,
            CommandKind::ClaimChow { start } => {
                next.handle_claim(seat, ClaimKind::Chow { start }, now)?
            }
            CommandKind::ClaimPung => next.handle_claim(seat, ClaimKind::Pung, now)?,
            CommandKind::ClaimKong { tile } => {
                if self.claim_window_awaits(seat) {
                    next.handle_claim(seat, ClaimKind::Kong, now)?
                } else {
                    let tile = tile.ok_or(EngineError::InvalidKong)?;
                    next.handle_self_kong(seat, tile, now)?
                }
            }
            CommandKind::DeclareWin => {
                if self.claim_window_awaits(seat) {
                    next.handle_claim(seat, ClaimKind::Hu, now)?
                } else {
                    next.handle_self_win(seat, now)?
                }
            }
            CommandKind::Pass => next.handle_pass(seat, now)?,
        };

        self.commit(next, events, Some(command))
    }

    /// 时钟推进（房间线程周期调用）：窗口超时与回合兜底也走先写后发
    pub fn tick(&mut self) -> Result<Vec<EventEnvelope>, CommandError> {
        let now = self.clock.now_ms();
        let mut next = self.engine.clone();
        let events = next.tick(now);
        if events.is_empty() {
            // 无变更时同步时间敏感的内部字段即可
            self.engine = next;
            return Ok(Vec::new());
        }
        self.commit(next, events, None)
    }

    /// 断线 / 重连上报（不产生对外事件，但状态要落库）
    pub fn report_disconnect(&mut self, seat: u8) -> Result<(), CommandError> {
        let now = self.clock.now_ms();
        let mut next = self.engine.clone();
        next.handle_disconnect(seat, now);
        self.commit(next, Vec::new(), None)?;
        Ok(())
    }

    pub fn report_reconnect(&mut self, seat: u8) -> Result<(), CommandError> {
        let now = self.clock.now_ms();
        let mut next = self.engine.clone();
        next.handle_reconnect(seat, now);
        self.commit(next, Vec::new(), None)?;
        Ok(())
    }

    /// 游标之后的事件；游标已被裁剪时返回 None（需走全量快照）
    pub fn events_since(&self, after_event_id: u64) -> Option<Vec<EventEnvelope>> {
        let oldest = self.event_log.first().map(|e| e.event_id)?;
        if after_event_id + 1 < oldest {
            return None;
        }
        Some(
            self.event_log
                .iter()
                .filter(|e| e.event_id > after_event_id)
                .cloned()
                .collect(),
        )
    }

    /// 已处理命令 ID（resync 时发给客户端去重）
    pub fn processed_ids(&self) -> Vec<String> {
        self.processed.keys().cloned().collect()
    }

    /// 游标之后确认的命令 ID（resync 只需补这部分，不随局长无限增长）
    pub fn processed_ids_since(&self, after_event_id: u64) -> Vec<String> {
        self.processed
            .iter()
            .filter(|(_, acked)| {
                acked
                    .last()
                    .map(|e| e.event_id > after_event_id)
                    .unwrap_or(true)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.engine.state.snapshot()
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn last_event_id(&self) -> u64 {
        self.next_event_id.saturating_sub(1)
    }

    fn claim_window_awaits(&self, seat: u8) -> bool {
        self.engine
            .state
            .claim_window
            .as_ref()
            .map(|w| w.awaiting.contains(&seat))
            .unwrap_or(false)
    }

    /// 先写后回执：命令日志与快照都落库成功才提交引擎并发放事件信封
    fn commit(
        &mut self,
        next: GameEngine,
        events: Vec<Event>,
        command: Option<&Command>,
    ) -> Result<Vec<EventEnvelope>, CommandError> {
        let snapshot = next.state.snapshot();
        if let Some(command) = command {
            self.retry
                .run("append command log", || {
                    self.store.append_command_log(&snapshot.game_id, command)
                })
                .map_err(|_| CommandError::StorageUnavailable)?;
        }
        self.retry
            .run("save snapshot", || self.store.save(&snapshot))
            .map_err(|_| CommandError::StorageUnavailable)?;
        if let Err(err) = self.cache.put(&snapshot) {
            // 缓存失败不阻断回执
            log::warn!("[COMMAND] cache put failed: {}", err);
        }

        self.engine = next;
        let ack_for = command.map(|c| c.command_id.clone());
        let now = self.clock.now_ms();
        let envelopes: Vec<EventEnvelope> = events
            .into_iter()
            .map(|event| {
                let envelope = EventEnvelope {
                    event_id: self.next_event_id,
                    game_id: self.engine.state.game_id.clone(),
                    event,
                    server_ts: now,
                    ack_for: ack_for.clone(),
                };
                self.next_event_id += 1;
                envelope
            })
            .collect();

        self.event_log.extend(envelopes.iter().cloned());
        if self.event_log.len() > EVENT_LOG_CAPACITY {
            let excess = self.event_log.len() - EVENT_LOG_CAPACITY;
            self.event_log.drain(..excess);
        }
        if let Some(command_id) = ack_for {
            self.processed.insert(command_id, envelopes.clone());
        }
        Ok(envelopes)
    }
}
