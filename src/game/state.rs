use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::game::claim::ClaimWindow;
use crate::game::meld::Meld;
use crate::game::player::PlayerState;
use crate::tile::{Tile, Wall, Wind};

/// 房间状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// 等待满员
    Waiting,
    /// 发牌中
    Dealing,
    /// 补花中（发牌后或摸到花牌时短暂进入）
    FlowerReplacement,
    /// 行牌
    Playing,
    /// 抢牌窗口开启
    ClaimWindow,
    /// 终局
    Finished,
}

/// 终局原因（每种流局单独建模，供下游报表区分）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "reason")]
pub enum EndReason {
    /// 有人胡牌
    Won { winners: Vec<u8> },
    /// 牌墙摸完流局
    WallExhausted,
    /// 四杠流局
    FourKongs,
    /// 开局四风连打流局
    FourWindDiscards,
}

impl EndReason {
    /// 流局（庄家连庄）
    pub fn is_draw(&self) -> bool {
        !matches!(self, EndReason::Won { .. })
    }
}

/// 弃牌记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardRecord {
    pub seat: u8,
    pub tile: Tile,
    pub turn: u32,
}

/// 游戏聚合
///
/// 命令处理器是唯一的变更方；其余组件只读快照做纯计算
#[derive(Debug, Clone)]
pub struct GameState {
    pub game_id: String,
    /// 固定 4 个玩家
    pub players: [PlayerState; 4],
    /// 庄家座位
    pub dealer_seat: u8,
    /// 圈风
    pub round_wind: Wind,
    /// 当前行牌座位
    pub current_seat: u8,
    /// 状态机阶段
    pub phase: Phase,
    /// 弃牌河（按顺序）
    pub discards: Vec<DiscardRecord>,
    /// 开启中的抢牌窗口
    pub claim_window: Option<ClaimWindow>,
    /// 加杠待定：抢杠窗口期间暂存 (座位, 牌)
    pub pending_kong: Option<(u8, Tile)>,
    /// 连庄次数
    pub consecutive_dealer_count: u32,
    /// 已完成的出牌轮数
    pub turn: u32,
    /// 本局杠牌总数（四杠流局判定）
    pub kong_count: u8,
    /// 当前玩家刚摸的牌（兜底出牌用）
    pub last_drawn: Option<Tile>,
    /// 最近一次摸牌是否来自牌尾（杠上开花判定）
    pub last_draw_from_dead: bool,
    /// 最近一张弃牌 (座位, 牌)
    pub last_discard: Option<(u8, Tile)>,
    /// 终局原因
    pub end_reason: Option<EndReason>,
    /// 回合截止时间（毫秒时间戳，None 表示无计时）
    pub turn_deadline_ms: Option<u64>,
    /// 断线宽限：暂停时剩余的回合毫秒数
    pub paused_turn_remaining_ms: Option<u64>,
}

impl GameState {
    pub fn new(game_id: impl Into<String>, dealer_seat: u8, round_wind: Wind) -> Self {
        Self {
            game_id: game_id.into(),
            players: [
                PlayerState::new(0),
                PlayerState::new(1),
                PlayerState::new(2),
                PlayerState::new(3),
            ],
            dealer_seat,
            round_wind,
            current_seat: dealer_seat,
            phase: Phase::Waiting,
            discards: Vec::new(),
            claim_window: None,
            pending_kong: None,
            consecutive_dealer_count: 0,
            turn: 0,
            kong_count: 0,
            last_drawn: None,
            last_draw_from_dead: false,
            last_discard: None,
            end_reason: None,
            turn_deadline_ms: None,
            paused_turn_remaining_ms: None,
        }
    }

    pub fn player(&self, seat: u8) -> &PlayerState {
        &self.players[seat as usize % 4]
    }

    pub fn player_mut(&mut self, seat: u8) -> &mut PlayerState {
        &mut self.players[seat as usize % 4]
    }

    /// 下一个座位
    pub fn next_seat(&self, seat: u8) -> u8 {
        (seat + 1) % 4
    }

    /// 游戏是否已终局
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// 牌张守恒检查：墙 + 手牌 + 面子 + 花牌 + 弃牌 == 144
    ///
    /// 任何合法操作序列后该不变量都必须成立
    pub fn tile_conservation_holds(&self, wall: &Wall) -> bool {
        let in_play: usize = self.players.iter().map(|p| p.tile_count()).sum::<usize>()
            + self.discards.len();
        let in_wall = wall.remaining_count() + wall.dead_remaining();
        in_play + in_wall == Tile::TOTAL_COUNT
    }

    /// 生成完整快照（重连 resync 与持久化的统一视图）
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id.clone(),
            phase: self.phase,
            dealer_seat: self.dealer_seat,
            round_wind: self.round_wind,
            current_seat: self.current_seat,
            turn: self.turn,
            consecutive_dealer_count: self.consecutive_dealer_count,
            kong_count: self.kong_count,
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    seat: p.seat,
                    concealed: p.hand.to_sorted_vec(),
                    melds: p.melds.clone(),
                    flowers: p.flowers.clone(),
                    declared_ready: p.declared_ready,
                    connected: p.connected,
                })
                .collect(),
            discards: self.discards.clone(),
            last_discard: self.last_discard,
            end_reason: self.end_reason.clone(),
        }
    }
}

/// 单个玩家的快照视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub seat: u8,
    /// 手牌（排序后，对局中仅发给本人；旁观/审计用全量）
    pub concealed: Vec<Tile>,
    pub melds: Vec<Meld>,
    pub flowers: Vec<Tile>,
    pub declared_ready: bool,
    pub connected: bool,
}

/// 游戏完整快照
///
/// 重连时整体下发；校验和不匹配强制再次 resync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: String,
    pub phase: Phase,
    pub dealer_seat: u8,
    pub round_wind: Wind,
    pub current_seat: u8,
    pub turn: u32,
    pub consecutive_dealer_count: u32,
    pub kong_count: u8,
    pub players: Vec<PlayerSnapshot>,
    pub discards: Vec<DiscardRecord>,
    pub last_discard: Option<(u8, Tile)>,
    pub end_reason: Option<EndReason>,
}

impl GameSnapshot {
    /// 快照校验和（SHA-256），客户端据此检测脱同步
    pub fn checksum(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&json);
        format!("{:x}", hasher.finalize())
    }
}
