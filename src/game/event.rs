use serde::{Deserialize, Serialize};

use crate::game::meld::Meld;
use crate::game::scoring::Score;
use crate::game::settlement::Settlement;
use crate::game::state::{EndReason, GameSnapshot};
use crate::tile::Tile;

/// 引擎产生的事件（不可变值，推送给房间内全部参与者）
///
/// 非核心监听者（分析、通知等）在房间事件通道外部订阅，
/// 永远不回写游戏状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum Event {
    /// 开局：含牌墙摘要供公平性审计
    GameStarted {
        dealer_seat: u8,
        wall_digest: String,
    },
    /// 摸牌（传输层负责对其他座位隐藏 tile）
    TileDrawn {
        seat: u8,
        tile: Tile,
        from_dead_wall: bool,
    },
    /// 补花
    FlowerReplaced {
        seat: u8,
        flower: Tile,
        replacement: Tile,
    },
    /// 弃牌
    TileDiscarded { seat: u8, tile: Tile },
    /// 抢牌窗口开启
    ClaimWindowOpened {
        tile: Tile,
        discarder: u8,
        deadline_ms: u64,
        /// 有合法抢牌动作的座位
        eligible: Vec<u8>,
        /// 是否抢杠窗口
        robbing_kong: bool,
    },
    /// 面子形成（吃/碰/杠）
    MeldFormed { seat: u8, meld: Meld },
    /// 轮转
    TurnChanged { seat: u8, deadline_ms: u64 },
    /// 全量快照（resync）
    GameStateSnapshot {
        snapshot: GameSnapshot,
        checksum: String,
    },
    /// 终局
    GameFinished {
        reason: EndReason,
        /// 各胡牌者的计台（流局为空）
        scores: Vec<(u8, Score)>,
        settlement: Settlement,
        /// 下一局是否连庄
        dealer_retained: bool,
    },
}

/// 事件信封：带幂等回执信息的传输单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// 单调递增的事件 ID
    pub event_id: u64,
    pub game_id: String,
    pub event: Event,
    /// 服务端时间戳（毫秒）
    pub server_ts: u64,
    /// 该事件作为哪个命令的回执（重复命令重发同一信封）
    pub ack_for: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = Event::TileDiscarded {
            seat: 2,
            tile: Tile::Wan(5),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"TILE_DISCARDED\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = EventEnvelope {
            event_id: 7,
            game_id: "g1".to_string(),
            event: Event::TurnChanged {
                seat: 1,
                deadline_ms: 1000,
            },
            server_ts: 123,
            ack_for: Some("cmd-1".to_string()),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
