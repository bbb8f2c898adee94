use serde::{Deserialize, Serialize};

use crate::game::event::EventEnvelope;
use crate::game::state::GameSnapshot;
use crate::game::CommandProcessor;
use crate::storage::{GameCache, GameStore};

/// 心跳间隔
pub const HEARTBEAT_INTERVAL_MS: u64 = 5000;
/// 发出 ping 后等待 pong 的超时
pub const PONG_TIMEOUT_MS: u64 = 2500;

/// 连接状态机
///
/// Connecting -> Connected -> Disconnected -> Reconnecting -> Resyncing -> Connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Resyncing,
}

/// 会话层协议消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum SessionMessage {
    Ping {
        ts: u64,
    },
    Pong {
        ts: u64,
    },
    /// 重连请求：客户端带上最后确认的事件游标
    ResyncRequest {
        game_id: String,
        seat: u8,
        last_event_id: u64,
    },
    /// 重连应答：全量快照 + 校验和 + 游标后确认的命令 ID + 游标后事件
    ResyncResponse {
        snapshot: GameSnapshot,
        checksum: String,
        processed_command_ids: Vec<String>,
        /// 游标之后的事件；游标已被裁剪时为空，客户端以快照为准
        events: Vec<EventEnvelope>,
    },
    /// 客户端校验和不匹配，要求再次 resync
    ChecksumMismatch {
        game_id: String,
        seat: u8,
    },
}

/// 单个座位的会话：心跳追踪 + 连接状态机
///
/// 超时判定全部基于调用方传入的毫秒时间戳，不自带时钟
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub seat: u8,
    pub state: ConnState,
    last_ping_ms: u64,
    awaiting_pong_since: Option<u64>,
}

impl Session {
    pub fn new(seat: u8) -> Self {
        Self {
            seat,
            state: ConnState::Connecting,
            last_ping_ms: 0,
            awaiting_pong_since: None,
        }
    }

    /// 握手完成
    pub fn mark_connected(&mut self, now_ms: u64) {
        self.state = ConnState::Connected;
        self.last_ping_ms = now_ms;
        self.awaiting_pong_since = None;
        log::debug!("[HEARTBEAT] seat {} connected", self.seat);
    }

    /// 是否该发 ping（每 5 秒一次，未在等待 pong 时）
    pub fn should_ping(&mut self, now_ms: u64) -> bool {
        if self.state != ConnState::Connected || self.awaiting_pong_since.is_some() {
            return false;
        }
        if now_ms.saturating_sub(self.last_ping_ms) >= HEARTBEAT_INTERVAL_MS {
            self.last_ping_ms = now_ms;
            self.awaiting_pong_since = Some(now_ms);
            return true;
        }
        false
    }

    pub fn on_pong(&mut self, _now_ms: u64) {
        self.awaiting_pong_since = None;
    }

    /// pong 超时判定；超时则标记断线，返回 true 供上层上报引擎
    pub fn check_timeout(&mut self, now_ms: u64) -> bool {
        let Some(sent) = self.awaiting_pong_since else {
            return false;
        };
        if now_ms.saturating_sub(sent) >= PONG_TIMEOUT_MS {
            log::info!("[HEARTBEAT] seat {} missed pong, marking disconnected", self.seat);
            self.state = ConnState::Disconnected;
            self.awaiting_pong_since = None;
            return true;
        }
        false
    }

    /// 客户端重连握手到达
    pub fn on_reconnect(&mut self) {
        self.state = ConnState::Reconnecting;
    }

    /// 收到 ResyncRequest，进入补发流程
    pub fn begin_resync(&mut self) {
        self.state = ConnState::Resyncing;
    }

    /// 客户端确认快照一致
    pub fn complete_resync(&mut self, now_ms: u64) {
        log::info!("[HEARTBEAT] seat {} resynced", self.seat);
        self.mark_connected(now_ms);
    }

    /// 客户端上报校验和不一致：退回 Resyncing 重新补发
    pub fn on_checksum_mismatch(&mut self) {
        log::warn!("[HEARTBEAT] seat {} checksum mismatch, forcing resync", self.seat);
        self.state = ConnState::Resyncing;
    }
}

/// 构造重连应答：全量快照 + 校验和 + 已处理命令 + 游标后事件
///
/// 游标早于事件日志保留范围时 events 为空，客户端丢弃本地日志以快照为准
pub fn build_resync_response<S, C>(
    processor: &CommandProcessor<S, C>,
    last_event_id: u64,
) -> SessionMessage
where
    S: GameStore,
    C: GameCache,
{
    let snapshot = processor.snapshot();
    let checksum = snapshot.checksum();
    let events = processor.events_since(last_event_id).unwrap_or_default();
    SessionMessage::ResyncResponse {
        snapshot,
        checksum,
        processed_command_ids: processor.processed_ids_since(last_event_id),
        events,
    }
}
