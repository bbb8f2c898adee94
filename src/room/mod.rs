//! 房间层：每个房间一条线程 + mpsc 收件箱，房间之间不共享可变状态

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::clock::Clock;
use crate::game::{Command, CommandError, CommandProcessor, EventEnvelope, GameEngine, RuleConfig};
use crate::net::session::{build_resync_response, ConnState, Session, SessionMessage};
use crate::storage::{GameCache, GameStore};
use crate::tile::Wind;

/// 房间线程空转时的轮询间隔（驱动超时与心跳）
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 发往房间线程的消息
pub enum RoomMessage {
    /// 满员后开局
    Start,
    /// 游戏命令，带同步应答通道
    Command {
        command: Command,
        reply: Sender<Result<Vec<EventEnvelope>, CommandError>>,
    },
    /// 心跳应答
    Pong { seat: u8, ts: u64 },
    /// 传输层发现连接断开
    ClientDisconnected { seat: u8 },
    /// 客户端重连握手
    Reconnected { seat: u8 },
    /// 重连补发请求
    ResyncRequest { seat: u8, last_event_id: u64 },
    /// 客户端确认快照一致
    ResyncAck { seat: u8 },
    /// 客户端上报校验和不一致
    ChecksumMismatch { seat: u8 },
    Shutdown,
}

/// 房间对外输出
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOutput {
    /// 广播给房间内全部座位的游戏事件
    Game(EventEnvelope),
    /// 发给单个座位的会话消息
    Session { seat: u8, message: SessionMessage },
}

/// 房间线程本体
struct Room<S: GameStore, C: GameCache> {
    processor: CommandProcessor<S, C>,
    sessions: [Session; 4],
    clock: Arc<dyn Clock>,
    outbound: Sender<RoomOutput>,
}

impl<S: GameStore, C: GameCache> Room<S, C> {
    fn run(mut self, inbox: Receiver<RoomMessage>) {
        loop {
            match inbox.recv_timeout(POLL_INTERVAL) {
                Ok(RoomMessage::Shutdown) => break,
                Ok(message) => self.dispatch(message),
                Err(RecvTimeoutError::Timeout) => self.poll(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("[ROOM] {} thread exiting", self.processor.snapshot().game_id);
    }

    fn dispatch(&mut self, message: RoomMessage) {
        let now = self.clock.now_ms();
        match message {
            RoomMessage::Start => {
                for session in &mut self.sessions {
                    session.mark_connected(now);
                }
                match self.processor.start() {
                    Ok(envelopes) => self.broadcast(envelopes),
                    Err(err) => log::error!("[ROOM] start failed: {}", err),
                }
            }
            RoomMessage::Command { command, reply } => {
                let result = self.processor.process(&command);
                if let Ok(envelopes) = &result {
                    self.broadcast(envelopes.clone());
                }
                // 应答端挂掉只影响该客户端，不影响房间
                let _ = reply.send(result);
            }
            RoomMessage::Pong { seat, ts } => {
                self.sessions[seat as usize % 4].on_pong(ts);
            }
            RoomMessage::ClientDisconnected { seat } => {
                self.sessions[seat as usize % 4].state = ConnState::Disconnected;
                self.report_disconnect(seat);
            }
            RoomMessage::Reconnected { seat } => {
                self.sessions[seat as usize % 4].on_reconnect();
            }
            RoomMessage::ResyncRequest {
                seat,
                last_event_id,
            } => {
                self.sessions[seat as usize % 4].begin_resync();
                let response = build_resync_response(&self.processor, last_event_id);
                self.send_session(seat, response);
            }
            RoomMessage::ResyncAck { seat } => {
                self.sessions[seat as usize % 4].complete_resync(now);
                if let Err(err) = self.processor.report_reconnect(seat) {
                    log::error!("[ROOM] reconnect persist failed: {}", err);
                }
            }
            RoomMessage::ChecksumMismatch { seat } => {
                self.sessions[seat as usize % 4].on_checksum_mismatch();
                let response = build_resync_response(&self.processor, 0);
                self.send_session(seat, response);
            }
            RoomMessage::Shutdown => {}
        }
    }

    /// 空转轮询：时钟驱动的超时兜底 + 心跳
    fn poll(&mut self) {
        let now = self.clock.now_ms();
        match self.processor.tick() {
            Ok(envelopes) => self.broadcast(envelopes),
            Err(err) => log::error!("[ROOM] tick persist failed: {}", err),
        }

        for seat in 0..4u8 {
            let session = &mut self.sessions[seat as usize];
            if session.should_ping(now) {
                let ping = SessionMessage::Ping { ts: now };
                let _ = self.outbound.send(RoomOutput::Session {
                    seat,
                    message: ping,
                });
            }
        }
        for seat in 0..4u8 {
            if self.sessions[seat as usize].check_timeout(now) {
                self.report_disconnect(seat);
            }
        }
    }

    fn report_disconnect(&mut self, seat: u8) {
        if let Err(err) = self.processor.report_disconnect(seat) {
            log::error!("[ROOM] disconnect persist failed: {}", err);
        }
    }

    fn broadcast(&self, envelopes: Vec<EventEnvelope>) {
        for envelope in envelopes {
            let _ = self.outbound.send(RoomOutput::Game(envelope));
        }
    }

    fn send_session(&self, seat: u8, message: SessionMessage) {
        let _ = self.outbound.send(RoomOutput::Session { seat, message });
    }
}

/// 房间句柄：注册表持有，跨线程发消息
pub struct RoomHandle {
    pub game_id: String,
    inbox: Sender<RoomMessage>,
    thread: Option<JoinHandle<()>>,
}

impl RoomHandle {
    pub fn send(&self, message: RoomMessage) -> bool {
        self.inbox.send(message).is_ok()
    }

    /// 同步执行一条命令（内部走房间线程，保证单写者）
    pub fn execute(&self, command: Command) -> Result<Vec<EventEnvelope>, CommandError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        if !self.send(RoomMessage::Command {
            command,
            reply: reply_tx,
        }) {
            return Err(CommandError::StorageUnavailable);
        }
        reply_rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap_or(Err(CommandError::StorageUnavailable))
    }

    fn shutdown(mut self) {
        let _ = self.inbox.send(RoomMessage::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// 房间注册表：GameId -> RoomHandle
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建房间并启动其线程；返回对外事件接收端
    #[allow(clippy::too_many_arguments)]
    pub fn create<S, C>(
        &mut self,
        game_id: &str,
        seed: u64,
        dealer_seat: u8,
        round_wind: Wind,
        dealer_streak: u32,
        config: RuleConfig,
        store: S,
        cache: C,
        retry: crate::storage::RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Receiver<RoomOutput>
    where
        S: GameStore + 'static,
        C: GameCache + 'static,
    {
        let engine = GameEngine::new(game_id, seed, dealer_seat, round_wind, dealer_streak, config);
        let processor = CommandProcessor::new(engine, store, cache, retry, clock.clone());
        let (inbox_tx, inbox_rx) = mpsc::channel();
        let (outbound_tx, outbound_rx) = mpsc::channel();

        let room = Room {
            processor,
            sessions: [
                Session::new(0),
                Session::new(1),
                Session::new(2),
                Session::new(3),
            ],
            clock,
            outbound: outbound_tx,
        };
        let thread = thread::Builder::new()
            .name(format!("room-{}", game_id))
            .spawn(move || room.run(inbox_rx))
            .ok();

        log::info!("[ROOM] created {} (seed={})", game_id, seed);
        self.rooms.insert(
            game_id.to_string(),
            RoomHandle {
                game_id: game_id.to_string(),
                inbox: inbox_tx,
                thread,
            },
        );
        outbound_rx
    }

    pub fn get(&self, game_id: &str) -> Option<&RoomHandle> {
        self.rooms.get(game_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// 关闭并移除房间
    pub fn evict(&mut self, game_id: &str) -> bool {
        match self.rooms.remove(game_id) {
            Some(handle) => {
                log::info!("[ROOM] evicting {}", game_id);
                handle.shutdown();
                true
            }
            None => false,
        }
    }
}
