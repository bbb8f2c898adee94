//! 会话层：心跳、连接状态机、断线重连补发

pub mod session;

pub use session::{
    build_resync_response, ConnState, Session, SessionMessage, HEARTBEAT_INTERVAL_MS,
    PONG_TIMEOUT_MS,
};
