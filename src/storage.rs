use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::game::{Command, GameSnapshot};

/// 存储层错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 存储暂不可用（可重试）
    Unavailable,
    /// 数据损坏（不可重试）
    Corrupted(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "storage unavailable"),
            StorageError::Corrupted(detail) => write!(f, "storage data corrupted: {}", detail),
        }
    }
}

impl std::error::Error for StorageError {}

/// 权威持久化存储
///
/// 命令处理器遵循先写后回执：快照落库成功之前不提交状态、不发事件
pub trait GameStore: Send {
    fn save(&self, snapshot: &GameSnapshot) -> Result<(), StorageError>;
    fn load(&self, game_id: &str) -> Result<Option<GameSnapshot>, StorageError>;
    /// 追加命令审计日志（回放与对账的数据源）
    fn append_command_log(&self, game_id: &str, command: &Command) -> Result<(), StorageError>;
}

/// 热路径缓存（尽力而为，失败只记日志不阻断回执）
pub trait GameCache: Send {
    fn put(&self, snapshot: &GameSnapshot) -> Result<(), StorageError>;
    fn get(&self, game_id: &str) -> Result<Option<GameSnapshot>, StorageError>;
}

// 共享句柄可直接作为存储使用
impl<T: GameStore + Sync> GameStore for std::sync::Arc<T> {
    fn save(&self, snapshot: &GameSnapshot) -> Result<(), StorageError> {
        (**self).save(snapshot)
    }

    fn load(&self, game_id: &str) -> Result<Option<GameSnapshot>, StorageError> {
        (**self).load(game_id)
    }

    fn append_command_log(&self, game_id: &str, command: &Command) -> Result<(), StorageError> {
        (**self).append_command_log(game_id, command)
    }
}

impl<T: GameCache + Sync> GameCache for std::sync::Arc<T> {
    fn put(&self, snapshot: &GameSnapshot) -> Result<(), StorageError> {
        (**self).put(snapshot)
    }

    fn get(&self, game_id: &str) -> Result<Option<GameSnapshot>, StorageError> {
        (**self).get(game_id)
    }
}

/// 重试策略：固定次数 + 线性退避
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 50,
        }
    }
}

impl RetryPolicy {
    /// 测试用：不退避
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_ms: 0,
        }
    }

    /// 执行可重试操作；Corrupted 不重试
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Result<T, StorageError>,
    {
        let mut last_err = StorageError::Unavailable;
        for attempt in 1..=self.max_attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(StorageError::Unavailable) => {
                    log::warn!(
                        "[STORAGE] {} attempt {}/{} failed, retrying",
                        label,
                        attempt,
                        self.max_attempts
                    );
                    last_err = StorageError::Unavailable;
                    if attempt < self.max_attempts && self.backoff_ms > 0 {
                        thread::sleep(Duration::from_millis(self.backoff_ms * attempt as u64));
                    }
                }
                Err(err) => return Err(err),
            }
        }
        log::error!("[STORAGE] {} failed after {} attempts", label, self.max_attempts);
        Err(last_err)
    }
}

/// 内存存储（测试与单机部署）
///
/// `fail_next` 用于测试注入存储故障
#[derive(Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, GameSnapshot>>,
    command_log: Mutex<HashMap<String, Vec<Command>>>,
    fail_next: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来 n 次写入失败（快照与命令日志共用计数）
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// 读取某局已落盘的命令日志（审计与测试用）
    pub fn command_log(&self, game_id: &str) -> Vec<Command> {
        self.command_log
            .lock()
            .map(|guard| guard.get(game_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn consume_injected_failure(&self) -> Result<(), StorageError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

impl GameStore for MemoryStore {
    fn save(&self, snapshot: &GameSnapshot) -> Result<(), StorageError> {
        self.consume_injected_failure()?;
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|_| StorageError::Unavailable)?;
        guard.insert(snapshot.game_id.clone(), snapshot.clone());
        Ok(())
    }

    fn load(&self, game_id: &str) -> Result<Option<GameSnapshot>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|_| StorageError::Unavailable)?;
        Ok(guard.get(game_id).cloned())
    }

    fn append_command_log(&self, game_id: &str, command: &Command) -> Result<(), StorageError> {
        self.consume_injected_failure()?;
        let mut guard = self
            .command_log
            .lock()
            .map_err(|_| StorageError::Unavailable)?;
        guard
            .entry(game_id.to_string())
            .or_default()
            .push(command.clone());
        Ok(())
    }
}

/// 内存缓存
#[derive(Default)]
pub struct MemoryCache {
    snapshots: Mutex<HashMap<String, GameSnapshot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameCache for MemoryCache {
    fn put(&self, snapshot: &GameSnapshot) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|_| StorageError::Unavailable)?;
        guard.insert(snapshot.game_id.clone(), snapshot.clone());
        Ok(())
    }

    fn get(&self, game_id: &str) -> Result<Option<GameSnapshot>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|_| StorageError::Unavailable)?;
        Ok(guard.get(game_id).cloned())
    }
}
