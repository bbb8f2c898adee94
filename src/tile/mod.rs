/// 牌与牌墙模块
///
/// 包含牌类型定义、牌墙（含牌尾）、手牌和胡牌判定

pub mod hand;
pub mod tile;
pub mod wall;
pub mod win_check;

pub use hand::Hand;
pub use tile::{Dragon, Suit, Tile, Wind};
pub use wall::{Wall, DEAD_WALL_SIZE};
pub use win_check::{Decomposition, Group, WinChecker};
