use serde::{Deserialize, Serialize};

use crate::tile::Tile;

/// 面子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeldKind {
    /// 吃（顺子，只能吃上家）
    Chow,
    /// 碰（刻子）
    Pung,
    /// 杠（四张，明杠/暗杠/加杠）
    Kong,
}

/// 已亮出的面子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    /// 组成牌（3 或 4 张，顺子按数字升序）
    pub tiles: Vec<Tile>,
    /// 是否暗杠
    pub concealed: bool,
    /// 被claim的牌的出牌座位（暗杠/加杠为 None）
    pub source_seat: Option<u8>,
}

impl Meld {
    /// 吃：以 start 为最小张的顺子
    pub fn chow(start: Tile, source_seat: u8) -> Option<Self> {
        let suit = start.suit()?;
        let rank = start.rank()?;
        if rank > 7 {
            return None;
        }
        let tiles = vec![
            start,
            Tile::suited(suit, rank + 1)?,
            Tile::suited(suit, rank + 2)?,
        ];
        Some(Self {
            kind: MeldKind::Chow,
            tiles,
            concealed: false,
            source_seat: Some(source_seat),
        })
    }

    /// 碰
    pub fn pung(tile: Tile, source_seat: u8) -> Self {
        Self {
            kind: MeldKind::Pung,
            tiles: vec![tile; 3],
            concealed: false,
            source_seat: Some(source_seat),
        }
    }

    /// 杠（明杠带出牌者，暗杠不带）
    pub fn kong(tile: Tile, concealed: bool, source_seat: Option<u8>) -> Self {
        Self {
            kind: MeldKind::Kong,
            tiles: vec![tile; 4],
            concealed,
            source_seat,
        }
    }

    /// 碰升级为加杠
    pub fn upgrade_to_kong(&mut self, tile: Tile) -> bool {
        if self.kind != MeldKind::Pung || self.tiles.first() != Some(&tile) {
            return false;
        }
        self.kind = MeldKind::Kong;
        self.tiles.push(tile);
        true
    }

    /// 面子占用的物理牌数（杠 4 张，其余 3 张）
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// 是否为指定牌的刻子/杠（台数判定用）
    pub fn is_triplet_of(&self, tile: Tile) -> bool {
        matches!(self.kind, MeldKind::Pung | MeldKind::Kong) && self.tiles.first() == Some(&tile)
    }
}
