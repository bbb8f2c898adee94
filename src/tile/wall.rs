use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use super::tile::Tile;

/// 牌尾（死墙）保留张数，用于杠牌补牌和花牌补牌
pub const DEAD_WALL_SIZE: usize = 16;

/// 牌墙（Wall）
///
/// 存储洗好的 144 张牌。前段为活牌（从前往后摸），
/// 末尾固定保留 16 张作为牌尾，杠/花补牌从牌尾末端取。
///
/// 给定 seed 时牌序完全确定，配合 SHA-256 摘要可做公平性审计与回放。
#[derive(Debug, Clone)]
pub struct Wall {
    /// 洗好的全部牌（固定 144 张）
    tiles: Box<[Tile]>,
    /// 活牌已摸张数（从索引 0 开始）
    live_drawn: usize,
    /// 牌尾已补张数（从索引 143 开始倒取）
    dead_drawn: usize,
    /// 洗牌结果的 SHA-256 摘要（审计用）
    digest: String,
    /// 洗牌种子
    seed: u64,
}

impl Wall {
    /// 用指定种子构建并洗牌
    ///
    /// 同一 seed 产生完全相同的牌序（确定性回放）
    pub fn build(seed: u64) -> Self {
        let mut tiles = Tile::full_set();
        let mut rng = StdRng::seed_from_u64(seed);
        tiles.shuffle(&mut rng);

        let mut hasher = Sha256::new();
        hasher.update(seed.to_be_bytes());
        for tile in &tiles {
            if let Some(idx) = tile.kind_index() {
                hasher.update([idx as u8]);
            } else {
                // 花牌映射到 34 之后的区段
                match tile {
                    Tile::Flower(n) => hasher.update([34 + n - 1]),
                    Tile::Season(n) => hasher.update([38 + n - 1]),
                    _ => unreachable!(),
                }
            }
        }
        let digest = format!("{:x}", hasher.finalize());

        Self {
            tiles: tiles.into_boxed_slice(),
            live_drawn: 0,
            dead_drawn: 0,
            digest,
            seed,
        }
    }

    /// 活牌区大小：144 - 16 = 128
    fn live_size(&self) -> usize {
        self.tiles.len() - DEAD_WALL_SIZE
    }

    /// 从活牌区摸一张牌
    ///
    /// 返回 `None` 表示活牌已摸完，由调用方触发流局，不是致命错误
    pub fn draw(&mut self) -> Option<Tile> {
        if self.live_drawn >= self.live_size() {
            return None;
        }
        let tile = self.tiles[self.live_drawn];
        self.live_drawn += 1;
        Some(tile)
    }

    /// 从牌尾补一张牌（杠后补牌 / 花牌补牌）
    pub fn draw_from_dead(&mut self) -> Option<Tile> {
        if self.dead_drawn >= DEAD_WALL_SIZE {
            return None;
        }
        let index = self.tiles.len() - 1 - self.dead_drawn;
        self.dead_drawn += 1;
        Some(self.tiles[index])
    }

    /// 活牌剩余张数
    pub fn remaining_count(&self) -> usize {
        self.live_size().saturating_sub(self.live_drawn)
    }

    /// 牌尾剩余张数
    pub fn dead_remaining(&self) -> usize {
        DEAD_WALL_SIZE - self.dead_drawn
    }

    /// 活牌是否摸完（流局触发条件）
    pub fn is_exhausted(&self) -> bool {
        self.remaining_count() == 0
    }

    /// 下一张活牌是否为最后一张（海底判定）
    pub fn is_last_live_tile(&self) -> bool {
        self.remaining_count() == 1
    }

    /// 已离开牌墙的总张数（活牌 + 牌尾）
    pub fn drawn_total(&self) -> usize {
        self.live_drawn + self.dead_drawn
    }

    /// 洗牌结果摘要（公平性审计）
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// 洗牌种子
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
