use std::collections::HashMap;

use smallvec::SmallVec;

use super::tile::Tile;

/// 手牌（Hand）
///
/// 使用 HashMap 存储每种牌的数量，支持 O(1) 的添加、移除和查询操作。
/// 只存放非花牌；花牌摸到即亮出，记录在 PlayerState 上。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hand {
    /// 牌的数量映射：Tile -> 数量（1-4）
    tiles: HashMap<Tile, u8>,
    /// 总牌数（用于快速查询）
    total_count: usize,
}

impl Hand {
    /// 创建空手牌
    pub fn new() -> Self {
        Self {
            tiles: HashMap::new(),
            total_count: 0,
        }
    }

    /// 从牌列表构建手牌（测试和场景搭建常用）
    pub fn from_tiles(tiles: &[Tile]) -> Self {
        let mut hand = Self::new();
        for &tile in tiles {
            hand.add_tile(tile);
        }
        hand
    }

    /// 添加一张牌
    ///
    /// # Returns
    ///
    /// - `true`：成功添加
    /// - `false`：该牌已有 4 张，或者是花牌（花牌不进手牌）
    pub fn add_tile(&mut self, tile: Tile) -> bool {
        if tile.is_bonus() {
            return false;
        }
        let count = self.tiles.entry(tile).or_insert(0);
        if *count >= 4 {
            return false;
        }
        *count += 1;
        self.total_count += 1;
        true
    }

    /// 移除一张牌
    ///
    /// # Returns
    ///
    /// - `true`：成功移除
    /// - `false`：手牌中没有该牌
    pub fn remove_tile(&mut self, tile: Tile) -> bool {
        match self.tiles.get_mut(&tile) {
            Some(count) if *count > 0 => {
                *count -= 1;
                self.total_count -= 1;
                if *count == 0 {
                    self.tiles.remove(&tile);
                }
                true
            }
            _ => false,
        }
    }

    /// 检查是否有某张牌
    pub fn has_tile(&self, tile: Tile) -> bool {
        self.tile_count(tile) > 0
    }

    /// 查询某张牌的数量
    pub fn tile_count(&self, tile: Tile) -> u8 {
        self.tiles.get(&tile).copied().unwrap_or(0)
    }

    /// 获取总牌数
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// 检查手牌是否为空
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// 清空手牌
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.total_count = 0;
    }

    /// 转换为种类计数数组（索引 0-33），胡牌判定的规范化输入
    pub fn kind_counts(&self) -> [u8; Tile::KIND_COUNT] {
        let mut counts = [0u8; Tile::KIND_COUNT];
        for (tile, &count) in &self.tiles {
            if let Some(idx) = tile.kind_index() {
                counts[idx] += count;
            }
        }
        counts
    }

    /// 转换为排序后的牌向量（快照、显示和调试用）
    ///
    /// 排序规则：按种类索引（万、筒、条、风、三元）
    pub fn to_sorted_vec(&self) -> Vec<Tile> {
        let mut result = Vec::with_capacity(self.total_count);
        for kind in 0..Tile::KIND_COUNT {
            let tile = match Tile::from_kind_index(kind) {
                Some(t) => t,
                None => continue,
            };
            for _ in 0..self.tile_count(tile) {
                result.push(tile);
            }
        }
        result
    }

    /// 获取所有不同的牌类型
    pub fn distinct_tiles(&self) -> SmallVec<[Tile; 10]> {
        let mut result: SmallVec<[Tile; 10]> = self.tiles.keys().copied().collect();
        result.sort_unstable();
        result
    }

    /// 获取所有牌的数量映射（用于高级操作）
    pub fn tiles_map(&self) -> &HashMap<Tile, u8> {
        &self.tiles
    }
}
