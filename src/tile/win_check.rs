use std::collections::HashMap;

use smallvec::SmallVec;

use super::hand::Hand;
use super::tile::{Suit, Tile};

/// 一组面子（顺子或刻子）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// 顺子（同花色连续三张，start 为最小数字）
    Run { suit: Suit, start: u8 },
    /// 刻子（三张相同牌）
    Triplet { tile: Tile },
}

/// 胡牌拆解结果：1 个对子 + 若干面子
///
/// 十六张制完整胡牌为 5 面子 + 1 对，已碰/杠的面子不在 groups 中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    /// 对子（将眼）
    pub pair: Tile,
    /// 手牌部分拆出的面子
    pub groups: SmallVec<[Group; 5]>,
}

/// 胡牌判定器
///
/// 递归回溯拆解手牌，按规范化的残余计数做失败记忆化，
/// 保证 17 张手牌的判定复杂度有界
#[derive(Debug, Clone)]
pub struct WinChecker {
    /// 失败缓存：残余计数哈希 -> 不可完全拆解
    fail_cache: HashMap<u64, ()>,
    /// 缓存上限，超过后清空（与查表器相同的简化 LRU 策略）
    max_cache_size: usize,
}

impl Default for WinChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl WinChecker {
    pub fn new() -> Self {
        Self {
            fail_cache: HashMap::new(),
            max_cache_size: 4096,
        }
    }

    /// 判定是否构成胡牌
    ///
    /// # 参数
    ///
    /// - `hand`: 手牌（含刚摸到或荣和的那张牌）
    /// - `melds_count`: 已碰/杠/吃的面子组数
    ///
    /// 手牌张数必须等于 `17 - 3 × melds_count`（杠按 3 张占位计）。
    /// 十三幺作为绕过面子/对子规则的特殊终止条件单独判定。
    pub fn is_winning(&mut self, hand: &Hand, melds_count: u8) -> bool {
        Self::is_thirteen_orphans(hand, melds_count) || self.decompose(hand, melds_count).is_some()
    }

    /// 拆解手牌为对子 + 面子
    ///
    /// 返回 `None` 表示不能构成胡牌（诈胡由上层转为专门错误）
    pub fn decompose(&mut self, hand: &Hand, melds_count: u8) -> Option<Decomposition> {
        if melds_count > 5 {
            return None;
        }
        let sets_needed = (5 - melds_count) as usize;
        if hand.total_count() != sets_needed * 3 + 2 {
            return None;
        }

        let counts = hand.kind_counts();

        // 枚举对子，剩余部分递归拆面子
        for kind in 0..Tile::KIND_COUNT {
            if counts[kind] < 2 {
                continue;
            }
            let mut rest = counts;
            rest[kind] -= 2;
            let mut groups = SmallVec::new();
            if self.decompose_sets(&mut rest, sets_needed, &mut groups) {
                let pair = Tile::from_kind_index(kind)?;
                return Some(Decomposition { pair, groups });
            }
        }
        None
    }

    /// 十三幺判定：门清 17 张，全部为幺九牌且 13 个种类齐备
    ///
    /// 十六张制的十三幺要求整手牌只由幺九种类构成（允许重复），
    /// 不需要满足面子/对子结构
    pub fn is_thirteen_orphans(hand: &Hand, melds_count: u8) -> bool {
        if melds_count != 0 || hand.total_count() != 17 {
            return false;
        }
        let counts = hand.kind_counts();
        let mut kinds_present = 0;
        for kind in 0..Tile::KIND_COUNT {
            if counts[kind] == 0 {
                continue;
            }
            let tile = match Tile::from_kind_index(kind) {
                Some(t) => t,
                None => return false,
            };
            if !tile.is_orphan() {
                return false;
            }
            kinds_present += 1;
        }
        kinds_present == 13
    }

    /// 递归拆面子（刻子优先，再尝试顺子）
    fn decompose_sets(
        &mut self,
        counts: &mut [u8; Tile::KIND_COUNT],
        needed: usize,
        groups: &mut SmallVec<[Group; 5]>,
    ) -> bool {
        if needed == 0 {
            return counts.iter().all(|&c| c == 0);
        }

        // 找到第一个非空种类
        let kind = match counts.iter().position(|&c| c > 0) {
            Some(k) => k,
            None => return false,
        };

        let key = Self::residual_key(counts, needed);
        if self.fail_cache.contains_key(&key) {
            return false;
        }

        let tile = match Tile::from_kind_index(kind) {
            Some(t) => t,
            None => return false,
        };

        // 尝试刻子
        if counts[kind] >= 3 {
            counts[kind] -= 3;
            groups.push(Group::Triplet { tile });
            if self.decompose_sets(counts, needed - 1, groups) {
                counts[kind] += 3;
                return true;
            }
            groups.pop();
            counts[kind] += 3;
        }

        // 尝试顺子（只有数牌且不跨花色段才可能）
        if let (Some(suit), Some(rank)) = (tile.suit(), tile.rank()) {
            if rank <= 7 && counts[kind + 1] > 0 && counts[kind + 2] > 0 {
                counts[kind] -= 1;
                counts[kind + 1] -= 1;
                counts[kind + 2] -= 1;
                groups.push(Group::Run { suit, start: rank });
                if self.decompose_sets(counts, needed - 1, groups) {
                    counts[kind] += 1;
                    counts[kind + 1] += 1;
                    counts[kind + 2] += 1;
                    return true;
                }
                groups.pop();
                counts[kind] += 1;
                counts[kind + 1] += 1;
                counts[kind + 2] += 1;
            }
        }

        if self.fail_cache.len() >= self.max_cache_size {
            self.fail_cache.clear();
        }
        self.fail_cache.insert(key, ());
        false
    }

    /// 残余计数的规范化键（FNV-1a）
    fn residual_key(counts: &[u8; Tile::KIND_COUNT], needed: usize) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for &c in counts.iter() {
            hash ^= c as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash ^= needed as u64;
        hash.wrapping_mul(0x0000_0100_0000_01b3)
    }
}
