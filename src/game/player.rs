use std::collections::HashSet;

use crate::game::meld::Meld;
use crate::tile::{Hand, Tile, Wind};

/// 玩家状态
///
/// 聚合内的纯数据，所有变更都经由命令处理器驱动的引擎完成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    /// 座位号（0-3，0 为建房时的东位）
    pub seat: u8,
    /// 手牌（暗牌）
    pub hand: Hand,
    /// 已亮出的面子
    pub melds: Vec<Meld>,
    /// 已亮出的花牌（单独计台）
    pub flowers: Vec<Tile>,
    /// 是否已宣告听牌（可选规则）
    pub declared_ready: bool,
    /// 过水记录：自上次自己摸牌以来放弃胡牌的牌种
    ///
    /// 不变量：玩家不得对过水记录中的牌种宣告胡牌
    pub pass_record: HashSet<Tile>,
    /// 本局断线次数（超过阈值后取消宽限期）
    pub disconnect_count: u8,
    /// 宽限期是否已被取消
    pub grace_revoked: bool,
    /// 当前连接状态（断线时回合计时暂停）
    pub connected: bool,
}

impl PlayerState {
    pub fn new(seat: u8) -> Self {
        Self {
            seat,
            hand: Hand::new(),
            melds: Vec::new(),
            flowers: Vec::new(),
            declared_ready: false,
            pass_record: HashSet::new(),
            disconnect_count: 0,
            grace_revoked: false,
            connected: true,
        }
    }

    /// 座风：按庄家座位推算（庄=东，依逆时针南西北）
    pub fn seat_wind(&self, dealer_seat: u8) -> Wind {
        let offset = (self.seat + 4 - dealer_seat) % 4;
        Wind::from_index(offset).unwrap_or(Wind::East)
    }

    /// 记录过水（放弃对某张弃牌的胡牌机会）
    pub fn record_pass(&mut self, tile: Tile) {
        self.pass_record.insert(tile);
    }

    /// 是否对该牌种过过水
    pub fn has_passed_on(&self, tile: Tile) -> bool {
        self.pass_record.contains(&tile)
    }

    /// 清除过水记录（玩家自己摸牌后调用）
    pub fn clear_pass_record(&mut self) {
        self.pass_record.clear();
    }

    /// 亮出一张花牌
    pub fn add_flower(&mut self, tile: Tile) {
        debug_assert!(tile.is_bonus());
        self.flowers.push(tile);
    }

    /// 记一次断线，返回是否触发宽限期取消
    ///
    /// # 参数
    ///
    /// - `threshold`: 本局允许的断线次数上限
    pub fn record_disconnect(&mut self, threshold: u8) -> bool {
        self.connected = false;
        self.disconnect_count = self.disconnect_count.saturating_add(1);
        if self.disconnect_count > threshold {
            self.grace_revoked = true;
        }
        self.grace_revoked
    }

    /// 重连成功
    pub fn mark_reconnected(&mut self) {
        self.connected = true;
    }

    /// 该玩家占用的物理牌总数（手牌 + 面子 + 花牌），守恒检查用
    pub fn tile_count(&self) -> usize {
        self.hand.total_count()
            + self.melds.iter().map(|m| m.tile_count()).sum::<usize>()
            + self.flowers.len()
    }

    /// 是否可以直杠该弃牌（手上有 3 张）
    pub fn can_kong_from_discard(&self, tile: Tile) -> bool {
        self.hand.tile_count(tile) >= 3
    }

    /// 是否可以碰该弃牌（手上有 2 张）
    pub fn can_pung(&self, tile: Tile) -> bool {
        self.hand.tile_count(tile) >= 2
    }

    /// 是否可以吃该弃牌，返回所有合法顺子的最小张
    pub fn chow_options(&self, tile: Tile) -> Vec<Tile> {
        let (Some(suit), Some(rank)) = (tile.suit(), tile.rank()) else {
            return Vec::new();
        };
        let mut options = Vec::new();
        for start in rank.saturating_sub(2)..=rank {
            if start < Tile::MIN_RANK || start + 2 > Tile::MAX_RANK {
                continue;
            }
            let run: Vec<Tile> = (start..start + 3)
                .filter_map(|r| Tile::suited(suit, r))
                .collect();
            let have_all = run
                .iter()
                .all(|t| *t == tile || self.hand.has_tile(*t));
            if have_all {
                if let Some(first) = run.first() {
                    options.push(*first);
                }
            }
        }
        options
    }

    /// 查找可加杠的碰（手上有第 4 张）
    pub fn can_add_kong(&self, tile: Tile) -> bool {
        self.hand.has_tile(tile) && self.melds.iter().any(|m| m.is_triplet_of(tile) && m.tile_count() == 3)
    }

    /// 是否可以暗杠（手上有 4 张）
    pub fn can_concealed_kong(&self, tile: Tile) -> bool {
        self.hand.tile_count(tile) == 4
    }
}
