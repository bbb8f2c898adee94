use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::tile::Tile;

/// 抢牌种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum ClaimKind {
    /// 胡（荣和 / 抢杠）
    Hu,
    /// 直杠
    Kong,
    /// 碰
    Pung,
    /// 吃（只能下家），start 为顺子最小张
    Chow { start: Tile },
}

impl ClaimKind {
    /// 优先级：胡 > 杠/碰 > 吃
    pub fn priority(&self) -> u8 {
        match self {
            ClaimKind::Hu => 3,
            ClaimKind::Kong | ClaimKind::Pung => 2,
            ClaimKind::Chow { .. } => 1,
        }
    }
}

/// 一次抢牌意图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIntent {
    pub seat: u8,
    #[serde(flatten)]
    pub kind: ClaimKind,
}

/// 仲裁结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 所有同时胡牌的玩家都成立（一炮多响，放炮者按人数赔付）
    Wins(SmallVec<[u8; 3]>),
    /// 单个碰/杠/吃成立
    Meld(ClaimIntent),
    /// 无人抢牌，轮转到下家
    NoClaim,
}

/// 抢牌仲裁器
///
/// 对抢牌窗口内收集到的全部意图做一次确定性仲裁。
/// 窗口的开启/关闭与超时拒绝由状态机负责，这里只做纯计算。
pub struct ClaimResolver;

impl ClaimResolver {
    /// 仲裁同一张弃牌上的所有抢牌意图
    ///
    /// 规则：
    /// - 胡的优先级最高；多人同时胡全部成立（设计决定，不做单胜者裁决）
    /// - 杠/碰同级，杠与碰不可能同时出现在不同玩家身上（物理牌数约束），
    ///   若同时出现按杠优先
    /// - 吃只接受紧邻下家，且被任何碰/杠/胡压制
    pub fn resolve(claims: &[ClaimIntent], _discarded: Tile, discarder: u8) -> Resolution {
        // 一炮多响：收集所有胡，按出牌者下家起的座位顺序排列，保证确定性
        let mut winners: SmallVec<[u8; 3]> = SmallVec::new();
        for offset in 1..=3u8 {
            let seat = (discarder + offset) % 4;
            if claims
                .iter()
                .any(|c| c.seat == seat && c.kind == ClaimKind::Hu)
            {
                winners.push(seat);
            }
        }
        if !winners.is_empty() {
            return Resolution::Wins(winners);
        }

        // 杠优先于碰
        if let Some(claim) = claims.iter().find(|c| c.kind == ClaimKind::Kong) {
            return Resolution::Meld(*claim);
        }
        if let Some(claim) = claims.iter().find(|c| c.kind == ClaimKind::Pung) {
            return Resolution::Meld(*claim);
        }

        // 吃：只有下家合法
        let next_seat = (discarder + 1) % 4;
        if let Some(claim) = claims
            .iter()
            .find(|c| matches!(c.kind, ClaimKind::Chow { .. }) && c.seat == next_seat)
        {
            return Resolution::Meld(*claim);
        }

        Resolution::NoClaim
    }
}

/// 抢牌窗口（状态机在弃牌后开启，收集意图直到截止或全员应答）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimWindow {
    /// 被抢的牌
    pub tile: Tile,
    /// 出牌座位
    pub discarder: u8,
    /// 窗口截止时间（注入时钟的毫秒时间戳）
    pub deadline_ms: u64,
    /// 已收集的意图
    pub pending: Vec<ClaimIntent>,
    /// 仍可应答的座位
    pub awaiting: SmallVec<[u8; 3]>,
    /// 是否为抢杠窗口（加杠被宣告后，只允许胡）
    pub robbing_kong: bool,
}

impl ClaimWindow {
    pub fn new(
        tile: Tile,
        discarder: u8,
        deadline_ms: u64,
        awaiting: SmallVec<[u8; 3]>,
        robbing_kong: bool,
    ) -> Self {
        Self {
            tile,
            discarder,
            deadline_ms,
            pending: Vec::new(),
            awaiting,
            robbing_kong,
        }
    }

    /// 座位应答（抢牌或过），返回是否仍在等待其他座位
    pub fn record_response(&mut self, seat: u8, claim: Option<ClaimIntent>) -> bool {
        self.awaiting.retain(|s| *s != seat);
        if let Some(claim) = claim {
            self.pending.push(claim);
        }
        !self.awaiting.is_empty()
    }

    /// 窗口是否已超时
    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hu(seat: u8) -> ClaimIntent {
        ClaimIntent {
            seat,
            kind: ClaimKind::Hu,
        }
    }

    fn pung(seat: u8) -> ClaimIntent {
        ClaimIntent {
            seat,
            kind: ClaimKind::Pung,
        }
    }

    fn chow(seat: u8, start: Tile) -> ClaimIntent {
        ClaimIntent {
            seat,
            kind: ClaimKind::Chow { start },
        }
    }

    #[test]
    fn test_hu_beats_everything() {
        let claims = [pung(2), hu(3), chow(1, Tile::Wan(1))];
        match ClaimResolver::resolve(&claims, Tile::Wan(3), 0) {
            Resolution::Wins(winners) => assert_eq!(winners.as_slice(), &[3]),
            other => panic!("expected win, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_hu_all_granted() {
        // 一炮多响：按出牌者下家起排序
        let claims = [hu(3), hu(1), pung(2)];
        match ClaimResolver::resolve(&claims, Tile::Tong(9), 0) {
            Resolution::Wins(winners) => assert_eq!(winners.as_slice(), &[1, 3]),
            other => panic!("expected wins, got {:?}", other),
        }
    }

    #[test]
    fn test_pung_beats_chow() {
        let claims = [chow(1, Tile::Wan(1)), pung(3)];
        match ClaimResolver::resolve(&claims, Tile::Wan(3), 0) {
            Resolution::Meld(claim) => {
                assert_eq!(claim.seat, 3);
                assert_eq!(claim.kind, ClaimKind::Pung);
            }
            other => panic!("expected pung, got {:?}", other),
        }
    }

    #[test]
    fn test_kong_beats_pung() {
        let claims = [
            pung(1),
            ClaimIntent {
                seat: 2,
                kind: ClaimKind::Kong,
            },
        ];
        match ClaimResolver::resolve(&claims, Tile::Tiao(5), 0) {
            Resolution::Meld(claim) => assert_eq!(claim.kind, ClaimKind::Kong),
            other => panic!("expected kong, got {:?}", other),
        }
    }

    #[test]
    fn test_chow_only_from_next_seat() {
        // 座位 2 不是出牌者 0 的下家，吃无效
        let claims = [chow(2, Tile::Wan(1))];
        assert_eq!(
            ClaimResolver::resolve(&claims, Tile::Wan(3), 0),
            Resolution::NoClaim
        );

        let claims = [chow(1, Tile::Wan(1))];
        match ClaimResolver::resolve(&claims, Tile::Wan(3), 0) {
            Resolution::Meld(claim) => assert_eq!(claim.seat, 1),
            other => panic!("expected chow, got {:?}", other),
        }
    }

    #[test]
    fn test_window_response_tracking() {
        let mut window = ClaimWindow::new(
            Tile::Wan(1),
            0,
            1000,
            SmallVec::from_slice(&[1, 2, 3]),
            false,
        );
        assert!(window.record_response(1, None));
        assert!(window.record_response(2, Some(pung(2))));
        assert!(!window.record_response(3, None));
        assert_eq!(window.pending.len(), 1);

        assert!(!window.expired(999));
        assert!(window.expired(1000));
    }
}
