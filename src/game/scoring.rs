use serde::{Deserialize, Serialize};

use crate::game::meld::{Meld, MeldKind};
use crate::tile::win_check::Group;
use crate::tile::{Dragon, Hand, Tile, WinChecker, Wind};

/// 台型（封闭枚举，配合静态判定表与互斥压制表）
///
/// 不采用开放式继承：台型集合封闭可穷举测试，
/// 互斥关系由压制表统一处理而不是散落的条件分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pattern {
    /// 天胡：庄家起手自摸
    TianHu,
    /// 地胡：闲家第一轮自摸
    DiHu,
    /// 大四喜：四组风刻
    DaSiXi,
    /// 小四喜：三组风刻 + 风将
    XiaoSiXi,
    /// 大三元：三组三元刻
    DaSanYuan,
    /// 小三元：两组三元刻 + 三元将
    XiaoSanYuan,
    /// 字一色：全字牌
    ZiYiSe,
    /// 清一色：单一花色数牌
    QingYiSe,
    /// 混一色：单一花色数牌 + 字牌
    HunYiSe,
    /// 碰碰胡：五组刻子/杠
    PengPengHu,
    /// 十三幺
    ShiSanYao,
    /// 门清：无吃碰明杠
    MenQing,
    /// 自摸
    ZiMo,
    /// 平胡：五组顺子 + 非字将，无花
    PingHu,
    /// 圈风刻
    QuanFengKe,
    /// 门风刻
    MenFengKe,
    /// 三元刻（每组一台）
    SanYuanKe,
    /// 花牌（每张一台）
    HuaPai,
    /// 海底捞月：牌墙最后一张自摸
    HaiDiLaoYue,
    /// 河底捞鱼：胡最后一张弃牌
    HeDiLaoYu,
    /// 杠上开花：杠后补牌自摸
    GangShangKaiHua,
    /// 抢杠：胡别人加杠的牌
    QiangGang,
    /// 连庄拉庄（连 N 拉 N）
    LianZhuang,
}

impl Pattern {
    /// 全部台型，按固定顺序求值保证结果确定
    pub fn all() -> &'static [Pattern] {
        use Pattern::*;
        &[
            TianHu, DiHu, ShiSanYao, DaSiXi, XiaoSiXi, DaSanYuan, XiaoSanYuan, ZiYiSe,
            QingYiSe, HunYiSe, PengPengHu, PingHu, MenQing, ZiMo, QuanFengKe, MenFengKe,
            SanYuanKe, HuaPai, HaiDiLaoYue, HeDiLaoYu, GangShangKaiHua, QiangGang, LianZhuang,
        ]
    }

    /// 固定台数（动态台型返回基础单位）
    pub fn tai(&self) -> u32 {
        match self {
            Pattern::TianHu | Pattern::DiHu => 16,
            Pattern::DaSiXi => 16,
            Pattern::ZiYiSe => 16,
            Pattern::ShiSanYao => 16,
            Pattern::XiaoSiXi => 8,
            Pattern::DaSanYuan => 8,
            Pattern::QingYiSe => 8,
            Pattern::XiaoSanYuan => 4,
            Pattern::HunYiSe => 4,
            Pattern::PengPengHu => 4,
            Pattern::PingHu => 2,
            Pattern::MenQing
            | Pattern::ZiMo
            | Pattern::QuanFengKe
            | Pattern::MenFengKe
            | Pattern::SanYuanKe
            | Pattern::HuaPai
            | Pattern::HaiDiLaoYue
            | Pattern::HeDiLaoYu
            | Pattern::GangShangKaiHua
            | Pattern::QiangGang => 1,
            // 连 N 拉 N：每连一次 2 台
            Pattern::LianZhuang => 2,
        }
    }

    /// 互斥压制表：该台型成立时不再计入的子台型
    pub fn suppresses(&self) -> &'static [Pattern] {
        match self {
            Pattern::TianHu | Pattern::DiHu => &[Pattern::ZiMo, Pattern::MenQing],
            Pattern::DaSiXi => &[Pattern::XiaoSiXi, Pattern::QuanFengKe, Pattern::MenFengKe],
            Pattern::XiaoSiXi => &[Pattern::QuanFengKe, Pattern::MenFengKe],
            Pattern::DaSanYuan => &[Pattern::XiaoSanYuan, Pattern::SanYuanKe],
            Pattern::XiaoSanYuan => &[Pattern::SanYuanKe],
            Pattern::QingYiSe | Pattern::ZiYiSe => &[Pattern::HunYiSe],
            Pattern::ShiSanYao => &[Pattern::MenQing],
            _ => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::TianHu => "天胡",
            Pattern::DiHu => "地胡",
            Pattern::DaSiXi => "大四喜",
            Pattern::XiaoSiXi => "小四喜",
            Pattern::DaSanYuan => "大三元",
            Pattern::XiaoSanYuan => "小三元",
            Pattern::ZiYiSe => "字一色",
            Pattern::QingYiSe => "清一色",
            Pattern::HunYiSe => "混一色",
            Pattern::PengPengHu => "碰碰胡",
            Pattern::ShiSanYao => "十三幺",
            Pattern::MenQing => "门清",
            Pattern::ZiMo => "自摸",
            Pattern::PingHu => "平胡",
            Pattern::QuanFengKe => "圈风刻",
            Pattern::MenFengKe => "门风刻",
            Pattern::SanYuanKe => "三元刻",
            Pattern::HuaPai => "花牌",
            Pattern::HaiDiLaoYue => "海底捞月",
            Pattern::HeDiLaoYu => "河底捞鱼",
            Pattern::GangShangKaiHua => "杠上开花",
            Pattern::QiangGang => "抢杠",
            Pattern::LianZhuang => "连庄拉庄",
        }
    }
}

/// 计台上下文：胡牌方式与局面信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreContext {
    /// 是否自摸
    pub self_draw: bool,
    /// 胡牌者座风
    pub seat_wind: Wind,
    /// 圈风
    pub round_wind: Wind,
    /// 胡牌者是否庄家
    pub is_dealer: bool,
    /// 已完成的出牌轮数（天胡/地胡判定）
    pub turn: u32,
    /// 胡的牌是否来自牌尾补牌（杠上开花）
    pub from_dead_wall: bool,
    /// 是否牌墙最后一张（海底捞月）
    pub is_last_live_tile: bool,
    /// 是否胡最后一张弃牌（河底捞鱼）
    pub win_on_last_discard: bool,
    /// 是否抢杠胡
    pub robbed_kong: bool,
    /// 庄家连庄次数
    pub dealer_streak: u32,
    /// 胡牌者亮出的花牌数
    pub flower_count: u32,
}

impl Default for ScoreContext {
    fn default() -> Self {
        Self {
            self_draw: false,
            seat_wind: Wind::East,
            round_wind: Wind::East,
            is_dealer: false,
            turn: u32::MAX,
            from_dead_wall: false,
            is_last_live_tile: false,
            win_on_last_discard: false,
            robbed_kong: false,
            dealer_streak: 0,
            flower_count: 0,
        }
    }
}

/// 计台结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// 命中的台型及其台数（压制后）
    pub patterns: Vec<(Pattern, u32)>,
    /// 总台数
    pub tai: u32,
    /// 最终得分 = 底分 + 台数 × 每台分值
    pub total: u32,
}

/// 胡牌的结构分析（判定表的共享输入）
struct WinAnalysis {
    /// 全部面子（手牌拆解 + 已亮面子），十三幺时为空
    groups: Vec<Group>,
    /// 将眼
    pair: Option<Tile>,
    /// 是否十三幺
    thirteen_orphans: bool,
    /// 全部非花牌的种类计数（手牌 + 面子）
    counts: [u8; Tile::KIND_COUNT],
    /// 是否门清（无吃/碰/明杠）
    concealed: bool,
    /// 已亮面子中是否有吃
    has_chow_meld: bool,
}

/// 台数计算引擎
///
/// 纯整数运算；同一手牌与上下文输出逐位一致
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    /// 底分
    pub base_score: u32,
    /// 每台分值
    pub tai_unit: u32,
}

impl ScoringEngine {
    pub fn new(base_score: u32, tai_unit: u32) -> Self {
        Self {
            base_score,
            tai_unit,
        }
    }

    /// 计算胡牌得分
    ///
    /// # 参数
    ///
    /// - `hand`: 手牌（已含胡的那张牌）
    /// - `melds`: 已亮面子
    /// - `ctx`: 计台上下文
    ///
    /// 调用方必须先通过胡牌判定；这里对无法拆解的手牌返回 0 台底分
    pub fn calculate(
        &self,
        checker: &mut WinChecker,
        hand: &Hand,
        melds: &[Meld],
        ctx: &ScoreContext,
    ) -> Score {
        let analysis = match Self::analyze(checker, hand, melds) {
            Some(a) => a,
            None => {
                return Score {
                    patterns: Vec::new(),
                    tai: 0,
                    total: self.base_score,
                }
            }
        };

        // 第一遍：按固定顺序收集所有命中台型
        let mut matched: Vec<(Pattern, u32)> = Vec::new();
        for &pattern in Pattern::all() {
            if let Some(tai) = Self::evaluate(pattern, &analysis, ctx) {
                matched.push((pattern, tai));
            }
        }

        // 第二遍：应用压制表
        let suppressed: Vec<Pattern> = matched
            .iter()
            .flat_map(|(p, _)| p.suppresses().iter().copied())
            .collect();
        matched.retain(|(p, _)| !suppressed.contains(p));

        let tai: u32 = matched.iter().map(|(_, t)| t).sum();
        Score {
            patterns: matched,
            tai,
            total: self.base_score + tai * self.tai_unit,
        }
    }

    /// 拆解胡牌结构
    fn analyze(checker: &mut WinChecker, hand: &Hand, melds: &[Meld]) -> Option<WinAnalysis> {
        let concealed = melds
            .iter()
            .all(|m| m.kind == MeldKind::Kong && m.concealed);
        let has_chow_meld = melds.iter().any(|m| m.kind == MeldKind::Chow);

        let mut counts = hand.kind_counts();
        for meld in melds {
            for tile in &meld.tiles {
                if let Some(idx) = tile.kind_index() {
                    counts[idx] += 1;
                }
            }
        }

        if WinChecker::is_thirteen_orphans(hand, melds.len() as u8) {
            return Some(WinAnalysis {
                groups: Vec::new(),
                pair: None,
                thirteen_orphans: true,
                counts,
                concealed: true,
                has_chow_meld: false,
            });
        }

        let decomposition = checker.decompose(hand, melds.len() as u8)?;
        let mut groups: Vec<Group> = decomposition.groups.to_vec();
        for meld in melds {
            match meld.kind {
                MeldKind::Chow => {
                    if let (Some(suit), Some(rank)) = (
                        meld.tiles.first().and_then(|t| t.suit()),
                        meld.tiles.first().and_then(|t| t.rank()),
                    ) {
                        groups.push(Group::Run { suit, start: rank });
                    }
                }
                MeldKind::Pung | MeldKind::Kong => {
                    if let Some(&tile) = meld.tiles.first() {
                        groups.push(Group::Triplet { tile });
                    }
                }
            }
        }

        Some(WinAnalysis {
            groups,
            pair: Some(decomposition.pair),
            thirteen_orphans: false,
            counts,
            concealed,
            has_chow_meld,
        })
    }

    /// 单个台型判定，命中时返回台数
    fn evaluate(pattern: Pattern, analysis: &WinAnalysis, ctx: &ScoreContext) -> Option<u32> {
        let triplet_of = |tile: Tile| {
            analysis
                .groups
                .iter()
                .any(|g| matches!(g, Group::Triplet { tile: t } if *t == tile))
        };
        let wind_triplets = Wind::all()
            .iter()
            .filter(|w| triplet_of(Tile::Wind(**w)))
            .count();
        let dragon_triplets = Dragon::all()
            .iter()
            .filter(|d| triplet_of(Tile::Dragon(**d)))
            .count();

        let matched = match pattern {
            Pattern::TianHu => ctx.is_dealer && ctx.self_draw && ctx.turn == 0,
            Pattern::DiHu => {
                !ctx.is_dealer && ctx.self_draw && ctx.turn < 4 && analysis.concealed
            }
            Pattern::ShiSanYao => analysis.thirteen_orphans,
            Pattern::DaSiXi => wind_triplets == 4,
            Pattern::XiaoSiXi => {
                wind_triplets == 3 && matches!(analysis.pair, Some(Tile::Wind(_)))
            }
            Pattern::DaSanYuan => dragon_triplets == 3,
            Pattern::XiaoSanYuan => {
                dragon_triplets == 2 && matches!(analysis.pair, Some(Tile::Dragon(_)))
            }
            Pattern::ZiYiSe => Self::suits_present(&analysis.counts) == (false, false, false, true),
            Pattern::QingYiSe => {
                let (wan, tong, tiao, honor) = Self::suits_present(&analysis.counts);
                !honor && [wan, tong, tiao].iter().filter(|p| **p).count() == 1
            }
            Pattern::HunYiSe => {
                let (wan, tong, tiao, honor) = Self::suits_present(&analysis.counts);
                honor && [wan, tong, tiao].iter().filter(|p| **p).count() == 1
            }
            Pattern::PengPengHu => {
                !analysis.thirteen_orphans
                    && !analysis.groups.is_empty()
                    && analysis
                        .groups
                        .iter()
                        .all(|g| matches!(g, Group::Triplet { .. }))
            }
            Pattern::PingHu => {
                !analysis.thirteen_orphans
                    && ctx.flower_count == 0
                    && analysis
                        .groups
                        .iter()
                        .all(|g| matches!(g, Group::Run { .. }))
                    && matches!(analysis.pair, Some(p) if !p.is_honor())
            }
            Pattern::MenQing => !analysis.thirteen_orphans && analysis.concealed,
            Pattern::ZiMo => ctx.self_draw,
            Pattern::QuanFengKe => triplet_of(Tile::Wind(ctx.round_wind)),
            Pattern::MenFengKe => {
                // 圈风与座风相同时，由圈风刻计入，避免同一刻子计两次
                ctx.seat_wind != ctx.round_wind && triplet_of(Tile::Wind(ctx.seat_wind))
            }
            Pattern::SanYuanKe => dragon_triplets > 0,
            Pattern::HuaPai => ctx.flower_count > 0,
            Pattern::HaiDiLaoYue => ctx.self_draw && ctx.is_last_live_tile,
            Pattern::HeDiLaoYu => !ctx.self_draw && ctx.win_on_last_discard,
            Pattern::GangShangKaiHua => ctx.self_draw && ctx.from_dead_wall,
            Pattern::QiangGang => ctx.robbed_kong,
            Pattern::LianZhuang => ctx.is_dealer && ctx.dealer_streak > 0,
        };

        if !matched {
            return None;
        }

        // 动态台数
        let tai = match pattern {
            Pattern::SanYuanKe => dragon_triplets as u32 * pattern.tai(),
            Pattern::HuaPai => ctx.flower_count * pattern.tai(),
            Pattern::LianZhuang => ctx.dealer_streak * pattern.tai(),
            _ => pattern.tai(),
        };
        Some(tai)
    }

    /// 各花色/字牌是否出现：(万, 筒, 条, 字)
    fn suits_present(counts: &[u8; Tile::KIND_COUNT]) -> (bool, bool, bool, bool) {
        let wan = counts[0..9].iter().any(|&c| c > 0);
        let tong = counts[9..18].iter().any(|&c| c > 0);
        let tiao = counts[18..27].iter().any(|&c| c > 0);
        let honor = counts[27..34].iter().any(|&c| c > 0);
        (wan, tong, tiao, honor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_of(specs: &[(Tile, u8)]) -> Hand {
        let mut hand = Hand::new();
        for &(tile, n) in specs {
            for _ in 0..n {
                hand.add_tile(tile);
            }
        }
        hand
    }

    fn engine() -> ScoringEngine {
        ScoringEngine::new(10, 5)
    }

    fn score_patterns(score: &Score) -> Vec<Pattern> {
        score.patterns.iter().map(|(p, _)| *p).collect()
    }

    #[test]
    fn test_all_triplets_self_draw() {
        // 碰碰胡 + 自摸 + 门清 + 圈风刻（东）
        let hand = hand_of(&[
            (Tile::Wan(2), 3),
            (Tile::Tong(5), 3),
            (Tile::Tiao(8), 3),
            (Tile::Wind(Wind::East), 3),
            (Tile::Dragon(Dragon::Red), 3),
            (Tile::Wan(9), 2),
        ]);
        let ctx = ScoreContext {
            self_draw: true,
            seat_wind: Wind::East,
            round_wind: Wind::East,
            ..Default::default()
        };
        let mut checker = WinChecker::new();
        let score = engine().calculate(&mut checker, &hand, &[], &ctx);

        let patterns = score_patterns(&score);
        assert!(patterns.contains(&Pattern::PengPengHu));
        assert!(patterns.contains(&Pattern::ZiMo));
        assert!(patterns.contains(&Pattern::MenQing));
        assert!(patterns.contains(&Pattern::QuanFengKe));
        assert!(patterns.contains(&Pattern::SanYuanKe));
        // 座风=圈风只计一次
        assert!(!patterns.contains(&Pattern::MenFengKe));

        // 碰碰胡4 + 自摸1 + 门清1 + 圈风刻1 + 三元刻1 = 8 台
        assert_eq!(score.tai, 8);
        assert_eq!(score.total, 10 + 8 * 5);
    }

    #[test]
    fn test_da_si_xi_suppression() {
        // 大四喜压制小四喜与风刻台
        let hand = hand_of(&[
            (Tile::Wind(Wind::East), 3),
            (Tile::Wind(Wind::South), 3),
            (Tile::Wind(Wind::West), 3),
            (Tile::Wind(Wind::North), 3),
            (Tile::Wan(1), 3),
            (Tile::Wan(5), 2),
        ]);
        let ctx = ScoreContext {
            seat_wind: Wind::South,
            round_wind: Wind::East,
            ..Default::default()
        };
        let mut checker = WinChecker::new();
        let score = engine().calculate(&mut checker, &hand, &[], &ctx);

        let patterns = score_patterns(&score);
        assert!(patterns.contains(&Pattern::DaSiXi));
        assert!(!patterns.contains(&Pattern::XiaoSiXi));
        assert!(!patterns.contains(&Pattern::QuanFengKe));
        assert!(!patterns.contains(&Pattern::MenFengKe));
        // 碰碰胡不被压制
        assert!(patterns.contains(&Pattern::PengPengHu));
    }

    #[test]
    fn test_qing_yi_se_suppresses_hun_yi_se() {
        // 123 234 345 456 789 + 99（全筒）
        let hand = hand_of(&[
            (Tile::Tong(1), 1),
            (Tile::Tong(2), 2),
            (Tile::Tong(3), 3),
            (Tile::Tong(4), 3),
            (Tile::Tong(5), 2),
            (Tile::Tong(6), 1),
            (Tile::Tong(7), 1),
            (Tile::Tong(8), 1),
            (Tile::Tong(9), 3),
        ]);
        assert_eq!(hand.total_count(), 17);
        let mut checker = WinChecker::new();
        let score = engine().calculate(&mut checker, &hand, &[], &ScoreContext::default());
        let patterns = score_patterns(&score);
        assert!(patterns.contains(&Pattern::QingYiSe));
        assert!(!patterns.contains(&Pattern::HunYiSe));
    }

    #[test]
    fn test_ping_hu() {
        let hand = hand_of(&[
            (Tile::Wan(1), 1),
            (Tile::Wan(2), 1),
            (Tile::Wan(3), 1),
            (Tile::Tong(4), 1),
            (Tile::Tong(5), 1),
            (Tile::Tong(6), 1),
            (Tile::Tiao(7), 1),
            (Tile::Tiao(8), 1),
            (Tile::Tiao(9), 1),
            (Tile::Wan(5), 1),
            (Tile::Wan(6), 1),
            (Tile::Wan(7), 1),
            (Tile::Tong(1), 1),
            (Tile::Tong(2), 1),
            (Tile::Tong(3), 1),
            (Tile::Tiao(5), 2),
        ]);
        assert_eq!(hand.total_count(), 17);
        let mut checker = WinChecker::new();
        let score = engine().calculate(&mut checker, &hand, &[], &ScoreContext::default());
        assert!(score_patterns(&score).contains(&Pattern::PingHu));

        // 有花牌则平胡不成立
        let ctx = ScoreContext {
            flower_count: 1,
            ..Default::default()
        };
        let score = engine().calculate(&mut checker, &hand, &[], &ctx);
        assert!(!score_patterns(&score).contains(&Pattern::PingHu));
        assert!(score_patterns(&score).contains(&Pattern::HuaPai));
    }

    #[test]
    fn test_thirteen_orphans_score() {
        let mut specs: Vec<(Tile, u8)> = Tile::orphan_kinds().iter().map(|&t| (t, 1)).collect();
        specs[0].1 = 3;
        specs[1].1 = 3;
        let hand = hand_of(&specs);
        let mut checker = WinChecker::new();
        let score = engine().calculate(&mut checker, &hand, &[], &ScoreContext::default());
        let patterns = score_patterns(&score);
        assert!(patterns.contains(&Pattern::ShiSanYao));
        // 门清被十三幺压制
        assert!(!patterns.contains(&Pattern::MenQing));
        assert_eq!(score.tai, 16);
    }

    #[test]
    fn test_dealer_streak_tai() {
        let hand = hand_of(&[
            (Tile::Wan(1), 1),
            (Tile::Wan(2), 1),
            (Tile::Wan(3), 1),
            (Tile::Wan(4), 1),
            (Tile::Wan(5), 1),
            (Tile::Wan(6), 1),
            (Tile::Wan(7), 1),
            (Tile::Wan(8), 1),
            (Tile::Wan(9), 1),
            (Tile::Tong(1), 3),
            (Tile::Tiao(2), 3),
            (Tile::Tong(9), 2),
        ]);
        let ctx = ScoreContext {
            is_dealer: true,
            dealer_streak: 2,
            ..Default::default()
        };
        let mut checker = WinChecker::new();
        let score = engine().calculate(&mut checker, &hand, &[], &ctx);
        // 连 2 拉 2 = 4 台
        let lian = score
            .patterns
            .iter()
            .find(|(p, _)| *p == Pattern::LianZhuang)
            .map(|(_, t)| *t);
        assert_eq!(lian, Some(4));
    }

    #[test]
    fn test_determinism() {
        let hand = hand_of(&[
            (Tile::Wan(2), 3),
            (Tile::Tong(5), 3),
            (Tile::Tiao(8), 3),
            (Tile::Wind(Wind::East), 3),
            (Tile::Dragon(Dragon::Red), 3),
            (Tile::Wan(9), 2),
        ]);
        let ctx = ScoreContext {
            self_draw: true,
            ..Default::default()
        };
        let mut checker = WinChecker::new();
        let first = engine().calculate(&mut checker, &hand, &[], &ctx);
        for _ in 0..5 {
            let again = engine().calculate(&mut checker, &hand, &[], &ctx);
            assert_eq!(first, again);
        }
    }
}
