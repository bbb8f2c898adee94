//! 计台集成测试：台型组合、压制与确定性

use twmj_engine::tile::{Dragon, Hand, Tile, WinChecker, Wind};
use twmj_engine::{Meld, Pattern, RuleConfig, ScoreContext, ScoringEngine};

fn hand_of(specs: &[(Tile, u8)]) -> Hand {
    let mut hand = Hand::new();
    for &(tile, n) in specs {
        for _ in 0..n {
            hand.add_tile(tile);
        }
    }
    hand
}

fn default_engine() -> ScoringEngine {
    let config = RuleConfig::default();
    ScoringEngine::new(config.base_score, config.tai_unit)
}

fn patterns_of(score: &twmj_engine::Score) -> Vec<Pattern> {
    score.patterns.iter().map(|(p, _)| *p).collect()
}

#[test]
fn test_self_draw_exact_total() {
    // 平胡 + 自摸 + 门清：2 + 1 + 1 = 4 台，默认 底30 每台10 → 70
    let hand = hand_of(&[
        (Tile::Wan(1), 1),
        (Tile::Wan(2), 1),
        (Tile::Wan(3), 1),
        (Tile::Wan(4), 1),
        (Tile::Wan(5), 1),
        (Tile::Wan(6), 1),
        (Tile::Tong(2), 1),
        (Tile::Tong(3), 1),
        (Tile::Tong(4), 1),
        (Tile::Tong(6), 1),
        (Tile::Tong(7), 1),
        (Tile::Tong(8), 1),
        (Tile::Tiao(3), 1),
        (Tile::Tiao(4), 1),
        (Tile::Tiao(5), 1),
        (Tile::Tiao(9), 2),
    ]);
    let ctx = ScoreContext {
        self_draw: true,
        seat_wind: Wind::South,
        round_wind: Wind::East,
        ..Default::default()
    };
    let mut checker = WinChecker::new();
    let score = default_engine().calculate(&mut checker, &hand, &[], &ctx);

    let patterns = patterns_of(&score);
    assert!(patterns.contains(&Pattern::PingHu));
    assert!(patterns.contains(&Pattern::ZiMo));
    assert!(patterns.contains(&Pattern::MenQing));
    assert_eq!(score.tai, 4);
    assert_eq!(score.total, 30 + 4 * 10);
}

#[test]
fn test_melds_break_concealed_and_pinghu() {
    // 同样结构但两组顺子已吃出：丢门清；平胡仍成立
    let hand = hand_of(&[
        (Tile::Wan(1), 1),
        (Tile::Wan(2), 1),
        (Tile::Wan(3), 1),
        (Tile::Tong(6), 1),
        (Tile::Tong(7), 1),
        (Tile::Tong(8), 1),
        (Tile::Tiao(3), 1),
        (Tile::Tiao(4), 1),
        (Tile::Tiao(5), 1),
        (Tile::Tiao(9), 2),
    ]);
    let melds = [
        Meld::chow(Tile::Wan(4), 3).unwrap(),
        Meld::chow(Tile::Tong(2), 1).unwrap(),
    ];
    let ctx = ScoreContext {
        self_draw: false,
        seat_wind: Wind::South,
        round_wind: Wind::East,
        ..Default::default()
    };
    let mut checker = WinChecker::new();
    let score = default_engine().calculate(&mut checker, &hand, &melds, &ctx);

    let patterns = patterns_of(&score);
    assert!(patterns.contains(&Pattern::PingHu));
    assert!(!patterns.contains(&Pattern::MenQing));
    assert!(!patterns.contains(&Pattern::ZiMo));
    assert_eq!(score.tai, 2);
}

#[test]
fn test_big_three_dragons_suppresses_components() {
    let hand = hand_of(&[
        (Tile::Dragon(Dragon::Red), 3),
        (Tile::Dragon(Dragon::Green), 3),
        (Tile::Dragon(Dragon::White), 3),
        (Tile::Wan(3), 1),
        (Tile::Wan(4), 1),
        (Tile::Wan(5), 1),
        (Tile::Tong(7), 3),
        (Tile::Tiao(2), 2),
    ]);
    let mut checker = WinChecker::new();
    let score = default_engine().calculate(
        &mut checker,
        &hand,
        &[],
        &ScoreContext::default(),
    );

    let patterns = patterns_of(&score);
    assert!(patterns.contains(&Pattern::DaSanYuan));
    // 大三元压制小三元与三元刻
    assert!(!patterns.contains(&Pattern::XiaoSanYuan));
    assert!(!patterns.contains(&Pattern::SanYuanKe));
}

#[test]
fn test_robbed_kong_and_flowers() {
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
        (Tile::Wan(7), 1),
        (Tile::Wan(8), 1),
        (Tile::Wan(9), 1),
        (Tile::Tong(1), 1),
        (Tile::Tong(2), 1),
        (Tile::Tong(3), 1),
        (Tile::Wind(Wind::North), 2),
    ]);
    let ctx = ScoreContext {
        robbed_kong: true,
        flower_count: 3,
        seat_wind: Wind::West,
        round_wind: Wind::East,
        ..Default::default()
    };
    let mut checker = WinChecker::new();
    let score = default_engine().calculate(&mut checker, &hand, &[], &ctx);

    let patterns = patterns_of(&score);
    assert!(patterns.contains(&Pattern::QiangGang));
    assert!(patterns.contains(&Pattern::MenQing));
    // 花牌每张一台
    let flower_tai = score
        .patterns
        .iter()
        .find(|(p, _)| *p == Pattern::HuaPai)
        .map(|(_, t)| *t);
    assert_eq!(flower_tai, Some(3));
    // 有花不计平胡
    assert!(!patterns.contains(&Pattern::PingHu));
}

#[test]
fn test_dealer_streak_scales() {
    let hand = hand_of(&[
        (Tile::Wan(2), 3),
        (Tile::Wan(5), 3),
        (Tile::Tong(3), 3),
        (Tile::Tiao(6), 3),
        (Tile::Tong(8), 3),
        (Tile::Tiao(1), 2),
    ]);
    let mut checker = WinChecker::new();
    let engine = default_engine();

    let base_ctx = ScoreContext {
        self_draw: true,
        is_dealer: true,
        ..Default::default()
    };
    let without_streak = engine.calculate(&mut checker, &hand, &[], &base_ctx);

    let streak_ctx = ScoreContext {
        dealer_streak: 3,
        ..base_ctx
    };
    let with_streak = engine.calculate(&mut checker, &hand, &[], &streak_ctx);

    // 连三拉三：多 6 台
    assert_eq!(with_streak.tai, without_streak.tai + 6);
}

#[test]
fn test_thirteen_orphans_scoring() {
    let mut hand = Hand::new();
    for tile in Tile::orphan_kinds() {
        hand.add_tile(tile);
    }
    for tile in [
        Tile::Wan(1),
        Tile::Wan(9),
        Tile::Dragon(Dragon::Red),
        Tile::Wind(Wind::North),
    ] {
        hand.add_tile(tile);
    }
    let mut checker = WinChecker::new();
    let score = default_engine().calculate(
        &mut checker,
        &hand,
        &[],
        &ScoreContext::default(),
    );

    let patterns = patterns_of(&score);
    assert!(patterns.contains(&Pattern::ShiSanYao));
    assert!(!patterns.contains(&Pattern::MenQing));
    assert_eq!(score.tai, 16);
    assert_eq!(score.total, 30 + 16 * 10);
}

#[test]
fn test_deterministic_output() {
    let hand = hand_of(&[
        (Tile::Wan(2), 3),
        (Tile::Wan(5), 3),
        (Tile::Tong(3), 3),
        (Tile::Tiao(6), 3),
        (Tile::Tong(8), 3),
        (Tile::Tiao(1), 2),
    ]);
    let ctx = ScoreContext {
        self_draw: true,
        ..Default::default()
    };
    let engine = default_engine();
    let mut checker = WinChecker::new();
    let first = engine.calculate(&mut checker, &hand, &[], &ctx);
    for _ in 0..10 {
        assert_eq!(engine.calculate(&mut checker, &hand, &[], &ctx), first);
    }
}
