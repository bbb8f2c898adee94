//! 抢牌集成测试：优先级仲裁、一炮多响、抢杠与过水

use twmj_engine::tile::{Hand, Tile, Wind};
use twmj_engine::{
    ClaimKind, EndReason, EngineError, GameEngine, Meld, Pattern, Phase, RuleConfig,
};

fn tiles(specs: &[(Tile, u8)]) -> Vec<Tile> {
    let mut out = Vec::new();
    for &(tile, n) in specs {
        for _ in 0..n {
            out.push(tile);
        }
    }
    out
}

/// 不可能胡牌的 16 张散牌（字牌单张 + 断开的数牌）
fn junk_16() -> Vec<Tile> {
    tiles(&[
        (Tile::Wan(1), 1),
        (Tile::Wan(4), 1),
        (Tile::Wan(7), 1),
        (Tile::Tong(1), 1),
        (Tile::Tong(4), 1),
        (Tile::Tong(7), 1),
        (Tile::Tiao(1), 1),
        (Tile::Tiao(4), 1),
        (Tile::Tiao(7), 1),
        (Tile::Wind(Wind::East), 1),
        (Tile::Wind(Wind::South), 1),
        (Tile::Wind(Wind::West), 1),
        (Tile::Wind(Wind::North), 1),
        (Tile::Dragon(twmj_engine::tile::Dragon::Red), 1),
        (Tile::Dragon(twmj_engine::tile::Dragon::Green), 1),
        (Tile::Dragon(twmj_engine::tile::Dragon::White), 1),
    ])
}

/// 手工布置局面：跳过发牌，直接设定各家手牌
fn crafted_engine(hands: [Vec<Tile>; 4]) -> GameEngine {
    let mut engine = GameEngine::new("t", 1, 0, Wind::East, 0, RuleConfig::default());
    for (seat, hand_tiles) in hands.into_iter().enumerate() {
        engine.state.players[seat].hand = Hand::from_tiles(&hand_tiles);
    }
    engine.state.phase = Phase::Playing;
    engine.state.current_seat = 0;
    engine
}

/// 四组完整面子 + 将（12 + 2 = 14 张），留两张听牌位
fn four_groups_and_pair() -> Vec<Tile> {
    tiles(&[
        (Tile::Tong(1), 1),
        (Tile::Tong(2), 1),
        (Tile::Tong(3), 1),
        (Tile::Tong(4), 1),
        (Tile::Tong(5), 1),
        (Tile::Tong(6), 1),
        (Tile::Tiao(1), 1),
        (Tile::Tiao(2), 1),
        (Tile::Tiao(3), 1),
        (Tile::Tiao(4), 1),
        (Tile::Tiao(5), 1),
        (Tile::Tiao(6), 1),
        (Tile::Tong(9), 2),
    ])
}

#[test]
fn test_pung_beats_chow_in_full_flow() {
    let mut seat0 = junk_16();
    seat0.push(Tile::Wan(5));
    let mut seat1 = junk_16();
    seat1[0] = Tile::Wan(3);
    seat1[1] = Tile::Wan(4) /* 等吃 5 万 */;
    let mut seat3 = junk_16();
    seat3[0] = Tile::Wan(5);
    seat3[1] = Tile::Wan(5);

    let mut engine = crafted_engine([seat0, seat1, junk_16(), seat3]);
    engine.handle_discard(0, Tile::Wan(5), 0).unwrap();
    assert_eq!(engine.state.phase, Phase::ClaimWindow);

    engine
        .handle_claim(1, ClaimKind::Chow { start: Tile::Wan(3) }, 10)
        .unwrap();
    engine.handle_claim(3, ClaimKind::Pung, 20).unwrap();

    // 碰压过吃：轮到座位 3 出牌
    assert_eq!(engine.state.current_seat, 3);
    assert_eq!(engine.state.phase, Phase::Playing);
    let player3 = engine.state.player(3);
    assert_eq!(player3.melds.len(), 1);
    assert!(player3.melds[0].is_triplet_of(Tile::Wan(5)));
    // 被碰走的牌离开牌河
    assert!(engine.state.discards.is_empty());
}

#[test]
fn test_multi_winner_discard() {
    // 座位 1 和 3 都听 9 万：一炮多响，放炮者分别赔付
    let mut seat0 = junk_16();
    seat0.push(Tile::Wan(9));
    let mut waiting = four_groups_and_pair();
    waiting.push(Tile::Wan(7));
    waiting.push(Tile::Wan(8));
    let mut waiting3 = tiles(&[
        (Tile::Wan(1), 1),
        (Tile::Wan(2), 1),
        (Tile::Wan(3), 1),
        (Tile::Tong(7), 3),
        (Tile::Tiao(7), 3),
        (Tile::Tiao(8), 3),
        (Tile::Wind(Wind::East), 2),
    ]);
    waiting3.push(Tile::Wan(7));
    waiting3.push(Tile::Wan(8));

    let mut engine = crafted_engine([seat0, waiting, junk_16(), waiting3]);
    engine.handle_discard(0, Tile::Wan(9), 0).unwrap();

    engine.handle_claim(1, ClaimKind::Hu, 10).unwrap();
    let events = engine.handle_claim(3, ClaimKind::Hu, 20).unwrap();

    assert!(engine.state.is_finished());
    assert_eq!(
        engine.state.end_reason,
        Some(EndReason::Won { winners: vec![1, 3] })
    );
    // 结算事件：座位 0 给两家分别全额赔付
    let settlement = events.iter().find_map(|e| match e {
        twmj_engine::Event::GameFinished { settlement, .. } => Some(settlement.clone()),
        _ => None,
    });
    let deltas = settlement.expect("settlement in finish event").net_deltas();
    assert!(deltas[0] < 0);
    assert!(deltas[1] > 0);
    assert!(deltas[3] > 0);
    assert_eq!(deltas[2], 0);
    assert_eq!(deltas.iter().sum::<i64>(), 0);
}

#[test]
fn test_robbing_kong() {
    // 座位 0 加杠 5 万，座位 2 抢杠胡
    // 碰在桌上折算 3 张：手牌 13 散牌 + 第 4 张 5 万 = 有效 17
    let mut seat0 = junk_16();
    seat0.truncate(13);
    seat0.push(Tile::Wan(5));

    let mut waiting = four_groups_and_pair();
    waiting.push(Tile::Wan(3));
    waiting.push(Tile::Wan(4));

    let mut engine = crafted_engine([seat0, junk_16(), waiting, junk_16()]);
    engine.state.players[0]
        .melds
        .push(Meld::pung(Tile::Wan(5), 1));

    let events = engine.handle_self_kong(0, Tile::Wan(5), 0).unwrap();
    assert_eq!(engine.state.phase, Phase::ClaimWindow);
    assert!(events.iter().any(|e| matches!(
        e,
        twmj_engine::Event::ClaimWindowOpened { robbing_kong: true, .. }
    )));

    let finish = engine.handle_claim(2, ClaimKind::Hu, 10).unwrap();
    assert!(engine.state.is_finished());

    // 抢杠台计入
    let scores = finish.iter().find_map(|e| match e {
        twmj_engine::Event::GameFinished { scores, .. } => Some(scores.clone()),
        _ => None,
    });
    let (winner, score) = &scores.expect("scores present")[0];
    assert_eq!(*winner, 2);
    assert!(score.patterns.iter().any(|(p, _)| *p == Pattern::QiangGang));
}

#[test]
fn test_robbing_kong_completes_when_unclaimed() {
    let mut seat0 = junk_16();
    seat0.truncate(13);
    seat0.push(Tile::Wan(5));

    let mut waiting = four_groups_and_pair();
    waiting.push(Tile::Wan(3));
    waiting.push(Tile::Wan(4));

    let mut engine = crafted_engine([seat0, junk_16(), waiting, junk_16()]);
    engine.state.players[0]
        .melds
        .push(Meld::pung(Tile::Wan(5), 1));

    engine.handle_self_kong(0, Tile::Wan(5), 0).unwrap();
    engine.handle_pass(2, 10).unwrap();

    // 无人抢：加杠成立并补牌
    assert_eq!(engine.state.phase, Phase::Playing);
    assert_eq!(engine.state.current_seat, 0);
    let meld = &engine.state.player(0).melds[0];
    assert_eq!(meld.tile_count(), 4);
    assert_eq!(engine.state.kong_count, 1);
    assert!(engine.state.last_draw_from_dead);
}

#[test]
fn test_sacred_discard_lifecycle() {
    // 座位 2 听 5 万且握两张 5 万（可碰）；过水后再荣和被拒，摸牌后恢复
    let mut seat0 = junk_16();
    seat0.push(Tile::Wan(5));
    let mut seat1 = junk_16();
    seat1[0] = Tile::Wan(5);
    let mut waiting = four_groups_and_pair();
    // 将改为 5 万对，听 5 万单骑碰/胡两用
    waiting.retain(|t| *t != Tile::Tong(9));
    waiting.push(Tile::Wan(5));
    waiting.push(Tile::Wan(5));
    waiting.push(Tile::Wan(3));
    waiting.push(Tile::Wan(4));

    let mut engine = crafted_engine([seat0, seat1, waiting, junk_16()]);

    // 第一张 5 万：座位 2 选择过
    engine.handle_discard(0, Tile::Wan(5), 0).unwrap();
    engine.handle_pass(2, 10).unwrap();
    assert!(engine.state.player(2).has_passed_on(Tile::Wan(5)));

    // 座位 1 摸牌后打出第二张 5 万
    engine.handle_draw(1, 20).unwrap();
    engine.handle_discard(1, Tile::Wan(5), 30).unwrap();
    assert_eq!(engine.state.phase, Phase::ClaimWindow);

    // 过水期间荣和被拒
    assert_eq!(
        engine.handle_claim(2, ClaimKind::Hu, 40),
        Err(EngineError::SacredDiscard)
    );
    // 碰仍然合法
    engine.handle_claim(2, ClaimKind::Pung, 50).unwrap();
    assert_eq!(engine.state.current_seat, 2);

    // 碰牌不清过水：要到自己摸牌才恢复
    let discard = engine.state.player(2).hand.to_sorted_vec()[0];
    engine.handle_discard(2, discard, 60).unwrap();
    assert!(engine.state.player(2).has_passed_on(Tile::Wan(5)));
}

#[test]
fn test_claim_validation_rejects_illegal() {
    let mut seat0 = junk_16();
    seat0.push(Tile::Wan(5));
    let mut seat3 = junk_16();
    seat3[0] = Tile::Wan(5);
    seat3[1] = Tile::Wan(5);

    let mut engine = crafted_engine([seat0, junk_16(), junk_16(), seat3]);
    engine.handle_discard(0, Tile::Wan(5), 0).unwrap();

    // 座位 2 无任何合法动作，不在应答名单
    assert_eq!(
        engine.handle_claim(2, ClaimKind::Pung, 10),
        Err(EngineError::NotAwaitingClaim)
    );
    // 座位 3 诈胡被拒
    assert_eq!(
        engine.handle_claim(3, ClaimKind::Hu, 10),
        Err(EngineError::FalseWin)
    );
    // 非下家不能吃
    assert_eq!(
        engine.handle_claim(3, ClaimKind::Chow { start: Tile::Wan(3) }, 10),
        Err(EngineError::InvalidClaim)
    );
    // 合法碰
    engine.handle_claim(3, ClaimKind::Pung, 20).unwrap();
    assert_eq!(engine.state.current_seat, 3);
}

#[test]
fn test_late_claim_rejected_after_deadline() {
    let mut seat0 = junk_16();
    seat0.push(Tile::Wan(5));
    let mut seat3 = junk_16();
    seat3[0] = Tile::Wan(5);
    seat3[1] = Tile::Wan(5);

    let mut engine = crafted_engine([seat0, junk_16(), junk_16(), seat3]);
    engine.handle_discard(0, Tile::Wan(5), 0).unwrap();
    assert_eq!(engine.state.phase, Phase::ClaimWindow);

    // 截止之后的应答一律拒绝，碰/过都不例外
    let deadline = RuleConfig::default().claim_window_ms;
    assert_eq!(
        engine.handle_claim(3, ClaimKind::Pung, 999_999),
        Err(EngineError::ClaimWindowExpired)
    );
    assert_eq!(
        engine.handle_pass(3, deadline),
        Err(EngineError::ClaimWindowExpired)
    );
    // 迟到应答没有推进任何状态
    assert_eq!(engine.state.phase, Phase::ClaimWindow);
    assert!(engine.state.player(3).melds.is_empty());

    // 窗口由时钟推进关闭：无人应答视为放弃，轮转下家
    engine.tick(deadline + 1);
    assert_eq!(engine.state.phase, Phase::Playing);
    assert_eq!(engine.state.current_seat, 1);
}
