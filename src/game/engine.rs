use std::fmt;

use smallvec::SmallVec;

use crate::game::claim::{ClaimIntent, ClaimKind, ClaimResolver, ClaimWindow, Resolution};
use crate::game::event::Event;
use crate::game::meld::Meld;
use crate::game::rules::RuleConfig;
use crate::game::scoring::{Score, ScoreContext, ScoringEngine};
use crate::game::settlement::Settlement;
use crate::game::state::{DiscardRecord, EndReason, GameState, Phase};
use crate::tile::{Tile, Wall, WinChecker, Wind};

/// 引擎层错误（命令处理器转换为对外错误码）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// 游戏已终局
    GameFinished,
    /// 当前阶段不接受该操作
    WrongPhase,
    /// 不是该座位的回合
    NotYourTurn,
    /// 必须先摸牌
    MustDrawFirst,
    /// 已摸牌，不能重复摸
    AlreadyDrawn,
    /// 手牌中没有该牌
    TileNotInHand,
    /// 抢牌不合法
    InvalidClaim,
    /// 当前没有抢牌窗口
    NoClaimWindow,
    /// 该座位不在应答名单中
    NotAwaitingClaim,
    /// 杠牌条件不满足
    InvalidKong,
    /// 詐胡：胡牌宣告但手牌不成胡
    FalseWin,
    /// 过水：对已放弃的牌种宣告胡牌
    SacredDiscard,
    /// 抢牌窗口已截止，迟到的应答不接受
    ClaimWindowExpired,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            EngineError::GameFinished => "game already finished",
            EngineError::WrongPhase => "operation not allowed in current phase",
            EngineError::NotYourTurn => "not your turn",
            EngineError::MustDrawFirst => "must draw a tile first",
            EngineError::AlreadyDrawn => "already drew this turn",
            EngineError::TileNotInHand => "tile not in hand",
            EngineError::InvalidClaim => "claim is not legal",
            EngineError::NoClaimWindow => "no claim window is open",
            EngineError::NotAwaitingClaim => "seat already responded or is not eligible",
            EngineError::InvalidKong => "kong conditions not met",
            EngineError::FalseWin => "declared win is not a winning hand",
            EngineError::SacredDiscard => "cannot win on a passed tile before next self-draw",
            EngineError::ClaimWindowExpired => "claim window already closed",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for EngineError {}

/// 单局引擎：状态机 + 牌墙 + 判定器的聚合
///
/// 所有变更入口都是确定性的：同一初始种子与同一命令序列
/// 产出逐位一致的状态与事件流
#[derive(Debug, Clone)]
pub struct GameEngine {
    pub state: GameState,
    pub wall: Wall,
    checker: WinChecker,
    scoring: ScoringEngine,
    pub config: RuleConfig,
}

/// 有效手牌数：杠的第 4 张由补牌补回，每组面子按 3 张折算。
/// 16 表示待摸牌，17 表示待出牌
fn effective_count(hand_total: usize, melds: usize) -> usize {
    hand_total + melds * 3
}

impl GameEngine {
    pub fn new(
        game_id: impl Into<String>,
        seed: u64,
        dealer_seat: u8,
        round_wind: Wind,
        dealer_streak: u32,
        config: RuleConfig,
    ) -> Self {
        let mut state = GameState::new(game_id, dealer_seat, round_wind);
        state.consecutive_dealer_count = dealer_streak;
        let scoring = ScoringEngine::new(config.base_score, config.tai_unit);
        Self {
            state,
            wall: Wall::build(seed),
            checker: WinChecker::new(),
            scoring,
            config,
        }
    }

    /// 开局：发牌、补花、轮到庄家
    pub fn start(&mut self, now_ms: u64) -> Result<Vec<Event>, EngineError> {
        if self.state.phase != Phase::Waiting {
            return Err(EngineError::WrongPhase);
        }
        let mut events = vec![Event::GameStarted {
            dealer_seat: self.state.dealer_seat,
            wall_digest: self.wall.digest().to_string(),
        }];

        self.state.phase = Phase::Dealing;
        // 从庄家起每人 16 张，发到花牌立即补花
        for _ in 0..16 {
            for offset in 0..4u8 {
                let seat = (self.state.dealer_seat + offset) % 4;
                let Some(tile) = self.wall.draw() else {
                    return Err(EngineError::WrongPhase);
                };
                let kept = if tile.is_bonus() {
                    match self.resolve_bonus(seat, tile, &mut events) {
                        Some(t) => t,
                        None => {
                            self.finish_draw(EndReason::WallExhausted, &mut events);
                            return Ok(events);
                        }
                    }
                } else {
                    tile
                };
                self.state.player_mut(seat).hand.add_tile(kept);
            }
        }

        log::info!(
            "[ENGINE] game {} dealt, dealer={} digest={}",
            self.state.game_id,
            self.state.dealer_seat,
            self.wall.digest()
        );

        let snapshot = self.state.snapshot();
        let checksum = snapshot.checksum();
        events.push(Event::GameStateSnapshot { snapshot, checksum });

        let dealer = self.state.dealer_seat;
        self.advance_turn(dealer, now_ms, &mut events);
        Ok(events)
    }

    /// 摸牌（当前座位）
    pub fn handle_draw(&mut self, seat: u8, _now_ms: u64) -> Result<Vec<Event>, EngineError> {
        self.ensure_turn(seat)?;
        let player = self.state.player(seat);
        if effective_count(player.hand.total_count(), player.melds.len()) != 16 {
            return Err(EngineError::AlreadyDrawn);
        }

        let mut events = Vec::new();
        let Some(tile) = self.wall.draw() else {
            self.finish_draw(EndReason::WallExhausted, &mut events);
            return Ok(events);
        };

        // 自己摸牌后过水记录失效
        self.state.player_mut(seat).clear_pass_record();

        let kept = if tile.is_bonus() {
            self.state.phase = Phase::FlowerReplacement;
            let replaced = self.resolve_bonus(seat, tile, &mut events);
            self.state.phase = Phase::Playing;
            match replaced {
                Some(t) => t,
                None => {
                    self.finish_draw(EndReason::WallExhausted, &mut events);
                    return Ok(events);
                }
            }
        } else {
            tile
        };

        self.state.player_mut(seat).hand.add_tile(kept);
        self.state.last_drawn = Some(kept);
        self.state.last_draw_from_dead = false;
        events.push(Event::TileDrawn {
            seat,
            tile: kept,
            from_dead_wall: false,
        });
        Ok(events)
    }

    /// 出牌（当前座位），之后视情况开启抢牌窗口或轮转
    pub fn handle_discard(
        &mut self,
        seat: u8,
        tile: Tile,
        now_ms: u64,
    ) -> Result<Vec<Event>, EngineError> {
        self.ensure_turn(seat)?;
        let player = self.state.player(seat);
        if effective_count(player.hand.total_count(), player.melds.len()) != 17 {
            return Err(EngineError::MustDrawFirst);
        }
        if !self.state.player_mut(seat).hand.remove_tile(tile) {
            return Err(EngineError::TileNotInHand);
        }

        let mut events = Vec::new();
        self.apply_discard(seat, tile, now_ms, &mut events);
        Ok(events)
    }

    /// 抢牌应答：吃/碰/杠/胡
    pub fn handle_claim(
        &mut self,
        seat: u8,
        kind: ClaimKind,
        now_ms: u64,
    ) -> Result<Vec<Event>, EngineError> {
        if self.state.is_finished() {
            return Err(EngineError::GameFinished);
        }
        let Some(window) = &self.state.claim_window else {
            return Err(EngineError::NoClaimWindow);
        };
        if window.expired(now_ms) {
            // 迟到的抢牌一律拒绝，窗口关闭交给时钟推进
            return Err(EngineError::ClaimWindowExpired);
        }
        if !window.awaiting.contains(&seat) {
            return Err(EngineError::NotAwaitingClaim);
        }
        let tile = window.tile;
        let discarder = window.discarder;
        let robbing = window.robbing_kong;

        if robbing && kind != ClaimKind::Hu {
            return Err(EngineError::InvalidClaim);
        }
        match kind {
            ClaimKind::Hu => {
                if self.state.player(seat).has_passed_on(tile) {
                    return Err(EngineError::SacredDiscard);
                }
                if !self.winnable_with(seat, tile) {
                    return Err(EngineError::FalseWin);
                }
            }
            ClaimKind::Kong => {
                if !self.state.player(seat).can_kong_from_discard(tile) {
                    return Err(EngineError::InvalidClaim);
                }
            }
            ClaimKind::Pung => {
                if !self.state.player(seat).can_pung(tile) {
                    return Err(EngineError::InvalidClaim);
                }
            }
            ClaimKind::Chow { start } => {
                let next = self.state.next_seat(discarder);
                if seat != next || !self.state.player(seat).chow_options(tile).contains(&start) {
                    return Err(EngineError::InvalidClaim);
                }
            }
        }

        let mut events = Vec::new();
        let still_waiting = match self.state.claim_window.as_mut() {
            Some(w) => w.record_response(seat, Some(ClaimIntent { seat, kind })),
            None => return Err(EngineError::NoClaimWindow),
        };
        if !still_waiting {
            self.resolve_window(now_ms, &mut events);
        }
        Ok(events)
    }

    /// 放弃抢牌；放弃可胡的牌会记入过水
    pub fn handle_pass(&mut self, seat: u8, now_ms: u64) -> Result<Vec<Event>, EngineError> {
        if self.state.is_finished() {
            return Err(EngineError::GameFinished);
        }
        let Some(window) = &self.state.claim_window else {
            return Err(EngineError::NoClaimWindow);
        };
        if window.expired(now_ms) {
            return Err(EngineError::ClaimWindowExpired);
        }
        if !window.awaiting.contains(&seat) {
            return Err(EngineError::NotAwaitingClaim);
        }
        let tile = window.tile;

        if self.winnable_with(seat, tile) {
            self.state.player_mut(seat).record_pass(tile);
            log::debug!("[ENGINE] seat {} passed on winnable {:?}", seat, tile);
        }

        let mut events = Vec::new();
        let still_waiting = match self.state.claim_window.as_mut() {
            Some(w) => w.record_response(seat, None),
            None => return Err(EngineError::NoClaimWindow),
        };
        if !still_waiting {
            self.resolve_window(now_ms, &mut events);
        }
        Ok(events)
    }

    /// 自己回合中的暗杠 / 加杠
    ///
    /// 加杠先开抢杠窗口；无人可抢才立即成杠
    pub fn handle_self_kong(
        &mut self,
        seat: u8,
        tile: Tile,
        now_ms: u64,
    ) -> Result<Vec<Event>, EngineError> {
        self.ensure_turn(seat)?;
        let player = self.state.player(seat);
        if effective_count(player.hand.total_count(), player.melds.len()) != 17 {
            return Err(EngineError::MustDrawFirst);
        }

        let mut events = Vec::new();
        if player.can_concealed_kong(tile) {
            for _ in 0..4 {
                self.state.player_mut(seat).hand.remove_tile(tile);
            }
            let meld = Meld::kong(tile, true, None);
            self.state.player_mut(seat).melds.push(meld.clone());
            events.push(Event::MeldFormed { seat, meld });
            self.after_kong(seat, now_ms, &mut events);
            return Ok(events);
        }

        if player.can_add_kong(tile) {
            // 抢杠窗口：只有能胡该牌且未过水的座位需要应答
            let mut eligible: SmallVec<[u8; 3]> = SmallVec::new();
            for offset in 1..=3u8 {
                let other = (seat + offset) % 4;
                if !self.state.player(other).has_passed_on(tile)
                    && self.winnable_with(other, tile)
                {
                    eligible.push(other);
                }
            }
            if eligible.is_empty() {
                self.state.pending_kong = Some((seat, tile));
                self.complete_pending_kong(now_ms, &mut events);
                return Ok(events);
            }

            let deadline = now_ms + self.config.claim_window_ms;
            self.state.pending_kong = Some((seat, tile));
            self.state.claim_window = Some(ClaimWindow::new(
                tile,
                seat,
                deadline,
                eligible.clone(),
                true,
            ));
            self.state.phase = Phase::ClaimWindow;
            events.push(Event::ClaimWindowOpened {
                tile,
                discarder: seat,
                deadline_ms: deadline,
                eligible: eligible.to_vec(),
                robbing_kong: true,
            });
            return Ok(events);
        }

        Err(EngineError::InvalidKong)
    }

    /// 自摸宣告
    pub fn handle_self_win(&mut self, seat: u8, _now_ms: u64) -> Result<Vec<Event>, EngineError> {
        self.ensure_turn(seat)?;
        let player = self.state.player(seat);
        if effective_count(player.hand.total_count(), player.melds.len()) != 17 {
            return Err(EngineError::MustDrawFirst);
        }
        let melds_count = player.melds.len() as u8;
        let hand = player.hand.clone();
        if !self.checker.is_winning(&hand, melds_count) {
            return Err(EngineError::FalseWin);
        }

        let mut ctx = self.make_ctx(seat);
        ctx.self_draw = true;
        ctx.from_dead_wall = self.state.last_draw_from_dead;
        ctx.is_last_live_tile =
            self.wall.remaining_count() == 0 && !self.state.last_draw_from_dead;
        ctx.turn = self.state.turn;

        let melds = self.state.player(seat).melds.clone();
        let score = self.scoring.calculate(&mut self.checker, &hand, &melds, &ctx);
        let settlement = Settlement::self_draw_win(seat, &score);

        let mut events = Vec::new();
        self.finish_with_win(vec![seat], vec![(seat, score)], settlement, &mut events);
        Ok(events)
    }

    /// 时钟推进：抢牌窗口超时、回合超时兜底
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state.is_finished() {
            return events;
        }

        // 抢牌窗口超时：未应答者按放弃处理（可胡者记过水）
        let expired_window = self
            .state
            .claim_window
            .as_ref()
            .filter(|w| w.expired(now_ms))
            .map(|w| (w.tile, w.awaiting.clone()));
        if let Some((tile, awaiting)) = expired_window {
            for seat in awaiting {
                if self.winnable_with(seat, tile) {
                    self.state.player_mut(seat).record_pass(tile);
                }
            }
            if let Some(w) = self.state.claim_window.as_mut() {
                w.awaiting.clear();
            }
            log::debug!("[ENGINE] claim window on {:?} expired", tile);
            self.resolve_window(now_ms, &mut events);
            return events;
        }

        // 回合超时（含断线宽限期到期）：兜底出牌
        if self.state.phase == Phase::Playing {
            let timed_out = self
                .state
                .turn_deadline_ms
                .map(|d| now_ms >= d)
                .unwrap_or(false);
            if timed_out {
                self.state.paused_turn_remaining_ms = None;
                self.fallback_turn(now_ms, &mut events);
            }
        }
        events
    }

    /// 断线上报：记录次数，当前回合进入宽限期（未被取消时）
    pub fn handle_disconnect(&mut self, seat: u8, now_ms: u64) {
        let revoked = self
            .state
            .player_mut(seat)
            .record_disconnect(self.config.disconnect_threshold);
        log::info!(
            "[ENGINE] seat {} disconnected (count={}, grace_revoked={})",
            seat,
            self.state.player(seat).disconnect_count,
            revoked
        );
        if revoked || seat != self.state.current_seat || self.state.phase != Phase::Playing {
            return;
        }
        if let Some(deadline) = self.state.turn_deadline_ms {
            self.state.paused_turn_remaining_ms = Some(deadline.saturating_sub(now_ms));
            self.state.turn_deadline_ms = Some(now_ms + self.config.grace_period_ms);
        }
    }

    /// 重连：恢复被暂停的回合计时
    pub fn handle_reconnect(&mut self, seat: u8, now_ms: u64) {
        self.state.player_mut(seat).mark_reconnected();
        if seat == self.state.current_seat {
            if let Some(remaining) = self.state.paused_turn_remaining_ms.take() {
                self.state.turn_deadline_ms = Some(now_ms + remaining);
            }
        }
    }

    /// 判定器（测试与复盘工具用）
    pub fn checker_mut(&mut self) -> &mut WinChecker {
        &mut self.checker
    }

    // ---- 内部状态迁移 ----

    fn ensure_turn(&self, seat: u8) -> Result<(), EngineError> {
        if self.state.is_finished() {
            return Err(EngineError::GameFinished);
        }
        if self.state.phase != Phase::Playing {
            return Err(EngineError::WrongPhase);
        }
        if seat != self.state.current_seat {
            return Err(EngineError::NotYourTurn);
        }
        Ok(())
    }

    /// 加上一张牌后是否成胡
    fn winnable_with(&mut self, seat: u8, tile: Tile) -> bool {
        let player = self.state.player(seat);
        let mut hand = player.hand.clone();
        let melds_count = player.melds.len() as u8;
        hand.add_tile(tile) && self.checker.is_winning(&hand, melds_count)
    }

    /// 花牌连锁补牌：从牌尾补到非花为止；牌尾摸空返回 None
    fn resolve_bonus(&mut self, seat: u8, first: Tile, events: &mut Vec<Event>) -> Option<Tile> {
        let mut flower = first;
        loop {
            self.state.player_mut(seat).add_flower(flower);
            let next = self.wall.draw_from_dead()?;
            events.push(Event::FlowerReplaced {
                seat,
                flower,
                replacement: next,
            });
            if next.is_bonus() {
                flower = next;
            } else {
                return Some(next);
            }
        }
    }

    /// 出牌后的公共路径：河记录、四风流局检查、开窗或轮转
    fn apply_discard(&mut self, seat: u8, tile: Tile, now_ms: u64, events: &mut Vec<Event>) {
        self.state.discards.push(DiscardRecord {
            seat,
            tile,
            turn: self.state.turn,
        });
        self.state.turn += 1;
        self.state.last_discard = Some((seat, tile));
        self.state.last_drawn = None;
        events.push(Event::TileDiscarded { seat, tile });

        // 开局四风连打：前四张弃牌为同一风牌且无人抢牌
        if self.config.four_wind_draw
            && self.state.discards.len() == 4
            && self.state.players.iter().all(|p| p.melds.is_empty())
        {
            let first = self.state.discards[0].tile;
            let all_same_wind = matches!(first, Tile::Wind(_))
                && self.state.discards.iter().all(|d| d.tile == first);
            if all_same_wind {
                self.finish_draw(EndReason::FourWindDiscards, events);
                return;
            }
        }

        let eligible = self.eligible_claims(tile, seat);
        if eligible.is_empty() {
            let next = self.state.next_seat(seat);
            self.advance_turn(next, now_ms, events);
            return;
        }

        let deadline = now_ms + self.config.claim_window_ms;
        self.state.claim_window = Some(ClaimWindow::new(
            tile,
            seat,
            deadline,
            eligible.clone(),
            false,
        ));
        self.state.phase = Phase::ClaimWindow;
        events.push(Event::ClaimWindowOpened {
            tile,
            discarder: seat,
            deadline_ms: deadline,
            eligible: eligible.to_vec(),
            robbing_kong: false,
        });
    }

    /// 有合法抢牌动作的座位（胡需排除过水）
    fn eligible_claims(&mut self, tile: Tile, discarder: u8) -> SmallVec<[u8; 3]> {
        let next = self.state.next_seat(discarder);
        let mut eligible: SmallVec<[u8; 3]> = SmallVec::new();
        for offset in 1..=3u8 {
            let seat = (discarder + offset) % 4;
            let can_hu =
                !self.state.player(seat).has_passed_on(tile) && self.winnable_with(seat, tile);
            let player = self.state.player(seat);
            let can_meld = player.can_kong_from_discard(tile)
                || player.can_pung(tile)
                || (seat == next && !player.chow_options(tile).is_empty());
            if can_hu || can_meld {
                eligible.push(seat);
            }
        }
        eligible
    }

    /// 关闭窗口并仲裁
    fn resolve_window(&mut self, now_ms: u64, events: &mut Vec<Event>) {
        let Some(window) = self.state.claim_window.take() else {
            return;
        };
        let resolution = ClaimResolver::resolve(&window.pending, window.tile, window.discarder);
        match resolution {
            Resolution::Wins(winners) => {
                self.settle_discard_wins(&window, &winners, events);
            }
            Resolution::Meld(intent) => {
                // 被抢走的弃牌离开牌河
                self.state.discards.pop();
                self.apply_meld_claim(intent, window.tile, window.discarder, now_ms, events);
            }
            Resolution::NoClaim => {
                if window.robbing_kong {
                    self.complete_pending_kong(now_ms, events);
                } else {
                    let next = self.state.next_seat(window.discarder);
                    self.advance_turn(next, now_ms, events);
                }
            }
        }
    }

    /// 荣和 / 抢杠结算（可一炮多响）
    fn settle_discard_wins(&mut self, window: &ClaimWindow, winners: &[u8], events: &mut Vec<Event>) {
        let robbed = window.robbing_kong;
        if robbed {
            self.state.pending_kong = None;
        }
        let win_on_last = !robbed && self.wall.remaining_count() == 0;

        let mut scores: Vec<(u8, Score)> = Vec::with_capacity(winners.len());
        for &seat in winners {
            let player = self.state.player(seat);
            let mut hand = player.hand.clone();
            hand.add_tile(window.tile);
            let melds = player.melds.clone();

            let mut ctx = self.make_ctx(seat);
            ctx.robbed_kong = robbed;
            ctx.win_on_last_discard = win_on_last;
            let score = self.scoring.calculate(&mut self.checker, &hand, &melds, &ctx);
            scores.push((seat, score));
        }

        let score_refs: Vec<(u8, &Score)> = scores.iter().map(|(s, sc)| (*s, sc)).collect();
        let settlement = Settlement::discard_win(&score_refs, window.discarder);
        self.finish_with_win(winners.to_vec(), scores, settlement, events);
    }

    /// 吃 / 碰 / 直杠成立
    fn apply_meld_claim(
        &mut self,
        intent: ClaimIntent,
        tile: Tile,
        discarder: u8,
        now_ms: u64,
        events: &mut Vec<Event>,
    ) {
        let seat = intent.seat;
        match intent.kind {
            ClaimKind::Kong => {
                for _ in 0..3 {
                    self.state.player_mut(seat).hand.remove_tile(tile);
                }
                let meld = Meld::kong(tile, false, Some(discarder));
                self.state.player_mut(seat).melds.push(meld.clone());
                events.push(Event::MeldFormed { seat, meld });
                self.state.current_seat = seat;
                self.after_kong(seat, now_ms, events);
            }
            ClaimKind::Pung => {
                for _ in 0..2 {
                    self.state.player_mut(seat).hand.remove_tile(tile);
                }
                let meld = Meld::pung(tile, discarder);
                self.state.player_mut(seat).melds.push(meld.clone());
                events.push(Event::MeldFormed { seat, meld });
                self.take_turn_without_draw(seat, now_ms, events);
            }
            ClaimKind::Chow { start } => {
                let Some(meld) = Meld::chow(start, discarder) else {
                    // 仲裁前已验证；防御性回退到轮转
                    let next = self.state.next_seat(discarder);
                    self.advance_turn(next, now_ms, events);
                    return;
                };
                let mut skipped_claimed = false;
                for t in &meld.tiles {
                    if *t == tile && !skipped_claimed {
                        skipped_claimed = true;
                        continue;
                    }
                    self.state.player_mut(seat).hand.remove_tile(*t);
                }
                self.state.player_mut(seat).melds.push(meld.clone());
                events.push(Event::MeldFormed { seat, meld });
                self.take_turn_without_draw(seat, now_ms, events);
            }
            ClaimKind::Hu => {}
        }
    }

    /// 无人抢杠：完成加杠
    fn complete_pending_kong(&mut self, now_ms: u64, events: &mut Vec<Event>) {
        let Some((seat, tile)) = self.state.pending_kong.take() else {
            return;
        };
        self.state.player_mut(seat).hand.remove_tile(tile);
        let player = self.state.player_mut(seat);
        if let Some(meld) = player.melds.iter_mut().find(|m| m.is_triplet_of(tile)) {
            meld.upgrade_to_kong(tile);
            let formed = meld.clone();
            events.push(Event::MeldFormed { seat, meld: formed });
        }
        self.state.current_seat = seat;
        self.after_kong(seat, now_ms, events);
    }

    /// 杠成立后的公共路径：计数、四杠流局检查、牌尾补牌
    fn after_kong(&mut self, seat: u8, now_ms: u64, events: &mut Vec<Event>) {
        self.state.kong_count += 1;
        if self.four_kong_draw_triggered() {
            self.finish_draw(EndReason::FourKongs, events);
            return;
        }

        let Some(tile) = self.wall.draw_from_dead() else {
            self.finish_draw(EndReason::WallExhausted, events);
            return;
        };
        // 补牌也是摸牌：过水记录失效
        self.state.player_mut(seat).clear_pass_record();
        let kept = if tile.is_bonus() {
            self.state.phase = Phase::FlowerReplacement;
            let replaced = self.resolve_bonus(seat, tile, events);
            self.state.phase = Phase::Playing;
            match replaced {
                Some(t) => t,
                None => {
                    self.finish_draw(EndReason::WallExhausted, events);
                    return;
                }
            }
        } else {
            tile
        };
        self.state.player_mut(seat).hand.add_tile(kept);
        self.state.last_drawn = Some(kept);
        self.state.last_draw_from_dead = true;
        events.push(Event::TileDrawn {
            seat,
            tile: kept,
            from_dead_wall: true,
        });

        self.state.phase = Phase::Playing;
        let deadline = now_ms + self.config.turn_timeout_ms;
        self.state.turn_deadline_ms = Some(deadline);
        events.push(Event::TurnChanged {
            seat,
            deadline_ms: deadline,
        });
    }

    /// 四杠流局：四组杠分属两家以上
    fn four_kong_draw_triggered(&self) -> bool {
        if !self.config.four_kong_draw || self.state.kong_count < 4 {
            return false;
        }
        let seats_with_kong = self
            .state
            .players
            .iter()
            .filter(|p| p.melds.iter().any(|m| m.tile_count() == 4))
            .count();
        seats_with_kong >= 2
    }

    /// 吃/碰后轮到自己：不摸牌直接待出牌
    fn take_turn_without_draw(&mut self, seat: u8, now_ms: u64, events: &mut Vec<Event>) {
        self.state.current_seat = seat;
        self.state.phase = Phase::Playing;
        self.state.last_drawn = None;
        let deadline = now_ms + self.config.turn_timeout_ms;
        self.state.turn_deadline_ms = Some(deadline);
        events.push(Event::TurnChanged {
            seat,
            deadline_ms: deadline,
        });
    }

    fn advance_turn(&mut self, seat: u8, now_ms: u64, events: &mut Vec<Event>) {
        self.state.current_seat = seat;
        self.state.phase = Phase::Playing;
        let deadline = now_ms + self.config.turn_timeout_ms;
        self.state.turn_deadline_ms = Some(deadline);
        events.push(Event::TurnChanged {
            seat,
            deadline_ms: deadline,
        });
    }

    /// 回合超时兜底：未摸则代摸，然后打出刚摸的牌（无摸牌时打最小牌）
    fn fallback_turn(&mut self, now_ms: u64, events: &mut Vec<Event>) {
        let seat = self.state.current_seat;
        log::info!("[ENGINE] seat {} turn timed out, auto-playing", seat);

        let player = self.state.player(seat);
        if effective_count(player.hand.total_count(), player.melds.len()) == 16 {
            match self.handle_draw(seat, now_ms) {
                Ok(drawn_events) => events.extend(drawn_events),
                Err(_) => return,
            }
            if self.state.is_finished() {
                return;
            }
        }

        let tile = match self.state.last_drawn {
            Some(t) => t,
            None => match self.state.player(seat).hand.to_sorted_vec().first() {
                Some(t) => *t,
                None => return,
            },
        };
        self.state.player_mut(seat).hand.remove_tile(tile);
        self.apply_discard(seat, tile, now_ms, events);
    }

    fn make_ctx(&self, seat: u8) -> ScoreContext {
        let player = self.state.player(seat);
        ScoreContext {
            seat_wind: player.seat_wind(self.state.dealer_seat),
            round_wind: self.state.round_wind,
            is_dealer: seat == self.state.dealer_seat,
            dealer_streak: self.state.consecutive_dealer_count,
            flower_count: player.flowers.len() as u32,
            ..ScoreContext::default()
        }
    }

    fn finish_with_win(
        &mut self,
        winners: Vec<u8>,
        scores: Vec<(u8, Score)>,
        settlement: Settlement,
        events: &mut Vec<Event>,
    ) {
        let dealer_retained = winners.contains(&self.state.dealer_seat);
        let reason = EndReason::Won { winners };
        log::info!(
            "[ENGINE] game {} finished: {:?}, dealer_retained={}",
            self.state.game_id,
            reason,
            dealer_retained
        );
        self.state.end_reason = Some(reason.clone());
        self.state.phase = Phase::Finished;
        self.state.claim_window = None;
        self.state.pending_kong = None;
        self.state.turn_deadline_ms = None;
        events.push(Event::GameFinished {
            reason,
            scores,
            settlement,
            dealer_retained,
        });
    }

    /// 流局终局：庄家连庄
    fn finish_draw(&mut self, reason: EndReason, events: &mut Vec<Event>) {
        log::info!(
            "[ENGINE] game {} finished in draw: {:?}",
            self.state.game_id,
            reason
        );
        self.state.end_reason = Some(reason.clone());
        self.state.phase = Phase::Finished;
        self.state.claim_window = None;
        self.state.pending_kong = None;
        self.state.turn_deadline_ms = None;
        events.push(Event::GameFinished {
            reason,
            scores: Vec::new(),
            settlement: Settlement::default(),
            dealer_retained: true,
        });
    }
}
