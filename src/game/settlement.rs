use serde::{Deserialize, Serialize};

use crate::game::scoring::Score;

/// 单笔赔付
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub from: u8,
    pub to: u8,
    pub amount: i64,
}

/// 一局的赔付结算
///
/// 付款规则（见 DESIGN.md 的开放问题决议）：
/// - 放炮：放炮者对每位胡牌者全额赔付（一炮多响按人数分别付）
/// - 自摸：三家各付全额
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settlement {
    pub payments: Vec<Payment>,
}

impl Settlement {
    /// 放炮胡结算（可多个胡牌者）
    pub fn discard_win(winners: &[(u8, &Score)], discarder: u8) -> Self {
        let payments = winners
            .iter()
            .map(|&(seat, score)| Payment {
                from: discarder,
                to: seat,
                amount: score.total as i64,
            })
            .collect();
        Self { payments }
    }

    /// 自摸结算：三家各付全额
    pub fn self_draw_win(winner: u8, score: &Score) -> Self {
        let payments = (0..4u8)
            .filter(|&seat| seat != winner)
            .map(|seat| Payment {
                from: seat,
                to: winner,
                amount: score.total as i64,
            })
            .collect();
        Self { payments }
    }

    /// 各座位的净变动（正为收入），守恒检查与对账用
    pub fn net_deltas(&self) -> [i64; 4] {
        let mut deltas = [0i64; 4];
        for payment in &self.payments {
            deltas[payment.from as usize] -= payment.amount;
            deltas[payment.to as usize] += payment.amount;
        }
        deltas
    }
}
