use serde::{Deserialize, Serialize};

/// 规则配置
///
/// 注入引擎构造，不使用全局可变状态；时间相关项配合注入时钟，
/// 测试可用虚拟时钟缩短窗口
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// 抢牌窗口时长（毫秒）
    pub claim_window_ms: u64,
    /// 回合超时（毫秒），超时自动执行兜底出牌
    pub turn_timeout_ms: u64,
    /// 断线宽限期（毫秒），期间回合计时暂停
    pub grace_period_ms: u64,
    /// 单局断线次数阈值，超过后取消宽限期
    pub disconnect_threshold: u8,
    /// 底分
    pub base_score: u32,
    /// 每台分值
    pub tai_unit: u32,
    /// 是否启用四杠流局
    pub four_kong_draw: bool,
    /// 是否启用开局四风连打流局
    pub four_wind_draw: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            claim_window_ms: 2500,
            turn_timeout_ms: 15_000,
            grace_period_ms: 30_000,
            disconnect_threshold: 3,
            base_score: 30,
            tai_unit: 10,
            four_kong_draw: true,
            four_wind_draw: true,
        }
    }
}
