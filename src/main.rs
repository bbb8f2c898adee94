/// 可执行文件入口（本地调试：跑一局固定种子的自动对局）

use std::io::Write;
use std::sync::Arc;

use twmj_engine::{
    Clock, Event, GameEngine, RuleConfig, SystemClock, VirtualClock, Wind,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(buf, "[{}] {}", record.level(), record.args())
        })
        .init();

    let seed = SystemClock.now_ms();
    println!("台湾十六张麻将引擎：种子 {} 自动对局", seed);

    let clock = VirtualClock::new(0);
    let config = RuleConfig::default();
    let timeout = config.turn_timeout_ms;
    let mut engine = GameEngine::new("demo", seed, 0, Wind::East, 0, config);

    let events = match engine.start(clock.now_ms()) {
        Ok(events) => events,
        Err(err) => {
            eprintln!("开局失败: {}", err);
            return;
        }
    };
    if let Some(Event::GameStarted { wall_digest, .. }) = events.first() {
        println!("牌墙摘要: {}", wall_digest);
    }

    // 全员超时兜底推进到终局
    let mut ticks = 0u32;
    while !engine.state.is_finished() && ticks < 4000 {
        clock.advance(timeout + 1);
        for event in engine.tick(clock.now_ms()) {
            match event {
                Event::TileDiscarded { seat, tile } => {
                    log::debug!("座位 {} 打出 {:?}", seat, tile)
                }
                Event::GameFinished {
                    reason,
                    settlement,
                    dealer_retained,
                    ..
                } => {
                    println!("终局: {:?}", reason);
                    println!("结算: {:?}", settlement.net_deltas());
                    println!("连庄: {}", dealer_retained);
                }
                _ => {}
            }
        }
        ticks += 1;
    }

    let snapshot = engine.state.snapshot();
    println!(
        "共 {} 轮出牌，快照校验和 {}",
        snapshot.turn,
        snapshot.checksum()
    );
}
