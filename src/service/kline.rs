//! K 线序列合并
//!
//! 序列按时间倒序存放，下标 0 是尚未收盘的当前 K 线。实时增量与头部
//! 时间戳相同则原地覆盖 OHLCV（当前 K 线仍在形成）；时间戳不同则头插
//! 新 K 线（上一根已收盘），超出上限时从尾部淘汰最旧的一根。

use crate::types::KLine;

/// 每个 (symbol, period) 序列的最大长度
pub const KLINE_SERIES_CAP: usize = 1000;

/// 合并一批实时增量
pub fn merge_ticks(series: &mut Vec<KLine>, ticks: Vec<KLine>, cap: usize) {
    for tick in ticks {
        merge_tick(series, tick, cap);
    }
}

fn merge_tick(series: &mut Vec<KLine>, tick: KLine, cap: usize) {
    match series.first_mut() {
        Some(head) if head.timestamp == tick.timestamp => {
            head.open = tick.open;
            head.high = tick.high;
            head.low = tick.low;
            head.close = tick.close;
            head.volume = tick.volume;
        }
        _ => {
            series.insert(0, tick);
            if series.len() > cap {
                series.pop();
            }
        }
    }
}
