//! BingX 数据转换
//!
//! 纯函数：原生形状 → 归一化模型。无 I/O、无状态。
//! 空输入返回空输出，缺失余额返回零值默认，坏数字解析为 0.0。

use crate::connectors::bingx::dto::*;
use crate::types::{
    Balance, Contract, ContractStatus, KLine, Position, PositionSide, Trade, TradeSide,
    Transaction,
};
use crate::utils::{parse_f64, parse_time_ms};

/// 符号归一化：去掉分隔符（"BTC-USDT" → "BTCUSDT"）
pub fn parse_symbol(symbol: &str) -> String {
    symbol.replace('-', "")
}

pub fn transactions_transform(transactions: &[BingxTransaction]) -> Vec<Transaction> {
    transactions
        .iter()
        .map(|tx| Transaction {
            symbol: parse_symbol(&tx.symbol),
            income_type: tx.income_type.clone(),
            income: parse_f64(&tx.income),
            asset: tx.asset.clone(),
            info: tx.info.clone(),
            time: tx.time,
            tran_id: tx.tran_id.clone(),
            trade_id: tx.trade_id.clone(),
        })
        .collect()
}

pub fn trades_transform(trades: &[BingxTrade]) -> Vec<Trade> {
    trades
        .iter()
        .map(|trade| Trade {
            symbol: parse_symbol(&trade.symbol),
            qty: parse_f64(&trade.qty),
            price: parse_f64(&trade.price),
            quote_qty: parse_f64(&trade.quote_qty),
            commission: parse_f64(&trade.commission),
            commission_asset: trade.commission_asset.clone(),
            order_id: trade.order_id.clone(),
            trade_id: trade.trade_id.clone(),
            filled_time: parse_time_ms(&trade.filled_time),
            side: TradeSide::parse(&trade.side),
            position_side: trade.position_side.clone(),
            role: trade.role.clone(),
            total: trade.total,
            realised_pnl: parse_f64(&trade.realised_pnl),
        })
        .collect()
}

pub fn balance_transform(balance: Option<&BingxBalance>) -> Balance {
    match balance {
        None => Balance::default(),
        Some(b) => Balance {
            symbol: b.asset.clone(),
            balance: parse_f64(&b.balance),
            equity: parse_f64(&b.equity),
            unrealized_pnl: parse_f64(&b.unrealized_profit),
            realised_pnl: parse_f64(&b.realised_profit),
            available_margin: parse_f64(&b.available_margin),
            used_margin: parse_f64(&b.used_margin),
            freezed_margin: parse_f64(&b.freezed_margin),
        },
    }
}

pub fn positions_transform(positions: &[BingxPosition]) -> Vec<Position> {
    positions
        .iter()
        .map(|pos| {
            let amt = parse_f64(&pos.position_amt);
            let side = match pos.position_side.as_str() {
                "LONG" => PositionSide::Long,
                "SHORT" => PositionSide::Short,
                // 单向持仓模式下按数量符号判断
                _ if amt < 0.0 => PositionSide::Short,
                _ => PositionSide::Long,
            };
            Position {
                symbol: parse_symbol(&pos.symbol),
                position_id: (!pos.position_id.is_empty()).then(|| pos.position_id.clone()),
                position_side: side,
                isolated: pos.isolated,
                position_amt: amt,
                available_amt: parse_f64(&pos.available_amt),
                unrealized_profit: parse_f64(&pos.unrealized_profit),
                realised_profit: parse_f64(&pos.realised_profit),
                initial_margin: Some(parse_f64(&pos.initial_margin)),
                margin: parse_f64(&pos.margin),
                avg_price: parse_f64(&pos.avg_price),
                liquidation_price: pos.liquidation_price,
                leverage: parse_f64(&pos.leverage),
                position_value: Some(parse_f64(&pos.position_value)),
                mark_price: parse_f64(&pos.mark_price),
                risk_rate: Some(parse_f64(&pos.risk_rate)),
                max_margin_reduction: Some(parse_f64(&pos.max_margin_reduction)),
                pnl_ratio: Some(parse_f64(&pos.pnl_ratio)),
                create_time: if pos.create_time > 0 {
                    pos.create_time
                } else {
                    pos.update_time
                },
                update_time: pos.update_time,
            }
        })
        .collect()
}

pub fn contracts_transform(contracts: &[BingxContract]) -> Vec<Contract> {
    contracts
        .iter()
        .map(|contract| Contract {
            contract_id: contract.contract_id.clone(),
            symbol: parse_symbol(&contract.symbol),
            quantity_precision: contract.quantity_precision,
            price_precision: contract.price_precision,
            taker_fee_rate: contract.taker_fee_rate,
            maker_fee_rate: contract.maker_fee_rate,
            trade_min_quantity: contract.trade_min_quantity,
            trade_min_usdt: contract.trade_min_usdt,
            currency: contract.currency.clone(),
            asset: contract.asset.clone(),
            status: contract_status(contract.status),
            api_state_open: contract.api_state_open == "true",
            api_state_close: contract.api_state_close == "true",
            ensure_trigger: contract.ensure_trigger,
            trigger_fee_rate: parse_f64(&contract.trigger_fee_rate),
            broker_state: contract.broker_state,
            launch_time: (contract.launch_time > 0).then_some(contract.launch_time),
            maintain_time: contract.maintain_time,
            off_time: contract.off_time,
        })
        .collect()
}

/// BingX 合约状态码：1 正常交易，0 已下线，其余视为未知
fn contract_status(status: i64) -> ContractStatus {
    match status {
        1 => ContractStatus::Normal,
        0 => ContractStatus::Off,
        _ => ContractStatus::Unknown,
    }
}

pub fn klines_transform(klines: &[BingxKLine]) -> Vec<KLine> {
    let mut out: Vec<KLine> = klines
        .iter()
        .map(|k| KLine {
            open: parse_f64(&k.open),
            high: parse_f64(&k.high),
            low: parse_f64(&k.low),
            close: parse_f64(&k.close),
            volume: parse_f64(&k.volume),
            timestamp: k.time,
        })
        .collect();
    // 序列统一按时间倒序，下标 0 为当前 K 线
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

pub fn ws_kline_transform(ticks: &[BingxWsKlineTick]) -> Vec<KLine> {
    ticks
        .iter()
        .map(|tick| KLine {
            open: parse_f64(&tick.o),
            high: parse_f64(&tick.h),
            low: parse_f64(&tick.l),
            close: parse_f64(&tick.c),
            volume: parse_f64(&tick.v),
            timestamp: tick.time,
        })
        .collect()
}
