//! KuCoin 数据转换
//!
//! 符号归一化去掉 "USDTM" 结算后缀；持仓方向由数量符号推导。

use crate::connectors::kucoin::dto::*;
use crate::types::{
    Balance, Contract, ContractStatus, KLine, Position, PositionSide, Trade, TradeSide,
    Transaction,
};
use crate::utils::parse_f64;

/// "XBTUSDTM" → "XBT"
pub fn parse_symbol(symbol: &str) -> String {
    symbol.replace("USDTM", "")
}

pub fn transactions_transform(transactions: &[KucoinTransaction]) -> Vec<Transaction> {
    transactions
        .iter()
        .map(|tx| Transaction {
            symbol: parse_symbol(&tx.remark),
            income_type: tx.tx_type.clone(),
            income: tx.amount,
            asset: if tx.currency.is_empty() {
                "USDT".to_string()
            } else {
                tx.currency.clone()
            },
            info: tx.remark.clone(),
            time: tx.time,
            tran_id: tx.offset.to_string(),
            trade_id: "0".to_string(),
        })
        .collect()
}

pub fn trades_transform(fills: &[KucoinFill]) -> Vec<Trade> {
    fills
        .iter()
        .map(|fill| Trade {
            symbol: parse_symbol(&fill.symbol),
            qty: fill.size,
            price: parse_f64(&fill.price),
            quote_qty: parse_f64(&fill.value),
            commission: parse_f64(&fill.fee),
            commission_asset: fill.fee_currency.clone(),
            order_id: fill.order_id.clone(),
            trade_id: fill.trade_id.clone(),
            // tradeTime 为纳秒
            filled_time: fill.trade_time / 1_000_000,
            side: TradeSide::parse(&fill.side),
            position_side: fill.side.to_uppercase(),
            role: fill.liquidity.to_uppercase(),
            total: parse_f64(&fill.value),
            realised_pnl: 0.0,
        })
        .collect()
}

pub fn balance_transform(balance: Option<&KucoinBalance>) -> Balance {
    match balance {
        None => Balance::default(),
        Some(b) => Balance {
            symbol: parse_symbol(&b.currency),
            balance: b.margin_balance,
            equity: b.account_equity,
            unrealized_pnl: b.unrealised_pnl,
            realised_pnl: 0.0,
            available_margin: b.available_balance,
            used_margin: b.position_margin + b.order_margin,
            freezed_margin: b.frozen_funds,
        },
    }
}

pub fn positions_transform(positions: &[KucoinPosition]) -> Vec<Position> {
    positions
        .iter()
        .map(|pos| Position {
            symbol: parse_symbol(&pos.symbol),
            position_id: (!pos.id.is_empty()).then(|| pos.id.clone()),
            // 方向由数量符号推导，空仓视为多头
            position_side: if pos.current_qty < 0.0 {
                PositionSide::Short
            } else {
                PositionSide::Long
            },
            isolated: !pos.cross_mode,
            position_amt: pos.current_qty,
            available_amt: pos.current_qty,
            unrealized_profit: pos.unrealised_pnl,
            realised_profit: pos.realised_pnl,
            initial_margin: Some(pos.pos_init),
            margin: pos.pos_margin,
            avg_price: pos.avg_entry_price,
            liquidation_price: pos.liquidation_price,
            leverage: pos.leverage,
            position_value: Some(pos.mark_value),
            mark_price: pos.mark_price,
            risk_rate: Some(pos.delev_percentage),
            max_margin_reduction: None,
            pnl_ratio: Some(pos.unrealised_roe_pcnt),
            create_time: pos.opening_timestamp,
            update_time: pos.current_timestamp,
        })
        .collect()
}

pub fn contracts_transform(contracts: &[KucoinContract]) -> Vec<Contract> {
    contracts
        .iter()
        .map(|contract| {
            let status = contract_status(&contract.status);
            Contract {
                contract_id: contract.symbol.clone(),
                symbol: parse_symbol(&contract.symbol),
                quantity_precision: contract.lot_size,
                price_precision: contract.tick_size,
                taker_fee_rate: contract.taker_fee_rate,
                maker_fee_rate: contract.maker_fee_rate,
                trade_min_quantity: contract.lot_size,
                trade_min_usdt: 0.0,
                currency: default_usdt(&contract.settle_currency),
                asset: default_usdt(&contract.settle_currency),
                status,
                api_state_open: contract.status == "Open",
                api_state_close: contract.status == "Open" || contract.status == "CancelOnly",
                ensure_trigger: contract.is_deleverage,
                trigger_fee_rate: 0.0,
                broker_state: contract.status == "Open",
                launch_time: (contract.first_open_date > 0).then_some(contract.first_open_date),
                maintain_time: 0,
                off_time: contract.expire_date.unwrap_or(0),
            }
        })
        .collect()
}

fn default_usdt(currency: &str) -> String {
    if currency.is_empty() {
        "USDT".to_string()
    } else {
        currency.to_string()
    }
}

/// KuCoin 合约状态到归一化状态的映射
fn contract_status(status: &str) -> ContractStatus {
    match status {
        "Open" => ContractStatus::Normal,
        "Paused" | "CancelOnly" => ContractStatus::RestrictedApi,
        "Init" => ContractStatus::PreOnline,
        "Closed" | "Settled" => ContractStatus::Off,
        _ => ContractStatus::Unknown,
    }
}

/// K 线行 [time, open, high, low, close, volume]，升序进、倒序出
pub fn klines_transform(candles: &[KucoinCandle]) -> Vec<KLine> {
    let mut out: Vec<KLine> = candles
        .iter()
        .filter(|row| row.len() >= 6)
        .map(|row| KLine {
            open: row[1],
            high: row[2],
            low: row[3],
            close: row[4],
            volume: row[5],
            timestamp: row[0] as i64,
        })
        .collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_strips_settlement_suffix() {
        assert_eq!(parse_symbol("XBTUSDTM"), "XBT");
        assert_eq!(parse_symbol("ETHUSDTM"), "ETH");
        assert_eq!(parse_symbol("USDT"), "USDT");
    }

    #[test]
    fn test_transactions_transform_uses_offset_as_identity() {
        let native = vec![KucoinTransaction {
            time: 1_700_000_000_000,
            tx_type: "RealisedPNL".to_string(),
            amount: 12.5,
            fee: Some(0.1),
            account_equity: 1000.0,
            status: "Completed".to_string(),
            remark: "XBTUSDTM".to_string(),
            offset: 987,
            currency: "USDT".to_string(),
        }];
        let out = transactions_transform(&native);
        assert_eq!(out[0].tran_id, "987");
        assert_eq!(out[0].trade_id, "0");
        assert_eq!(out[0].symbol, "XBT");
        assert_eq!(out[0].income, 12.5);
    }

    #[test]
    fn test_trades_transform_converts_nanos() {
        let native = vec![KucoinFill {
            symbol: "ETHUSDTM".to_string(),
            trade_id: "t1".to_string(),
            order_id: "o1".to_string(),
            side: "sell".to_string(),
            liquidity: "maker".to_string(),
            price: "3000".to_string(),
            size: 2.0,
            value: "6000".to_string(),
            fee: "0.6".to_string(),
            fee_currency: "USDT".to_string(),
            trade_time: 1_700_000_000_000_000_000,
        }];
        let out = trades_transform(&native);
        assert_eq!(out[0].filled_time, 1_700_000_000_000);
        assert_eq!(out[0].side, TradeSide::Sell);
        assert_eq!(out[0].role, "MAKER");
        assert_eq!(out[0].commission, 0.6);
    }

    #[test]
    fn test_balance_transform_sums_used_margin() {
        let native = KucoinBalance {
            account_equity: 1207.7,
            unrealised_pnl: -78.9,
            margin_balance: 1286.7,
            position_margin: 43.8,
            order_margin: 4.0,
            frozen_funds: 0.0,
            available_balance: 1080.9,
            currency: "USDT".to_string(),
            risk_ratio: 0.002,
            max_withdraw_amount: 1080.9,
        };
        let balance = balance_transform(Some(&native));
        assert!((balance.used_margin - 47.8).abs() < 1e-9);
        assert_eq!(balance.symbol, "USDT");
        assert_eq!(balance_transform(None), Balance::default());
    }

    #[test]
    fn test_position_side_from_qty_sign() {
        let native = vec![
            KucoinPosition {
                symbol: "XBTUSDTM".to_string(),
                current_qty: 1.0,
                cross_mode: true,
                ..Default::default()
            },
            KucoinPosition {
                symbol: "ETHUSDTM".to_string(),
                current_qty: -3.0,
                cross_mode: false,
                ..Default::default()
            },
        ];
        let out = positions_transform(&native);
        assert_eq!(out[0].position_side, PositionSide::Long);
        assert!(!out[0].isolated);
        assert_eq!(out[1].position_side, PositionSide::Short);
        assert!(out[1].isolated);
    }

    #[test]
    fn test_contract_status_mapping() {
        assert_eq!(contract_status("Open"), ContractStatus::Normal);
        assert_eq!(contract_status("Paused"), ContractStatus::RestrictedApi);
        assert_eq!(contract_status("CancelOnly"), ContractStatus::RestrictedApi);
        assert_eq!(contract_status("Init"), ContractStatus::PreOnline);
        assert_eq!(contract_status("Settled"), ContractStatus::Off);
        assert_eq!(contract_status("BeingSettled"), ContractStatus::Unknown);
    }

    #[test]
    fn test_klines_transform() {
        let rows: Vec<KucoinCandle> = vec![
            vec![100.0, 1.0, 2.0, 0.5, 1.5, 10.0],
            vec![200.0, 1.5, 2.5, 1.0, 2.0, 20.0],
            vec![150.0], // 残行跳过
        ];
        let out = klines_transform(&rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, 200);
        assert_eq!(out[1].close, 1.5);
    }
}
