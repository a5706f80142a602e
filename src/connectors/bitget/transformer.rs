//! Bitget 数据转换
//!
//! 账单的 income 为 amount 与 fee 之和；tranId/tradeId 都取 billId。

use crate::connectors::bitget::dto::*;
use crate::types::{
    Balance, Contract, ContractStatus, KLine, Position, PositionSide, Trade, TradeSide,
    Transaction,
};
use crate::utils::{parse_f64, parse_i64};

/// 符号归一化：去掉分隔符
pub fn parse_symbol(symbol: &str) -> String {
    symbol.replace('-', "")
}

pub fn transactions_transform(bills: &[BitgetBill]) -> Vec<Transaction> {
    bills
        .iter()
        .map(|bill| Transaction {
            symbol: parse_symbol(&bill.symbol),
            income_type: bill.business_type.clone(),
            income: parse_f64(&bill.amount) + parse_f64(&bill.fee),
            asset: bill.coin.clone(),
            info: bill.business_type.clone(),
            time: parse_i64(&bill.c_time),
            tran_id: bill.bill_id.clone(),
            trade_id: bill.bill_id.clone(),
        })
        .collect()
}

pub fn trades_transform(fills: &[BitgetFill]) -> Vec<Trade> {
    fills
        .iter()
        .map(|fill| {
            let side = TradeSide::parse(&fill.side);
            Trade {
                symbol: parse_symbol(&fill.symbol),
                qty: parse_f64(&fill.base_volume),
                price: parse_f64(&fill.price),
                quote_qty: parse_f64(&fill.quote_volume),
                commission: 0.0,
                commission_asset: String::new(),
                order_id: fill.order_id.clone(),
                trade_id: fill.trade_id.clone(),
                filled_time: parse_i64(&fill.c_time),
                side,
                position_side: fill.side.to_uppercase(),
                role: fill.trade_scope.to_uppercase(),
                total: parse_f64(&fill.quote_volume),
                realised_pnl: parse_f64(&fill.profit),
            }
        })
        .collect()
}

pub fn balance_transform(account: Option<&BitgetAccount>) -> Balance {
    match account {
        None => Balance::default(),
        Some(a) => Balance {
            symbol: a.margin_coin.clone(),
            balance: parse_f64(&a.available) + parse_f64(&a.locked),
            equity: parse_f64(&a.account_equity),
            unrealized_pnl: parse_f64(&a.unrealized_pl),
            realised_pnl: 0.0,
            available_margin: parse_f64(&a.crossed_max_available),
            used_margin: parse_f64(&a.crossed_margin),
            freezed_margin: parse_f64(&a.locked),
        },
    }
}

pub fn positions_transform(positions: &[BitgetPosition]) -> Vec<Position> {
    positions
        .iter()
        .map(|pos| Position {
            symbol: parse_symbol(&pos.symbol),
            position_id: None,
            position_side: if pos.hold_side.eq_ignore_ascii_case("short") {
                PositionSide::Short
            } else {
                PositionSide::Long
            },
            isolated: pos.margin_mode.eq_ignore_ascii_case("isolated"),
            position_amt: parse_f64(&pos.total),
            available_amt: parse_f64(&pos.available),
            unrealized_profit: parse_f64(&pos.unrealized_pl),
            realised_profit: parse_f64(&pos.achieved_profits),
            initial_margin: None,
            margin: parse_f64(&pos.margin_size),
            avg_price: parse_f64(&pos.open_price_avg),
            liquidation_price: parse_f64(&pos.liquidation_price),
            leverage: parse_f64(&pos.leverage),
            position_value: None,
            mark_price: parse_f64(&pos.mark_price),
            risk_rate: Some(parse_f64(&pos.margin_ratio)),
            max_margin_reduction: None,
            pnl_ratio: None,
            create_time: parse_i64(&pos.c_time),
            update_time: parse_i64(&pos.u_time),
        })
        .collect()
}

pub fn contracts_transform(contracts: &[BitgetContract]) -> Vec<Contract> {
    contracts
        .iter()
        .map(|contract| {
            let status = contract_status(&contract.symbol_status);
            Contract {
                contract_id: contract.symbol.clone(),
                symbol: parse_symbol(&contract.symbol),
                quantity_precision: parse_f64(&contract.volume_place),
                price_precision: parse_f64(&contract.price_place),
                taker_fee_rate: parse_f64(&contract.taker_fee_rate),
                maker_fee_rate: parse_f64(&contract.maker_fee_rate),
                trade_min_quantity: parse_f64(&contract.min_trade_num),
                trade_min_usdt: parse_f64(&contract.min_trade_usdt),
                currency: contract.quote_coin.clone(),
                asset: contract.base_coin.clone(),
                status,
                api_state_open: matches!(status, ContractStatus::Normal | ContractStatus::Listed),
                api_state_close: !matches!(status, ContractStatus::Off),
                ensure_trigger: false,
                trigger_fee_rate: 0.0,
                broker_state: matches!(status, ContractStatus::Normal),
                launch_time: {
                    let t = parse_i64(&contract.launch_time);
                    (t > 0).then_some(t)
                },
                maintain_time: parse_i64(&contract.limit_open_time),
                off_time: parse_i64(&contract.off_time),
            }
        })
        .collect()
}

/// Bitget 的 symbolStatus 与归一化状态一一对应
fn contract_status(status: &str) -> ContractStatus {
    match status {
        "listed" => ContractStatus::Listed,
        "normal" => ContractStatus::Normal,
        "maintain" => ContractStatus::Maintain,
        "limit_open" => ContractStatus::LimitOpen,
        "restrictedAPI" => ContractStatus::RestrictedApi,
        "off" => ContractStatus::Off,
        _ => ContractStatus::Unknown,
    }
}

/// K 线行 [ts, open, high, low, close, baseVol, ...]，升序进、倒序出
pub fn klines_transform(candles: &[BitgetCandle]) -> Vec<KLine> {
    let mut out: Vec<KLine> = candles
        .iter()
        .filter(|row| row.len() >= 6)
        .map(|row| KLine {
            open: parse_f64(&row[1]),
            high: parse_f64(&row[2]),
            low: parse_f64(&row[3]),
            close: parse_f64(&row[4]),
            volume: parse_f64(&row[5]),
            timestamp: parse_i64(&row[0]),
        })
        .collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transactions_income_sums_amount_and_fee() {
        let bills = vec![BitgetBill {
            bill_id: "b1".to_string(),
            symbol: "BTCUSDT".to_string(),
            coin: "USDT".to_string(),
            amount: "10.5".to_string(),
            fee: "-0.5".to_string(),
            business_type: "close_long".to_string(),
            c_time: "1700000000000".to_string(),
        }];
        let out = transactions_transform(&bills);
        assert_eq!(out[0].income, 10.0);
        assert_eq!(out[0].tran_id, "b1");
        assert_eq!(out[0].trade_id, "b1");
        assert_eq!(out[0].time, 1_700_000_000_000);
    }

    #[test]
    fn test_trades_transform_maps_side_and_scope() {
        let fills = vec![BitgetFill {
            trade_id: "t1".to_string(),
            order_id: "o1".to_string(),
            symbol: "ETHUSDT".to_string(),
            price: "3000".to_string(),
            base_volume: "2".to_string(),
            quote_volume: "6000".to_string(),
            side: "sell".to_string(),
            profit: "15".to_string(),
            trade_scope: "taker".to_string(),
            c_time: "1700000001000".to_string(),
        }];
        let out = trades_transform(&fills);
        assert_eq!(out[0].side, TradeSide::Sell);
        assert_eq!(out[0].role, "TAKER");
        assert_eq!(out[0].total, 6000.0);
        assert_eq!(out[0].realised_pnl, 15.0);
        assert_eq!(out[0].filled_time, 1_700_000_001_000);
    }

    #[test]
    fn test_balance_transform() {
        let account = BitgetAccount {
            margin_coin: "USDT".to_string(),
            available: "900".to_string(),
            locked: "100".to_string(),
            account_equity: "1050".to_string(),
            crossed_max_available: "850".to_string(),
            crossed_margin: "150".to_string(),
            unrealized_pl: "50".to_string(),
            ..Default::default()
        };
        let balance = balance_transform(Some(&account));
        assert_eq!(balance.balance, 1000.0);
        assert_eq!(balance.freezed_margin, 100.0);
        assert_eq!(balance.used_margin, 150.0);
        assert_eq!(balance_transform(None), Balance::default());
    }

    #[test]
    fn test_contract_status_mapping() {
        assert_eq!(contract_status("normal"), ContractStatus::Normal);
        assert_eq!(contract_status("limit_open"), ContractStatus::LimitOpen);
        assert_eq!(contract_status("restrictedAPI"), ContractStatus::RestrictedApi);
        assert_eq!(contract_status("whatever"), ContractStatus::Unknown);
    }

    #[test]
    fn test_klines_ascending_input_becomes_descending() {
        let rows: Vec<BitgetCandle> = vec![
            vec!["100".into(), "1".into(), "2".into(), "0.5".into(), "1.5".into(), "10".into()],
            vec!["200".into(), "1.5".into(), "2.5".into(), "1".into(), "2".into(), "20".into()],
        ];
        let out = klines_transform(&rows);
        assert_eq!(out[0].timestamp, 200);
        assert_eq!(out[1].timestamp, 100);
        // 行字段残缺时整行跳过
        let bad: Vec<BitgetCandle> = vec![vec!["100".into(), "1".into()]];
        assert!(klines_transform(&bad).is_empty());
    }

    #[test]
    fn test_position_sides() {
        let positions = vec![
            BitgetPosition {
                hold_side: "long".to_string(),
                margin_mode: "crossed".to_string(),
                ..Default::default()
            },
            BitgetPosition {
                hold_side: "short".to_string(),
                margin_mode: "isolated".to_string(),
                ..Default::default()
            },
        ];
        let out = positions_transform(&positions);
        assert_eq!(out[0].position_side, PositionSide::Long);
        assert!(!out[0].isolated);
        assert_eq!(out[1].position_side, PositionSide::Short);
        assert!(out[1].isolated);
    }
}
