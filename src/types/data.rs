// src/types/data.rs - 归一化数据模型
//
// 所有交易所的原生数据最终都映射到这里定义的形状。
// 序列化（缓存文件、通知负载）统一使用 camelCase 字段名。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 账单事件（资金费、已实现盈亏、划转等）。
/// 身份键为 `(tran_id, trade_id)`，同一交易所历史内唯一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub symbol: String,
    pub income_type: String,
    pub income: f64,
    pub asset: String,
    pub info: String,
    /// epoch 毫秒
    pub time: i64,
    pub tran_id: String,
    pub trade_id: String,
}

/// 成交记录。身份键为 `(order_id, trade_id)`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub symbol: String,
    pub qty: f64,
    pub price: f64,
    pub quote_qty: f64,
    pub commission: f64,
    pub commission_asset: String,
    pub order_id: String,
    pub trade_id: String,
    /// 成交时间，epoch 毫秒
    pub filled_time: i64,
    pub side: TradeSide,
    pub position_side: String,
    pub role: String,
    pub total: f64,
    #[serde(rename = "realisedPNL")]
    pub realised_pnl: f64,
}

/// 买卖方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl TradeSide {
    /// 宽松解析，未知输入默认 Buy（上游已保证大小写混杂）
    pub fn parse(s: &str) -> TradeSide {
        if s.eq_ignore_ascii_case("sell") {
            TradeSide::Sell
        } else {
            TradeSide::Buy
        }
    }
}

/// 账户余额快照，每轮刷新整体替换
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub symbol: String,
    pub balance: f64,
    pub equity: f64,
    pub unrealized_pnl: f64,
    pub realised_pnl: f64,
    pub available_margin: f64,
    pub used_margin: f64,
    pub freezed_margin: f64,
}

/// 持仓方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    #[serde(rename = "LONG")]
    Long,
    #[serde(rename = "SHORT")]
    Short,
}

/// 持仓快照，每轮刷新整体替换（不做差分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub position_id: Option<String>,
    pub position_side: PositionSide,
    pub isolated: bool,
    pub position_amt: f64,
    pub available_amt: f64,
    pub unrealized_profit: f64,
    pub realised_profit: f64,
    pub initial_margin: Option<f64>,
    pub margin: f64,
    pub avg_price: f64,
    pub liquidation_price: f64,
    pub leverage: f64,
    pub position_value: Option<f64>,
    pub mark_price: f64,
    pub risk_rate: Option<f64>,
    pub max_margin_reduction: Option<f64>,
    pub pnl_ratio: Option<f64>,
    pub create_time: i64,
    pub update_time: i64,
}

/// 合约生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    #[serde(rename = "listed")]
    Listed,
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "maintain")]
    Maintain,
    #[serde(rename = "limit_open")]
    LimitOpen,
    #[serde(rename = "restrictedAPI")]
    RestrictedApi,
    #[serde(rename = "preOnline")]
    PreOnline,
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "unknown")]
    Unknown,
}

/// 合约元数据（精度、费率、最小下单量），每轮刷新整体替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub contract_id: String,
    pub symbol: String,
    pub quantity_precision: f64,
    pub price_precision: f64,
    pub taker_fee_rate: f64,
    pub maker_fee_rate: f64,
    pub trade_min_quantity: f64,
    #[serde(rename = "tradeMinUSDT")]
    pub trade_min_usdt: f64,
    pub currency: String,
    pub asset: String,
    pub status: ContractStatus,
    pub api_state_open: bool,
    pub api_state_close: bool,
    pub ensure_trigger: bool,
    pub trigger_fee_rate: f64,
    pub broker_state: bool,
    pub launch_time: Option<i64>,
    pub maintain_time: i64,
    pub off_time: i64,
}

/// 单根 K 线。序列按时间倒序存放，下标 0 为尚未收盘的当前 K 线。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KLine {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: i64,
}

/// K 线周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "3m")]
    Min3,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "8h")]
    Hour8,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "3d")]
    Day3,
    #[serde(rename = "1w")]
    Week1,
    #[serde(rename = "1M")]
    Month1,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Min1 => "1m",
            Period::Min3 => "3m",
            Period::Min5 => "5m",
            Period::Min15 => "15m",
            Period::Min30 => "30m",
            Period::Hour1 => "1h",
            Period::Hour2 => "2h",
            Period::Hour4 => "4h",
            Period::Hour6 => "6h",
            Period::Hour8 => "8h",
            Period::Hour12 => "12h",
            Period::Day1 => "1d",
            Period::Day3 => "3d",
            Period::Week1 => "1w",
            Period::Month1 => "1M",
        }
    }

    /// KuCoin 的 granularity 参数以分钟计，且只支持部分周期
    pub fn kucoin_granularity(&self) -> Option<u32> {
        match self {
            Period::Min1 => Some(1),
            Period::Min5 => Some(5),
            Period::Min15 => Some(15),
            Period::Min30 => Some(30),
            Period::Hour1 => Some(60),
            Period::Hour2 => Some(120),
            Period::Hour4 => Some(240),
            Period::Hour8 => Some(480),
            Period::Hour12 => Some(720),
            Period::Day1 => Some(1440),
            Period::Week1 => Some(10080),
            _ => None,
        }
    }

    /// Bitget 的 granularity 写法：分钟用小写 m，小时以上用大写
    pub fn bitget_granularity(&self) -> &'static str {
        match self {
            Period::Min1 => "1m",
            Period::Min3 => "3m",
            Period::Min5 => "5m",
            Period::Min15 => "15m",
            Period::Min30 => "30m",
            Period::Hour1 => "1H",
            Period::Hour2 => "2H",
            Period::Hour4 => "4H",
            Period::Hour6 => "6H",
            Period::Hour8 => "8H",
            Period::Hour12 => "12H",
            Period::Day1 => "1D",
            Period::Day3 => "3D",
            Period::Week1 => "1W",
            Period::Month1 => "1M",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Period::Min1),
            "3m" => Ok(Period::Min3),
            "5m" => Ok(Period::Min5),
            "15m" => Ok(Period::Min15),
            "30m" => Ok(Period::Min30),
            "1h" => Ok(Period::Hour1),
            "2h" => Ok(Period::Hour2),
            "4h" => Ok(Period::Hour4),
            "6h" => Ok(Period::Hour6),
            "8h" => Ok(Period::Hour8),
            "12h" => Ok(Period::Hour12),
            "1d" => Ok(Period::Day1),
            "3d" => Ok(Period::Day3),
            "1w" => Ok(Period::Week1),
            "1M" => Ok(Period::Month1),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// 持久化包装：交易所原生 Transaction/Trade 数组 + 最后更新时间
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedData<T> {
    /// epoch 毫秒
    pub last_updated: i64,
    pub data: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_roundtrip() {
        let all = [
            Period::Min1,
            Period::Min3,
            Period::Min5,
            Period::Min15,
            Period::Min30,
            Period::Hour1,
            Period::Hour2,
            Period::Hour4,
            Period::Hour6,
            Period::Hour8,
            Period::Hour12,
            Period::Day1,
            Period::Day3,
            Period::Week1,
            Period::Month1,
        ];
        for p in all {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), p);
        }
        assert!("7m".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_kucoin_granularity() {
        assert_eq!(Period::Min1.kucoin_granularity(), Some(1));
        assert_eq!(Period::Day1.kucoin_granularity(), Some(1440));
        // KuCoin 不支持 3m / 1M
        assert_eq!(Period::Min3.kucoin_granularity(), None);
        assert_eq!(Period::Month1.kucoin_granularity(), None);
    }

    #[test]
    fn test_transaction_serde_camel_case() {
        let tx = Transaction {
            symbol: "BTCUSDT".to_string(),
            income_type: "FUNDING_FEE".to_string(),
            income: -0.12,
            asset: "USDT".to_string(),
            info: String::new(),
            time: 1_700_000_000_000,
            tran_id: "t1".to_string(),
            trade_id: "0".to_string(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("incomeType").is_some());
        assert!(json.get("tranId").is_some());
        assert!(json.get("income_type").is_none());
    }

    #[test]
    fn test_balance_default_is_zeroed() {
        let b = Balance::default();
        assert_eq!(b.balance, 0.0);
        assert_eq!(b.equity, 0.0);
        assert!(b.symbol.is_empty());
    }
}
