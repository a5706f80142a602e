//! BingX 原生数据类型
//!
//! 数值字段按交易所实际返回保留为字符串，转换层再统一解析为 f64。

use serde::{Deserialize, Serialize};

/// GET 响应信封：{code, msg, data}，code 非 0 即业务错误
#[derive(Debug, Clone, Deserialize)]
pub struct BingxResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// 账单事件（资金费、已实现盈亏、划转等）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BingxTransaction {
    pub symbol: String,
    pub income_type: String,
    pub income: String,
    pub asset: String,
    pub info: String,
    pub time: i64,
    pub tran_id: String,
    pub trade_id: String,
}

/// 账户余额（v3 返回多币种数组，取 USDT 条目）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BingxBalance {
    pub asset: String,
    pub balance: String,
    pub equity: String,
    pub unrealized_profit: String,
    pub realised_profit: String,
    pub available_margin: String,
    pub used_margin: String,
    pub freezed_margin: String,
    pub short_uid: String,
}

/// 成交记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BingxTrade {
    pub symbol: String,
    pub qty: String,
    pub price: String,
    pub quote_qty: String,
    pub commission: String,
    pub commission_asset: String,
    pub order_id: String,
    pub trade_id: String,
    /// ISO 时间串，可能带 "+0800" 形式的时区
    pub filled_time: String,
    pub side: String,
    pub position_side: String,
    pub role: String,
    pub total: f64,
    #[serde(rename = "realisedPNL")]
    pub realised_pnl: String,
}

/// fillHistory 响应体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BingxFillHistory {
    pub fill_history_orders: Vec<BingxTrade>,
}

/// 持仓
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BingxPosition {
    pub symbol: String,
    pub position_id: String,
    pub position_side: String,
    pub isolated: bool,
    pub position_amt: String,
    pub available_amt: String,
    pub unrealized_profit: String,
    pub realised_profit: String,
    pub initial_margin: String,
    pub margin: String,
    pub avg_price: String,
    pub liquidation_price: f64,
    pub leverage: String,
    pub position_value: String,
    pub mark_price: String,
    pub risk_rate: String,
    pub max_margin_reduction: String,
    pub pnl_ratio: String,
    pub create_time: i64,
    pub update_time: i64,
}

/// K 线（v3 返回最新在前）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BingxKLine {
    pub open: String,
    pub close: String,
    pub high: String,
    pub low: String,
    pub volume: String,
    pub time: i64,
}

/// 合约元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BingxContract {
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
    pub status: i64,
    pub api_state_open: String,
    pub api_state_close: String,
    pub ensure_trigger: bool,
    pub trigger_fee_rate: String,
    pub broker_state: bool,
    pub launch_time: i64,
    pub maintain_time: i64,
    pub off_time: i64,
}

/// listenKey 签发/续期响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BingxListenKey {
    pub listen_key: String,
}

// ---------------------------------------------------------------------------
// WebSocket 推送

/// K 线推送事件：dataType 形如 "BTC-USDT@kline_1m"
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BingxWsKlineEvent {
    pub code: i64,
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub s: String,
    pub data: Vec<BingxWsKlineTick>,
}

/// 单根 K 线增量
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BingxWsKlineTick {
    pub c: String,
    pub h: String,
    pub l: String,
    pub o: String,
    pub v: String,
    #[serde(rename = "T")]
    pub time: i64,
}
