//! Bitget 原生数据类型（v2 接口，数值一律字符串）

use serde::{Deserialize, Serialize};

/// 响应信封：code 为 "00000" 表示成功
#[derive(Debug, Clone, Deserialize)]
pub struct BitgetResponse<T> {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// 账单流水（资金费、平仓盈亏、手续费等）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitgetBill {
    pub bill_id: String,
    pub symbol: String,
    pub coin: String,
    pub amount: String,
    pub fee: String,
    pub business_type: String,
    /// epoch 毫秒（字符串）
    #[serde(rename = "cTime")]
    pub c_time: String,
}

/// 账单分页：endId 为下一页 idLessThan 游标
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitgetBillPage {
    pub bills: Vec<BitgetBill>,
    pub end_id: String,
}

/// 成交明细
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitgetFill {
    pub trade_id: String,
    pub order_id: String,
    pub symbol: String,
    pub price: String,
    pub base_volume: String,
    pub quote_volume: String,
    pub side: String,
    pub profit: String,
    pub trade_scope: String,
    #[serde(rename = "cTime")]
    pub c_time: String,
}

/// 成交分页
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitgetFillPage {
    pub fill_list: Vec<BitgetFill>,
    pub end_id: String,
}

/// 合约账户资产（多币种，取 USDT）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitgetAccount {
    pub margin_coin: String,
    pub available: String,
    pub locked: String,
    pub account_equity: String,
    pub crossed_max_available: String,
    pub crossed_margin_leverage: String,
    #[serde(rename = "crossedRiskRate")]
    pub crossed_risk_rate: String,
    pub crossed_margin: String,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: String,
}

/// 持仓
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitgetPosition {
    pub symbol: String,
    pub margin_coin: String,
    /// "long" | "short"
    pub hold_side: String,
    /// "isolated" | "crossed"
    pub margin_mode: String,
    pub margin_size: String,
    pub available: String,
    pub total: String,
    pub leverage: String,
    pub achieved_profits: String,
    pub open_price_avg: String,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: String,
    pub liquidation_price: String,
    pub mark_price: String,
    pub margin_ratio: String,
    #[serde(rename = "cTime")]
    pub c_time: String,
    #[serde(rename = "uTime")]
    pub u_time: String,
}

/// 合约元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitgetContract {
    pub symbol: String,
    pub base_coin: String,
    pub quote_coin: String,
    pub maker_fee_rate: String,
    pub taker_fee_rate: String,
    pub min_trade_num: String,
    pub price_place: String,
    pub volume_place: String,
    #[serde(rename = "minTradeUSDT")]
    pub min_trade_usdt: String,
    /// listed/normal/maintain/limit_open/restrictedAPI/off
    pub symbol_status: String,
    pub launch_time: String,
    pub limit_open_time: String,
    pub off_time: String,
}

/// K 线行：[ts, open, high, low, close, baseVol, quoteVol]，时间升序
pub type BitgetCandle = Vec<String>;
