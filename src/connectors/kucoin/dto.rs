//! KuCoin Futures 原生数据类型
//!
//! 与 BingX/Bitget 不同，KuCoin 的数值大多直接是 JSON number。

use serde::{Deserialize, Serialize};

/// 响应信封：code 为 "200000" 表示成功
#[derive(Debug, Clone, Deserialize)]
pub struct KucoinResponse<T> {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// 资金流水条目（已实现盈亏、资金费、划转等）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KucoinTransaction {
    /// epoch 毫秒
    pub time: i64,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub amount: f64,
    pub fee: Option<f64>,
    pub account_equity: f64,
    pub status: String,
    pub remark: String,
    /// 单调递增的游标 id，同时充当身份键
    pub offset: i64,
    pub currency: String,
}

/// 流水分页：offset 游标 + hasMore 标记
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KucoinTransactionPage {
    pub has_more: bool,
    pub data_list: Vec<KucoinTransaction>,
}

/// 成交明细
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KucoinFill {
    pub symbol: String,
    pub trade_id: String,
    pub order_id: String,
    pub side: String,
    /// "taker" | "maker"
    pub liquidity: String,
    pub price: String,
    pub size: f64,
    pub value: String,
    pub fee: String,
    pub fee_currency: String,
    /// 纳秒时间戳
    pub trade_time: i64,
}

/// 成交分页（页号式）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KucoinFillPage {
    pub current_page: u32,
    pub page_size: u32,
    pub total_num: u64,
    pub total_page: u32,
    pub items: Vec<KucoinFill>,
}

/// 合约账户总览
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KucoinBalance {
    pub account_equity: f64,
    #[serde(rename = "unrealisedPNL")]
    pub unrealised_pnl: f64,
    pub margin_balance: f64,
    pub position_margin: f64,
    pub order_margin: f64,
    pub frozen_funds: f64,
    pub available_balance: f64,
    pub currency: String,
    pub risk_ratio: f64,
    pub max_withdraw_amount: f64,
}

/// 持仓
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KucoinPosition {
    pub id: String,
    pub symbol: String,
    pub cross_mode: bool,
    pub delev_percentage: f64,
    pub opening_timestamp: i64,
    pub current_timestamp: i64,
    pub current_qty: f64,
    pub unrealised_pnl: f64,
    pub realised_pnl: f64,
    pub unrealised_roe_pcnt: f64,
    pub pos_init: f64,
    pub pos_margin: f64,
    pub avg_entry_price: f64,
    pub liquidation_price: f64,
    pub leverage: f64,
    pub mark_value: f64,
    pub mark_price: f64,
    pub is_open: bool,
    pub maintain_margin: f64,
    pub margin_mode: String,
}

/// 合约元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KucoinContract {
    pub symbol: String,
    pub root_symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub settle_currency: String,
    pub lot_size: f64,
    pub tick_size: f64,
    pub multiplier: f64,
    pub maker_fee_rate: f64,
    pub taker_fee_rate: f64,
    pub is_deleverage: bool,
    pub first_open_date: i64,
    pub expire_date: Option<i64>,
    /// Init/Open/BeingSettled/Settled/Paused/Closed/CancelOnly
    pub status: String,
    pub max_leverage: f64,
}

/// K 线行：[time, open, high, low, close, volume]，时间升序
pub type KucoinCandle = Vec<f64>;
