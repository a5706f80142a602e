// src/types/events.rs - 通知事件定义
//
// 核心向订阅方推送的事件统一为「store + 负载」的形状，
// store 形如 "bingx.balance" / "kucoin.positions" / "notifications"。

use crate::types::data::{Balance, Contract, KLine, Period, Position, Trade, Transaction};
use crate::types::exchange::ExchangeId;
use serde::Serialize;
use serde_json::{json, Value};

/// 单个交易所某一数据类别的负载
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StorePayload {
    Transactions { transactions: Vec<Transaction> },
    Trades { trades: Vec<Trade> },
    Balance { balance: Option<Balance> },
    Positions { positions: Vec<Position> },
    Contracts { contracts: Vec<Contract> },
    Klines {
        symbol: String,
        period: Period,
        klines: Vec<KLine>,
    },
}

impl StorePayload {
    /// store 后缀（"transactions"、"klines" 等）
    pub fn kind(&self) -> &'static str {
        match self {
            StorePayload::Transactions { .. } => "transactions",
            StorePayload::Trades { .. } => "trades",
            StorePayload::Balance { .. } => "balance",
            StorePayload::Positions { .. } => "positions",
            StorePayload::Contracts { .. } => "contracts",
            StorePayload::Klines { .. } => "klines",
        }
    }
}

/// 瞬态提示（机器人控制等外围动作的结果回执也走这条通道）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub action: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

impl Notification {
    pub fn success(title: &str, action: &str, message: &str) -> Self {
        Self::build(NotificationKind::Success, title, action, message)
    }

    pub fn error(title: &str, action: &str, message: &str) -> Self {
        Self::build(NotificationKind::Error, title, action, message)
    }

    fn build(kind: NotificationKind, title: &str, action: &str, message: &str) -> Self {
        Notification {
            id: chrono::Utc::now().timestamp_millis().to_string(),
            kind,
            title: title.to_string(),
            action: action.to_string(),
            message: message.to_string(),
        }
    }
}

/// 推送给订阅方的事件
#[derive(Debug, Clone)]
pub enum NotifyMessage {
    /// 某交易所某类别的数据变更
    Store {
        exchange: ExchangeId,
        payload: StorePayload,
    },
    /// 瞬态提示
    Notification(Notification),
}

impl NotifyMessage {
    pub fn store(exchange: ExchangeId, payload: StorePayload) -> Self {
        NotifyMessage::Store { exchange, payload }
    }

    /// 事件的 store 标识，例如 "bitget.klines"
    pub fn store_name(&self) -> String {
        match self {
            NotifyMessage::Store { exchange, payload } => {
                format!("{}.{}", exchange.as_str(), payload.kind())
            }
            NotifyMessage::Notification(_) => "notifications".to_string(),
        }
    }

    /// 外发 JSON：负载字段拍平到顶层，附加 store 标签
    pub fn to_json(&self) -> Value {
        match self {
            NotifyMessage::Store { payload, .. } => {
                let mut value = serde_json::to_value(payload).unwrap_or_else(|_| json!({}));
                if let Value::Object(ref mut map) = value {
                    map.insert("store".to_string(), Value::String(self.store_name()));
                }
                value
            }
            NotifyMessage::Notification(notification) => json!({
                "store": "notifications",
                "notification": notification,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_name() {
        let msg = NotifyMessage::store(
            ExchangeId::Bingx,
            StorePayload::Balance { balance: None },
        );
        assert_eq!(msg.store_name(), "bingx.balance");

        let msg = NotifyMessage::Notification(Notification::error("Bot", "delete", "failed"));
        assert_eq!(msg.store_name(), "notifications");
    }

    #[test]
    fn test_to_json_flattens_payload() {
        let msg = NotifyMessage::store(
            ExchangeId::Kucoin,
            StorePayload::Klines {
                symbol: "XBTUSDTM".to_string(),
                period: Period::Min1,
                klines: vec![],
            },
        );
        let json = msg.to_json();
        assert_eq!(json["store"], "kucoin.klines");
        assert_eq!(json["symbol"], "XBTUSDTM");
        assert_eq!(json["period"], "1m");
        assert!(json["klines"].as_array().unwrap().is_empty());
    }
}
