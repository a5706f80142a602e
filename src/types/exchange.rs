// src/types/exchange.rs - 交易所标识

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 支持的交易所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    /// BingX USDT 永续
    Bingx,
    /// Bitget USDT 永续
    Bitget,
    /// KuCoin Futures
    Kucoin,
}

impl ExchangeId {
    /// 通知事件 store 前缀使用的小写名称
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Bingx => "bingx",
            ExchangeId::Bitget => "bitget",
            ExchangeId::Kucoin => "kucoin",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bingx" => Ok(ExchangeId::Bingx),
            "bitget" => Ok(ExchangeId::Bitget),
            "kucoin" => Ok(ExchangeId::Kucoin),
            other => Err(format!("unknown exchange: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_id_roundtrip() {
        for id in [ExchangeId::Bingx, ExchangeId::Bitget, ExchangeId::Kucoin] {
            assert_eq!(id.as_str().parse::<ExchangeId>().unwrap(), id);
        }
        assert!("binance".parse::<ExchangeId>().is_err());
    }
}
