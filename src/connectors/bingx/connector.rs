//! BingX 连接器：适配器实现 + WebSocket 传输层
//!
//! 把 REST 客户端与转换层拼装成编排层使用的 ExchangeAdapter；
//! 私有流通过 listenKey 鉴权，帧为 gzip 压缩。

use crate::connectors::bingx::constants::*;
use crate::connectors::bingx::dto::{
    BingxBalance, BingxContract, BingxKLine, BingxPosition, BingxTrade, BingxTransaction,
    BingxWsKlineEvent,
};
use crate::connectors::bingx::rest::BingxRestClient;
use crate::connectors::bingx::transformer;
use crate::connectors::traits::{ExchangeAdapter, StreamTransport, WsMessage};
use crate::types::{
    AppError, Balance, Contract, ExchangeId, FetchError, KLine, Period, Position, Trade,
    Transaction,
};
use crate::utils::compress::gzip_decompress_text;
use crate::utils::{Credentials, RateLimiter};
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// K 线频道名，形如 "BTC-USDT@kline_1m"
static KLINE_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9-]+)@kline_([0-9]+[mhdwM])$").expect("valid kline regex"));

fn parse_kline_channel(data_type: &str) -> Option<(String, Period)> {
    let caps = KLINE_CHANNEL.captures(data_type)?;
    let symbol = caps.get(1)?.as_str().to_string();
    let period = caps.get(2)?.as_str().parse::<Period>().ok()?;
    Some((symbol, period))
}

/// BingX 适配器
pub struct BingxConnector {
    rest: Arc<BingxRestClient>,
}

impl BingxConnector {
    pub fn new(credentials: Credentials, limiter: Arc<RateLimiter>) -> Self {
        BingxConnector {
            rest: Arc::new(BingxRestClient::new(credentials, limiter)),
        }
    }

    pub fn rest(&self) -> Arc<BingxRestClient> {
        self.rest.clone()
    }
}

#[async_trait]
impl ExchangeAdapter for BingxConnector {
    type Transaction = BingxTransaction;
    type Trade = BingxTrade;
    type Balance = BingxBalance;
    type Position = BingxPosition;
    type Contract = BingxContract;
    type KLine = BingxKLine;

    fn exchange(&self) -> ExchangeId {
        ExchangeId::Bingx
    }

    fn set_credentials(&self, credentials: Credentials) {
        self.rest.set_credentials(credentials);
    }

    fn credential_fingerprint(&self) -> String {
        self.rest.credential_fingerprint()
    }

    async fn fetch_transactions(
        &self,
        existing: Vec<BingxTransaction>,
    ) -> Result<Vec<BingxTransaction>, FetchError> {
        self.rest.fetch_transactions(existing).await
    }

    async fn fetch_trades(&self, existing: Vec<BingxTrade>) -> Result<Vec<BingxTrade>, FetchError> {
        self.rest.fetch_trades(existing).await
    }

    async fn fetch_balance(&self) -> Result<Option<BingxBalance>, FetchError> {
        self.rest.fetch_balance().await
    }

    async fn fetch_positions(&self) -> Result<Vec<BingxPosition>, FetchError> {
        self.rest.fetch_positions().await
    }

    async fn fetch_contracts(&self) -> Result<Vec<BingxContract>, FetchError> {
        self.rest.fetch_contracts().await
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<BingxKLine>, FetchError> {
        self.rest.fetch_klines(symbol, period).await
    }

    fn transaction_key(tx: &BingxTransaction) -> (String, String) {
        (tx.tran_id.clone(), tx.trade_id.clone())
    }

    fn trade_key(trade: &BingxTrade) -> (String, String) {
        (trade.order_id.clone(), trade.trade_id.clone())
    }

    fn transactions_transform(txs: &[BingxTransaction]) -> Vec<Transaction> {
        transformer::transactions_transform(txs)
    }

    fn trades_transform(trades: &[BingxTrade]) -> Vec<Trade> {
        transformer::trades_transform(trades)
    }

    fn balance_transform(balance: Option<&BingxBalance>) -> Balance {
        transformer::balance_transform(balance)
    }

    fn positions_transform(positions: &[BingxPosition]) -> Vec<Position> {
        transformer::positions_transform(positions)
    }

    fn contracts_transform(contracts: &[BingxContract]) -> Vec<Contract> {
        transformer::contracts_transform(contracts)
    }

    fn klines_transform(klines: &[BingxKLine]) -> Vec<KLine> {
        transformer::klines_transform(klines)
    }

    fn stream_transport(&self) -> Option<Arc<dyn StreamTransport>> {
        Some(Arc::new(BingxStreamTransport {
            rest: self.rest.clone(),
        }))
    }

    /// 消息路由：带 "e" 的是账户事件，带 "dataType" 的是行情推送
    fn parse_ws_message(&self, text: &str) -> WsMessage {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                debug!("[Bingx] 无法解析的 WS 消息: {err}");
                return WsMessage::Ignored;
            }
        };

        if let Some(event) = value.get("e").and_then(|e| e.as_str()) {
            return match event {
                "ORDER_TRADE_UPDATE" | "TRADE_UPDATE" => WsMessage::OrderUpdate,
                "ACCOUNT_UPDATE" => WsMessage::AccountUpdate,
                "listenKeyExpired" => WsMessage::ListenKeyExpired,
                "SNAPSHOT" => WsMessage::Ignored,
                other => {
                    debug!("[Bingx] 未处理的账户事件: {other}");
                    WsMessage::Ignored
                }
            };
        }

        let data_type = value
            .get("dataType")
            .and_then(|d| d.as_str())
            .map(str::to_string);
        if let Some(data_type) = data_type {
            if data_type.is_empty() {
                return WsMessage::Ignored;
            }
            match parse_kline_channel(&data_type) {
                Some((symbol, period)) => {
                    if let Ok(event) = serde_json::from_value::<BingxWsKlineEvent>(value) {
                        return WsMessage::Kline {
                            symbol,
                            period,
                            klines: transformer::ws_kline_transform(&event.data),
                        };
                    }
                }
                None => debug!("[Bingx] 未处理的行情频道: {data_type}"),
            }
        }

        WsMessage::Ignored
    }
}

/// BingX 私有流传输层：listenKey 会话 + gzip 帧
pub struct BingxStreamTransport {
    rest: Arc<BingxRestClient>,
}

#[async_trait]
impl StreamTransport for BingxStreamTransport {
    async fn issue_listen_key(&self) -> Result<String, FetchError> {
        self.rest.get_ws_listen_key().await
    }

    async fn extend_listen_key(&self, listen_key: &str) -> Result<(), FetchError> {
        self.rest.extend_ws_listen_key(listen_key).await
    }

    fn stream_url(&self, listen_key: &str) -> String {
        format!("{BINGX_WS_URL}?listenKey={listen_key}")
    }

    fn decode_frame(&self, payload: &[u8]) -> Result<String, AppError> {
        gzip_decompress_text(payload)
    }
}
