// src/connectors/traits.rs - 连接器核心 Trait 定义

use crate::types::{
    Balance, Contract, FetchError, KLine, Period, Position, Trade, Transaction,
};
use crate::types::{AppError, ExchangeId};
use crate::utils::Credentials;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// 交易所适配器：REST 拉取 + 纯转换 + 可选流式推送，一个交易所实现一个。
/// 编排层（service 模块）对该 trait 泛型，新增交易所不需要改编排代码。
#[async_trait]
pub trait ExchangeAdapter: Send + Sync + 'static {
    /// 交易所原生账单类型（缓存与去重都作用在原生形状上）
    type Transaction: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;
    /// 交易所原生成交类型
    type Trade: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Balance: Clone + Send + Sync + 'static;
    type Position: Clone + Send + Sync + 'static;
    type Contract: Clone + Send + Sync + 'static;
    type KLine: Clone + Send + Sync + 'static;

    fn exchange(&self) -> ExchangeId;

    /// 替换凭证。旧连接/分区的切换由编排层负责。
    fn set_credentials(&self, credentials: Credentials);

    /// 当前凭证指纹，作为缓存分区键
    fn credential_fingerprint(&self) -> String;

    /// 以当前已知历史为种子做增量拉取，返回合并后的全量历史（时间倒序）。
    /// 分页中途出错时保留已取得的页；首页即失败才返回 Err。
    async fn fetch_transactions(
        &self,
        existing: Vec<Self::Transaction>,
    ) -> Result<Vec<Self::Transaction>, FetchError>;

    async fn fetch_trades(&self, existing: Vec<Self::Trade>) -> Result<Vec<Self::Trade>, FetchError>;

    /// USDT 保证金账户余额；多币种响应中无 USDT 条目时返回 Ok(None)
    async fn fetch_balance(&self) -> Result<Option<Self::Balance>, FetchError>;

    async fn fetch_positions(&self) -> Result<Vec<Self::Position>, FetchError>;

    async fn fetch_contracts(&self) -> Result<Vec<Self::Contract>, FetchError>;

    /// 最近至多 1000 根 K 线
    async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<Self::KLine>, FetchError>;

    /// 账单身份键 `(tran_id, trade_id)`，用于去重
    fn transaction_key(tx: &Self::Transaction) -> (String, String);

    /// 成交身份键 `(order_id, trade_id)`
    fn trade_key(trade: &Self::Trade) -> (String, String);

    // 纯转换，无 I/O。空输入返回空输出，缺失余额返回零值默认。
    fn transactions_transform(txs: &[Self::Transaction]) -> Vec<Transaction>;
    fn trades_transform(trades: &[Self::Trade]) -> Vec<Trade>;
    fn balance_transform(balance: Option<&Self::Balance>) -> Balance;
    fn positions_transform(positions: &[Self::Position]) -> Vec<Position>;
    fn contracts_transform(contracts: &[Self::Contract]) -> Vec<Contract>;
    fn klines_transform(klines: &[Self::KLine]) -> Vec<KLine>;

    /// 支持私有流的交易所返回传输层实现，其余返回 None
    fn stream_transport(&self) -> Option<Arc<dyn StreamTransport>> {
        None
    }

    /// 解析一条已解码的 WebSocket JSON 文本
    fn parse_ws_message(&self, text: &str) -> WsMessage {
        let _ = text;
        WsMessage::Ignored
    }

    /// 订阅 K 线时使用的频道名
    fn kline_channel(&self, symbol: &str, period: Period) -> String {
        format!("{}@kline_{}", symbol, period.as_str())
    }
}

/// WebSocket 传输层：监听密钥生命周期 + 流地址 + 帧解码。
/// 泛型 WebSocket 客户端（stream 模块）只依赖这一层差异。
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// 签发私有流会话密钥
    async fn issue_listen_key(&self) -> Result<String, FetchError>;

    /// 续期会话密钥；失败只记日志，不拆连接
    async fn extend_listen_key(&self, listen_key: &str) -> Result<(), FetchError>;

    fn stream_url(&self, listen_key: &str) -> String;

    /// 解码一帧二进制负载为 UTF-8 文本（BingX 为 gzip）
    fn decode_frame(&self, payload: &[u8]) -> Result<String, AppError>;
}

/// 归一化后的 WebSocket 消息
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// K 线增量（一条消息可携带多根）
    Kline {
        symbol: String,
        period: Period,
        klines: Vec<KLine>,
    },
    /// 订单/成交更新，触发一次带外刷新
    OrderUpdate,
    /// 账户余额/持仓推送（当前仅记录）
    AccountUpdate,
    /// 会话密钥过期，需强制换新重连
    ListenKeyExpired,
    /// 已识别但无需处理，或无法识别
    Ignored,
}
