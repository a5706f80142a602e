//! KuCoin 连接器：适配器实现（无流式推送）

use crate::connectors::kucoin::dto::{
    KucoinBalance, KucoinCandle, KucoinContract, KucoinFill, KucoinPosition, KucoinTransaction,
};
use crate::connectors::kucoin::rest::KucoinRestClient;
use crate::connectors::kucoin::transformer;
use crate::connectors::traits::ExchangeAdapter;
use crate::types::{
    Balance, Contract, ExchangeId, FetchError, KLine, Period, Position, Trade, Transaction,
};
use crate::utils::{Credentials, RateLimiter};
use async_trait::async_trait;
use std::sync::Arc;

/// KuCoin 适配器
pub struct KucoinConnector {
    rest: Arc<KucoinRestClient>,
}

impl KucoinConnector {
    pub fn new(credentials: Credentials, limiter: Arc<RateLimiter>) -> Self {
        KucoinConnector {
            rest: Arc::new(KucoinRestClient::new(credentials, limiter)),
        }
    }

    pub fn rest(&self) -> Arc<KucoinRestClient> {
        self.rest.clone()
    }
}

#[async_trait]
impl ExchangeAdapter for KucoinConnector {
    type Transaction = KucoinTransaction;
    type Trade = KucoinFill;
    type Balance = KucoinBalance;
    type Position = KucoinPosition;
    type Contract = KucoinContract;
    type KLine = KucoinCandle;

    fn exchange(&self) -> ExchangeId {
        ExchangeId::Kucoin
    }

    fn set_credentials(&self, credentials: Credentials) {
        self.rest.set_credentials(credentials);
    }

    fn credential_fingerprint(&self) -> String {
        self.rest.credential_fingerprint()
    }

    async fn fetch_transactions(
        &self,
        existing: Vec<KucoinTransaction>,
    ) -> Result<Vec<KucoinTransaction>, FetchError> {
        self.rest.fetch_transactions(existing).await
    }

    async fn fetch_trades(&self, existing: Vec<KucoinFill>) -> Result<Vec<KucoinFill>, FetchError> {
        self.rest.fetch_trades(existing).await
    }

    async fn fetch_balance(&self) -> Result<Option<KucoinBalance>, FetchError> {
        self.rest.fetch_balance().await
    }

    async fn fetch_positions(&self) -> Result<Vec<KucoinPosition>, FetchError> {
        self.rest.fetch_positions().await
    }

    async fn fetch_contracts(&self) -> Result<Vec<KucoinContract>, FetchError> {
        self.rest.fetch_contracts().await
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<KucoinCandle>, FetchError> {
        self.rest.fetch_klines(symbol, period).await
    }

    fn transaction_key(tx: &KucoinTransaction) -> (String, String) {
        (tx.offset.to_string(), "0".to_string())
    }

    fn trade_key(fill: &KucoinFill) -> (String, String) {
        (fill.order_id.clone(), fill.trade_id.clone())
    }

    fn transactions_transform(txs: &[KucoinTransaction]) -> Vec<Transaction> {
        transformer::transactions_transform(txs)
    }

    fn trades_transform(fills: &[KucoinFill]) -> Vec<Trade> {
        transformer::trades_transform(fills)
    }

    fn balance_transform(balance: Option<&KucoinBalance>) -> Balance {
        transformer::balance_transform(balance)
    }

    fn positions_transform(positions: &[KucoinPosition]) -> Vec<Position> {
        transformer::positions_transform(positions)
    }

    fn contracts_transform(contracts: &[KucoinContract]) -> Vec<Contract> {
        transformer::contracts_transform(contracts)
    }

    fn klines_transform(candles: &[KucoinCandle]) -> Vec<KLine> {
        transformer::klines_transform(candles)
    }
}
