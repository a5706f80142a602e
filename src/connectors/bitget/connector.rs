//! Bitget 连接器：适配器实现（无流式推送）

use crate::connectors::bitget::dto::{
    BitgetAccount, BitgetBill, BitgetCandle, BitgetContract, BitgetFill, BitgetPosition,
};
use crate::connectors::bitget::rest::BitgetRestClient;
use crate::connectors::bitget::transformer;
use crate::connectors::traits::ExchangeAdapter;
use crate::types::{
    Balance, Contract, ExchangeId, FetchError, KLine, Period, Position, Trade, Transaction,
};
use crate::utils::{Credentials, RateLimiter};
use async_trait::async_trait;
use std::sync::Arc;

/// Bitget 适配器
pub struct BitgetConnector {
    rest: Arc<BitgetRestClient>,
}

impl BitgetConnector {
    pub fn new(credentials: Credentials, limiter: Arc<RateLimiter>) -> Self {
        BitgetConnector {
            rest: Arc::new(BitgetRestClient::new(credentials, limiter)),
        }
    }

    pub fn rest(&self) -> Arc<BitgetRestClient> {
        self.rest.clone()
    }
}

#[async_trait]
impl ExchangeAdapter for BitgetConnector {
    type Transaction = BitgetBill;
    type Trade = BitgetFill;
    type Balance = BitgetAccount;
    type Position = BitgetPosition;
    type Contract = BitgetContract;
    type KLine = BitgetCandle;

    fn exchange(&self) -> ExchangeId {
        ExchangeId::Bitget
    }

    fn set_credentials(&self, credentials: Credentials) {
        self.rest.set_credentials(credentials);
    }

    fn credential_fingerprint(&self) -> String {
        self.rest.credential_fingerprint()
    }

    async fn fetch_transactions(
        &self,
        existing: Vec<BitgetBill>,
    ) -> Result<Vec<BitgetBill>, FetchError> {
        self.rest.fetch_transactions(existing).await
    }

    async fn fetch_trades(&self, existing: Vec<BitgetFill>) -> Result<Vec<BitgetFill>, FetchError> {
        self.rest.fetch_trades(existing).await
    }

    async fn fetch_balance(&self) -> Result<Option<BitgetAccount>, FetchError> {
        self.rest.fetch_balance().await
    }

    async fn fetch_positions(&self) -> Result<Vec<BitgetPosition>, FetchError> {
        self.rest.fetch_positions().await
    }

    async fn fetch_contracts(&self) -> Result<Vec<BitgetContract>, FetchError> {
        self.rest.fetch_contracts().await
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<BitgetCandle>, FetchError> {
        self.rest.fetch_klines(symbol, period).await
    }

    fn transaction_key(bill: &BitgetBill) -> (String, String) {
        (bill.bill_id.clone(), bill.bill_id.clone())
    }

    fn trade_key(fill: &BitgetFill) -> (String, String) {
        (fill.order_id.clone(), fill.trade_id.clone())
    }

    fn transactions_transform(bills: &[BitgetBill]) -> Vec<Transaction> {
        transformer::transactions_transform(bills)
    }

    fn trades_transform(fills: &[BitgetFill]) -> Vec<Trade> {
        transformer::trades_transform(fills)
    }

    fn balance_transform(account: Option<&BitgetAccount>) -> Balance {
        transformer::balance_transform(account)
    }

    fn positions_transform(positions: &[BitgetPosition]) -> Vec<Position> {
        transformer::positions_transform(positions)
    }

    fn contracts_transform(contracts: &[BitgetContract]) -> Vec<Contract> {
        transformer::contracts_transform(contracts)
    }

    fn klines_transform(candles: &[BitgetCandle]) -> Vec<KLine> {
        transformer::klines_transform(candles)
    }
}
