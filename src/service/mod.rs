//! 交易所服务编排
//!
//! 每个交易所一个单写者 actor：刷新定时、WebSocket 事件、外部命令都以
//! 消息进入同一个任务，由它独占归一化快照与原生历史。刷新迭代串行执行，
//! 慢迭代顺延下一跳而不是并发重入；某一类别拉取失败只影响该类别，其余
//! 照常更新并通知。

pub mod kline;

use crate::cache::CacheStore;
use crate::connectors::traits::{ExchangeAdapter, WsMessage};
use crate::notify::NotificationHub;
use crate::stream::ExchangeWebSocketClient;
use crate::types::{
    Balance, CachedData, Contract, ExchangeId, KLine, NotifyMessage, Period, Position,
    StorePayload, Trade, Transaction,
};
use crate::utils::Credentials;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use uuid::Uuid;

/// 默认刷新间隔
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// 按身份键去重，保留首个出现的记录。幂等：dedup(dedup(x)) == dedup(x)。
pub fn dedup_by_identity<T, K>(items: Vec<T>, key: K) -> Vec<T>
where
    K: Fn(&T) -> (String, String),
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

/// 一个 (symbol, period) 的 K 线序列与其订阅 id。
/// 订阅 id 每个符号只生成一次，切换周期后复用。
#[derive(Debug, Clone)]
pub struct KlineSeries {
    pub subscription_id: String,
    pub period: Period,
    pub data: Vec<KLine>,
}

/// 归一化快照：整体替换的五个类别 + 增量合并的 K 线序列
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub trades: Vec<Trade>,
    pub balance: Option<Balance>,
    pub positions: Vec<Position>,
    pub contracts: Vec<Contract>,
    pub klines: HashMap<String, KlineSeries>,
}

/// 交易所原生历史，缓存与去重作用在这层
struct OriginalHistory<A: ExchangeAdapter> {
    transactions: Vec<A::Transaction>,
    trades: Vec<A::Trade>,
}

impl<A: ExchangeAdapter> OriginalHistory<A> {
    fn new() -> Self {
        OriginalHistory {
            transactions: Vec::new(),
            trades: Vec::new(),
        }
    }
}

enum ServiceCommand {
    SetCredentials(Credentials),
    StartAutoRefresh(Duration),
    StopAutoRefresh,
    StopWebSocket,
    Refresh,
    LoadSymbolKlines { symbol: String, period: Period },
    RemoveSymbolKlines { symbol: String, period: Period },
    Shutdown,
}

enum LoopEvent {
    Command(Option<ServiceCommand>),
    Ws(Option<String>),
    RefreshTick,
}

/// 服务句柄：向 actor 发送命令。由启动方持有，drop 即停止服务。
pub struct ExchangeServiceHandle {
    exchange: ExchangeId,
    cmd_tx: mpsc::UnboundedSender<ServiceCommand>,
    ws_tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl ExchangeServiceHandle {
    /// 启动一个交易所服务 actor
    pub fn spawn<A: ExchangeAdapter>(
        adapter: A,
        mut cache: CacheStore,
        hub: NotificationHub,
    ) -> ExchangeServiceHandle {
        let exchange = adapter.exchange();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (ws_tx, ws_rx) = mpsc::unbounded_channel();

        cache.set_partition(&adapter.credential_fingerprint());

        let actor = ServiceActor {
            exchange,
            adapter: Arc::new(adapter),
            cache,
            hub,
            ws: None,
            ws_tx: ws_tx.clone(),
            original: OriginalHistory::new(),
            snapshot: Snapshot::default(),
            history_loaded: false,
        };
        let task = tokio::spawn(actor.run(cmd_rx, ws_rx));

        ExchangeServiceHandle {
            exchange,
            cmd_tx,
            ws_tx,
            task,
        }
    }

    pub fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    /// 换凭证：适配器换 key、缓存换分区、WebSocket 换 listenKey 重连，
    /// 内存中的旧账户数据一并丢弃
    pub fn set_credentials(&self, credentials: Credentials) {
        self.send(ServiceCommand::SetCredentials(credentials));
    }

    /// 启动周期刷新：立即跑一轮，然后按 interval 重复
    pub fn start_auto_refresh(&self, interval: Duration) {
        self.send(ServiceCommand::StartAutoRefresh(interval));
    }

    pub fn stop_auto_refresh(&self) {
        self.send(ServiceCommand::StopAutoRefresh);
    }

    pub fn stop_web_socket(&self) {
        self.send(ServiceCommand::StopWebSocket);
    }

    /// 带外刷新一轮（不影响周期计划）
    pub fn refresh_now(&self) {
        self.send(ServiceCommand::Refresh);
    }

    pub fn load_symbol_klines(&self, symbol: &str, period: Period) {
        self.send(ServiceCommand::LoadSymbolKlines {
            symbol: symbol.to_string(),
            period,
        });
    }

    pub fn remove_symbol_klines(&self, symbol: &str, period: Period) {
        self.send(ServiceCommand::RemoveSymbolKlines {
            symbol: symbol.to_string(),
            period,
        });
    }

    /// 直接投递一条原始 WebSocket 消息（回放、测试）
    pub fn inject_ws_event(&self, text: &str) {
        if self.ws_tx.send(text.to_string()).is_err() {
            warn!("[{}] service task gone, ws event dropped", self.exchange);
        }
    }

    /// 停止服务并等待 actor 退出
    pub async fn shutdown(self) {
        self.send(ServiceCommand::Shutdown);
        let _ = self.task.await;
    }

    fn send(&self, command: ServiceCommand) {
        if self.cmd_tx.send(command).is_err() {
            warn!("[{}] service task gone, command dropped", self.exchange);
        }
    }
}

struct ServiceActor<A: ExchangeAdapter> {
    exchange: ExchangeId,
    adapter: Arc<A>,
    cache: CacheStore,
    hub: NotificationHub,
    ws: Option<ExchangeWebSocketClient>,
    ws_tx: mpsc::UnboundedSender<String>,
    original: OriginalHistory<A>,
    snapshot: Snapshot,
    history_loaded: bool,
}

impl<A: ExchangeAdapter> ServiceActor<A> {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<ServiceCommand>,
        mut ws_rx: mpsc::UnboundedReceiver<String>,
    ) {
        info!("[{}] service started", self.exchange);
        let mut refresh: Option<Interval> = None;

        loop {
            let event = if let Some(interval) = refresh.as_mut() {
                tokio::select! {
                    cmd = cmd_rx.recv() => LoopEvent::Command(cmd),
                    text = ws_rx.recv() => LoopEvent::Ws(text),
                    _ = interval.tick() => LoopEvent::RefreshTick,
                }
            } else {
                tokio::select! {
                    cmd = cmd_rx.recv() => LoopEvent::Command(cmd),
                    text = ws_rx.recv() => LoopEvent::Ws(text),
                }
            };

            match event {
                LoopEvent::Command(None) => break,
                LoopEvent::Command(Some(command)) => {
                    if !self.handle_command(command, &mut refresh).await {
                        break;
                    }
                }
                LoopEvent::Ws(Some(text)) => self.handle_ws_text(&text).await,
                // actor 自身持有 ws_tx 克隆，通道不会关闭
                LoopEvent::Ws(None) => {}
                LoopEvent::RefreshTick => self.refresh_cycle().await,
            }
        }

        if let Some(ws) = self.ws.as_mut() {
            ws.stop().await;
        }
        info!("[{}] service stopped", self.exchange);
    }

    /// 返回 false 表示退出主循环
    async fn handle_command(
        &mut self,
        command: ServiceCommand,
        refresh: &mut Option<Interval>,
    ) -> bool {
        match command {
            ServiceCommand::SetCredentials(credentials) => {
                info!("[{}] credentials updated", self.exchange);
                self.adapter.set_credentials(credentials);
                self.cache
                    .set_partition(&self.adapter.credential_fingerprint());
                // 旧账户的内存数据不得漂移进新分区
                self.original = OriginalHistory::new();
                self.snapshot.transactions.clear();
                self.snapshot.trades.clear();
                self.snapshot.balance = None;
                self.snapshot.positions.clear();
                self.snapshot.contracts.clear();
                self.history_loaded = false;

                if let Some(ws) = self.ws.as_mut() {
                    if let Err(err) = ws.update_listen_key().await {
                        warn!("[{}] ws reconnect after credential change failed: {err}", self.exchange);
                    }
                }
            }
            ServiceCommand::StartAutoRefresh(period) => {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // interval 的首跳立即触发，等价于「先刷一轮再进周期」
                *refresh = Some(interval);
                info!(
                    "[{}] auto-refresh started: every {}s",
                    self.exchange,
                    period.as_secs()
                );
            }
            ServiceCommand::StopAutoRefresh => {
                if let Some(ws) = self.ws.as_mut() {
                    ws.stop().await;
                }
                if refresh.take().is_some() {
                    info!("[{}] auto-refresh stopped", self.exchange);
                }
            }
            ServiceCommand::StopWebSocket => {
                if let Some(ws) = self.ws.as_mut() {
                    ws.stop().await;
                }
            }
            ServiceCommand::Refresh => self.refresh_cycle().await,
            ServiceCommand::LoadSymbolKlines { symbol, period } => {
                self.load_symbol_klines(symbol, period).await;
            }
            ServiceCommand::RemoveSymbolKlines { symbol, period } => {
                self.remove_symbol_klines(symbol, period).await;
            }
            ServiceCommand::Shutdown => return false,
        }
        true
    }

    /// 一轮刷新。任何类别失败都被捕获记录，绝不让周期停摆。
    async fn refresh_cycle(&mut self) {
        info!("[{}] refresh cycle", self.exchange);

        if !self.history_loaded {
            self.load_cached_history().await;
            self.history_loaded = true;
        }

        match self
            .adapter
            .fetch_transactions(self.original.transactions.clone())
            .await
        {
            Ok(merged) => {
                self.original.transactions = dedup_by_identity(merged, A::transaction_key);
            }
            Err(err) => error!("[{}] transactions fetch failed: {err}", self.exchange),
        }

        match self.adapter.fetch_trades(self.original.trades.clone()).await {
            Ok(merged) => {
                self.original.trades = dedup_by_identity(merged, A::trade_key);
            }
            Err(err) => error!("[{}] trades fetch failed: {err}", self.exchange),
        }

        match self.adapter.fetch_balance().await {
            Ok(native) => {
                self.snapshot.balance = Some(A::balance_transform(native.as_ref()));
            }
            Err(err) => error!("[{}] balance fetch failed: {err}", self.exchange),
        }

        match self.adapter.fetch_positions().await {
            Ok(native) => self.snapshot.positions = A::positions_transform(&native),
            Err(err) => error!("[{}] positions fetch failed: {err}", self.exchange),
        }

        match self.adapter.fetch_contracts().await {
            Ok(native) => self.snapshot.contracts = A::contracts_transform(&native),
            Err(err) => error!("[{}] contracts fetch failed: {err}", self.exchange),
        }

        self.persist_history().await;

        self.snapshot.transactions = A::transactions_transform(&self.original.transactions);
        self.snapshot.trades = A::trades_transform(&self.original.trades);

        // 五个类别各发一次通知；失败类别带着现有数据照发
        self.publish(StorePayload::Transactions {
            transactions: self.snapshot.transactions.clone(),
        });
        self.publish(StorePayload::Trades {
            trades: self.snapshot.trades.clone(),
        });
        self.publish(StorePayload::Balance {
            balance: self.snapshot.balance.clone(),
        });
        self.publish(StorePayload::Positions {
            positions: self.snapshot.positions.clone(),
        });
        self.publish(StorePayload::Contracts {
            contracts: self.snapshot.contracts.clone(),
        });

        info!(
            "[{}] refresh done: {} transactions, {} trades, {} positions",
            self.exchange,
            self.snapshot.transactions.len(),
            self.snapshot.trades.len(),
            self.snapshot.positions.len()
        );
    }

    /// 首轮刷新前从磁盘恢复历史，按身份键去重
    async fn load_cached_history(&mut self) {
        if self.original.transactions.is_empty() {
            if let Some(cached) = self
                .cache
                .read::<A::Transaction>(&self.transactions_cache_file())
                .await
            {
                let raw = cached.data.len();
                self.original.transactions = dedup_by_identity(cached.data, A::transaction_key);
                info!(
                    "[{}] cache: {} transactions ({} after dedup)",
                    self.exchange,
                    raw,
                    self.original.transactions.len()
                );
            }
        }
        if self.original.trades.is_empty() {
            if let Some(cached) = self.cache.read::<A::Trade>(&self.trades_cache_file()).await {
                let raw = cached.data.len();
                self.original.trades = dedup_by_identity(cached.data, A::trade_key);
                info!(
                    "[{}] cache: {} trades ({} after dedup)",
                    self.exchange,
                    raw,
                    self.original.trades.len()
                );
            }
        }
    }

    async fn persist_history(&self) {
        let now = Utc::now().timestamp_millis();
        self.cache
            .write(
                &self.transactions_cache_file(),
                &CachedData {
                    last_updated: now,
                    data: self.original.transactions.clone(),
                },
            )
            .await;
        self.cache
            .write(
                &self.trades_cache_file(),
                &CachedData {
                    last_updated: now,
                    data: self.original.trades.clone(),
                },
            )
            .await;
    }

    fn transactions_cache_file(&self) -> String {
        format!("{}.transactions.json", self.exchange.as_str())
    }

    fn trades_cache_file(&self) -> String {
        format!("{}.trades.json", self.exchange.as_str())
    }

    /// REST 拉一窗最近 K 线整体替换序列，然后订阅对应实时频道
    async fn load_symbol_klines(&mut self, symbol: String, period: Period) {
        let series = self
            .snapshot
            .klines
            .entry(symbol.clone())
            .or_insert_with(|| KlineSeries {
                subscription_id: Uuid::new_v4().to_string(),
                period,
                data: Vec::new(),
            });
        series.period = period;

        match self.adapter.fetch_klines(&symbol, period).await {
            Ok(native) => series.data = A::klines_transform(&native),
            Err(err) => {
                error!("[{}] kline fetch failed for {symbol}: {err}", self.exchange);
                series.data = Vec::new();
            }
        }

        let data = series.data.clone();
        let subscription_id = series.subscription_id.clone();
        self.publish(StorePayload::Klines {
            symbol: symbol.clone(),
            period,
            klines: data,
        });

        let channel = self.adapter.kline_channel(&symbol, period);
        if let Some(ws) = self.ensure_ws() {
            if let Err(err) = ws.subscribe(&subscription_id, &channel).await {
                error!("[{}] ws subscribe failed for {channel}: {err}", self.exchange);
            }
        }
    }

    /// 清空序列、通知空序列、退订频道。订阅 id 保留给周期切换复用。
    async fn remove_symbol_klines(&mut self, symbol: String, period: Period) {
        let Some(series) = self.snapshot.klines.get_mut(&symbol) else {
            return;
        };
        series.data.clear();
        let subscription_id = series.subscription_id.clone();

        self.publish(StorePayload::Klines {
            symbol: symbol.clone(),
            period,
            klines: Vec::new(),
        });

        let channel = self.adapter.kline_channel(&symbol, period);
        if let Some(ws) = self.ws.as_mut() {
            if let Err(err) = ws.unsubscribe(&subscription_id, &channel).await {
                warn!("[{}] ws unsubscribe failed for {channel}: {err}", self.exchange);
            }
        }
    }

    async fn handle_ws_text(&mut self, text: &str) {
        match self.adapter.parse_ws_message(text) {
            WsMessage::Kline {
                symbol,
                period,
                klines,
            } => self.apply_kline_ticks(symbol, period, klines),
            WsMessage::OrderUpdate => {
                // 成交回报不等下一个周期跳，立即带外刷新持仓与余额
                info!("[{}] order update, refreshing out of band", self.exchange);
                self.refresh_cycle().await;
            }
            WsMessage::AccountUpdate => {
                debug!("[{}] account update event", self.exchange);
            }
            WsMessage::ListenKeyExpired => {
                warn!("[{}] listen key expired, reconnecting", self.exchange);
                if let Some(ws) = self.ws.as_mut() {
                    if let Err(err) = ws.update_listen_key().await {
                        error!("[{}] reconnect failed: {err}", self.exchange);
                    }
                }
            }
            WsMessage::Ignored => {}
        }
    }

    fn apply_kline_ticks(&mut self, symbol: String, period: Period, ticks: Vec<KLine>) {
        let Some(series) = self.snapshot.klines.get_mut(&symbol) else {
            debug!("[{}] kline tick for unknown symbol {symbol}", self.exchange);
            return;
        };
        kline::merge_ticks(&mut series.data, ticks, kline::KLINE_SERIES_CAP);
        let data = series.data.clone();
        self.publish(StorePayload::Klines {
            symbol,
            period,
            klines: data,
        });
    }

    fn ensure_ws(&mut self) -> Option<&mut ExchangeWebSocketClient> {
        if self.ws.is_none() {
            if let Some(transport) = self.adapter.stream_transport() {
                self.ws = Some(ExchangeWebSocketClient::new(transport, self.ws_tx.clone()));
            }
        }
        self.ws.as_mut()
    }

    fn publish(&self, payload: StorePayload) {
        self.hub.publish(NotifyMessage::store(self.exchange, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FetchError, PositionSide, TradeSide};
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;
    use tokio::time::timeout;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct MockRecord {
        id: String,
        sub_id: String,
        time: i64,
    }

    fn record(id: &str, time: i64) -> MockRecord {
        MockRecord {
            id: id.to_string(),
            sub_id: "0".to_string(),
            time,
        }
    }

    #[derive(Default)]
    struct MockState {
        credentials: Credentials,
        new_transactions: Vec<MockRecord>,
        new_trades: Vec<MockRecord>,
        balance: Option<f64>,
        fail_balance: bool,
        fail_transactions: bool,
        positions: Vec<String>,
        contracts: Vec<String>,
        klines: Vec<KLine>,
        transaction_fetches: u32,
    }

    struct MockAdapter {
        state: Arc<Mutex<MockState>>,
    }

    #[derive(Debug, Deserialize)]
    struct MockWsEvent {
        symbol: String,
        period: Period,
        klines: Vec<KLine>,
    }

    fn sample_position(symbol: &str) -> Position {
        Position {
            symbol: symbol.to_string(),
            position_id: None,
            position_side: PositionSide::Long,
            isolated: false,
            position_amt: 1.0,
            available_amt: 1.0,
            unrealized_profit: 0.0,
            realised_profit: 0.0,
            initial_margin: None,
            margin: 10.0,
            avg_price: 100.0,
            liquidation_price: 50.0,
            leverage: 5.0,
            position_value: None,
            mark_price: 101.0,
            risk_rate: None,
            max_margin_reduction: None,
            pnl_ratio: None,
            create_time: 0,
            update_time: 0,
        }
    }

    fn sample_contract(symbol: &str) -> Contract {
        Contract {
            contract_id: symbol.to_string(),
            symbol: symbol.to_string(),
            quantity_precision: 4.0,
            price_precision: 2.0,
            taker_fee_rate: 0.0005,
            maker_fee_rate: 0.0002,
            trade_min_quantity: 0.001,
            trade_min_usdt: 5.0,
            currency: "USDT".to_string(),
            asset: symbol.to_string(),
            status: crate::types::ContractStatus::Normal,
            api_state_open: true,
            api_state_close: true,
            ensure_trigger: false,
            trigger_fee_rate: 0.0,
            broker_state: true,
            launch_time: None,
            maintain_time: 0,
            off_time: 0,
        }
    }

    #[async_trait::async_trait]
    impl ExchangeAdapter for MockAdapter {
        type Transaction = MockRecord;
        type Trade = MockRecord;
        type Balance = f64;
        type Position = String;
        type Contract = String;
        type KLine = KLine;

        fn exchange(&self) -> ExchangeId {
            ExchangeId::Bingx
        }

        fn set_credentials(&self, credentials: Credentials) {
            self.state.lock().unwrap().credentials = credentials;
        }

        fn credential_fingerprint(&self) -> String {
            self.state.lock().unwrap().credentials.fingerprint()
        }

        async fn fetch_transactions(
            &self,
            existing: Vec<MockRecord>,
        ) -> Result<Vec<MockRecord>, FetchError> {
            let mut state = self.state.lock().unwrap();
            state.transaction_fetches += 1;
            if state.fail_transactions {
                return Err(FetchError::Http(500));
            }
            let mut merged = existing;
            merged.extend(state.new_transactions.clone());
            merged.sort_by(|a, b| b.time.cmp(&a.time));
            Ok(merged)
        }

        async fn fetch_trades(
            &self,
            existing: Vec<MockRecord>,
        ) -> Result<Vec<MockRecord>, FetchError> {
            let state = self.state.lock().unwrap();
            let mut merged = existing;
            merged.extend(state.new_trades.clone());
            merged.sort_by(|a, b| b.time.cmp(&a.time));
            Ok(merged)
        }

        async fn fetch_balance(&self) -> Result<Option<f64>, FetchError> {
            let state = self.state.lock().unwrap();
            if state.fail_balance {
                return Err(FetchError::Http(500));
            }
            Ok(state.balance)
        }

        async fn fetch_positions(&self) -> Result<Vec<String>, FetchError> {
            Ok(self.state.lock().unwrap().positions.clone())
        }

        async fn fetch_contracts(&self) -> Result<Vec<String>, FetchError> {
            Ok(self.state.lock().unwrap().contracts.clone())
        }

        async fn fetch_klines(
            &self,
            _symbol: &str,
            _period: Period,
        ) -> Result<Vec<KLine>, FetchError> {
            Ok(self.state.lock().unwrap().klines.clone())
        }

        fn transaction_key(tx: &MockRecord) -> (String, String) {
            (tx.id.clone(), tx.sub_id.clone())
        }

        fn trade_key(trade: &MockRecord) -> (String, String) {
            (trade.id.clone(), trade.sub_id.clone())
        }

        fn transactions_transform(txs: &[MockRecord]) -> Vec<Transaction> {
            txs.iter()
                .map(|tx| Transaction {
                    symbol: "BTCUSDT".to_string(),
                    income_type: "REALIZED_PNL".to_string(),
                    income: 1.0,
                    asset: "USDT".to_string(),
                    info: String::new(),
                    time: tx.time,
                    tran_id: tx.id.clone(),
                    trade_id: tx.sub_id.clone(),
                })
                .collect()
        }

        fn trades_transform(trades: &[MockRecord]) -> Vec<Trade> {
            trades
                .iter()
                .map(|trade| Trade {
                    symbol: "BTCUSDT".to_string(),
                    qty: 1.0,
                    price: 100.0,
                    quote_qty: 100.0,
                    commission: 0.1,
                    commission_asset: "USDT".to_string(),
                    order_id: trade.id.clone(),
                    trade_id: trade.sub_id.clone(),
                    filled_time: trade.time,
                    side: TradeSide::Buy,
                    position_side: "LONG".to_string(),
                    role: "TAKER".to_string(),
                    total: 100.0,
                    realised_pnl: 0.0,
                })
                .collect()
        }

        fn balance_transform(balance: Option<&f64>) -> Balance {
            match balance {
                None => Balance::default(),
                Some(equity) => Balance {
                    symbol: "USDT".to_string(),
                    equity: *equity,
                    ..Default::default()
                },
            }
        }

        fn positions_transform(positions: &[String]) -> Vec<Position> {
            positions.iter().map(|s| sample_position(s)).collect()
        }

        fn contracts_transform(contracts: &[String]) -> Vec<Contract> {
            contracts.iter().map(|s| sample_contract(s)).collect()
        }

        fn klines_transform(klines: &[KLine]) -> Vec<KLine> {
            klines.to_vec()
        }

        fn parse_ws_message(&self, text: &str) -> WsMessage {
            if text.contains("\"event\":\"order\"") {
                return WsMessage::OrderUpdate;
            }
            match serde_json::from_str::<MockWsEvent>(text) {
                Ok(event) => WsMessage::Kline {
                    symbol: event.symbol,
                    period: event.period,
                    klines: event.klines,
                },
                Err(_) => WsMessage::Ignored,
            }
        }
    }

    fn kline(timestamp: i64) -> KLine {
        KLine {
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
            timestamp,
        }
    }

    struct Fixture {
        handle: ExchangeServiceHandle,
        state: Arc<Mutex<MockState>>,
        hub: NotificationHub,
        _cache_dir: tempfile::TempDir,
        cache_root: std::path::PathBuf,
    }

    fn fixture(state: MockState) -> Fixture {
        let cache_dir = tempfile::tempdir().unwrap();
        let cache_root = cache_dir.path().to_path_buf();
        let state = Arc::new(Mutex::new(state));
        let hub = NotificationHub::new();
        let handle = ExchangeServiceHandle::spawn(
            MockAdapter {
                state: state.clone(),
            },
            CacheStore::new(&cache_root),
            hub.clone(),
        );
        Fixture {
            handle,
            state,
            hub,
            _cache_dir: cache_dir,
            cache_root,
        }
    }

    async fn wait_for_store(
        rx: &mut tokio::sync::broadcast::Receiver<NotifyMessage>,
        store: &str,
    ) -> NotifyMessage {
        loop {
            let msg = timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {store}"))
                .expect("hub closed");
            if msg.store_name() == store {
                return msg;
            }
        }
    }

    fn payload(msg: &NotifyMessage) -> &StorePayload {
        match msg {
            NotifyMessage::Store { payload, .. } => payload,
            _ => panic!("expected store message"),
        }
    }

    #[tokio::test]
    async fn test_first_refresh_loads_everything_and_persists() {
        // 2500 条账单（模拟 3 页 1000/1000/500 合并后的结果）
        let state = MockState {
            new_transactions: (1..=2500).map(|t| record(&format!("tx{t}"), t)).collect(),
            new_trades: vec![record("t1", 10), record("t2", 20)],
            balance: Some(1234.5),
            positions: vec!["BTCUSDT".to_string()],
            contracts: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            ..Default::default()
        };
        let fx = fixture(state);
        let mut rx = fx.hub.subscribe();

        // start_auto_refresh 立即触发首轮刷新
        fx.handle.start_auto_refresh(Duration::from_secs(3600));

        let msg = wait_for_store(&mut rx, "bingx.transactions").await;
        match payload(&msg) {
            StorePayload::Transactions { transactions } => {
                assert_eq!(transactions.len(), 2500);
                // 按时间倒序
                assert!(transactions.windows(2).all(|w| w[0].time >= w[1].time));
                assert_eq!(transactions[0].time, 2500);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let msg = wait_for_store(&mut rx, "bingx.balance").await;
        match payload(&msg) {
            StorePayload::Balance { balance } => {
                assert_eq!(balance.as_ref().unwrap().equity, 1234.5);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        let msg = wait_for_store(&mut rx, "bingx.positions").await;
        match payload(&msg) {
            StorePayload::Positions { positions } => assert_eq!(positions.len(), 1),
            other => panic!("unexpected payload {other:?}"),
        }
        let msg = wait_for_store(&mut rx, "bingx.contracts").await;
        match payload(&msg) {
            StorePayload::Contracts { contracts } => assert_eq!(contracts.len(), 2),
            other => panic!("unexpected payload {other:?}"),
        }

        // 历史已落盘到当前凭证分区
        let fingerprint = Credentials::default().fingerprint();
        let mut store = CacheStore::new(&fx.cache_root);
        store.set_partition(&fingerprint);
        let cached: CachedData<MockRecord> =
            store.read("bingx.transactions.json").await.unwrap();
        assert_eq!(cached.data.len(), 2500);

        fx.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_categories_flowing() {
        let state = MockState {
            fail_balance: true,
            positions: vec!["BTCUSDT".to_string()],
            contracts: vec!["BTCUSDT".to_string()],
            ..Default::default()
        };
        let fx = fixture(state);
        let mut rx = fx.hub.subscribe();

        fx.handle.refresh_now();

        // 余额失败：通知仍然发出，载荷是当前持有值（尚无，为 None）
        let msg = wait_for_store(&mut rx, "bingx.balance").await;
        match payload(&msg) {
            StorePayload::Balance { balance } => assert!(balance.is_none()),
            other => panic!("unexpected payload {other:?}"),
        }

        // 其余类别不受影响
        let msg = wait_for_store(&mut rx, "bingx.positions").await;
        match payload(&msg) {
            StorePayload::Positions { positions } => {
                assert_eq!(positions.len(), 1);
                assert_eq!(positions[0].symbol, "BTCUSDT");
            }
            other => panic!("unexpected payload {other:?}"),
        }
        let msg = wait_for_store(&mut rx, "bingx.contracts").await;
        match payload(&msg) {
            StorePayload::Contracts { contracts } => assert_eq!(contracts.len(), 1),
            other => panic!("unexpected payload {other:?}"),
        }

        fx.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_category_keeps_stale_value_next_cycle() {
        let state = MockState {
            balance: Some(1000.0),
            ..Default::default()
        };
        let fx = fixture(state);
        let mut rx = fx.hub.subscribe();

        fx.handle.refresh_now();
        let msg = wait_for_store(&mut rx, "bingx.balance").await;
        match payload(&msg) {
            StorePayload::Balance { balance } => {
                assert_eq!(balance.as_ref().unwrap().equity, 1000.0)
            }
            other => panic!("unexpected payload {other:?}"),
        }

        // 第二轮余额接口挂了：上一轮的值保持不变地再次通知
        fx.state.lock().unwrap().fail_balance = true;
        fx.handle.refresh_now();
        let msg = wait_for_store(&mut rx, "bingx.balance").await;
        match payload(&msg) {
            StorePayload::Balance { balance } => {
                assert_eq!(balance.as_ref().unwrap().equity, 1000.0)
            }
            other => panic!("unexpected payload {other:?}"),
        }

        fx.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_identity_keys_never_accumulate() {
        // 同一身份键在多轮刷新中反复出现
        let state = MockState {
            new_transactions: vec![record("dup", 10), record("dup", 10), record("other", 20)],
            ..Default::default()
        };
        let fx = fixture(state);
        let mut rx = fx.hub.subscribe();

        for _ in 0..3 {
            fx.handle.refresh_now();
            let msg = wait_for_store(&mut rx, "bingx.transactions").await;
            match payload(&msg) {
                StorePayload::Transactions { transactions } => {
                    assert_eq!(transactions.len(), 2);
                }
                other => panic!("unexpected payload {other:?}"),
            }
        }

        fx.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_kline_load_then_ws_merge_keeps_cap() {
        // 1000 根种子，倒序
        let state = MockState {
            klines: (1..=1000).rev().map(kline).collect(),
            ..Default::default()
        };
        let fx = fixture(state);
        let mut rx = fx.hub.subscribe();

        fx.handle.load_symbol_klines("BTC-USDT", Period::Min1);
        let msg = wait_for_store(&mut rx, "bingx.klines").await;
        match payload(&msg) {
            StorePayload::Klines { klines, symbol, .. } => {
                assert_eq!(symbol, "BTC-USDT");
                assert_eq!(klines.len(), 1000);
                assert_eq!(klines[0].timestamp, 1000);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        // 新时间戳的实时增量：头插 + 尾部淘汰，长度不变
        let tick = serde_json::json!({
            "symbol": "BTC-USDT",
            "period": "1m",
            "klines": [{"open": 1.0, "high": 2.0, "low": 0.5, "close": 1.7, "volume": 3.0, "timestamp": 1001}],
        });
        fx.handle.inject_ws_event(&tick.to_string());

        let msg = wait_for_store(&mut rx, "bingx.klines").await;
        match payload(&msg) {
            StorePayload::Klines { klines, .. } => {
                assert_eq!(klines.len(), 1000);
                assert_eq!(klines[0].timestamp, 1001);
                assert_eq!(klines[0].close, 1.7);
                assert_eq!(klines.last().unwrap().timestamp, 2);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        // 相同时间戳：原地覆盖，长度不变
        let tick = serde_json::json!({
            "symbol": "BTC-USDT",
            "period": "1m",
            "klines": [{"open": 1.0, "high": 2.5, "low": 0.5, "close": 1.9, "volume": 4.0, "timestamp": 1001}],
        });
        fx.handle.inject_ws_event(&tick.to_string());

        let msg = wait_for_store(&mut rx, "bingx.klines").await;
        match payload(&msg) {
            StorePayload::Klines { klines, .. } => {
                assert_eq!(klines.len(), 1000);
                assert_eq!(klines[0].close, 1.9);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        // 未订阅符号的增量被忽略，不 panic 不通知
        let tick = serde_json::json!({
            "symbol": "UNKNOWN",
            "period": "1m",
            "klines": [{"open": 1.0, "high": 2.0, "low": 0.5, "close": 1.0, "volume": 1.0, "timestamp": 5}],
        });
        fx.handle.inject_ws_event(&tick.to_string());

        // 清空序列并通知空载荷
        fx.handle.remove_symbol_klines("BTC-USDT", Period::Min1);
        let msg = wait_for_store(&mut rx, "bingx.klines").await;
        match payload(&msg) {
            StorePayload::Klines { klines, .. } => assert!(klines.is_empty()),
            other => panic!("unexpected payload {other:?}"),
        }

        fx.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_order_update_event_triggers_out_of_band_refresh() {
        let fx = fixture(MockState::default());
        let mut rx = fx.hub.subscribe();

        assert_eq!(fx.state.lock().unwrap().transaction_fetches, 0);
        fx.handle.inject_ws_event(r#"{"event":"order"}"#);

        // 带外刷新照常发全量通知
        wait_for_store(&mut rx, "bingx.transactions").await;
        assert_eq!(fx.state.lock().unwrap().transaction_fetches, 1);

        fx.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_credential_switch_isolates_cache_and_memory() {
        let state = MockState {
            new_transactions: vec![record("a1", 1), record("a2", 2)],
            ..Default::default()
        };
        let fx = fixture(state);
        let mut rx = fx.hub.subscribe();

        fx.handle.refresh_now();
        let msg = wait_for_store(&mut rx, "bingx.transactions").await;
        match payload(&msg) {
            StorePayload::Transactions { transactions } => assert_eq!(transactions.len(), 2),
            other => panic!("unexpected payload {other:?}"),
        }

        // 换账户：交易所侧不再返回旧记录
        {
            let mut state = fx.state.lock().unwrap();
            state.new_transactions.clear();
        }
        fx.handle
            .set_credentials(Credentials::new("other-key", "other-secret"));
        fx.handle.refresh_now();

        // 旧账户的内存历史与缓存都不可见
        let msg = wait_for_store(&mut rx, "bingx.transactions").await;
        match payload(&msg) {
            StorePayload::Transactions { transactions } => assert!(transactions.is_empty()),
            other => panic!("unexpected payload {other:?}"),
        }

        // 两套凭证的分区目录各自独立
        let old_fingerprint = Credentials::default().fingerprint();
        let new_fingerprint = Credentials::new("other-key", "other-secret").fingerprint();
        assert_ne!(old_fingerprint, new_fingerprint);

        let mut store = CacheStore::new(&fx.cache_root);
        store.set_partition(&old_fingerprint);
        let old: CachedData<MockRecord> = store.read("bingx.transactions.json").await.unwrap();
        assert_eq!(old.data.len(), 2);

        store.set_partition(&new_fingerprint);
        let new: CachedData<MockRecord> = store.read("bingx.transactions.json").await.unwrap();
        assert!(new.data.is_empty());

        fx.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_transactions_failure_keeps_existing_history() {
        let state = MockState {
            new_transactions: vec![record("a", 1)],
            ..Default::default()
        };
        let fx = fixture(state);
        let mut rx = fx.hub.subscribe();

        fx.handle.refresh_now();
        wait_for_store(&mut rx, "bingx.transactions").await;

        fx.state.lock().unwrap().fail_transactions = true;
        fx.handle.refresh_now();
        let msg = wait_for_store(&mut rx, "bingx.transactions").await;
        match payload(&msg) {
            StorePayload::Transactions { transactions } => assert_eq!(transactions.len(), 1),
            other => panic!("unexpected payload {other:?}"),
        }

        fx.handle.shutdown().await;
    }

    #[test]
    fn test_dedup_by_identity_is_idempotent() {
        let items = vec![record("a", 1), record("a", 1), record("b", 2), record("a", 3)];
        let key = |r: &MockRecord| (r.id.clone(), r.sub_id.clone());

        let once = dedup_by_identity(items, key);
        assert_eq!(once.len(), 2);
        let twice = dedup_by_identity(once.clone(), key);
        assert_eq!(once, twice);
    }
}
