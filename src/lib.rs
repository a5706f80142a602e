// Define modules
pub mod cache;
pub mod config;
pub mod connectors;  // 交易所连接器系统
pub mod notify;
pub mod service;  // 每交易所一个单写者编排 actor
pub mod stream;
pub mod types;  // 归一化类型系统
pub mod utils;

// Re-export key components for easier usage
pub use cache::CacheStore;
pub use config::Config;
pub use connectors::{BingxConnector, BitgetConnector, ExchangeAdapter, KucoinConnector};
pub use notify::NotificationHub;
pub use service::{ExchangeServiceHandle, Snapshot, DEFAULT_REFRESH_INTERVAL};
pub use types::{
    AppError, Balance, CachedData, Contract, ContractStatus, ExchangeId, FetchError, KLine,
    Notification, NotifyMessage, Period, Position, PositionSide, StorePayload, Trade, TradeSide,
    Transaction,
};
pub use utils::{Credentials, RateLimiter};
