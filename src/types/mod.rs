// src/types/mod.rs - 类型系统

pub mod data;
pub mod errors;
pub mod events;
pub mod exchange;

pub use data::{
    Balance, CachedData, Contract, ContractStatus, KLine, Period, Position, PositionSide, Trade,
    TradeSide, Transaction,
};
pub use errors::{AppError, FetchError};
pub use events::{Notification, NotificationKind, NotifyMessage, StorePayload};
pub use exchange::ExchangeId;
