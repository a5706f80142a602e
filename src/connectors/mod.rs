// src/connectors/mod.rs - 交易所连接器系统

pub mod paginate;
pub mod traits;

pub mod bingx;
pub mod bitget;
pub mod kucoin;

pub use bingx::BingxConnector;
pub use bitget::BitgetConnector;
pub use kucoin::KucoinConnector;
pub use traits::{ExchangeAdapter, StreamTransport, WsMessage};
