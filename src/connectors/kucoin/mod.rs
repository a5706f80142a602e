//! KuCoin Futures 连接器模块
//!
//! v1 REST 接口，三重鉴权头（签名 + 加签 passphrase + key 版本）。
//! 账单按 offset 游标翻页，成交按页号翻页；时间窗口不能超过约 3 个月，
//! 回看窗口取 90 天。无私有流接入。

pub mod connector;
pub mod dto;
pub mod rest;
pub mod transformer;

pub use connector::KucoinConnector;
pub use rest::KucoinRestClient;

// KuCoin 端点常量
pub mod constants {
    pub const KUCOIN_API_HOST: &str = "api-futures.kucoin.com";

    pub const TRANSACTION_HISTORY_PATH: &str = "/api/v1/transaction-history";
    pub const FILLS_PATH: &str = "/api/v1/fills";
    pub const ACCOUNT_OVERVIEW_PATH: &str = "/api/v1/account-overview";
    pub const POSITIONS_PATH: &str = "/api/v1/positions";
    pub const CONTRACTS_PATH: &str = "/api/v1/contracts/active";
    pub const KLINE_PATH: &str = "/api/v1/kline/query";

    /// 历史接口单页条数
    pub const PAGE_SIZE: usize = 50;
    /// 无缓存时的回看窗口：90 天（接口拒绝超过约 3 个月的窗口）
    pub const LOOKBACK_MS: i64 = 90 * 24 * 3600 * 1000;
    /// 单次 K 线查询最多返回 500 根
    pub const KLINE_WINDOW: i64 = 500;
    /// 业务成功码
    pub const SUCCESS_CODE: &str = "200000";
}
