//! Bitget USDT 永续连接器模块
//!
//! v2 REST 接口，历史分页使用 idLessThan 不透明游标。
//! Bitget 不提供本系统使用的私有流，快照只靠周期刷新。

pub mod connector;
pub mod dto;
pub mod rest;
pub mod transformer;

pub use connector::BitgetConnector;
pub use rest::BitgetRestClient;

// Bitget 端点常量
pub mod constants {
    pub const BITGET_API_HOST: &str = "api.bitget.com";

    pub const BILL_PATH: &str = "/api/v2/mix/account/bill";
    pub const FILL_HISTORY_PATH: &str = "/api/v2/mix/order/fill-history";
    pub const ACCOUNTS_PATH: &str = "/api/v2/mix/account/accounts";
    pub const POSITIONS_PATH: &str = "/api/v2/mix/position/all-position";
    pub const CONTRACTS_PATH: &str = "/api/v2/mix/market/contracts";
    pub const CANDLES_PATH: &str = "/api/v2/mix/market/candles";

    pub const PRODUCT_TYPE: &str = "USDT-FUTURES";

    /// v2 历史接口单页上限
    pub const PAGE_SIZE: usize = 100;
    /// 无缓存时的回看窗口：30 天
    pub const LOOKBACK_MS: i64 = 30 * 24 * 3600 * 1000;
    /// 业务成功码
    pub const SUCCESS_CODE: &str = "00000";
}
