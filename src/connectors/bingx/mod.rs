//! BingX 永续合约连接器模块
//!
//! REST 签名拉取 + 私有 WebSocket 流（listenKey 会话 + gzip 帧）。
//! BingX 是三个交易所中唯一提供流式 K 线推送的。

pub mod connector;
pub mod dto;
pub mod rest;
pub mod transformer;

pub use connector::{BingxConnector, BingxStreamTransport};
pub use rest::BingxRestClient;

// BingX 端点常量
pub mod constants {
    pub const BINGX_API_HOST: &str = "open-api.bingx.com";
    pub const BINGX_WS_URL: &str = "wss://open-api-swap.bingx.com/swap-market";

    pub const INCOME_PATH: &str = "/openApi/swap/v2/user/income";
    pub const FILL_HISTORY_PATH: &str = "/openApi/swap/v2/trade/fillHistory";
    pub const BALANCE_PATH: &str = "/openApi/swap/v3/user/balance";
    pub const POSITIONS_PATH: &str = "/openApi/swap/v2/user/positions";
    pub const CONTRACTS_PATH: &str = "/openApi/swap/v2/quote/contracts";
    pub const KLINES_PATH: &str = "/openApi/swap/v3/quote/klines";
    pub const LISTEN_KEY_PATH: &str = "/openApi/user/auth/userDataStream";

    /// 历史分页单页条数
    pub const PAGE_SIZE: usize = 1000;
    /// 无缓存时的回看窗口：10 年
    pub const LOOKBACK_MS: i64 = 10 * 365 * 24 * 3600 * 1000;
    /// 429 响应中允许重试的业务错误码
    pub const RATE_LIMIT_ERROR_CODE: i64 = 100410;
}
