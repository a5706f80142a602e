// src/types/errors.rs - 错误类型定义

use thiserror::Error;

/// 基础设施层错误（连接、解析、缓存、配置、加密）
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Crypto error: {0}")]
    CryptoError(String),
}

/// REST 拉取错误。调用方必须显式决定如何降级，而不是隐式吞掉失败。
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 层非 2xx 状态码
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// 200 响应体内交易所返回的业务错误码
    #[error("API error: {msg} ({code})")]
    Api { code: i64, msg: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// 可重试的限频错误（HTTP 429 + 交易所限频错误码）
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 凭证未设置，服务尚未初始化
    #[error("Missing credentials")]
    MissingCredentials,
}

impl FetchError {
    /// 限频错误允许调用方做有界重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited(_))
    }
}
