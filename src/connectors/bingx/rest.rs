//! BingX REST API 客户端
//!
//! 签名方式：按插入顺序拼接参数 + timestamp，HMAC-SHA256 后以 hex 追加
//! signature。所有请求经共享限频器排队；429 + 特定错误码时退避 1s 重试。

use crate::connectors::bingx::constants::*;
use crate::connectors::bingx::dto::*;
use crate::connectors::paginate::{paginate_backward, PageResult};
use crate::types::{FetchError, Period};
use crate::utils::{parse_time_ms, Credentials, RateLimiter};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::{debug, info, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::sync::{Arc, RwLock};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// BingX 签名 REST 客户端
pub struct BingxRestClient {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    credentials: RwLock<Credentials>,
}

impl BingxRestClient {
    pub fn new(credentials: Credentials, limiter: Arc<RateLimiter>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        BingxRestClient {
            http,
            limiter,
            credentials: RwLock::new(credentials),
        }
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().expect("credentials lock poisoned") = credentials;
    }

    pub fn credential_fingerprint(&self) -> String {
        self.credentials().fingerprint()
    }

    fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .expect("credentials lock poisoned")
            .clone()
    }

    /// 按插入顺序拼参数，末尾追加 timestamp（签名与 URL 共用同一串）
    fn build_parameters(params: &[(&str, String)], timestamp: i64) -> String {
        let joined = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        if joined.is_empty() {
            format!("timestamp={timestamp}")
        } else {
            format!("{joined}&timestamp={timestamp}")
        }
    }

    fn sign(secret: &str, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<(u16, String), FetchError> {
        let creds = self.credentials();
        if !creds.is_complete() {
            return Err(FetchError::MissingCredentials);
        }

        let timestamp = Utc::now().timestamp_millis();
        let query = Self::build_parameters(params, timestamp);
        let signature = Self::sign(&creds.api_secret, &query);
        let url = format!("https://{BINGX_API_HOST}{path}?{query}&signature={signature}");

        debug!("[Bingx] {method} {path}");

        let response = self
            .http
            .request(method, &url)
            .header("X-BX-APIKEY", &creds.api_key)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok((status, body))
    }

    /// GET：响应为 {code, msg, data} 信封，经限频器排队，限频错误有界重试
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = self
                .limiter
                .schedule(|| self.get_once::<T>(path, params))
                .await;

            match result {
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    warn!("[Bingx] 限频，1s 后重试（第 {attempt} 次）: {err}");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                other => return other,
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let (status, body) = self.send(Method::GET, path, params).await?;

        if status == 429 {
            if let Ok(envelope) = serde_json::from_str::<BingxResponse<serde_json::Value>>(&body) {
                if envelope.code == RATE_LIMIT_ERROR_CODE {
                    return Err(FetchError::RateLimited(envelope.msg));
                }
            }
            return Err(FetchError::Http(429));
        }
        if !(200..300).contains(&status) {
            return Err(FetchError::Http(status));
        }

        let envelope: BingxResponse<T> = serde_json::from_str(&body)
            .map_err(|e| FetchError::Decode(format!("{path}: {e}")))?;
        if envelope.code != 0 {
            return Err(FetchError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        envelope
            .data
            .ok_or_else(|| FetchError::Decode(format!("{path}: missing data field")))
    }

    /// POST/PUT（listenKey 生命周期）：响应体本身就是负载，不走信封
    async fn send_raw<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let (status, body) = self
            .limiter
            .schedule(|| self.send(method, path, params))
            .await?;

        if !(200..300).contains(&status) {
            return Err(FetchError::Http(status));
        }
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(format!("{path}: {e}")))
    }

    /// 增量拉取账单历史：以已知最新时间为起点向后分页
    pub async fn fetch_transactions(
        &self,
        existing: Vec<BingxTransaction>,
    ) -> Result<Vec<BingxTransaction>, FetchError> {
        let merged = paginate_backward(
            existing,
            LOOKBACK_MS,
            PAGE_SIZE,
            |tx: &BingxTransaction| tx.time,
            |req| {
                let params = [
                    ("limit", PAGE_SIZE.to_string()),
                    ("startTime", req.start_time.to_string()),
                    ("endTime", req.end_time.to_string()),
                ];
                async move {
                    info!(
                        "[Bingx][fetchTransactions] page {} window {}..{}",
                        req.page, req.start_time, req.end_time
                    );
                    let page: Vec<BingxTransaction> = self.get(INCOME_PATH, &params).await?;
                    Ok(PageResult::plain(page))
                }
            },
        )
        .await?;

        info!("[Bingx] total transactions fetched: {}", merged.len());
        Ok(merged)
    }

    /// 增量拉取成交历史，按成交时间向后分页
    pub async fn fetch_trades(
        &self,
        existing: Vec<BingxTrade>,
    ) -> Result<Vec<BingxTrade>, FetchError> {
        let merged = paginate_backward(
            existing,
            LOOKBACK_MS,
            PAGE_SIZE,
            |trade: &BingxTrade| parse_time_ms(&trade.filled_time),
            |req| {
                let params = [
                    ("pageSize", PAGE_SIZE.to_string()),
                    ("startTs", req.start_time.to_string()),
                    ("endTs", req.end_time.to_string()),
                ];
                async move {
                    info!(
                        "[Bingx][fetchTrades] page {} window {}..{}",
                        req.page, req.start_time, req.end_time
                    );
                    let page: BingxFillHistory = self.get(FILL_HISTORY_PATH, &params).await?;
                    Ok(PageResult::plain(page.fill_history_orders))
                }
            },
        )
        .await?;

        info!("[Bingx] total trades fetched: {}", merged.len());
        Ok(merged)
    }

    /// 多币种余额里取 USDT 条目
    pub async fn fetch_balance(&self) -> Result<Option<BingxBalance>, FetchError> {
        let balances: Vec<BingxBalance> = self.get(BALANCE_PATH, &[]).await?;
        Ok(balances.into_iter().find(|b| b.asset == "USDT"))
    }

    pub async fn fetch_positions(&self) -> Result<Vec<BingxPosition>, FetchError> {
        self.get(POSITIONS_PATH, &[]).await
    }

    pub async fn fetch_contracts(&self) -> Result<Vec<BingxContract>, FetchError> {
        self.get(CONTRACTS_PATH, &[]).await
    }

    pub async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<BingxKLine>, FetchError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", period.as_str().to_string()),
            ("limit", "1000".to_string()),
        ];
        self.get(KLINES_PATH, &params).await
    }

    /// 签发私有流 listenKey
    pub async fn get_ws_listen_key(&self) -> Result<String, FetchError> {
        let key: BingxListenKey = self.send_raw(Method::POST, LISTEN_KEY_PATH, &[]).await?;
        if key.listen_key.is_empty() {
            return Err(FetchError::Decode("empty listenKey".to_string()));
        }
        info!("[Bingx] listenKey issued");
        Ok(key.listen_key)
    }

    /// 续期 listenKey（每 30 分钟调用一次）
    pub async fn extend_ws_listen_key(&self, listen_key: &str) -> Result<(), FetchError> {
        let params = [("listenKey", listen_key.to_string())];
        let _: serde_json::Value = self.send_raw(Method::PUT, LISTEN_KEY_PATH, &params).await?;
        debug!("[Bingx] listenKey extended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parameters_keeps_insertion_order() {
        let params = [
            ("limit", "1000".to_string()),
            ("startTime", "1".to_string()),
            ("endTime", "2".to_string()),
        ];
        assert_eq!(
            BingxRestClient::build_parameters(&params, 99),
            "limit=1000&startTime=1&endTime=2&timestamp=99"
        );
        assert_eq!(BingxRestClient::build_parameters(&[], 99), "timestamp=99");
    }

    #[test]
    fn test_sign_is_deterministic_hex() {
        let a = BingxRestClient::sign("secret", "limit=1000&timestamp=1");
        let b = BingxRestClient::sign("secret", "limit=1000&timestamp=1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        // 不同密钥、不同负载必须产生不同签名
        assert_ne!(a, BingxRestClient::sign("secret2", "limit=1000&timestamp=1"));
        assert_ne!(a, BingxRestClient::sign("secret", "limit=1000&timestamp=2"));
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuits() {
        let client = BingxRestClient::new(Credentials::default(), Arc::new(RateLimiter::new(5.0)));
        let result = client.fetch_balance().await;
        assert!(matches!(result, Err(FetchError::MissingCredentials)));
    }
}
