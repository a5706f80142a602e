//! Bitget REST API 客户端
//!
//! 签名方式：prehash = timestamp + METHOD + path(+?query) + body，
//! HMAC-SHA256 后 base64，连同 passphrase 放入 ACCESS-* 请求头。
//! 历史接口按 idLessThan 游标向旧翻页，时间窗口同时收紧。

use crate::connectors::bitget::constants::*;
use crate::connectors::bitget::dto::*;
use crate::connectors::paginate::{paginate_backward, PageRequest, PageResult};
use crate::types::{FetchError, Period};
use crate::utils::{parse_i64, Credentials, RateLimiter};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::sync::{Arc, RwLock};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Bitget 签名 REST 客户端
pub struct BitgetRestClient {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    credentials: RwLock<Credentials>,
}

impl BitgetRestClient {
    pub fn new(credentials: Credentials, limiter: Arc<RateLimiter>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        BitgetRestClient {
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

    /// prehash = timestamp + METHOD + requestPath(+?query) + body
    fn sign(secret: &str, timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
        let prehash = format!("{timestamp}{method}{request_path}{body}");
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(prehash.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// GET：信封 {code, msg, data}，HTTP 429 视为可重试限频
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
                    warn!("[Bitget] 限频，1s 后重试（第 {attempt} 次）: {err}");
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
        let creds = self.credentials();
        if !creds.is_complete() {
            return Err(FetchError::MissingCredentials);
        }
        let passphrase = creds.passphrase.clone().unwrap_or_default();

        let query = Self::build_query(params);
        let request_path = if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        };

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = Self::sign(&creds.api_secret, &timestamp, "GET", &request_path, "");
        let url = format!("https://{BITGET_API_HOST}{request_path}");

        debug!("[Bitget] GET {path}");

        let response = self
            .http
            .get(&url)
            .header("ACCESS-KEY", &creds.api_key)
            .header("ACCESS-SIGN", signature)
            .header("ACCESS-TIMESTAMP", timestamp)
            .header("ACCESS-PASSPHRASE", passphrase)
            .header("Content-Type", "application/json")
            .header("locale", "en-US")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if status == 429 {
            return Err(FetchError::RateLimited(body));
        }
        if !(200..300).contains(&status) {
            return Err(FetchError::Http(status));
        }

        let envelope: BitgetResponse<T> = serde_json::from_str(&body)
            .map_err(|e| FetchError::Decode(format!("{path}: {e}")))?;
        if envelope.code != SUCCESS_CODE {
            return Err(FetchError::Api {
                code: parse_i64(&envelope.code),
                msg: envelope.msg,
            });
        }
        envelope
            .data
            .ok_or_else(|| FetchError::Decode(format!("{path}: missing data field")))
    }

    fn history_params(req: &PageRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("productType", PRODUCT_TYPE.to_string()),
            ("startTime", req.start_time.to_string()),
            ("endTime", req.end_time.to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        if let Some(cursor) = &req.cursor {
            params.push(("idLessThan", cursor.clone()));
        }
        params
    }

    /// 增量拉取账单历史（资金费、盈亏、手续费流水）
    pub async fn fetch_transactions(
        &self,
        existing: Vec<BitgetBill>,
    ) -> Result<Vec<BitgetBill>, FetchError> {
        let merged = paginate_backward(
            existing,
            LOOKBACK_MS,
            PAGE_SIZE,
            |bill: &BitgetBill| parse_i64(&bill.c_time),
            |req| {
                let params = Self::history_params(&req);
                async move {
                    info!(
                        "[Bitget][fetchTransactions] page {} cursor {:?}",
                        req.page, req.cursor
                    );
                    let page: BitgetBillPage = self.get(BILL_PATH, &params).await?;
                    let next_cursor =
                        (!page.end_id.is_empty()).then(|| page.end_id.clone());
                    Ok(PageResult {
                        items: page.bills,
                        next_cursor,
                    })
                }
            },
        )
        .await?;

        info!("[Bitget] total transactions fetched: {}", merged.len());
        Ok(merged)
    }

    /// 增量拉取成交历史
    pub async fn fetch_trades(
        &self,
        existing: Vec<BitgetFill>,
    ) -> Result<Vec<BitgetFill>, FetchError> {
        let merged = paginate_backward(
            existing,
            LOOKBACK_MS,
            PAGE_SIZE,
            |fill: &BitgetFill| parse_i64(&fill.c_time),
            |req| {
                let params = Self::history_params(&req);
                async move {
                    info!(
                        "[Bitget][fetchTrades] page {} cursor {:?}",
                        req.page, req.cursor
                    );
                    let page: BitgetFillPage = self.get(FILL_HISTORY_PATH, &params).await?;
                    let next_cursor =
                        (!page.end_id.is_empty()).then(|| page.end_id.clone());
                    Ok(PageResult {
                        items: page.fill_list,
                        next_cursor,
                    })
                }
            },
        )
        .await?;

        info!("[Bitget] total trades fetched: {}", merged.len());
        Ok(merged)
    }

    /// 多币种资产里取 USDT 保证金账户
    pub async fn fetch_balance(&self) -> Result<Option<BitgetAccount>, FetchError> {
        let params = [("productType", PRODUCT_TYPE.to_string())];
        let accounts: Vec<BitgetAccount> = self.get(ACCOUNTS_PATH, &params).await?;
        Ok(accounts.into_iter().find(|a| a.margin_coin == "USDT"))
    }

    pub async fn fetch_positions(&self) -> Result<Vec<BitgetPosition>, FetchError> {
        let params = [
            ("productType", PRODUCT_TYPE.to_string()),
            ("marginCoin", "USDT".to_string()),
        ];
        self.get(POSITIONS_PATH, &params).await
    }

    pub async fn fetch_contracts(&self) -> Result<Vec<BitgetContract>, FetchError> {
        let params = [("productType", PRODUCT_TYPE.to_string())];
        self.get(CONTRACTS_PATH, &params).await
    }

    pub async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<BitgetCandle>, FetchError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("productType", PRODUCT_TYPE.to_string()),
            ("granularity", period.bitget_granularity().to_string()),
            ("limit", "1000".to_string()),
        ];
        self.get(CANDLES_PATH, &params).await
    }
}
