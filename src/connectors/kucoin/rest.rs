//! KuCoin Futures REST API 客户端
//!
//! 签名方式：prehash = timestamp + METHOD + endpoint(+?query) + body，
//! HMAC-SHA256 后 base64 放入 KC-API-SIGN；passphrase 本身也要用密钥
//! 加签（KC-API-KEY-VERSION: 2）。

use crate::connectors::kucoin::constants::*;
use crate::connectors::kucoin::dto::*;
use crate::connectors::paginate::{paginate_backward, PageResult};
use crate::types::{FetchError, Period};
use crate::utils::{Credentials, RateLimiter};
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

/// KuCoin 签名 REST 客户端
pub struct KucoinRestClient {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    credentials: RwLock<Credentials>,
}

impl KucoinRestClient {
    pub fn new(credentials: Credentials, limiter: Arc<RateLimiter>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        KucoinRestClient {
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

    fn hmac_base64(secret: &str, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// GET：信封 {code, msg, data}，data 必须存在
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        match self.get_opt(path, params).await? {
            Some(data) => Ok(data),
            None => Err(FetchError::Decode(format!("{path}: missing data field"))),
        }
    }

    /// GET：data 可以为空（例如尚无该币种的账户）
    async fn get_opt<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = self
                .limiter
                .schedule(|| self.get_once::<T>(path, params))
                .await;

            match result {
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    warn!("[Kucoin] 限频，1s 后重试（第 {attempt} 次）: {err}");
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
    ) -> Result<Option<T>, FetchError> {
        let creds = self.credentials();
        if !creds.is_complete() || creds.passphrase.is_none() {
            return Err(FetchError::MissingCredentials);
        }
        let passphrase = creds.passphrase.clone().unwrap_or_default();

        let query = Self::build_query(params);
        let endpoint = if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        };

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = Self::hmac_base64(
            &creds.api_secret,
            &format!("{timestamp}GET{endpoint}"),
        );
        let signed_passphrase = Self::hmac_base64(&creds.api_secret, &passphrase);
        let url = format!("https://{KUCOIN_API_HOST}{endpoint}");

        debug!("[Kucoin] GET {path}");

        let response = self
            .http
            .get(&url)
            .header("KC-API-KEY", &creds.api_key)
            .header("KC-API-SIGN", signature)
            .header("KC-API-TIMESTAMP", timestamp)
            .header("KC-API-PASSPHRASE", signed_passphrase)
            .header("KC-API-KEY-VERSION", "2")
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

        let envelope: KucoinResponse<T> = serde_json::from_str(&body)
            .map_err(|e| FetchError::Decode(format!("{path}: {e}")))?;
        if envelope.code != SUCCESS_CODE {
            return Err(FetchError::Api {
                code: envelope.code.parse().unwrap_or(0),
                msg: envelope.msg,
            });
        }
        Ok(envelope.data)
    }

    /// 增量拉取资金流水：offset 游标 + 时间窗口
    pub async fn fetch_transactions(
        &self,
        existing: Vec<KucoinTransaction>,
    ) -> Result<Vec<KucoinTransaction>, FetchError> {
        let merged = paginate_backward(
            existing,
            LOOKBACK_MS,
            PAGE_SIZE,
            |tx: &KucoinTransaction| tx.time,
            |req| {
                let mut params = vec![
                    ("startAt", req.start_time.to_string()),
                    ("endAt", req.end_time.to_string()),
                    ("maxCount", PAGE_SIZE.to_string()),
                ];
                if let Some(cursor) = &req.cursor {
                    params.push(("offset", cursor.clone()));
                }
                async move {
                    info!(
                        "[Kucoin][fetchTransactions] page {} cursor {:?}",
                        req.page, req.cursor
                    );
                    let page: KucoinTransactionPage =
                        self.get(TRANSACTION_HISTORY_PATH, &params).await?;
                    let next_cursor = page
                        .data_list
                        .last()
                        .map(|tx| tx.offset.to_string());
                    Ok(PageResult {
                        items: page.data_list,
                        next_cursor,
                    })
                }
            },
        )
        .await?;

        info!("[Kucoin] total transactions fetched: {}", merged.len());
        Ok(merged)
    }

    /// 增量拉取成交历史：页号式翻页，中途出错保留已取得的页
    pub async fn fetch_trades(
        &self,
        existing: Vec<KucoinFill>,
    ) -> Result<Vec<KucoinFill>, FetchError> {
        let now = Utc::now().timestamp_millis();
        let newest_known = existing.iter().map(|f| f.trade_time / 1_000_000).max();
        let start_at = match newest_known {
            Some(t) => t + 1,
            None => now - LOOKBACK_MS,
        };

        let mut all = existing;
        let mut current_page = 1u32;
        loop {
            let params = [
                ("startAt", start_at.to_string()),
                ("endAt", now.to_string()),
                ("currentPage", current_page.to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];

            info!("[Kucoin][fetchTrades] page {current_page}");
            let page: KucoinFillPage = match self.get(FILLS_PATH, &params).await {
                Ok(page) => page,
                Err(err) if current_page == 1 => return Err(err),
                Err(err) => {
                    warn!("[Kucoin] trade pagination stopped at page {current_page}: {err}");
                    break;
                }
            };

            let count = page.items.len();
            all.extend(page.items);

            if count < PAGE_SIZE || current_page >= page.total_page {
                break;
            }
            current_page += 1;
        }

        all.sort_by(|a, b| b.trade_time.cmp(&a.trade_time));
        info!("[Kucoin] total trades fetched: {}", all.len());
        Ok(all)
    }

    /// USDT 合约账户总览
    pub async fn fetch_balance(&self) -> Result<Option<KucoinBalance>, FetchError> {
        let params = [("currency", "USDT".to_string())];
        self.get_opt(ACCOUNT_OVERVIEW_PATH, &params).await
    }

    pub async fn fetch_positions(&self) -> Result<Vec<KucoinPosition>, FetchError> {
        self.get(POSITIONS_PATH, &[]).await
    }

    pub async fn fetch_contracts(&self) -> Result<Vec<KucoinContract>, FetchError> {
        self.get(CONTRACTS_PATH, &[]).await
    }

    /// 单次最多 500 根，按 granularity 推算时间窗口
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<KucoinCandle>, FetchError> {
        let Some(granularity) = period.kucoin_granularity() else {
            return Err(FetchError::Decode(format!(
                "KuCoin does not serve period {period}"
            )));
        };

        let now = Utc::now().timestamp_millis();
        let from = now - (granularity as i64) * 60_000 * KLINE_WINDOW;
        let params = [
            ("symbol", symbol.to_string()),
            ("granularity", granularity.to_string()),
            ("from", from.to_string()),
            ("to", now.to_string()),
        ];
        self.get(KLINE_PATH, &params).await
    }
}
