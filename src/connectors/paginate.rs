// src/connectors/paginate.rs - 历史数据向后分页
//
// 各交易所的历史接口都按「从最新往旧翻页」的方式拉取：起点是已知最新记录
// 之后 1ms（无历史则取回看窗口起点），终点逐页向旧推进。时间窗口型交易所
// 用 end_time 翻页，游标型交易所透传 cursor。两类都终止于空页或短页。

use crate::types::FetchError;
use chrono::Utc;
use log::{info, warn};
use std::future::Future;

/// 一页请求的参数
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// 窗口起点（epoch 毫秒，整个分页过程固定）
    pub start_time: i64,
    /// 窗口终点（epoch 毫秒，逐页向旧推进）
    pub end_time: i64,
    /// 从 1 开始的页号（仅用于日志）
    pub page: u32,
    /// 游标型接口的不透明游标（上一页返回的 next_cursor）
    pub cursor: Option<String>,
}

/// 一页结果
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// 游标型接口的下一页游标；时间窗口型保持 None
    pub next_cursor: Option<String>,
}

impl<T> PageResult<T> {
    pub fn plain(items: Vec<T>) -> Self {
        PageResult {
            items,
            next_cursor: None,
        }
    }
}

/// 以 `all` 为种子做增量向后分页，返回按 `time_of` 倒序的合并结果。
///
/// 终止条件：空页、短页（少于 page_size）、或窗口耗尽。首页失败返回 Err；
/// 之后任何一页失败则停止翻页并保留已累积的数据，绝不丢弃整批。
pub async fn paginate_backward<T, TimeFn, F, Fut>(
    mut all: Vec<T>,
    lookback_ms: i64,
    page_size: usize,
    time_of: TimeFn,
    mut fetch_page: F,
) -> Result<Vec<T>, FetchError>
where
    TimeFn: Fn(&T) -> i64,
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<PageResult<T>, FetchError>>,
{
    let now = Utc::now().timestamp_millis();
    let newest_known = all.iter().map(&time_of).max();
    let start_time = match newest_known {
        Some(t) => t + 1,
        None => now - lookback_ms,
    };
    let mut end_time = now;
    let mut cursor: Option<String> = None;
    let mut page: u32 = 1;

    loop {
        let request = PageRequest {
            start_time,
            end_time,
            page,
            cursor: cursor.clone(),
        };

        let result = match fetch_page(request).await {
            Ok(result) => result,
            Err(err) if page == 1 => return Err(err),
            Err(err) => {
                warn!("pagination stopped at page {page}: {err}");
                break;
            }
        };

        if result.items.is_empty() {
            break;
        }

        let oldest = result.items.iter().map(&time_of).min().unwrap_or(end_time);
        let short_page = result.items.len() < page_size;
        all.extend(result.items);

        if short_page {
            break;
        }

        cursor = result.next_cursor;
        end_time = oldest - 1;
        if end_time < start_time {
            break;
        }
        page += 1;
    }

    info!("pagination done: {} records total", all.len());
    all.sort_by(|a, b| time_of(b).cmp(&time_of(a)));
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 测试时间戳从 1 开始，回看窗口必须覆盖到 epoch 0
    const LOOKBACK_ALL: i64 = 200 * 365 * 24 * 3600 * 1000;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        time: i64,
    }

    /// 模拟交易所：total 条记录（time 1..=total），按窗口过滤后
    /// 返回其中最新的 page_size 条。
    fn serve_page(total: i64, page_size: usize, req: &PageRequest) -> Vec<Row> {
        let mut in_window: Vec<Row> = (1..=total)
            .filter(|t| *t >= req.start_time && *t <= req.end_time)
            .map(|t| Row {
                id: t as u32,
                time: t,
            })
            .collect();
        in_window.sort_by(|a, b| b.time.cmp(&a.time));
        in_window.truncate(page_size);
        in_window
    }

    #[tokio::test]
    async fn test_terminates_in_ceil_total_over_page_size_calls() {
        let total = 2500i64;
        let page_size = 1000usize;
        let mut calls = 0u32;

        let merged = paginate_backward(
            Vec::new(),
            LOOKBACK_ALL,
            page_size,
            |row: &Row| row.time,
            |req| {
                calls += 1;
                let page = serve_page(total, page_size, &req);
                async move { Ok(PageResult::plain(page)) }
            },
        )
        .await
        .unwrap();

        // ceil(2500/1000) = 3 次调用，拿全 2500 条
        assert_eq!(calls, 3);
        assert_eq!(merged.len(), 2500);
        // 按时间倒序
        assert!(merged.windows(2).all(|w| w[0].time >= w[1].time));
        assert_eq!(merged.first().unwrap().time, 2500);
        assert_eq!(merged.last().unwrap().time, 1);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_trailing_empty_page() {
        // 2000 条、页长 1000：两满页后还需一个空页确认结束
        let total = 2000i64;
        let page_size = 1000usize;
        let mut calls = 0u32;

        let merged = paginate_backward(
            Vec::new(),
            LOOKBACK_ALL,
            page_size,
            |row: &Row| row.time,
            |req| {
                calls += 1;
                let page = serve_page(total, page_size, &req);
                async move { Ok(PageResult::plain(page)) }
            },
        )
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(merged.len(), 2000);
    }

    #[tokio::test]
    async fn test_incremental_fetch_starts_after_newest_known() {
        let existing = vec![Row { id: 5, time: 500 }, Row { id: 4, time: 400 }];
        let mut seen_start = 0i64;

        let merged = paginate_backward(
            existing,
            LOOKBACK_ALL,
            1000,
            |row: &Row| row.time,
            |req| {
                seen_start = req.start_time;
                let page = serve_page(503, 1000, &req);
                async move { Ok(PageResult::plain(page)) }
            },
        )
        .await
        .unwrap();

        // 增量拉取只请求已知最新之后的范围
        assert_eq!(seen_start, 501);
        // 新增 501..=503 三条，连同种子共 5 条
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.first().unwrap().time, 503);
    }

    #[tokio::test]
    async fn test_error_on_first_page_is_propagated() {
        let result = paginate_backward(
            Vec::<Row>::new(),
            LOOKBACK_ALL,
            1000,
            |row: &Row| row.time,
            |_req| async move {
                Err::<PageResult<Row>, _>(FetchError::Http(500))
            },
        )
        .await;

        assert!(matches!(result, Err(FetchError::Http(500))));
    }

    #[tokio::test]
    async fn test_error_mid_pagination_keeps_accumulated_pages() {
        let mut calls = 0u32;

        let merged = paginate_backward(
            Vec::new(),
            LOOKBACK_ALL,
            1000,
            |row: &Row| row.time,
            |req| {
                calls += 1;
                let page = if calls == 1 {
                    Ok(PageResult::plain(serve_page(2500, 1000, &req)))
                } else {
                    Err(FetchError::Network("reset".to_string()))
                };
                async move { page }
            },
        )
        .await
        .unwrap();

        // 第二页失败：保留第一页的 1000 条
        assert_eq!(merged.len(), 1000);
    }

    #[tokio::test]
    async fn test_cursor_is_threaded_between_pages() {
        let mut cursors_seen: Vec<Option<String>> = Vec::new();
        let mut calls = 0u32;

        let _ = paginate_backward(
            Vec::new(),
            LOOKBACK_ALL,
            2,
            |row: &Row| row.time,
            |req| {
                calls += 1;
                cursors_seen.push(req.cursor.clone());
                let (items, next) = match calls {
                    1 => (
                        vec![Row { id: 9, time: 9 }, Row { id: 8, time: 8 }],
                        Some("c1".to_string()),
                    ),
                    2 => (
                        vec![Row { id: 7, time: 7 }, Row { id: 6, time: 6 }],
                        Some("c2".to_string()),
                    ),
                    _ => (vec![], None),
                };
                async move {
                    Ok(PageResult {
                        items,
                        next_cursor: next,
                    })
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(
            cursors_seen,
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }
}
