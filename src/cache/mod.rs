//! 磁盘缓存模块
//!
//! 以凭证指纹为分区目录，持久化交易所原生的 Transaction/Trade 历史，
//! 进程重启后无需重新拉取全量历史。负载为 JSON 序列化后 gzip 压缩。
//! Balance/Position/Contract/KLine 只存在于内存，从不落盘。

use crate::types::{AppError, CachedData};
use crate::utils::compress::{gzip_compress, gzip_decompress};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

// 定义Result类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 按凭证指纹分区的压缩键值存储
pub struct CacheStore {
    root: PathBuf,
    partition: Option<PathBuf>,
}

impl CacheStore {
    /// 创建存储，根目录此时不必存在（首次写入时按需创建）
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        CacheStore {
            root: root.as_ref().to_path_buf(),
            partition: None,
        }
    }

    /// 切换当前分区。换凭证后必须调用，避免旧账户数据泄漏到新分区。
    pub fn set_partition(&mut self, fingerprint: &str) {
        let dir = self.root.join(fingerprint);
        debug!("cache partition: {}", dir.display());
        self.partition = Some(dir);
    }

    pub fn partition_dir(&self) -> Option<&Path> {
        self.partition.as_deref()
    }

    /// 写入一个缓存条目（例如 "bingx.transactions.json"）。
    /// 失败只记日志不上抛：缓存是加速层，不是正确性来源。
    pub async fn write<T: Serialize>(&self, file_name: &str, data: &CachedData<T>) {
        let Some(dir) = self.partition.as_ref() else {
            warn!("cache write skipped, no partition selected: {file_name}");
            return;
        };

        if let Err(err) = self.write_inner(dir, file_name, data).await {
            error!("cache write failed for {file_name}: {err}");
        }
    }

    async fn write_inner<T: Serialize>(
        &self,
        dir: &Path,
        file_name: &str,
        data: &CachedData<T>,
    ) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::CacheError(format!("create dir failed: {e}")))?;

        let json = serde_json::to_vec(data)
            .map_err(|e| AppError::CacheError(format!("serialize failed: {e}")))?;
        let packed = gzip_compress(&json)?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, packed)
            .await
            .map_err(|e| AppError::CacheError(format!("write {} failed: {e}", path.display())))?;

        debug!("cache saved: {} ({} entries)", path.display(), data.data.len());
        Ok(())
    }

    /// 读取缓存条目。文件缺失、解压失败、JSON 损坏一律视为冷启动，
    /// 返回 None 而不是错误。
    pub async fn read<T: DeserializeOwned>(&self, file_name: &str) -> Option<CachedData<T>> {
        let dir = self.partition.as_ref()?;
        let path = dir.join(file_name);

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(_) => {
                debug!("no cache at {}", path.display());
                return None;
            }
        };

        let json = match gzip_decompress(&raw) {
            Ok(json) => json,
            Err(err) => {
                warn!("cache at {} unreadable: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_slice::<CachedData<T>>(&json) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!("cache at {} corrupt: {err}", path.display());
                None
            }
        }
    }

    /// 清空当前分区的全部条目
    pub async fn clear(&self) {
        let Some(dir) = self.partition.as_ref() else {
            return;
        };

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(_) => return,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                warn!("cache clear: failed to remove {:?}: {err}", entry.path());
            }
        }
        info!("cache cleared: {}", dir.display());
    }
}
