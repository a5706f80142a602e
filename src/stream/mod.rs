//! 交易所 WebSocket 客户端
//!
//! 对 StreamTransport 泛型：监听密钥签发/续期、流地址、帧解码由各交易所
//! 提供，连接管理、订阅控制帧、保活与读循环在这里统一实现。
//!
//! 连接是惰性的：首次 subscribe 或强制换 listenKey 时才建立；断开后不做
//! 自动重连，由下一次 subscribe/update_listen_key 按需拉起（连接本身带
//! 有界指数退避，避免对持续失败的握手热循环）。

use crate::connectors::traits::StreamTransport;
use crate::types::AppError;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

// 定义Result类型别名
pub type Result<T> = std::result::Result<T, AppError>;

type WsSink = Arc<Mutex<SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>>>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// listenKey 续期间隔：30 分钟
const LISTEN_KEY_RENEW_INTERVAL: Duration = Duration::from_secs(30 * 60);
/// 连接退避：500ms 起步，指数翻倍，上限 5s，最多 3 次
const CONNECT_BACKOFF_BASE: Duration = Duration::from_millis(500);
const MAX_CONNECT_BACKOFF: Duration = Duration::from_secs(5);
const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// 泛型 WebSocket 客户端，由所属交易所服务独占持有
pub struct ExchangeWebSocketClient {
    transport: Arc<dyn StreamTransport>,
    event_tx: mpsc::UnboundedSender<String>,
    listen_key: Option<String>,
    sink: Option<WsSink>,
    connected: Arc<AtomicBool>,
    /// 订阅 id → 频道名；强制重连后按此恢复订阅
    subscriptions: HashMap<String, String>,
    renew_task: Option<JoinHandle<()>>,
    read_task: Option<JoinHandle<()>>,
}

impl ExchangeWebSocketClient {
    /// 解码后的 JSON 文本经 event_tx 交给所属服务处理
    pub fn new(transport: Arc<dyn StreamTransport>, event_tx: mpsc::UnboundedSender<String>) -> Self {
        ExchangeWebSocketClient {
            transport,
            event_tx,
            listen_key: None,
            sink: None,
            connected: Arc::new(AtomicBool::new(false)),
            subscriptions: HashMap::new(),
            renew_task: None,
            read_task: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some() && self.connected.load(Ordering::SeqCst)
    }

    /// 订阅频道，必要时先惰性建立连接
    pub async fn subscribe(&mut self, id: &str, channel: &str) -> Result<()> {
        self.ensure_connected().await?;
        self.send_control(id, "sub", channel).await?;
        self.subscriptions
            .insert(id.to_string(), channel.to_string());
        info!("subscribed to {channel}");
        Ok(())
    }

    /// 退订频道；未连接时只移除本地记录
    pub async fn unsubscribe(&mut self, id: &str, channel: &str) -> Result<()> {
        self.subscriptions.remove(id);
        if self.is_open() {
            self.send_control(id, "unsub", channel).await?;
        }
        info!("unsubscribed from {channel}");
        Ok(())
    }

    /// 换新 listenKey 强制重连（凭证变更、密钥过期），并恢复既有订阅
    pub async fn update_listen_key(&mut self) -> Result<()> {
        self.start_socket(true).await?;
        let subscriptions: Vec<(String, String)> = self
            .subscriptions
            .iter()
            .map(|(id, channel)| (id.clone(), channel.clone()))
            .collect();
        for (id, channel) in subscriptions {
            self.send_control(&id, "sub", &channel).await?;
        }
        Ok(())
    }

    /// 停止续期任务并关闭连接；幂等，未连接时调用安全
    pub async fn stop(&mut self) {
        self.shutdown_tasks().await;
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        self.start_socket(false).await
    }

    async fn send_control(&mut self, id: &str, req_type: &str, channel: &str) -> Result<()> {
        let frame = json!({
            "id": id,
            "reqType": req_type,
            "dataType": channel,
        })
        .to_string();

        let Some(sink) = &self.sink else {
            return Err(AppError::WebSocketError("not connected".to_string()));
        };
        sink.lock()
            .await
            .send(Message::Text(frame))
            .await
            .map_err(|e| AppError::WebSocketError(format!("send control frame failed: {e}")))
    }

    async fn start_socket(&mut self, force: bool) -> Result<()> {
        if self.is_open() && !force {
            return Ok(());
        }
        self.shutdown_tasks().await;

        if self.listen_key.is_none() || force {
            let key = self
                .transport
                .issue_listen_key()
                .await
                .map_err(|e| AppError::WebSocketError(format!("listen key issue failed: {e}")))?;
            self.listen_key = Some(key);
        }
        let listen_key = self.listen_key.clone().unwrap_or_default();
        let url = self.transport.stream_url(&listen_key);

        let ws_stream = Self::connect_with_backoff(&url).await?;
        let (sink, stream) = ws_stream.split();
        let sink: WsSink = Arc::new(Mutex::new(sink));

        self.sink = Some(sink.clone());
        self.connected.store(true, Ordering::SeqCst);

        self.read_task = Some(tokio::spawn(read_loop(
            stream,
            sink,
            self.transport.clone(),
            self.event_tx.clone(),
            self.connected.clone(),
        )));
        self.renew_task = Some(tokio::spawn(renew_loop(self.transport.clone(), listen_key)));

        info!("WebSocket open");
        Ok(())
    }

    async fn connect_with_backoff(
        url: &str,
    ) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        let mut attempt = 0u32;
        loop {
            match connect_async(url).await {
                Ok((stream, _)) => return Ok(stream),
                Err(err) => {
                    attempt += 1;
                    if attempt >= MAX_CONNECT_ATTEMPTS {
                        return Err(AppError::WebSocketError(format!(
                            "connect failed after {attempt} attempts: {err}"
                        )));
                    }
                    let delay =
                        (CONNECT_BACKOFF_BASE * 2u32.pow(attempt - 1)).min(MAX_CONNECT_BACKOFF);
                    warn!("WebSocket connect failed (attempt {attempt}), retrying in {delay:?}: {err}");
                    sleep(delay).await;
                }
            }
        }
    }

    async fn shutdown_tasks(&mut self) {
        if let Some(task) = self.renew_task.take() {
            task.abort();
        }
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(sink) = self.sink.take() {
            let _ = sink.lock().await.close().await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// 读循环：解码帧、应答保活、把业务消息转发给服务层。
/// 任何单条消息的解析失败只记日志，绝不拆掉连接。
async fn read_loop(
    mut stream: WsStream,
    sink: WsSink,
    transport: Arc<dyn StreamTransport>,
    event_tx: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Binary(payload)) => match transport.decode_frame(&payload) {
                Ok(text) => handle_text(text, &sink, &event_tx).await,
                Err(err) => warn!("undecodable frame dropped: {err}"),
            },
            Ok(Message::Text(text)) => handle_text(text, &sink, &event_tx).await,
            Ok(Message::Ping(payload)) => {
                if let Err(err) = sink.lock().await.send(Message::Pong(payload)).await {
                    error!("failed to answer protocol ping: {err}");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed by server");
                break;
            }
            Err(err) => {
                error!("WebSocket error: {err}");
                break;
            }
            _ => {}
        }
    }
    connected.store(false, Ordering::SeqCst);
    info!("WebSocket read loop exited");
}

/// 文本 "Ping" 保活要先于 JSON 解析识别并以 "Pong" 应答
async fn handle_text(text: String, sink: &WsSink, event_tx: &mpsc::UnboundedSender<String>) {
    if text == "Ping" {
        if let Err(err) = sink
            .lock()
            .await
            .send(Message::Text("Pong".to_string()))
            .await
        {
            error!("failed to answer Ping: {err}");
        }
        return;
    }
    if event_tx.send(text).is_err() {
        debug!("event receiver dropped, message discarded");
    }
}

/// listenKey 续期循环：失败只告警，连接不受影响
async fn renew_loop(transport: Arc<dyn StreamTransport>, listen_key: String) {
    let mut interval = tokio::time::interval(LISTEN_KEY_RENEW_INTERVAL);
    // interval 首跳立即完成，跳过它
    interval.tick().await;
    loop {
        interval.tick().await;
        debug!("extending listen key");
        if let Err(err) = transport.extend_listen_key(&listen_key).await {
            warn!("failed to extend listen key: {err}");
        }
    }
}
