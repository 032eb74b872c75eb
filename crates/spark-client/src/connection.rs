use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use spark_codec_text::{Charset, ResponseDecoder};
use spark_transport_tcp::{
    CallContext, Cancellation, TcpChannel, TcpReadHalf, TcpWriteHalf, TransportError,
};
use tokio::task::JoinHandle;

use crate::{
    config::ClientConfig,
    error::{IllegalStateError, RequestError, TransportWriteError},
    listener::ListenerGuard,
    outcome::TransactionOutcome,
    pending::{AdmitError, PendingSlot, ResponseProgress, Resolved, SendProgress},
    state::ClientState,
};

/// 一条已建立连接的句柄：写半部、待决槽与入站任务。
///
/// # 教案式说明
///
/// ## 意图（Why）
/// - 把“已连接”期间才存在的资源收拢到一个由 `connect` 返回、被 `request`/`close` 显式传递的对象里，
///   客户端不会在运行中隐式替换通道；
///
/// ## 逻辑（How）
/// - 入站任务独占读半部，循环读取 → 解码 → 投递到待决槽；
/// - 每个请求的写入在独立任务中执行，完成后回到待决槽；
/// - 所有 IO 共享 `cancellation`，`close` 一次取消即可打断写入与读取。
///
/// ## 契约（What）
/// - 监听器只在锁外、通过 [`ListenerGuard`] 调用；
/// - 连接丢失后（EOF 或读错误）新请求立即以写失败结束，不再触碰套接字。
pub(crate) struct Connection {
    writer: TcpWriteHalf,
    slot: PendingSlot,
    listener: ListenerGuard,
    charset: Charset,
    peer: SocketAddr,
    lost: AtomicBool,
    cancellation: Cancellation,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    pub(crate) fn start(
        channel: TcpChannel,
        config: &ClientConfig,
        listener: ListenerGuard,
    ) -> Arc<Self> {
        let peer = channel.peer_addr();
        let (reader, writer) = channel.into_split();
        let connection = Arc::new(Self {
            writer,
            slot: PendingSlot::new(),
            listener,
            charset: config.charset(),
            peer,
            lost: AtomicBool::new(false),
            cancellation: Cancellation::new(),
            reader: Mutex::new(None),
        });
        let task = tokio::spawn(Arc::clone(&connection).read_loop(
            reader,
            config.framing().decoder(),
            config.read_buffer_size(),
        ));
        *connection.reader.lock() = Some(task);
        connection
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// 发送一个请求并等待其结果，最长等待 `timeout`。
    pub(crate) async fn transact(
        self: &Arc<Self>,
        request: String,
        timeout: Duration,
    ) -> Result<TransactionOutcome, RequestError> {
        let (generation, receiver) = self
            .slot
            .admit(request.clone())
            .map_err(|error| match error {
                AdmitError::Busy => IllegalStateError::in_flight("request"),
                AdmitError::Sealed => IllegalStateError::new("request", ClientState::Closed),
            })?;
        tracing::debug!(peer = %self.peer, generation, "transaction admitted");

        if self.lost.load(Ordering::Acquire) {
            self.complete_send(
                generation,
                &request,
                Err(TransportWriteError::connection_lost()),
            );
        } else {
            let connection = Arc::clone(self);
            let payload = self.charset.encode(&request);
            tokio::spawn(async move {
                connection.send(generation, request, payload).await;
            });
        }

        // 截止时间由独立任务执行，调用方丢弃 Future 后事务仍按时结束。
        let deadline = tokio::spawn(Arc::clone(self).expire_after(generation, timeout));
        let outcome = receiver.await;
        deadline.abort();
        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(_) => Err(IllegalStateError::new("request", ClientState::Closed).into()),
        }
    }

    async fn expire_after(self: Arc<Self>, generation: u64, timeout: Duration) {
        tokio::select! {
            _ = self.cancellation.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                if let Some(resolved) = self.slot.on_timeout(generation, timeout) {
                    tracing::debug!(peer = %self.peer, generation, ?timeout, "no response before timeout");
                    self.deliver(resolved);
                }
            }
        }
    }

    async fn send(&self, generation: u64, request: String, payload: Bytes) {
        let ctx = CallContext::new().with_cancellation(self.cancellation.clone());
        let result = self
            .writer
            .write(&ctx, &payload)
            .await
            .map(|_| ())
            .map_err(|error| {
                if error.is_cancelled() {
                    tracing::debug!(peer = %self.peer, "request write cancelled by close");
                } else {
                    tracing::warn!(peer = %self.peer, code = error.code(), %error, "request write failed");
                }
                TransportWriteError::from(&error)
            });
        self.complete_send(generation, &request, result);
    }

    fn complete_send(
        &self,
        generation: u64,
        request: &str,
        result: Result<(), TransportWriteError>,
    ) {
        match self.slot.on_send_complete(generation, result) {
            SendProgress::Acknowledge => {
                self.listener.on_send(request);
                if let Some(resolved) = self.slot.acknowledge_send(generation) {
                    self.deliver(resolved);
                }
            }
            SendProgress::Resolved(resolved) => self.deliver(resolved),
            SendProgress::Stale => {
                tracing::debug!(peer = %self.peer, generation, "send completion for finished transaction ignored");
            }
        }
    }

    fn deliver(&self, resolved: Resolved) {
        let Resolved { outcome, waiter } = resolved;
        tracing::debug!(
            peer = %self.peer,
            success = outcome.success,
            responded = outcome.response.is_some(),
            resolution = outcome.resolution.as_str(),
            "transaction resolved"
        );
        self.listener
            .on_request(&outcome.request, outcome.response.as_deref(), outcome.success);
        // 等待者可能已随 `request()` 的 Future 一起被丢弃。
        let _ = waiter.send(outcome);
    }

    async fn read_loop(
        self: Arc<Self>,
        mut reader: TcpReadHalf,
        mut decoder: Box<dyn ResponseDecoder>,
        buffer_size: usize,
    ) {
        let ctx = CallContext::new().with_cancellation(self.cancellation.clone());
        let mut buffer = BytesMut::with_capacity(buffer_size);
        loop {
            buffer.reserve(buffer_size);
            match reader.read_buf(&ctx, &mut buffer).await {
                Ok(0) => {
                    self.drain(&mut buffer, decoder.as_mut(), true);
                    self.on_inbound_closed(None);
                    return;
                }
                Ok(_) => self.drain(&mut buffer, decoder.as_mut(), false),
                Err(error) if error.is_cancelled() => return,
                Err(error) => {
                    self.on_inbound_closed(Some(error));
                    return;
                }
            }
        }
    }

    fn drain(&self, buffer: &mut BytesMut, decoder: &mut dyn ResponseDecoder, eof: bool) {
        loop {
            let decoded = if eof {
                decoder.decode_eof(buffer)
            } else {
                decoder.decode(buffer)
            };
            match decoded {
                Ok(Some(frame)) => self.on_frame(&frame),
                Ok(None) => return,
                Err(error) => {
                    tracing::warn!(peer = %self.peer, %error, "discarding undecodable response");
                }
            }
        }
    }

    fn on_frame(&self, frame: &[u8]) {
        let response = self.charset.decode(frame);
        match self.slot.on_response(response) {
            ResponseProgress::Resolved(resolved) => self.deliver(resolved),
            ResponseProgress::Recorded => {
                tracing::trace!(peer = %self.peer, "response recorded before send completion");
            }
            ResponseProgress::Discarded(response) => {
                tracing::debug!(
                    peer = %self.peer,
                    bytes = response.len(),
                    "discarding response with no pending transaction"
                );
            }
        }
    }

    fn on_inbound_closed(&self, error: Option<TransportError>) {
        self.lost.store(true, Ordering::Release);
        match error {
            Some(error) => {
                tracing::warn!(peer = %self.peer, code = error.code(), %error, "connection lost")
            }
            None => tracing::debug!(peer = %self.peer, "peer closed the connection"),
        }
        if let Some(resolved) = self.slot.on_connection_lost() {
            self.deliver(resolved);
        }
    }

    /// 有序关闭：结束在途事务 → 取消 IO → 写半关闭（受 `close_timeout` 约束）→ 终止入站任务。
    pub(crate) async fn close(&self, close_timeout: Duration) {
        if let Some(resolved) = self.slot.seal() {
            self.deliver(resolved);
        }
        self.cancellation.cancel();
        let ctx = CallContext::new().with_timeout(Some(close_timeout));
        if let Err(error) = self.writer.shutdown(&ctx).await {
            tracing::debug!(peer = %self.peer, code = error.code(), %error, "write shutdown failed");
        }
        self.abort_reader();
    }

    /// 不做任何通知地释放 IO 资源，用于客户端被直接丢弃的场景。
    pub(crate) fn abort(&self) {
        self.cancellation.cancel();
        self.abort_reader();
    }

    fn abort_reader(&self) {
        if let Some(task) = self.reader.lock().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("lost", &self.lost.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{listener::TransactionListener, outcome::Resolution};
    use spark_transport_tcp::TcpChannel;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::Notify,
    };

    #[derive(Default)]
    struct SendSignal {
        sent: Notify,
    }

    impl TransactionListener for SendSignal {
        fn on_start(&self) {}

        fn on_send(&self, _request: &str) {
            self.sent.notify_one();
        }

        fn on_request(&self, _request: &str, _response: Option<&str>, _success: bool) {}

        fn on_stop(&self) {}
    }

    /// 启动回环服务端：每次读到数据后按 `reply` 决定是否回写。
    async fn connect(
        reply: Option<&'static [u8]>,
        signal: Arc<SendSignal>,
    ) -> anyhow::Result<Arc<Connection>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0_u8; 64];
            while let Ok(read) = stream.read(&mut buf).await {
                if read == 0 {
                    return;
                }
                if let Some(reply) = reply
                    && stream.write_all(reply).await.is_err()
                {
                    return;
                }
            }
        });
        let channel = TcpChannel::connect(&CallContext::new(), addr).await?;
        Ok(Connection::start(
            channel,
            &ClientConfig::default(),
            ListenerGuard::new(signal),
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transact_returns_response_before_timeout() -> anyhow::Result<()> {
        let connection = connect(Some(b"PONG"), Arc::new(SendSignal::default())).await?;

        let outcome = connection
            .transact("PING".into(), Duration::from_secs(5))
            .await?;
        assert_eq!(outcome.response(), Some("PONG"));
        assert!(outcome.success);
        assert_eq!(outcome.resolution, Resolution::Responded);

        let again = connection
            .transact("PING".into(), Duration::from_secs(5))
            .await?;
        assert_eq!(again.response(), Some("PONG"), "槽应在上一个事务结束后空闲");
        connection.close(Duration::from_secs(1)).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn close_resolves_waiting_transact() -> anyhow::Result<()> {
        let signal = Arc::new(SendSignal::default());
        let connection = connect(None, Arc::clone(&signal)).await?;

        let waiting = {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move {
                connection
                    .transact("HELLO".into(), Duration::from_secs(30))
                    .await
            })
        };
        signal.sent.notified().await;

        connection.close(Duration::from_secs(1)).await;
        let outcome = tokio::time::timeout(Duration::from_secs(2), waiting).await???;
        assert!(!outcome.success);
        assert_eq!(outcome.response, None);
        assert_eq!(outcome.resolution, Resolution::Closed);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropped_caller_still_frees_the_slot_at_the_deadline() -> anyhow::Result<()> {
        let connection = connect(None, Arc::new(SendSignal::default())).await?;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            connection.transact("A".into(), Duration::from_millis(200)),
        )
        .await;
        assert!(abandoned.is_err(), "外层超时应先于事务超时触发");

        tokio::time::sleep(Duration::from_millis(400)).await;
        let outcome = connection
            .transact("B".into(), Duration::from_millis(50))
            .await?;
        assert_eq!(outcome.request, "B");
        assert!(matches!(outcome.resolution, Resolution::TimedOut(_)));
        connection.close(Duration::from_secs(1)).await;
        Ok(())
    }
}
