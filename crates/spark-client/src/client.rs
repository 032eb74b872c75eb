use std::{net::SocketAddr, sync::Arc, time::Duration};

use parking_lot::Mutex;
use spark_transport_tcp::{CallContext, Cancellation, TcpChannel, TransportError, resolve};

use crate::{
    config::ClientConfig,
    connection::Connection,
    endpoint::Endpoint,
    error::{ClientError, ConnectionError, IllegalStateError, RequestError},
    listener::{ListenerGuard, TransactionListener},
    outcome::TransactionOutcome,
    state::ClientState,
};

/// 单连接 TCP 请求/响应客户端。
///
/// # 教案式说明
///
/// ## 意图（Why）
/// - 在回调驱动的异步 IO 之上提供“发送一个请求、得到一个结果”的调用约定，
///   同时把生命周期与事务事件推送给 [`TransactionListener`]；
/// - 等待只发生在调用方自己的任务上（`await`），从不自旋，也从不无限期挂起。
///
/// ## 逻辑（How）
/// - 生命周期状态与连接句柄放在同一把锁后面，状态检查与转换一次完成；
/// - `connect` 解析主机并建连，成功后启动 [`Connection`]（入站任务 + 待决槽）；
/// - `request` 把请求交给连接：写入在独立任务中进行，结果由写完成、响应、超时、断连或关闭之一决定；
/// - `close` 先切换到 `Closed` 并通知 `on_stop`，再打断建连、结束在途事务并释放套接字与任务。
///
/// ## 契约（What）
/// - 方法均接收 `&self`，客户端可以放入 `Arc` 在多个任务间共享；
/// - 同一时刻最多一个在途事务，第二个 `request` 立即返回 [`IllegalStateError`]；
/// - 建连失败对实例是致命的：状态进入 `Failed`，只能 `close`；
/// - 未调用 `close` 就丢弃客户端时，后台任务与套接字同样被释放，但不会触发 `on_stop`。
///
/// ## 注意事项（Trade-offs）
/// - 协议层没有请求标识，超时后迟到的响应可能被下一个事务接收；对时延敏感的调用方应使用较长的超时。
pub struct TcpClient {
    endpoint: Endpoint,
    config: ClientConfig,
    listener: ListenerGuard,
    lifecycle: Cancellation,
    inner: Mutex<Inner>,
}

struct Inner {
    state: ClientState,
    connection: Option<Arc<Connection>>,
}

impl TcpClient {
    /// 以默认配置构造客户端。
    pub fn new(
        host: impl Into<String>,
        port: u16,
        listener: Arc<dyn TransactionListener>,
    ) -> Result<Self, ClientError> {
        Self::with_config(Endpoint::new(host, port)?, ClientConfig::default(), listener)
    }

    pub fn with_config(
        endpoint: Endpoint,
        config: ClientConfig,
        listener: Arc<dyn TransactionListener>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            endpoint,
            config,
            listener: ListenerGuard::new(listener),
            lifecycle: Cancellation::new(),
            inner: Mutex::new(Inner {
                state: ClientState::Unconnected,
                connection: None,
            }),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ClientState {
        self.inner.lock().state
    }

    /// 已连接时的对端地址。
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner
            .lock()
            .connection
            .as_ref()
            .map(|connection| connection.peer())
    }

    /// 建立连接，只允许在 `Unconnected` 状态调用。
    ///
    /// 等待受 `connect_timeout` 约束，并可被并发的 [`close`](Self::close) 打断。
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        {
            let mut inner = self.inner.lock();
            if inner.state != ClientState::Unconnected {
                return Err(IllegalStateError::new("connect", inner.state).into());
            }
            inner.state = ClientState::Connecting;
        }
        self.listener.on_start();
        tracing::debug!(endpoint = %self.endpoint, "connecting");

        let timeout = self.config.connect_timeout();
        let ctx = CallContext::new()
            .with_timeout(Some(timeout))
            .with_cancellation(self.lifecycle.clone());
        let channel = match self.open(&ctx).await {
            Ok(channel) => channel,
            Err(error) => {
                let mut inner = self.inner.lock();
                if inner.state == ClientState::Connecting {
                    inner.state = ClientState::Failed;
                }
                drop(inner);
                tracing::debug!(endpoint = %self.endpoint, code = error.code(), %error, "connect failed");
                return Err(ConnectionError::from_transport(&self.endpoint, timeout, error));
            }
        };

        let peer = channel.peer_addr();
        {
            let mut inner = self.inner.lock();
            if inner.state != ClientState::Connecting {
                return Err(ConnectionError::Interrupted {
                    endpoint: self.endpoint.clone(),
                });
            }
            inner.connection = Some(Connection::start(
                channel,
                &self.config,
                self.listener.clone(),
            ));
            inner.state = ClientState::Connected;
        }
        tracing::debug!(endpoint = %self.endpoint, %peer, "connected");
        self.listener.on_connect(peer);
        Ok(())
    }

    async fn open(&self, ctx: &CallContext) -> Result<TcpChannel, TransportError> {
        let addr = resolve(ctx, self.endpoint.host(), self.endpoint.port()).await?;
        TcpChannel::connect_with_config(ctx, addr, self.config.socket().clone()).await
    }

    /// 发送请求并等待结果，超时取 `response_timeout`。
    pub async fn request(
        &self,
        payload: impl Into<String>,
    ) -> Result<TransactionOutcome, RequestError> {
        self.request_with_timeout(payload, self.config.response_timeout())
            .await
    }

    /// 发送请求并等待结果，最长等待 `timeout`。
    ///
    /// 写失败、无响应、断连等都折叠进返回的 [`TransactionOutcome`]；
    /// 只有状态非法（未连接、已关闭、已有在途事务）才返回错误。
    pub async fn request_with_timeout(
        &self,
        payload: impl Into<String>,
        timeout: Duration,
    ) -> Result<TransactionOutcome, RequestError> {
        let connection = {
            let inner = self.inner.lock();
            match (&inner.connection, inner.state) {
                (Some(connection), ClientState::Connected) => Arc::clone(connection),
                (_, state) => return Err(IllegalStateError::new("request", state).into()),
            }
        };
        connection.transact(payload.into(), timeout).await
    }

    /// 关闭客户端，任何状态下都可以调用，重复调用为空操作。
    pub async fn close(&self) {
        let (previous, connection) = {
            let mut inner = self.inner.lock();
            if inner.state == ClientState::Closed {
                return;
            }
            let previous = std::mem::replace(&mut inner.state, ClientState::Closed);
            (previous, inner.connection.take())
        };
        self.listener.on_stop();
        self.lifecycle.cancel();
        if let Some(connection) = connection {
            connection.close(self.config.close_timeout()).await;
        }
        tracing::debug!(endpoint = %self.endpoint, from = %previous, "closed");
    }
}

impl Drop for TcpClient {
    fn drop(&mut self) {
        self.lifecycle.cancel();
        if let Some(connection) = self.inner.get_mut().connection.take() {
            connection.abort();
        }
    }
}

impl std::fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpClient")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopListener;

    fn client() -> TcpClient {
        TcpClient::new("127.0.0.1", 9, Arc::new(NoopListener)).expect("合法参数")
    }

    #[test]
    fn construction_validates_arguments() {
        assert!(TcpClient::new("", 9000, Arc::new(NoopListener)).is_err());
        assert!(TcpClient::new("localhost", 0, Arc::new(NoopListener)).is_err());
        let invalid = ClientConfig::new().with_read_buffer_size(0);
        let endpoint = Endpoint::new("localhost", 9000).expect("合法端点");
        assert!(TcpClient::with_config(endpoint, invalid, Arc::new(NoopListener)).is_err());
    }

    #[tokio::test]
    async fn request_before_connect_is_illegal() {
        let client = client();
        let error = client.request("PING").await.expect_err("未连接时请求应失败");
        let RequestError::IllegalState(error) = error;
        assert_eq!(error.state(), ClientState::Unconnected);
        assert!(!error.is_in_flight());
    }

    #[tokio::test]
    async fn close_without_connect_moves_to_closed() {
        let client = client();
        client.close().await;
        assert_eq!(client.state(), ClientState::Closed);
        assert!(matches!(
            client.connect().await,
            Err(ConnectionError::IllegalState(_))
        ));
    }
}
