use crate::{
    context::CallContext,
    error::{self, CONFIGURE, TransportError, map_io_error},
    util::run_with_context,
};
use bytes::BytesMut;
use socket2::SockRef;
use std::{io, net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream as TokioTcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex as AsyncMutex,
};

/// TCP 套接字级配置项，实现对内核行为的显式控制。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 客户端长时间保持单条连接等待请求，默认开启 `SO_KEEPALIVE`，让内核探测半开连接；
/// - 将 `TCP_NODELAY`、`SO_LINGER` 等选项集中配置，避免调用方直接操作 `socket2`。
///
/// ## 核心逻辑（How）
/// - `apply` 在建连成功后、拆分读写半部之前执行，一次性写入全部选项；
/// - `linger = Some(dur)` 时，关闭阶段在 `dur` 后仍未发送完成就改发 RST；`None` 沿用内核默认。
///
/// ## 契约说明（What）
/// - **前置条件**：调用 `apply` 前，`TokioTcpStream` 必须已成功创建；
/// - **后置条件**：若 `apply` 返回 `Ok(())`，则套接字选项已落地，失败时通道不会被构造。
///
/// ## 设计取舍与注意事项（Trade-offs）
/// - `SO_LINGER` 在不同平台的精度不同（Linux 取整到秒）；
/// - keepalive 探测间隔沿用内核参数，不在此处暴露。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpSocketConfig {
    keepalive: bool,
    nodelay: bool,
    linger: Option<Duration>,
}

impl Default for TcpSocketConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpSocketConfig {
    /// 默认配置：开启 keepalive，关闭 nodelay，`linger = None`。
    pub const fn new() -> Self {
        Self {
            keepalive: true,
            nodelay: false,
            linger: None,
        }
    }

    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// 设置 `SO_LINGER` 超时时长。
    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    pub fn keepalive(&self) -> bool {
        self.keepalive
    }

    pub fn nodelay(&self) -> bool {
        self.nodelay
    }

    pub fn linger(&self) -> Option<Duration> {
        self.linger
    }

    fn apply(&self, stream: &TokioTcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;
        let sock = SockRef::from(stream);
        sock.set_keepalive(self.keepalive)?;
        sock.set_linger(self.linger)
    }
}

/// 已建立的 TCP 连接，尚未拆分读写方向。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 建连阶段需要一个完整的流对象来应用套接字选项、读取地址元数据；
///   之后客户端立即调用 [`TcpChannel::into_split`]，由独立任务驱动读半部，
///   请求路径只持有写半部。
///
/// ## 契约 (What)
/// - `connect` / `connect_with_config`：根据 `CallContext` 建立到目标地址的连接；
/// - `peer_addr` / `local_addr`：建连时记录的地址；
/// - `into_split`：消费通道，返回 [`TcpReadHalf`] 与 [`TcpWriteHalf`]。
///
/// ## 注意事项 (Trade-offs)
/// - 拆分后两个半部各自持有底层套接字的一份引用，只有二者都被释放时连接才真正关闭；
///   写半部的 [`TcpWriteHalf::shutdown`] 只发送 FIN。
#[derive(Debug)]
pub struct TcpChannel {
    stream: TokioTcpStream,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    config: TcpSocketConfig,
}

impl TcpChannel {
    /// 使用默认套接字配置建连。
    pub async fn connect(ctx: &CallContext, addr: SocketAddr) -> Result<Self, TransportError> {
        Self::connect_with_config(ctx, addr, TcpSocketConfig::default()).await
    }

    /// 建连并应用指定的套接字配置。
    ///
    /// - **How**：通过 `run_with_context` 把建连过程与 `ctx` 绑定，继承取消/超时；
    ///   成功后读取本地/对端地址并调用 `config.apply`；
    /// - **What**：失败时错误码覆盖“连接失败”“配置失败”“取消”“超时”四类。
    pub async fn connect_with_config(
        ctx: &CallContext,
        addr: SocketAddr,
        config: TcpSocketConfig,
    ) -> Result<Self, TransportError> {
        let stream = run_with_context(ctx, error::CONNECT, TokioTcpStream::connect(addr)).await?;
        let local_addr = stream
            .local_addr()
            .map_err(|err| map_io_error(error::CONNECT, err))?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|err| map_io_error(error::CONNECT, err))?;
        config
            .apply(&stream)
            .map_err(|err| map_io_error(CONFIGURE, err))?;
        tracing::trace!(%peer_addr, %local_addr, "tcp channel established");
        Ok(Self {
            stream,
            peer_addr,
            local_addr,
            config,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 返回构造时使用的套接字配置。
    pub fn config(&self) -> &TcpSocketConfig {
        &self.config
    }

    /// 查询内核中实际生效的 `SO_KEEPALIVE`。
    pub fn keepalive(&self) -> Result<bool, TransportError> {
        SockRef::from(&self.stream)
            .keepalive()
            .map_err(|err| map_io_error(CONFIGURE, err))
    }

    /// 查询内核中实际生效的 `SO_LINGER`。
    pub fn linger(&self) -> Result<Option<Duration>, TransportError> {
        SockRef::from(&self.stream)
            .linger()
            .map_err(|err| map_io_error(CONFIGURE, err))
    }

    /// 拆分为独立的读半部与写半部。
    pub fn into_split(self) -> (TcpReadHalf, TcpWriteHalf) {
        let (read, write) = self.stream.into_split();
        (
            TcpReadHalf {
                inner: read,
                peer_addr: self.peer_addr,
            },
            TcpWriteHalf {
                inner: AsyncMutex::new(write),
                peer_addr: self.peer_addr,
            },
        )
    }
}

/// 连接的读半部，由客户端的入站任务独占。
#[derive(Debug)]
pub struct TcpReadHalf {
    inner: OwnedReadHalf,
    peer_addr: SocketAddr,
}

impl TcpReadHalf {
    /// 追加读取到 `buf`，返回本次读取的字节数；`Ok(0)` 表示对端已关闭写方向（EOF）。
    pub async fn read_buf(
        &mut self,
        ctx: &CallContext,
        buf: &mut BytesMut,
    ) -> Result<usize, TransportError> {
        let read = run_with_context(ctx, error::READ, self.inner.read_buf(buf)).await?;
        tracing::trace!(peer = %self.peer_addr, bytes = read, "tcp read");
        Ok(read)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

/// 连接的写半部；内部互斥保证同一时刻只有一次写入在进行。
#[derive(Debug)]
pub struct TcpWriteHalf {
    inner: AsyncMutex<OwnedWriteHalf>,
    peer_addr: SocketAddr,
}

impl TcpWriteHalf {
    /// 将整个缓冲区写入套接字并刷新，返回写入的字节数。
    ///
    /// 返回 `Ok` 仅表示字节已交给内核发送缓冲区，不代表对端已经读取。
    pub async fn write(&self, ctx: &CallContext, buf: &[u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len();
        run_with_context(ctx, error::WRITE, async {
            let mut guard = self.inner.lock().await;
            guard.write_all(buf).await?;
            guard.flush().await?;
            Ok::<_, io::Error>(len)
        })
        .await?;
        tracing::trace!(peer = %self.peer_addr, bytes = len, "tcp write");
        Ok(len)
    }

    /// 写半关闭：发送 FIN，之后不能再写入。
    pub async fn shutdown(&self, ctx: &CallContext) -> Result<(), TransportError> {
        run_with_context(ctx, error::SHUTDOWN, async {
            let mut guard = self.inner.lock().await;
            guard.shutdown().await
        })
        .await
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
