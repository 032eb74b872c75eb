#![doc = r#"
# spark-client

## 设计动机（Why）
- **定位**：单连接 TCP 客户端，发送离散的文本请求，并把每个请求与其异步响应关联成一个事务结果；
- **核心难点**：写完成与响应到达是两条独立的回调路径，顺序不定、可能并发；
  客户端要在不阻塞 IO 线程、不自旋的前提下为调用方提供“发一个请求、得一个结果”的约定；
- **架构角色**：位于 [`spark_transport_tcp`]（字节通道）与 [`spark_codec_text`]（分帧与字符集）之上，
  向外暴露 [`TcpClient`] 与 [`TransactionListener`]。

## 核心契约（What）
- 生命周期：`Unconnected → Connecting → Connected → Closed`，建连失败进入 `Failed`；
- [`TcpClient::request`] 返回 [`TransactionOutcome`]：`success` 表示写入是否成功，`response` 独立于 `success`；
- 结束策略：写失败立即结束；写成功后等待响应或超时；断连或关闭使在途事务以 `success = false` 结束；
- 同一时刻最多一个在途事务，第二个请求以 [`IllegalStateError`] 快速失败。

## 实现策略（How）
- 容量为 1 的待决槽用一把互斥锁串行化所有回调路径，并用事务代号过滤迟到事件；
- 每个事务配一个 `oneshot` 通道，调用方在 `tokio::time::timeout` 下等待；
- 监听器回调经过 `catch_unwind` 隔离，panic 只会被记录为 `tracing::error!`。

## 使用示例
```no_run
use std::sync::Arc;
use spark_client::{NoopListener, TcpClient};

# async fn demo() -> Result<(), Box<dyn std::error::Error>> {
let client = TcpClient::new("localhost", 9000, Arc::new(NoopListener))?;
client.connect().await?;
let outcome = client.request("PING").await?;
println!("{} -> {:?} (success = {})", outcome.request, outcome.response, outcome.success);
client.close().await;
# Ok(())
# }
```
"#]

mod client;
mod config;
mod connection;
mod endpoint;
mod error;
mod listener;
mod outcome;
mod pending;
mod state;

pub use client::TcpClient;
pub use config::ClientConfig;
pub use endpoint::Endpoint;
pub use error::{
    ClientError, ConnectionError, IllegalStateError, RequestError, ResponseTimeoutError,
    TransportWriteError,
};
pub use listener::{NoopListener, TransactionListener};
pub use outcome::{Resolution, TransactionOutcome};
pub use state::ClientState;

pub use spark_codec_text::{Charset, Framing};
pub use spark_transport_tcp::TcpSocketConfig;
