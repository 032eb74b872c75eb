#![doc = r#"
# spark-transport-tcp

## 设计动机（Why）
- **定位**：该 crate 提供客户端在 Tokio 运行时上的最小 TCP 通道实现，
  封装解析、建连、读写半部与套接字选项等底层细节。
- **架构角色**：作为 `spark-client` 的传输通道（Transport Channel），只负责字节搬运；
  请求/响应的关联逻辑全部位于客户端状态机，本 crate 不做任何决策。
- **设计理念**：强调“上下文传递”与“错误分类”，所有网络操作均感知
  [`CallContext`] 的取消与截止时间，并在失败时映射为结构化的 [`TransportError`]。

## 核心契约（What）
- **输入条件**：调用方必须在 Tokio 运行时中使用本实现，并显式传递 `CallContext`；
- **输出保障**：解析、建连、读写与关闭均返回语义化结果，出错时附带稳定错误码及
  [`ErrorCategory`]；
- **全双工**：[`TcpChannel::into_split`] 拆出独立的读半部与写半部，入站读取循环不会阻塞写路径。

## 实现策略（How）
- **执行框架**：完全依赖 Tokio 的 `TcpStream`，并通过 `tokio::select!` 将取消/超时与 IO Future 组合；
- **取消信号**：[`Cancellation`] 基于 `Notify` 唤醒，不需要轮询；
- **套接字选项**：[`TcpSocketConfig`] 通过 `socket2::SockRef` 落地 `SO_KEEPALIVE`、`SO_LINGER`。

## 风险与考量（Trade-offs）
- **解析策略**：主机名解析仅取第一个地址，不做多地址轮询（Happy Eyeballs）；
- **写路径串行化**：写半部内部使用 `tokio::sync::Mutex`，同一时刻只允许一次写入，
  与客户端“单飞行请求”的协议约束一致。
"#]

mod channel;
mod context;
mod error;
mod util;

pub use channel::{TcpChannel, TcpReadHalf, TcpSocketConfig, TcpWriteHalf};
pub use context::{CallContext, Cancellation};
pub use error::{ErrorCategory, TransportError, codes};
pub use util::resolve;
