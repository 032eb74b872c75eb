use crate::{
    context::CallContext,
    error::{
        self, ErrorCategory, OperationKind, TransportError, cancelled_error, map_io_error,
        timeout_error,
    },
};
use std::{future::Future, io, net::SocketAddr};

/// 在保留取消/超时语义的前提下执行 IO Future。
///
/// 取消优先于截止时间，截止时间优先于 IO 结果（`biased`），
/// 保证 `close()` 触发的取消不会被恰好同时完成的写入掩盖。
pub(crate) async fn run_with_context<F, T>(
    ctx: &CallContext,
    kind: OperationKind,
    future: F,
) -> Result<T, TransportError>
where
    F: Future<Output = io::Result<T>>,
{
    if ctx.cancellation().is_cancelled() {
        return Err(cancelled_error(kind));
    }
    if ctx.is_expired() {
        return Err(timeout_error(kind));
    }

    let cancel = ctx.cancellation().cancelled();
    tokio::pin!(cancel);
    tokio::pin!(future);

    if let Some(deadline) = ctx.deadline() {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);
        tokio::select! {
            biased;
            _ = &mut cancel => Err(cancelled_error(kind)),
            _ = &mut sleep => Err(timeout_error(kind)),
            result = &mut future => result.map_err(|err| map_io_error(kind, err)),
        }
    } else {
        tokio::select! {
            biased;
            _ = &mut cancel => Err(cancelled_error(kind)),
            result = &mut future => result.map_err(|err| map_io_error(kind, err)),
        }
    }
}

/// 将 `host:port` 解析为第一个可用的套接字地址。
///
/// - **What**：`host` 可以是 IP 字面量或主机名；解析过程继承 `ctx` 的取消与截止时间；
///   解析结果为空时返回 [`codes::RESOLVE_EMPTY`](crate::codes::RESOLVE_EMPTY)。
/// - **Trade-offs**：只取第一个地址，不做多地址回退。
pub async fn resolve(
    ctx: &CallContext,
    host: &str,
    port: u16,
) -> Result<SocketAddr, TransportError> {
    let mut addrs =
        run_with_context(ctx, error::RESOLVE, tokio::net::lookup_host((host, port))).await?;
    addrs.next().ok_or_else(|| {
        TransportError::new(
            error::codes::RESOLVE_EMPTY,
            format!("tcp resolve: no address for {host}:{port}"),
            ErrorCategory::NonRetryable,
        )
    })
}
