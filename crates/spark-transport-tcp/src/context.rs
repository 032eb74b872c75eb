use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{sync::Notify, time::Instant};

/// 可克隆的取消令牌，所有克隆共享同一个取消状态。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 客户端 `close()` 需要打断仍在进行的建连或写入；令牌被克隆进每一次 IO 调用的
///   [`CallContext`]，一次 `cancel` 即可让所有等待中的操作返回取消错误。
///
/// ## 逻辑 (How)
/// - `AtomicBool` 记录是否已取消，`Notify::notify_waiters` 唤醒所有已注册的等待者；
/// - [`Cancellation::cancelled`] 先创建 `Notified` 再检查标志，避免“检查后、注册前”被取消而丢失唤醒。
///
/// ## 契约 (What)
/// - `cancel` 幂等：仅第一次调用返回 `true`；
/// - **后置条件**：取消后 `is_cancelled` 永远为 `true`，令牌不可复位。
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    /// 创建尚未取消的令牌。
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发取消；返回值表示本次调用是否完成了状态切换。
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// 查询是否已取消。
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// 等待取消发生；若已取消则立即返回。
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// 单次传输调用的上下文：可选截止时间 + 取消令牌。
///
/// - **Why**：把“这次操作最多等多久、能否被打断”显式传给每个 IO 调用，
///   而不是散落在各个调用点的 `timeout` 包装里。
/// - **What**：`deadline` 使用 Tokio 单调时钟，测试中可配合 `tokio::time::pause` 推进。
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancellation: Cancellation,
}

impl CallContext {
    /// 创建无截止时间、未取消的上下文。
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置绝对截止时间。
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// 以“从现在起的时长”设置截止时间；`None` 表示不限时。
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|timeout| Instant::now() + timeout);
        self
    }

    /// 绑定共享的取消令牌。
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// 截止时间是否已过期；无截止时间时恒为 `false`。
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| deadline <= Instant::now())
    }

    /// 距离截止时间的剩余时长。
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
