//! 容量为 1 的待决事务槽。
//!
//! # 教案式说明
//!
//! ## 意图（Why）
//! - 写完成回调与响应回调运行在不同任务上，到达顺序不确定，甚至可能并发；
//!   二者以及超时、断连、关闭五条路径都要基于同一份一致快照判断“事务是否结束”；
//! - 协议只支持单个在途交换，第二个请求必须快速失败，而不是覆盖第一个事务的状态。
//!
//! ## 逻辑（How）
//! - 全部字段放在一把 `parking_lot::Mutex` 后面，每条路径在锁内完成“更新 + 判定”；
//! - 每个事务分配单调递增的 `generation`，写完成与超时路径携带它回来，
//!   已结束或已被替换的事务返回 `Stale`，保证迟到事件不会串到下一个事务上；
//! - 判定结束时把事务从槽中取出，连同 `oneshot::Sender` 打包成 [`Resolved`] 返回，
//!   由调用方在锁外通知监听器并唤醒等待者，监听器永远不会在持锁状态下被调用。
//!
//! ## 契约（What）
//! - 写失败：立即结束，`success = false`；
//! - 写成功：进入 `Success`，调用方先发出 `on_send` 再调用 [`PendingSlot::acknowledge_send`]；
//!   只有确认之后观察到的（或之前已记录的）响应才会结束事务，从而 `on_send` 总在 `on_request` 之前；
//! - 超时：`success` 取写入结果，尚未完成视为 `false`，`response = None`；
//! - 断连：仅当尚未观察到响应时结束事务，`success = false`；
//! - 关闭：槽被封存，在途事务以 `success = false` 结束，之后的一切事件都被丢弃。
//!
//! ## 注意事项（Trade-offs）
//! - 协议层没有请求标识，超时后才到达的响应若恰好落在下一个事务的窗口内，会被当作下一个事务的响应。

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{
    error::{ResponseTimeoutError, TransportWriteError},
    outcome::{Resolution, TransactionOutcome},
};

/// 写入在事务内的进度。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SendOutcome {
    Pending,
    Success,
    Failure(TransportWriteError),
}

/// 已结束的事务：结果与等待者的唤醒端。
#[derive(Debug)]
pub(crate) struct Resolved {
    pub(crate) outcome: TransactionOutcome,
    pub(crate) waiter: oneshot::Sender<TransactionOutcome>,
}

/// 槽拒绝接纳新事务的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdmitError {
    Busy,
    Sealed,
}

/// 写完成回调的处理结果。
#[derive(Debug)]
pub(crate) enum SendProgress {
    /// 写入成功，调用方应发出 `on_send` 后调用 `acknowledge_send`。
    Acknowledge,
    Resolved(Resolved),
    /// 事务已经结束（超时、断连或关闭），该回调被忽略。
    Stale,
}

/// 响应回调的处理结果。
#[derive(Debug)]
pub(crate) enum ResponseProgress {
    Resolved(Resolved),
    /// 已记录，等待写入确认。
    Recorded,
    /// 没有可归属的事务，或该事务已记录过响应。
    Discarded(String),
}

#[derive(Debug)]
struct PendingTransaction {
    generation: u64,
    request: String,
    send: SendOutcome,
    send_acknowledged: bool,
    response: Option<String>,
    waiter: oneshot::Sender<TransactionOutcome>,
}

impl PendingTransaction {
    fn resolve(self, resolution: Resolution) -> Resolved {
        let (success, response) = match resolution {
            Resolution::Responded => (true, self.response),
            Resolution::TimedOut(_) => (self.send == SendOutcome::Success, None),
            Resolution::SendFailed(_) | Resolution::ConnectionLost | Resolution::Closed => {
                (false, None)
            }
        };
        Resolved {
            outcome: TransactionOutcome {
                request: self.request,
                response,
                success,
                resolution,
            },
            waiter: self.waiter,
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    next_generation: u64,
    current: Option<PendingTransaction>,
    sealed: bool,
}

impl SlotState {
    fn take_if(&mut self, generation: u64) -> Option<PendingTransaction> {
        if self
            .current
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
        {
            self.current.take()
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PendingSlot {
    state: Mutex<SlotState>,
}

impl PendingSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 接纳一个新事务，返回其代号与结果接收端。
    pub(crate) fn admit(
        &self,
        request: String,
    ) -> Result<(u64, oneshot::Receiver<TransactionOutcome>), AdmitError> {
        let mut state = self.state.lock();
        if state.sealed {
            return Err(AdmitError::Sealed);
        }
        if state.current.is_some() {
            return Err(AdmitError::Busy);
        }
        state.next_generation += 1;
        let generation = state.next_generation;
        let (waiter, receiver) = oneshot::channel();
        state.current = Some(PendingTransaction {
            generation,
            request,
            send: SendOutcome::Pending,
            send_acknowledged: false,
            response: None,
            waiter,
        });
        Ok((generation, receiver))
    }

    pub(crate) fn on_send_complete(
        &self,
        generation: u64,
        result: Result<(), TransportWriteError>,
    ) -> SendProgress {
        let mut state = self.state.lock();
        match result {
            Ok(()) => match state.current.as_mut() {
                Some(pending) if pending.generation == generation => {
                    pending.send = SendOutcome::Success;
                    SendProgress::Acknowledge
                }
                _ => SendProgress::Stale,
            },
            Err(error) => match state.take_if(generation) {
                Some(mut pending) => {
                    pending.send = SendOutcome::Failure(error.clone());
                    SendProgress::Resolved(pending.resolve(Resolution::SendFailed(error)))
                }
                None => SendProgress::Stale,
            },
        }
    }

    /// `on_send` 已发出；若响应已先到达则结束事务。
    pub(crate) fn acknowledge_send(&self, generation: u64) -> Option<Resolved> {
        let mut state = self.state.lock();
        let pending = state
            .current
            .as_mut()
            .filter(|pending| pending.generation == generation)?;
        pending.send_acknowledged = true;
        if pending.response.is_none() {
            return None;
        }
        state
            .current
            .take()
            .map(|pending| pending.resolve(Resolution::Responded))
    }

    pub(crate) fn on_response(&self, response: String) -> ResponseProgress {
        let mut state = self.state.lock();
        if state.sealed {
            return ResponseProgress::Discarded(response);
        }
        let Some(pending) = state.current.as_mut() else {
            return ResponseProgress::Discarded(response);
        };
        if pending.response.is_some() {
            return ResponseProgress::Discarded(response);
        }
        pending.response = Some(response);
        if !pending.send_acknowledged {
            return ResponseProgress::Recorded;
        }
        match state.current.take() {
            Some(pending) => ResponseProgress::Resolved(pending.resolve(Resolution::Responded)),
            None => ResponseProgress::Recorded,
        }
    }

    pub(crate) fn on_timeout(&self, generation: u64, after: Duration) -> Option<Resolved> {
        let pending = self.state.lock().take_if(generation)?;
        Some(pending.resolve(Resolution::TimedOut(ResponseTimeoutError::new(after))))
    }

    /// 对端关闭或读取失败。已观察到响应的事务保留给写完成路径结束。
    pub(crate) fn on_connection_lost(&self) -> Option<Resolved> {
        let mut state = self.state.lock();
        if state
            .current
            .as_ref()
            .is_some_and(|pending| pending.response.is_none())
        {
            return state
                .current
                .take()
                .map(|pending| pending.resolve(Resolution::ConnectionLost));
        }
        None
    }

    /// 封存槽并结束在途事务；之后的接纳与响应都会被拒绝。
    pub(crate) fn seal(&self) -> Option<Resolved> {
        let mut state = self.state.lock();
        state.sealed = true;
        state
            .current
            .take()
            .map(|pending| pending.resolve(Resolution::Closed))
    }

    #[cfg(test)]
    fn is_idle(&self) -> bool {
        self.state.lock().current.is_none()
    }
}
