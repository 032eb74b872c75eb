use std::{
    any::Any,
    net::SocketAddr,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

/// 客户端生命周期与事务结果的观察者。
///
/// # 教案式说明
///
/// ## 意图（Why）
/// - 展示层（控制台转录、日志、测试探针）只需要“发生了什么”，不参与任何决策；
///   客户端通过该契约把事件推送出去，自身不依赖任何展示实现。
///
/// ## 调用时机（What）
/// - [`on_start`](Self::on_start)：建连开始之前；
/// - [`on_connect`](Self::on_connect)：建连成功之后，可选实现；
/// - [`on_send`](Self::on_send)：请求字节已无错误地交给传输层；
/// - [`on_request`](Self::on_request)：每个事务唯一一次的终态通知；
/// - [`on_stop`](Self::on_stop)：`close` 开始、资源释放之前。
///
/// ## 注意事项（Trade-offs）
/// - 回调运行在触发事件的任务所在的工作线程上，实现方不能假设固定线程；
/// - 回调不应长时间阻塞：`on_request` 返回之后等待中的 `request()` 才会被唤醒；
/// - 回调中的 panic 会被捕获并记录，不会破坏客户端状态。
pub trait TransactionListener: Send + Sync + 'static {
    fn on_start(&self);

    fn on_connect(&self, peer: SocketAddr) {
        let _ = peer;
    }

    fn on_send(&self, request: &str);

    fn on_request(&self, request: &str, response: Option<&str>, success: bool);

    fn on_stop(&self);
}

/// 忽略所有事件的监听器。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl TransactionListener for NoopListener {
    fn on_start(&self) {}

    fn on_send(&self, _request: &str) {}

    fn on_request(&self, _request: &str, _response: Option<&str>, _success: bool) {}

    fn on_stop(&self) {}
}

/// 在回调边界捕获 panic 的监听器包装。
#[derive(Clone)]
pub(crate) struct ListenerGuard {
    inner: Arc<dyn TransactionListener>,
}

impl ListenerGuard {
    pub(crate) fn new(inner: Arc<dyn TransactionListener>) -> Self {
        Self { inner }
    }

    pub(crate) fn on_start(&self) {
        self.invoke("on_start", || self.inner.on_start());
    }

    pub(crate) fn on_connect(&self, peer: SocketAddr) {
        self.invoke("on_connect", || self.inner.on_connect(peer));
    }

    pub(crate) fn on_send(&self, request: &str) {
        self.invoke("on_send", || self.inner.on_send(request));
    }

    pub(crate) fn on_request(&self, request: &str, response: Option<&str>, success: bool) {
        self.invoke("on_request", || {
            self.inner.on_request(request, response, success)
        });
    }

    pub(crate) fn on_stop(&self) {
        self.invoke("on_stop", || self.inner.on_stop());
    }

    fn invoke(&self, callback: &'static str, f: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
            tracing::error!(
                callback,
                panic = %panic_message(payload.as_ref()),
                "transaction listener panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    #[derive(Default)]
    struct PanickingListener {
        stops: AtomicUsize,
    }

    impl TransactionListener for PanickingListener {
        fn on_start(&self) {}

        fn on_send(&self, request: &str) {
            panic!("listener exploded on {request}");
        }

        fn on_request(&self, _request: &str, _response: Option<&str>, _success: bool) {
            std::panic::panic_any(42_u32);
        }

        fn on_stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    #[traced_test]
    fn panics_are_contained_and_logged() {
        let listener = Arc::new(PanickingListener::default());
        let guard = ListenerGuard::new(listener.clone());

        guard.on_send("PING");
        guard.on_request("PING", None, false);
        guard.on_stop();

        assert_eq!(listener.stops.load(Ordering::SeqCst), 1);
        assert!(logs_contain("transaction listener panicked"));
        assert!(logs_contain("listener exploded on PING"));
        assert!(logs_contain("<non-string panic payload>"));
    }
}
