use std::{borrow::Cow, io, time::Duration};

/// 传输层稳定错误码，遵循 `<域>.<语义>` 命名约定。
pub mod codes {
    pub const RESOLVE_FAILED: &str = "spark.transport.tcp.resolve_failed";
    pub const RESOLVE_EMPTY: &str = "spark.transport.tcp.resolve_empty";
    pub const CONNECT_FAILED: &str = "spark.transport.tcp.connect_failed";
    pub const READ_FAILED: &str = "spark.transport.tcp.read_failed";
    pub const WRITE_FAILED: &str = "spark.transport.tcp.write_failed";
    pub const SHUTDOWN_FAILED: &str = "spark.transport.tcp.shutdown_failed";
    pub const CONFIGURE_FAILED: &str = "spark.transport.tcp.configure_failed";
    pub const CANCELLED: &str = "spark.transport.tcp.cancelled";
    pub const TIMEOUT: &str = "spark.transport.tcp.timeout";
}

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy, Debug)]
pub(crate) struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

pub(crate) const RESOLVE: OperationKind = OperationKind {
    code: codes::RESOLVE_FAILED,
    message: "tcp resolve",
};
pub(crate) const CONNECT: OperationKind = OperationKind {
    code: codes::CONNECT_FAILED,
    message: "tcp connect",
};
pub(crate) const READ: OperationKind = OperationKind {
    code: codes::READ_FAILED,
    message: "tcp read",
};
pub(crate) const WRITE: OperationKind = OperationKind {
    code: codes::WRITE_FAILED,
    message: "tcp write",
};
pub(crate) const SHUTDOWN: OperationKind = OperationKind {
    code: codes::SHUTDOWN_FAILED,
    message: "tcp shutdown",
};
pub(crate) const CONFIGURE: OperationKind = OperationKind {
    code: codes::CONFIGURE_FAILED,
    message: "tcp configure",
};

/// 错误的主要处置策略。
///
/// - **Why**：上层（客户端状态机、CLI）据此决定是否值得提示“稍后重试”，
///   而不必解析错误文案。
/// - **What**：`Retryable` 附带建议的退避时长；客户端本身不做重试，仅透传该建议。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 暂时性故障，可在 `after` 之后重试。
    Retryable { after: Duration },
    /// 不可重试的故障。
    NonRetryable,
    /// 截止时间已到。
    Timeout,
    /// 调用被取消。
    Cancelled,
}

/// 传输层结构化错误：稳定错误码 + 人类可读消息 + 分类 + 可选底层 IO 原因。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 建连、写入失败需要被客户端折叠进事务结果或 `ConnectionError`，统一的错误码便于
///   日志聚合与测试断言。
///
/// ## 契约 (What)
/// - `code`：取自 [`codes`] 的 `'static` 字符串；
/// - `message`：形如 `tcp write: Broken pipe` 的描述，避免包含敏感信息；
/// - `source`：若由 `io::Error` 映射而来则保留原始错误，通过 `Error::source` 暴露。
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    code: &'static str,
    message: Cow<'static, str>,
    category: ErrorCategory,
    #[source]
    source: Option<io::Error>,
}

impl TransportError {
    /// 构造不带底层原因的错误。
    pub fn new(
        code: &'static str,
        message: impl Into<Cow<'static, str>>,
        category: ErrorCategory,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            category,
            source: None,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// 底层 IO 错误的种类（若存在）。
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        self.source.as_ref().map(io::Error::kind)
    }

    pub fn is_timeout(&self) -> bool {
        self.category == ErrorCategory::Timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.category == ErrorCategory::Cancelled
    }
}

/// 将 IO 错误映射为传输错误，并附带错误分类。
pub(crate) fn map_io_error(kind: OperationKind, error: io::Error) -> TransportError {
    let category = categorize_io_error(&error);
    TransportError {
        code: kind.code,
        message: Cow::Owned(format!("{}: {}", kind.message, error)),
        category,
        source: Some(error),
    }
}

/// 构造取消错误。
pub(crate) fn cancelled_error(kind: OperationKind) -> TransportError {
    let message = format!("{} cancelled", kind.message);
    TransportError::new(codes::CANCELLED, message, ErrorCategory::Cancelled)
}

/// 构造超时错误。
pub(crate) fn timeout_error(kind: OperationKind) -> TransportError {
    let message = format!("{} timed out", kind.message);
    TransportError::new(codes::TIMEOUT, message, ErrorCategory::Timeout)
}

fn categorize_io_error(error: &io::Error) -> ErrorCategory {
    use io::ErrorKind;
    match error.kind() {
        ErrorKind::TimedOut => ErrorCategory::Timeout,
        ErrorKind::WouldBlock | ErrorKind::Interrupted => ErrorCategory::Retryable {
            after: Duration::from_millis(5),
        },
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::AddrInUse
        | ErrorKind::AddrNotAvailable
        | ErrorKind::BrokenPipe => ErrorCategory::Retryable {
            after: Duration::from_millis(50),
        },
        ErrorKind::WriteZero => ErrorCategory::Retryable {
            after: Duration::from_millis(10),
        },
        ErrorKind::PermissionDenied | ErrorKind::Unsupported => ErrorCategory::NonRetryable,
        _ => ErrorCategory::NonRetryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_errors_keep_code_message_and_source() {
        let err = map_io_error(
            WRITE,
            io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"),
        );
        assert_eq!(err.code(), codes::WRITE_FAILED);
        assert_eq!(err.to_string(), "tcp write: peer gone");
        assert_eq!(err.io_kind(), Some(io::ErrorKind::BrokenPipe));
        assert!(err.source().is_some(), "应保留底层 io::Error");
        assert_eq!(
            err.category(),
            ErrorCategory::Retryable {
                after: Duration::from_millis(50)
            }
        );
    }

    #[test]
    fn refused_connect_is_retryable_but_permission_is_not() {
        let refused = map_io_error(CONNECT, io::ErrorKind::ConnectionRefused.into());
        assert!(matches!(refused.category(), ErrorCategory::Retryable { .. }));

        let denied = map_io_error(CONNECT, io::ErrorKind::PermissionDenied.into());
        assert_eq!(denied.category(), ErrorCategory::NonRetryable);

        let timed_out = map_io_error(READ, io::ErrorKind::TimedOut.into());
        assert!(timed_out.is_timeout());
    }

    #[test]
    fn synthetic_errors_use_stable_codes() {
        let cancelled = cancelled_error(CONNECT);
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.code(), codes::CANCELLED);
        assert_eq!(cancelled.message(), "tcp connect cancelled");

        let timeout = timeout_error(SHUTDOWN);
        assert_eq!(timeout.code(), codes::TIMEOUT);
        assert_eq!(timeout.message(), "tcp shutdown timed out");
        assert!(timeout.source().is_none());
    }
}
