use std::fmt;

use crate::error::{ResponseTimeoutError, TransportWriteError};

/// 一次事务的最终结果，同时通过 `on_request` 通知监听器。
///
/// - `success`：当且仅当写入在无传输错误的情况下完成；
/// - `response`：与 `success` 相互独立，写入成功但未收到响应时为 `None`；
/// - `resolution`：事务以何种方式结束，仅用于诊断。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub request: String,
    pub response: Option<String>,
    pub success: bool,
    pub resolution: Resolution,
}

impl TransactionOutcome {
    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }
}

/// 事务的结束原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 写入成功且观察到响应。
    Responded,
    /// 写入失败，立即结束。
    SendFailed(TransportWriteError),
    /// 等待响应超时；迟到的响应会被丢弃。
    TimedOut(ResponseTimeoutError),
    /// 未收到响应前对端关闭或读取出错。
    ConnectionLost,
    /// 客户端在事务进行中被关闭。
    Closed,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Responded => "responded",
            Resolution::SendFailed(_) => "send_failed",
            Resolution::TimedOut(_) => "timed_out",
            Resolution::ConnectionLost => "connection_lost",
            Resolution::Closed => "closed",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::SendFailed(error) => write!(f, "send failed: {error}"),
            Resolution::TimedOut(error) => write!(f, "timed out: {error}"),
            other => f.write_str(other.as_str()),
        }
    }
}
