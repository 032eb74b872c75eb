//! 客户端错误分类。
//!
//! # 教案式说明
//! - **Why**：建连失败需要上抛给调用方（对实例致命）；而单次请求的失败或无响应属于正常运行态，
//!   只折叠进 [`TransactionOutcome`](crate::TransactionOutcome)，不以错误形式返回；
//! - **What**：
//!   - [`ClientError`]：构造参数非法；
//!   - [`ConnectionError`]：`connect()` 的全部失败路径；
//!   - [`RequestError`]：`request()` 唯一可能返回的错误，即状态非法；
//!   - [`TransportWriteError`] / [`ResponseTimeoutError`]：只作为结果里的
//!     [`Resolution`](crate::Resolution) 附带值出现。

use std::{fmt, time::Duration};

use spark_transport_tcp::{TransportError, codes};

use crate::{endpoint::Endpoint, state::ClientState};

/// 构造客户端时的参数错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },
}

/// 在不允许的状态下调用了操作。
///
/// 两种来源：生命周期状态不匹配（如未建连即请求），或已有一个事务在途时再次请求。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct IllegalStateError {
    operation: &'static str,
    state: ClientState,
    in_flight: bool,
}

impl IllegalStateError {
    pub(crate) fn new(operation: &'static str, state: ClientState) -> Self {
        Self {
            operation,
            state,
            in_flight: false,
        }
    }

    pub(crate) fn in_flight(operation: &'static str) -> Self {
        Self {
            operation,
            state: ClientState::Connected,
            in_flight: true,
        }
    }

    /// 被拒绝的操作名，如 `"connect"`、`"request"`。
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// 拒绝时客户端所处的状态。
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// 是否因为已有事务在途而被拒绝。
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

impl fmt::Display for IllegalStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.in_flight {
            write!(
                f,
                "cannot {}: another transaction is still in flight",
                self.operation
            )
        } else {
            write!(f, "cannot {} while client is {}", self.operation, self.state)
        }
    }
}

/// `connect()` 的失败。任何一种都使该客户端实例不可再用。
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
    #[error("failed to resolve {endpoint}")]
    Resolve {
        endpoint: Endpoint,
        #[source]
        source: TransportError,
    },
    #[error("failed to connect to {endpoint}")]
    Connect {
        endpoint: Endpoint,
        #[source]
        source: TransportError,
    },
    #[error("connect to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: Endpoint, after: Duration },
    #[error("connect to {endpoint} was interrupted by close")]
    Interrupted { endpoint: Endpoint },
}

impl ConnectionError {
    pub(crate) fn from_transport(endpoint: &Endpoint, after: Duration, error: TransportError) -> Self {
        let endpoint = endpoint.clone();
        if error.is_cancelled() {
            return ConnectionError::Interrupted { endpoint };
        }
        if error.is_timeout() {
            return ConnectionError::Timeout { endpoint, after };
        }
        match error.code() {
            codes::RESOLVE_FAILED | codes::RESOLVE_EMPTY => ConnectionError::Resolve {
                endpoint,
                source: error,
            },
            _ => ConnectionError::Connect {
                endpoint,
                source: error,
            },
        }
    }
}

/// `request()` 的失败。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
}

/// 异步写入失败，作为 `success = false` 的原因记录在结果中。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({code})")]
pub struct TransportWriteError {
    code: &'static str,
    message: String,
}

impl TransportWriteError {
    pub(crate) fn connection_lost() -> Self {
        Self {
            code: codes::WRITE_FAILED,
            message: "connection to peer was lost".to_owned(),
        }
    }

    /// 传输层稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&TransportError> for TransportWriteError {
    fn from(error: &TransportError) -> Self {
        Self {
            code: error.code(),
            message: error.message().to_owned(),
        }
    }
}

/// 在限定时间内未观察到响应。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no response within {after:?}")]
pub struct ResponseTimeoutError {
    after: Duration,
}

impl ResponseTimeoutError {
    pub(crate) fn new(after: Duration) -> Self {
        Self { after }
    }

    pub fn after(&self) -> Duration {
        self.after
    }
}
