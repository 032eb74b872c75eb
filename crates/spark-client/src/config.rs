use std::time::Duration;

use spark_codec_text::{Charset, Framing};
use spark_transport_tcp::TcpSocketConfig;

use crate::error::ClientError;

/// 客户端运行参数。
///
/// # 教案式说明
/// - **Why**：超时、字符集、分帧与套接字选项都属于部署期决策，集中在一个值对象里，
///   便于 CLI 从配置文件与命令行叠加构造；
/// - **How**：`with_*` 方法按值链式覆盖，未覆盖的字段保持 [`Default`]；
/// - **What**：默认值如下
///   - `response_timeout = 5s`：`request()` 等待响应的上限；
///   - `connect_timeout = 30s`：解析 + 建连的总上限；
///   - `close_timeout = 1s`：`close()` 中写半关闭的上限；
///   - `charset = UTF-8`，`framing = Chunk`，`read_buffer_size = 8 KiB`；
///   - `socket`：开启 `SO_KEEPALIVE`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    response_timeout: Duration,
    connect_timeout: Duration,
    close_timeout: Duration,
    charset: Charset,
    framing: Framing,
    read_buffer_size: usize,
    socket: TcpSocketConfig,
}

impl ClientConfig {
    pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
    pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_socket(mut self, socket: TcpSocketConfig) -> Self {
        self.socket = socket;
        self
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn socket(&self) -> &TcpSocketConfig {
        &self.socket
    }

    /// 校验无法在类型层面排除的取值。
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.read_buffer_size == 0 {
            return Err(ClientError::InvalidArgument {
                name: "read_buffer_size",
                reason: "must be greater than zero",
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ClientError::InvalidArgument {
                name: "connect_timeout",
                reason: "must be greater than zero",
            });
        }
        if let Framing::Line { max_length: 0 } = self.framing {
            return Err(ClientError::InvalidArgument {
                name: "framing",
                reason: "line budget must be greater than zero",
            });
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout: Self::DEFAULT_RESPONSE_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            close_timeout: Self::DEFAULT_CLOSE_TIMEOUT,
            charset: Charset::default(),
            framing: Framing::default(),
            read_buffer_size: Self::DEFAULT_READ_BUFFER_SIZE,
            socket: TcpSocketConfig::default(),
        }
    }
}
