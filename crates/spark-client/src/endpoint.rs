use std::fmt;

use crate::error::ClientError;

/// 远端对等方的 `host:port`，在客户端生命周期内不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// 校验并构造端点：`host` 不能为空白，`port` 不能为 0。
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ClientError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ClientError::InvalidArgument {
                name: "host",
                reason: "must not be empty",
            });
        }
        if port == 0 {
            return Err(ClientError::InvalidArgument {
                name: "port",
                reason: "must be in 1..=65535",
            });
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
