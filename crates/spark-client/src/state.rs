use std::fmt;

/// 客户端连接生命周期状态。
///
/// ```text
/// Unconnected ──connect──▶ Connecting ──ok──▶ Connected
///                              │
///                              └──err──▶ Failed
/// (任意状态) ──close──▶ Closed
/// ```
///
/// - `Failed`：建连失败对该实例是致命的，之后只允许 `close`；
/// - `Closed`：终态，重复 `close` 为空操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    Unconnected,
    Connecting,
    Connected,
    Failed,
    Closed,
}

impl ClientState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::Unconnected => "unconnected",
            ClientState::Connecting => "connecting",
            ClientState::Connected => "connected",
            ClientState::Failed => "failed",
            ClientState::Closed => "closed",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
