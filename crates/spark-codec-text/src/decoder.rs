use bytes::{Bytes, BytesMut};

/// 入站字节到响应帧的解码契约。
///
/// # 教案式说明
/// - **Why**：状态机把“每个解码值视为当前待决请求的一个响应”，因此需要一个只负责切帧、
///   不做任何关联决策的边界；
/// - **How**：实现者从 `src` 头部切走一个完整帧并返回；数据不足时返回 `Ok(None)`，
///   保留 `src` 中的半帧等待下一次读取；
/// - **What**：`decode` 每次最多产出一个帧，调用方需循环调用直到 `Ok(None)`；
///   `decode_eof` 在连接关闭时调用一次，用于冲刷残余数据。
pub trait ResponseDecoder: Send + 'static {
    /// 尝试从 `src` 切出一个完整帧。
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, DecodeError>;

    /// 连接 EOF 时冲刷残余数据；默认实现与 `decode` 相同并丢弃不完整的尾部。
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, DecodeError> {
        let frame = self.decode(src)?;
        if frame.is_none() {
            src.clear();
        }
        Ok(frame)
    }
}

/// 解码阶段的错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 单帧长度超过预算，对应字节已被丢弃。
    #[error("frame length {length} exceeds limit {max_length}")]
    FrameTooLong {
        /// 被丢弃的字节数（不含分隔符）。
        length: usize,
        /// 配置的帧预算。
        max_length: usize,
    },
}

impl<D: ResponseDecoder + ?Sized> ResponseDecoder for Box<D> {
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, DecodeError> {
        (**self).decode(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, DecodeError> {
        (**self).decode_eof(src)
    }
}
