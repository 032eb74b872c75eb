use bytes::{Bytes, BytesMut};

use crate::decoder::{DecodeError, ResponseDecoder};

/// 不做分帧：把当前缓冲中的全部字节作为一个响应。
///
/// 入站任务在每次读取之后调用解码，因此一次读取恰好产出一个值。
/// 边界不对齐字符：跨两次读取的 UTF-8 多字节字符会被拆开，各自解码为 U+FFFD；
/// 需要完整字符时改用 [`LineDelimitedDecoder`](crate::LineDelimitedDecoder)。
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkDecoder;

impl ChunkDecoder {
    /// 创建解码器。
    pub fn new() -> Self {
        Self
    }
}

impl ResponseDecoder for ChunkDecoder {
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, DecodeError> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(src.split().freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Charset;

    #[test]
    fn one_read_yields_one_value() {
        let mut decoder = ChunkDecoder::new();
        let mut src = BytesMut::from(&b"PONG\nand more"[..]);
        assert_eq!(
            decoder.decode(&mut src).unwrap(),
            Some(Bytes::from_static(b"PONG\nand more"))
        );
        assert!(src.is_empty());
        assert_eq!(decoder.decode(&mut src).unwrap(), None);
    }

    #[test]
    fn multi_byte_char_split_across_reads_is_not_reassembled() {
        let mut decoder = ChunkDecoder::new();
        let bytes = "é".as_bytes();
        let mut src = BytesMut::from(&bytes[..1]);
        let first = decoder.decode(&mut src).unwrap().expect("第一次读取产出一个值");
        src.extend_from_slice(&bytes[1..]);
        let second = decoder.decode(&mut src).unwrap().expect("第二次读取产出一个值");

        assert_eq!(Charset::Utf8.decode(&first), "\u{FFFD}");
        assert_eq!(Charset::Utf8.decode(&second), "\u{FFFD}");
    }

    #[test]
    fn eof_on_empty_buffer_yields_nothing() {
        let mut decoder = ChunkDecoder::new();
        let mut src = BytesMut::new();
        assert_eq!(decoder.decode_eof(&mut src).unwrap(), None);
    }
}
