use bytes::{Buf, Bytes, BytesMut};

use crate::decoder::{DecodeError, ResponseDecoder};

const NEWLINE: u8 = b'\n';
const CARRIAGE_RETURN: u8 = b'\r';

/// 基于换行符的响应分帧器。
///
/// # 设计动机（Why）
/// - 行分隔文本协议常见于调试回显服务，服务端可能把一行拆成多次写出，按分隔符切帧
///   可以消除对 TCP 读取边界的依赖；
/// - 帧预算防止对端发送无换行的超长数据把缓冲撑爆。
///
/// # 行为概览（How）
/// - 在缓冲中查找首个 `\n`，切出该行并去掉分隔符与行尾 `\r`；
/// - 若行长超过 `max_length`：已完整到达的行直接丢弃；尚未出现换行但缓冲已超限时，清空缓冲并进入
///   “丢弃模式”，直到下一个换行符之后才恢复正常解码。两种情况都返回一次 [`DecodeError::FrameTooLong`]。
///
/// # 契约说明（What）
/// - 返回的帧不包含分隔符；
/// - EOF 时若残留非空的半行（且不在丢弃模式），将其作为最后一个帧返回。
///
/// # 权衡与风险（Trade-offs）
/// - 不提供转义策略，响应中包含 `\n` 时会被拆成多个值。
#[derive(Debug, Clone)]
pub struct LineDelimitedDecoder {
    max_length: usize,
    discarding: bool,
}

impl LineDelimitedDecoder {
    /// 构建新的换行分帧器，`max_length` 为单行字节预算（不含分隔符）。
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            discarding: false,
        }
    }

    /// 当前单行字节预算。
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

fn strip_carriage_return(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&CARRIAGE_RETURN) {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}

impl ResponseDecoder for LineDelimitedDecoder {
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, DecodeError> {
        loop {
            let Some(pos) = src.iter().position(|byte| *byte == NEWLINE) else {
                if !self.discarding && src.len() > self.max_length {
                    let length = src.len();
                    src.clear();
                    self.discarding = true;
                    return Err(DecodeError::FrameTooLong {
                        length,
                        max_length: self.max_length,
                    });
                }
                if self.discarding {
                    src.clear();
                }
                return Ok(None);
            };

            if self.discarding {
                // 超长行的尾部，丢弃到分隔符为止后继续解码后续数据。
                src.advance(pos + 1);
                self.discarding = false;
                continue;
            }

            if pos > self.max_length {
                src.advance(pos + 1);
                return Err(DecodeError::FrameTooLong {
                    length: pos,
                    max_length: self.max_length,
                });
            }

            let mut line = src.split_to(pos + 1);
            line.truncate(pos);
            return Ok(Some(strip_carriage_return(line)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, DecodeError> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if self.discarding || src.is_empty() {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(strip_carriage_return(rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut LineDelimitedDecoder, src: &mut BytesMut) -> Vec<Bytes> {
        let mut frames = Vec::new();
        while let Some(frame) = decoder.decode(src).expect("帧长应在预算内") {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn splits_lines_and_strips_crlf() {
        let mut decoder = LineDelimitedDecoder::new(64);
        let mut src = BytesMut::from(&b"PONG\r\nSECOND\npart"[..]);
        assert_eq!(
            decode_all(&mut decoder, &mut src),
            vec![Bytes::from_static(b"PONG"), Bytes::from_static(b"SECOND")]
        );
        assert_eq!(&src[..], b"part", "半行应保留在缓冲中");
    }

    #[test]
    fn partial_line_waits_for_delimiter() {
        let mut decoder = LineDelimitedDecoder::new(64);
        let mut src = BytesMut::from(&b"PO"[..]);
        assert_eq!(decoder.decode(&mut src).unwrap(), None);
        src.extend_from_slice(b"NG\n");
        assert_eq!(
            decoder.decode(&mut src).unwrap(),
            Some(Bytes::from_static(b"PONG"))
        );
    }

    #[test]
    fn complete_overlong_line_is_dropped_and_decoding_resumes() {
        let mut decoder = LineDelimitedDecoder::new(4);
        let mut src = BytesMut::from(&b"TOOLONG\nOK\n"[..]);
        assert_eq!(
            decoder.decode(&mut src),
            Err(DecodeError::FrameTooLong {
                length: 7,
                max_length: 4
            })
        );
        assert_eq!(
            decoder.decode(&mut src).unwrap(),
            Some(Bytes::from_static(b"OK"))
        );
    }

    #[test]
    fn unterminated_overlong_data_enters_discard_mode() {
        let mut decoder = LineDelimitedDecoder::new(4);
        let mut src = BytesMut::from(&b"ABCDEFG"[..]);
        assert!(matches!(
            decoder.decode(&mut src),
            Err(DecodeError::FrameTooLong { length: 7, .. })
        ));
        assert!(src.is_empty());

        src.extend_from_slice(b"HIJ\nOK\n");
        assert_eq!(
            decoder.decode(&mut src).unwrap(),
            Some(Bytes::from_static(b"OK")),
            "超长行的尾部应被丢弃"
        );
    }

    #[test]
    fn eof_flushes_trailing_partial_line() {
        let mut decoder = LineDelimitedDecoder::new(64);
        let mut src = BytesMut::from(&b"PONG"[..]);
        assert_eq!(
            decoder.decode_eof(&mut src).unwrap(),
            Some(Bytes::from_static(b"PONG"))
        );
        assert_eq!(decoder.decode_eof(&mut src).unwrap(), None);
    }
}
