use std::{fmt, str::FromStr};

use crate::{chunk::ChunkDecoder, decoder::ResponseDecoder, line::LineDelimitedDecoder};

/// 响应分帧策略。
///
/// 每条连接在建立时通过 [`Framing::decoder`] 获得一个独立的解码器实例，
/// 解码器的半帧状态不会跨连接共享。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// 每次套接字读取产出一个响应。
    #[default]
    Chunk,
    /// 按换行符分帧。
    Line {
        /// 单行字节预算（不含分隔符）。
        max_length: usize,
    },
}

impl Framing {
    /// 行分帧的默认单行预算。
    pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

    /// 使用默认预算的行分帧。
    pub const fn line() -> Self {
        Framing::Line {
            max_length: Self::DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// 构造该策略对应的解码器。
    pub fn decoder(&self) -> Box<dyn ResponseDecoder> {
        match *self {
            Framing::Chunk => Box::new(ChunkDecoder::new()),
            Framing::Line { max_length } => Box::new(LineDelimitedDecoder::new(max_length)),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::Chunk => f.write_str("chunk"),
            Framing::Line { max_length } => write!(f, "line(max {max_length} bytes)"),
        }
    }
}

/// 无法识别的分帧策略名称。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported framing `{0}` (expected chunk or line)")]
pub struct ParseFramingError(pub String);

impl FromStr for Framing {
    type Err = ParseFramingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chunk" | "raw" => Ok(Framing::Chunk),
            "line" => Ok(Framing::line()),
            _ => Err(ParseFramingError(s.to_owned())),
        }
    }
}
