use std::{fmt, str::FromStr};

use bytes::Bytes;

const LATIN1_REPLACEMENT: u8 = b'?';

/// 请求与响应负载使用的字符集。
///
/// # 契约说明（What）
/// - [`Charset::Utf8`]（默认）：编码无损；解码时非法序列替换为 U+FFFD；
/// - [`Charset::Latin1`]（ISO-8859-1）：编码时超出 `U+00FF` 的字符替换为 `?`；
///   解码按字节一一映射，永不失败。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    /// UTF-8。按块分帧时跨读取拆开的多字节字符会解码为 U+FFFD。
    #[default]
    Utf8,
    /// ISO-8859-1。
    Latin1,
}

impl Charset {
    /// 规范名称，与 IANA 注册名一致。
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
        }
    }

    /// 把请求文本编码为线上字节。
    pub fn encode(&self, text: &str) -> Bytes {
        match self {
            Charset::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            Charset::Latin1 => text
                .chars()
                .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(LATIN1_REPLACEMENT))
                .collect::<Vec<u8>>()
                .into(),
        }
    }

    /// 把响应帧解码为文本。
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|byte| char::from(*byte)).collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 无法识别的字符集名称。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported charset `{0}` (expected utf-8 or iso-8859-1)")]
pub struct ParseCharsetError(pub String);

impl FromStr for Charset {
    type Err = ParseCharsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "latin-1" | "latin1" => Ok(Charset::Latin1),
            _ => Err(ParseCharsetError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_decoding_replaces_invalid_sequences() {
        assert_eq!(Charset::Utf8.encode("PING"), Bytes::from_static(b"PING"));
        assert_eq!(Charset::Utf8.decode(b"PO\xffNG"), "PO\u{fffd}NG");
    }

    #[test]
    fn latin1_maps_bytes_one_to_one() {
        assert_eq!(Charset::Latin1.encode("caf\u{e9}"), Bytes::from_static(b"caf\xe9"));
        assert_eq!(Charset::Latin1.decode(b"caf\xe9"), "caf\u{e9}");
    }

    #[test]
    fn latin1_replaces_unmappable_characters() {
        assert_eq!(Charset::Latin1.encode("a\u{4e2d}b"), Bytes::from_static(b"a?b"));
    }

    #[test]
    fn parses_common_aliases() {
        assert_eq!("UTF-8".parse::<Charset>(), Ok(Charset::Utf8));
        assert_eq!("latin1".parse::<Charset>(), Ok(Charset::Latin1));
        assert_eq!(" ISO-8859-1 ".parse::<Charset>(), Ok(Charset::Latin1));
        assert_eq!(
            "ebcdic".parse::<Charset>(),
            Err(ParseCharsetError("ebcdic".to_owned()))
        );
    }
}
