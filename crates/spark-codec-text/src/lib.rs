#![warn(missing_docs)]

//! `spark-codec-text` 提供客户端入站响应的分帧与文本编解码。
//!
//! # 教案背景（Why）
//! - 客户端状态机只关心“收到了一个响应”，不关心字节如何切分；分帧策略因此被隔离在本 crate，
//!   作为响应解码器（Response Decoder）的边界实现；
//! - 请求与响应都是按固定字符集解释的不透明字节，字符集转换同样集中在这里，避免散落在调用点。
//!
//! # 使用概览（How）
//! - 通过 [`Framing`] 选择分帧策略并调用 [`Framing::decoder`] 获得 [`ResponseDecoder`]；
//! - 入站任务每次读到字节后循环调用 `decode`，直到返回 `Ok(None)`；连接 EOF 时调用 `decode_eof` 冲刷残余；
//! - 使用 [`Charset`] 把请求文本编码为字节、把响应帧解码为文本。
//!
//! # 合约说明（What）
//! - [`ChunkDecoder`]：一次套接字读取产出一个响应，等价于“每次读取解码一次”；
//! - [`LineDelimitedDecoder`]：按 `\n` 分帧，去除行尾 `\r`，超过预算的帧被丢弃并报告 [`DecodeError::FrameTooLong`]；
//! - 解码器出错后内部状态保持一致，调用方记录告警后可以继续调用 `decode`。
//!
//! # 风险提示与后续（Trade-offs）
//! - `ChunkDecoder` 依赖 TCP 读取边界，服务端分多次写出的单个响应可能被拆成多个值；
//!   需要严格边界的场景应改用行分隔或长度前缀；
//! - 字符集仅覆盖 UTF-8 与 ISO-8859-1，二者都不需要外部转换表。

mod charset;
mod chunk;
mod decoder;
mod framing;
mod line;

pub use crate::charset::{Charset, ParseCharsetError};
pub use crate::chunk::ChunkDecoder;
pub use crate::decoder::{DecodeError, ResponseDecoder};
pub use crate::framing::{Framing, ParseFramingError};
pub use crate::line::LineDelimitedDecoder;
