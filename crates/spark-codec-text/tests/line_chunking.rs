//! 行分帧与 TCP 读取边界无关的性质测试。
//!
//! - **Why**：服务端一行回包可能被内核拆成任意多次读取，解码结果不应依赖拆分位置；
//! - **How**：`proptest` 随机生成若干行与任意切分点，逐段喂给解码器，再与一次性解码的结果比对。

use bytes::BytesMut;
use proptest::prelude::*;
use spark_codec_text::{LineDelimitedDecoder, ResponseDecoder};

fn decode_in_pieces(payload: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut decoder = LineDelimitedDecoder::new(1024);
    let mut src = BytesMut::new();
    let mut frames = Vec::new();
    let mut start = 0;
    let mut bounds: Vec<usize> = cuts.iter().map(|cut| cut % (payload.len() + 1)).collect();
    bounds.sort_unstable();
    bounds.push(payload.len());
    for end in bounds {
        if end < start {
            continue;
        }
        src.extend_from_slice(&payload[start..end]);
        start = end;
        while let Some(frame) = decoder.decode(&mut src).expect("行长在预算内") {
            frames.push(frame.to_vec());
        }
    }
    frames
}

proptest! {
    #[test]
    fn arbitrary_read_boundaries_yield_same_lines(
        lines in prop::collection::vec("[a-zA-Z0-9 ]{0,32}", 1..8),
        cuts in prop::collection::vec(any::<usize>(), 0..6),
    ) {
        let payload: Vec<u8> = lines
            .iter()
            .flat_map(|line| line.bytes().chain(std::iter::once(b'\n')))
            .collect();
        let expected: Vec<Vec<u8>> = lines.iter().map(|line| line.as_bytes().to_vec()).collect();
        prop_assert_eq!(decode_in_pieces(&payload, &cuts), expected);
    }
}
