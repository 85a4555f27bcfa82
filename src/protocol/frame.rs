//! 事件帧解码器
//!
//! 帧以空行（`\n\n` 或 `\r\n\r\n`）分隔，帧体可带 `data:` 前缀。读边界与帧边界不对齐：
//! 未完整的尾部字节留在缓冲区，等下一次 push 补齐；流结束时 finish 把残留当作最后一帧解码。

use crate::core::error::DecodeError;
use crate::protocol::event::Event;

/// 帧体的可选前缀
pub const FRAME_MARKER: &str = "data:";

/// 增量解码器：按块喂入字节，产出每个完整帧的解码结果
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// buf[..scanned] 中确定没有完整分隔符，下次从这里继续找
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一块数据，返回其中所有完整帧的解码结果（按出现顺序）；空帧/保活帧不产出
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Event, DecodeError>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf, self.scanned) {
            let frame: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            self.scanned = 0;
            if let Some(result) = decode_frame(&frame) {
                out.push(result);
            }
        }
        // 分隔符最长 4 字节，可能跨两次读取：回退 3 字节
        self.scanned = self.buf.len().saturating_sub(3);
        out
    }

    /// 流结束：缓冲区中没有分隔符收尾的残留按一帧处理
    pub fn finish(&mut self) -> Vec<Result<Event, DecodeError>> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        decode_frame(&rest).into_iter().collect()
    }

    /// 尚未组成完整帧的字节数
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

/// 从 start 起查找第一个帧分隔符，返回 (位置, 分隔符长度)
fn find_frame_delimiter(buf: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut i = start;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

/// 取出帧体文本：去掉前缀与注释行，多行 data 以换行拼接；体为空时返回 None
fn frame_body(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines: Vec<&str> = Vec::new();
    for raw in text.split('\n') {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        match line.strip_prefix(FRAME_MARKER) {
            Some(rest) => lines.push(rest.trim_start()),
            None => lines.push(line),
        }
    }
    let body = lines.join("\n");
    if body.trim().is_empty() {
        None
    } else {
        Some(body)
    }
}

fn decode_frame(bytes: &[u8]) -> Option<Result<Event, DecodeError>> {
    let body = frame_body(bytes)?;
    Some(
        serde_json::from_str::<Event>(&body).map_err(|source| DecodeError::Json { body, source }),
    )
}
