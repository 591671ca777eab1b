//! Incremental decoder for the server-sent-events wire format used by the
//! streaming Messages API.

/// One complete SSE frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Buffers raw bytes until a blank line terminates a frame.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds a chunk and returns every frame it completed.
    /// Partial frames (and split UTF-8 sequences) stay buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((end, sep_len)) = find_frame_end(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + sep_len).take(end).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Position of the first blank-line separator and its length.
fn find_frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in raw.lines() {
        // comment / keep-alive
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => frame.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if frame.event.is_none() && data_lines.is_empty() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b"event: ping\ndata: {\"type\":\"ping\"}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("ping".to_string()),
                data: "{\"type\":\"ping\"}".to_string(),
            }]
        );
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: message_stop\nda").is_empty());
        assert!(decoder.push(b"ta: {\"type\":\"message_stop\"}\n").is_empty());
        let frames = decoder.push(b"\nevent: ping\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"type\":\"message_stop\"}");
    }

    #[test]
    fn test_multiple_frames_and_crlf() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b"data: a\r\n\r\ndata: b\n\ndata: c");
        let data: Vec<_> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(data, vec!["a", "b"]);
    }

    #[test]
    fn test_comments_are_skipped_and_multiline_data_joined() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\n\n").is_empty());
        let frames = decoder.push(b"data: line one\ndata: line two\n\n");
        assert_eq!(frames[0].data, "line one\nline two");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_multibyte_text_split_mid_character() {
        let mut decoder = SseDecoder::default();
        let payload = "data: caf\u{e9}\n\n".as_bytes();
        let split = payload.len() - 3;
        assert!(decoder.push(&payload[..split]).is_empty());
        let frames = decoder.push(&payload[split..]);
        assert_eq!(frames[0].data, "caf\u{e9}");
    }
}
