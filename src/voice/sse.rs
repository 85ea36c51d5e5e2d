//! Incremental server-sent events decoding

/// Splits a byte stream into SSE `data` payloads
///
/// Network reads do not align with event boundaries, so bytes are buffered
/// until a blank line closes the event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes and return the payloads of every event they complete
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some((end, separator_len)) = find_event_end(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + separator_len).collect();
            if let Some(payload) = event_data(&block[..end]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing event the server did not terminate
    pub fn finish(&mut self) -> Option<String> {
        let block = std::mem::take(&mut self.buffer);
        event_data(&block)
    }
}

/// Position and length of the first blank-line separator
fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));

    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Joined `data:` lines of one event, if it has any
fn event_data(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
