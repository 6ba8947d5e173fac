//! Buffered handler output.
//!
//! Everything a handler echoes lands here instead of on the wire. The kernel
//! takes the buffer once the handler returns, substitutes `{elapsed_time}`,
//! and moves the result into the response body. On a 404 the buffer is
//! discarded.

use std::fmt;
use std::io;

/// Marker replaced with the total elapsed seconds at finalization.
pub const ELAPSED_TIME: &str = "{elapsed_time}";

#[derive(Debug, Default, Clone)]
pub struct Output {
    buffer: String,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drain the buffer.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl fmt::Write for Output {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Replace every `{elapsed_time}` marker with `seconds` (4 decimals).
pub fn substitute_elapsed(body: &str, seconds: f64) -> String {
    if !body.contains(ELAPSED_TIME) {
        return body.to_string();
    }
    body.replace(ELAPSED_TIME, &format!("{:.4}", seconds))
}
