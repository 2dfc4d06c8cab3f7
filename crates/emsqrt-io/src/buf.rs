//! A line reader bounded to a maximum read-ahead buffer, used by the
//! CSV/JSONL readers so a single malformed (unbounded) line cannot grow
//! memory use past the operator's declared footprint.

use std::io::{self, BufRead};

pub struct BoundedLineReader<R> {
    inner: R,
    max_line_bytes: usize,
}

impl<R: BufRead> BoundedLineReader<R> {
    pub fn new(inner: R, max_line_bytes: usize) -> Self {
        Self {
            inner,
            max_line_bytes,
        }
    }

    /// Read one line (without its trailing newline). Returns `Ok(None)` at EOF.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        let n = self.inner.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if buf.len() > self.max_line_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "line exceeds max buffered length ({} > {})",
                    buf.len(),
                    self.max_line_bytes
                ),
            ));
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }
}
