//! Newline index for byte→line mapping.
//!
//! The extraction rules report byte offsets of their first match; the
//! analyzer converts those into 1-based line numbers by counting the
//! newlines that precede the offset. Built in a single `memchr` pass.
//!
//! Notes
//! - An empty buffer has 0 lines.
//! - A non-empty buffer without '\n' has 1 line.
//! - Offsets sitting exactly on a '\n' belong to the *next* line.

#[derive(Debug, Clone)]
pub struct NewlineIndex {
    /// Byte positions of every '\n' in the buffer.
    nl_positions: Vec<usize>,
    /// Total byte length of the buffer.
    len: usize,
}

impl NewlineIndex {
    /// Build an index recording positions of '\n'.
    pub fn build(bytes: &[u8]) -> Self {
        let mut nl_positions = Vec::with_capacity(bytes.len() / 48);
        let mut i = 0usize;

        // Single pass; record every '\n' offset.
        while let Some(pos) = memchr::memchr(b'\n', &bytes[i..]) {
            let abs = i + pos;
            nl_positions.push(abs);
            i = abs + 1;
        }

        Self {
            nl_positions,
            len: bytes.len(),
        }
    }

    /// Total number of logical lines.
    /// Empty buffer => 0 lines; else (#'\n' + 1).
    pub fn line_count(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.nl_positions.len() + 1
        }
    }

    /// 1-based line number covering the given byte offset.
    /// Returns 0 for empty buffers.
    pub fn line_of_byte(&self, byte: usize) -> usize {
        if self.len == 0 {
            return 0;
        }
        // Count how many '\n' are strictly before `byte`.
        let idx = match self.nl_positions.binary_search(&byte) {
            Ok(pos) => pos + 1, // at NL → next line
            Err(pos) => pos,    // number of NLs before `byte`
        };
        idx + 1
    }
}
