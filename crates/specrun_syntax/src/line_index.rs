//! Byte offset → line/column lookup.
//!
//! Spans are byte offsets; discovery reports 1-based line numbers. Building the index is one pass over the source,
//! lookups are a binary search.

/// Precomputed line starts for one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// 1-based line containing `offset` (offsets past the end clamp to the last line).
    pub fn line(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// 1-based (line, column) for `offset`; the column counts bytes.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line(offset);
        let start = self.line_starts[line - 1];
        (line, offset.min(self.len) - start + 1)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        let idx = LineIndex::new("abc\ndef\n");
        assert_eq!(idx.line(0), 1);
        assert_eq!(idx.line(2), 1);
    }

    #[test]
    fn test_newline_belongs_to_its_line() {
        let idx = LineIndex::new("abc\ndef\n");
        assert_eq!(idx.line(3), 1);
        assert_eq!(idx.line(4), 2);
    }

    #[test]
    fn test_line_col() {
        let idx = LineIndex::new("a\n  spec(\"x\")");
        assert_eq!(idx.line_col(4), (2, 3));
    }

    #[test]
    fn test_past_end_clamps() {
        let idx = LineIndex::new("one\ntwo");
        assert_eq!(idx.line(1_000), 2);
        assert_eq!(idx.line_count(), 2);
    }
}
