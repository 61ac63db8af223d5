// Reassembles transport chunks into command lines.

/// Longest line kept before the pending bytes are emitted as a line anyway.
pub const MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream on `\n`, dropping a trailing `\r` from each line.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes in and returns every line they completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                lines.push(self.take());
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_LINE_LEN {
                    lines.push(self.take());
                }
            }
        }
        lines
    }

    /// Flushes an unterminated final line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> String {
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines_and_keeps_the_rest() {
        let mut lines = LineAssembler::new();
        assert_eq!(lines.push(b"start test\nsho"), vec!["start test"]);
        assert_eq!(lines.push(b"ot 1 2\r\n"), vec!["shoot 1 2"]);
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn empty_lines_are_preserved() {
        let mut lines = LineAssembler::new();
        assert_eq!(lines.push(b"\n\nhelp\n"), vec!["", "", "help"]);
    }

    #[test]
    fn finish_flushes_unterminated_tail() {
        let mut lines = LineAssembler::new();
        assert!(lines.push(b"start test").is_empty());
        assert_eq!(lines.finish().as_deref(), Some("start test"));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn overlong_lines_are_cut() {
        let mut lines = LineAssembler::new();
        let long = vec![b'a'; MAX_LINE_LEN + 10];
        let out = lines.push(&long);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), MAX_LINE_LEN);
        assert_eq!(lines.finish().map(|l| l.len()), Some(10));
    }
}
