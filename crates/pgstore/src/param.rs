//! Positional placeholder numbering.

use std::fmt::Write as _;

/// Monotonic `$n` counter scoped to one statement build.
///
/// Each call to [`next`](Self::next) hands out the following placeholder number,
/// starting at 1. Batches that produce several independent statements must call
/// [`reset`](Self::reset) (or use a fresh sequencer) between them.
#[derive(Debug, Clone, Default)]
pub struct ParamSequencer {
    issued: usize,
}

impl ParamSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next placeholder number.
    pub fn next(&mut self) -> usize {
        self.issued += 1;
        self.issued
    }

    /// Issue the next placeholder rendered as `$n`.
    pub fn placeholder(&mut self) -> String {
        format!("${}", self.next())
    }

    /// Append the next placeholder to `buf`.
    pub fn write_placeholder(&mut self, buf: &mut String) {
        let n = self.next();
        let _ = write!(buf, "${n}");
    }

    /// Number of placeholders issued since creation or the last reset.
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn reset(&mut self) {
        self.issued = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_start_at_one_and_increase() {
        let mut seq = ParamSequencer::new();
        assert_eq!(seq.placeholder(), "$1");
        assert_eq!(seq.next(), 2);
        let mut buf = String::from("id = ");
        seq.write_placeholder(&mut buf);
        assert_eq!(buf, "id = $3");
        assert_eq!(seq.issued(), 3);
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut seq = ParamSequencer::new();
        seq.next();
        seq.next();
        seq.reset();
        assert_eq!(seq.issued(), 0);
        assert_eq!(seq.placeholder(), "$1");
    }
}
